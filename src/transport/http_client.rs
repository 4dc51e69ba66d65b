use crate::config::Config;
use crate::error::TransportError;
use crate::session::credentials::Token;
use crate::transport::headers::outgoing_headers;
use crate::transport::model::{CallDescriptor, RawResponse, ResponseBody};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Performs exactly one HTTP exchange and decodes its body.
///
/// Implementations never read or write credentials on their own; the optional access
/// token is the only auth input.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(
        &self,
        descriptor: &CallDescriptor,
        access: Option<&Token>,
    ) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed executor bound to one API root.
pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    /// Creates an executor for `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API root; descriptor URLs that are not absolute are appended to it.
    /// * `timeout` - Transport timeout. An elapsed timeout surfaces as `TransportError::Timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.rest_api.base_url,
            Duration::from_secs(config.rest_api.timeout),
        )
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    async fn decode_response(response: Response) -> Result<RawResponse, TransportError> {
        let status = response.status();
        let body_text = response.text().await.map_err(TransportError::from)?;

        debug!("Response Status: {}", status);
        let body = ResponseBody::decode(&body_text);
        if let ResponseBody::Malformed(_) = body {
            warn!("Response body with status {} is not JSON", status);
        }
        Ok(RawResponse::new(status, body))
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    #[instrument(skip(self, descriptor, access), fields(method = %descriptor.method(), url = %descriptor.url()))]
    async fn execute(
        &self,
        descriptor: &CallDescriptor,
        access: Option<&Token>,
    ) -> Result<RawResponse, TransportError> {
        let url = self.resolve(descriptor.url());
        let headers = outgoing_headers(descriptor, access)?;
        debug!("Sending {} request to {}", descriptor.method(), url);

        let mut request = self
            .client
            .request(descriptor.method().clone(), &url)
            .headers(headers);
        if let Some(body) = descriptor.body() {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to send {} request to {}: {}", descriptor.method(), url, e);
                return Err(e.into());
            }
        };

        Self::decode_response(response).await
    }
}

impl fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl fmt::Display for HttpExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"base_url\":\"{}\"}}", self.base_url)
    }
}
