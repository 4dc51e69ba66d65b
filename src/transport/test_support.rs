use crate::error::TransportError;
use crate::session::credentials::Token;
use crate::transport::http_client::RequestExecutor;
use crate::transport::model::{CallDescriptor, RawResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

type Handler =
    dyn Fn(&CallDescriptor, Option<&Token>) -> Result<RawResponse, TransportError> + Send + Sync;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

/// Executor answering from a closure, recording every call it receives.
pub(crate) struct ScriptedExecutor {
    handler: Box<Handler>,
    delay: Duration,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedExecutor {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&CallDescriptor, Option<&Token>) -> Result<RawResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call suspends this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.url == url).count()
    }
}

#[async_trait]
impl RequestExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        descriptor: &CallDescriptor,
        access: Option<&Token>,
    ) -> Result<RawResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            method: descriptor.method().clone(),
            url: descriptor.url().to_string(),
            bearer: access.map(|t| t.expose().to_string()),
            body: descriptor.body().cloned(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(descriptor, access)
    }
}
