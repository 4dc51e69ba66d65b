/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 12/10/26
******************************************************************************/
use crate::application::normalizer::normalize_body;
use crate::config::AuthConfig;
use crate::constants::{GENERIC_ERROR_MESSAGE, MALFORMED_RESPONSE_MESSAGE};
use crate::error::NormalizedError;
use crate::session::credentials::{CredentialPair, Session};
use crate::session::store::CredentialStore;
use crate::transport::http_client::RequestExecutor;
use crate::transport::model::{CallDescriptor, RawResponse, ResponseBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
}

/// Obtains and discards credentials.
///
/// Calls made here go out anonymously and never trigger a refresh.
pub struct AuthClient {
    executor: Arc<dyn RequestExecutor>,
    store: Arc<CredentialStore>,
    login_path: String,
    register_path: String,
}

impl AuthClient {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        store: Arc<CredentialStore>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            executor,
            store,
            login_path: auth.login_path.clone(),
            register_path: auth.register_path.clone(),
        }
    }

    /// Exchanges an identifier and secret for a credential pair and stores it.
    #[instrument(skip(self, secret))]
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session, NormalizedError> {
        let request = LoginRequest {
            username: identifier,
            password: secret,
        };
        let descriptor = CallDescriptor::post(self.login_path.as_str(), &request)
            .map_err(|e| {
                warn!("Failed to encode login request: {}", e);
                NormalizedError::form(GENERIC_ERROR_MESSAGE)
            })?;

        let data = self.send(&descriptor).await?;
        let response: LoginResponse = serde_json::from_value(data).map_err(|e| {
            warn!("Login response without a credential pair: {}", e);
            NormalizedError::form(MALFORMED_RESPONSE_MESSAGE)
        })?;

        let pair = CredentialPair::new(response.access, response.refresh);
        if !pair.is_well_formed() {
            warn!("Login returned a blank credential");
            return Err(NormalizedError::form(MALFORMED_RESPONSE_MESSAGE));
        }
        self.store.set(pair).map_err(|e| {
            warn!("Failed to persist credentials: {}", e);
            NormalizedError::form(GENERIC_ERROR_MESSAGE)
        })?;

        info!("Logged in");
        Ok(self.store.session())
    }

    /// Creates an account. The payload is forwarded as-is.
    #[instrument(skip(self, payload))]
    pub async fn register(&self, payload: &Value) -> Result<Value, NormalizedError> {
        let descriptor = CallDescriptor::new(reqwest::Method::POST, self.register_path.as_str())
            .with_body(payload.clone());
        let data = self.send(&descriptor).await?;
        info!("Registered new account");
        Ok(data)
    }

    pub async fn register_and_login(
        &self,
        payload: &Value,
        identifier: &str,
        secret: &str,
    ) -> Result<Session, NormalizedError> {
        self.register(payload).await?;
        self.login(identifier, secret).await
    }

    /// Forgets the stored credential. Calling it without a session is a no-op.
    pub fn logout(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to remove persisted credentials: {}", e);
        }
        info!("Logged out");
    }

    async fn send(&self, descriptor: &CallDescriptor) -> Result<Value, NormalizedError> {
        let RawResponse { status, body } = self.executor.execute(descriptor, None).await?;
        debug!("{} responded with {}", descriptor, status);

        if !status.is_success() {
            return Err(normalize_body(&body));
        }
        match body {
            ResponseBody::Json(data) => Ok(data),
            ResponseBody::Malformed(_) => Err(NormalizedError::form(MALFORMED_RESPONSE_MESSAGE)),
        }
    }
}
