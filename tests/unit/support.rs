use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cms_client::utils::logger::setup_logger;
use cms_client::{
    CallDescriptor, CmsClient, Config, CredentialPair, HttpExecutor, MemoryStorage, RawResponse,
    RefreshMode, RequestExecutor, Token, TransportError,
};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const POSTS: &str = "/api/admin/posts/";
pub const LOGIN: &str = "/api/auth/get-access-token/";
pub const REFRESH: &str = "/api/auth/get-refresh-token/";
pub const REGISTER: &str = "/api/auth/register/";

pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::with_base_url(base_url);
    config.rest_api.timeout = 5;
    config.auth.login_path = LOGIN.to_string();
    config.auth.refresh_path = REFRESH.to_string();
    config.auth.register_path = REGISTER.to_string();
    config.auth.refresh_mode = RefreshMode::Body;
    config
}

/// Client against `base_url` with in-memory storage, optionally seeded with a pair.
pub fn client_for(base_url: &str, pair: Option<CredentialPair>) -> CmsClient {
    setup_logger();
    let config = test_config(base_url);
    let executor = HttpExecutor::from_config(&config).unwrap();
    let client = CmsClient::with_parts(Arc::new(executor), Arc::new(MemoryStorage::new()), &config);
    if let Some(pair) = pair {
        client.store().set(pair).unwrap();
    }
    client
}

pub fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"token_type": "access", "exp": exp}).to_string());
    format!("{header}.{payload}.signature")
}

/// Backend where only `valid_access` is accepted and every refresh is slow.
pub struct SlowBackend {
    pub valid_access: String,
    pub refresh_status: StatusCode,
    pub refresh_delay: Duration,
    pub refresh_calls: AtomicUsize,
    pub resource_calls: AtomicUsize,
}

impl SlowBackend {
    pub fn new(refresh_status: StatusCode) -> Self {
        Self {
            valid_access: "a2".to_string(),
            refresh_status,
            refresh_delay: Duration::from_millis(50),
            refresh_calls: AtomicUsize::new(0),
            resource_calls: AtomicUsize::new(0),
        }
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestExecutor for SlowBackend {
    async fn execute(
        &self,
        descriptor: &CallDescriptor,
        access: Option<&Token>,
    ) -> Result<RawResponse, TransportError> {
        if descriptor.url() == REFRESH {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.refresh_delay).await;
            return Ok(if self.refresh_status.is_success() {
                RawResponse::json(
                    self.refresh_status,
                    json!({"access": self.valid_access, "refresh": "r2"}),
                )
            } else {
                RawResponse::json(
                    self.refresh_status,
                    json!({"detail": "Token is invalid or expired", "code": "token_not_valid"}),
                )
            });
        }

        self.resource_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        if access.map(Token::expose) == Some(self.valid_access.as_str()) {
            Ok(RawResponse::json(StatusCode::OK, json!({"id": 1, "title": "x"})))
        } else {
            Ok(RawResponse::json(
                StatusCode::UNAUTHORIZED,
                json!({"detail": "Given token not valid for any token type"}),
            ))
        }
    }
}
