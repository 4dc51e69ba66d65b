use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Whether a call may go out without a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthRequirement {
    /// Bearer header attached when a credential exists, omitted otherwise.
    #[default]
    Optional,
    /// Without a credential the call is not sent and resolves `SessionExpired`.
    Required,
}

/// Immutable description of one logical request.
///
/// Built once per call and only ever borrowed by the executor, so a retry reuses exactly
/// what the first attempt sent apart from the freshly built auth header.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<Value>,
    auth: AuthRequirement,
}

impl CallDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Vec::new(),
            body: None,
            auth: AuthRequirement::Optional,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn post<B: Serialize>(url: impl Into<String>, body: &B) -> serde_json::Result<Self> {
        Self::new(Method::POST, url).with_json(body)
    }

    pub fn put<B: Serialize>(url: impl Into<String>, body: &B) -> serde_json::Result<Self> {
        Self::new(Method::PUT, url).with_json(body)
    }

    pub fn patch<B: Serialize>(url: impl Into<String>, body: &B) -> serde_json::Result<Self> {
        Self::new(Method::PATCH, url).with_json(body)
    }

    pub fn with_json<B: Serialize>(self, body: &B) -> serde_json::Result<Self> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn require_auth(mut self) -> Self {
        self.auth = AuthRequirement::Required;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn auth(&self) -> AuthRequirement {
        self.auth
    }
}

impl fmt::Display for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Valid JSON. An empty body decodes to `Value::Null`.
    Json(Value),
    /// The body was not JSON; the raw text is kept for diagnostics.
    Malformed(String),
}

impl ResponseBody {
    pub fn decode(text: &str) -> Self {
        if text.trim().is_empty() {
            return ResponseBody::Json(Value::Null);
        }
        match serde_json::from_str(text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Malformed(text.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Malformed(_) => None,
        }
    }
}

/// Outcome of one completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: ResponseBody) -> Self {
        Self { status, body }
    }

    pub fn json(status: StatusCode, body: Value) -> Self {
        Self::new(status, ResponseBody::Json(body))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }
}
