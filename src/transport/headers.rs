/******************************************************************************
    Author: Joaquín Béjar García
    Email: jb@taunais.com
    Date: 9/10/26
 ******************************************************************************/

use crate::constants::{AUTHORIZATION_HEADER_KEY, BEARER_PREFIX};
use crate::error::TransportError;
use crate::session::credentials::Token;
use crate::transport::model::CallDescriptor;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use tracing::debug;

/// Builds the outgoing headers for one attempt of a call.
///
/// The map is rebuilt from the descriptor on every attempt, so a retry after a refresh
/// carries the new credential without the descriptor ever being touched. Any
/// `Authorization` header the caller put on the descriptor is replaced by the bearer
/// credential when one is given, and dropped otherwise.
///
/// # Errors
///
/// * `TransportError::InvalidRequest` - a header name or value is not valid HTTP.
pub(crate) fn outgoing_headers(
    descriptor: &CallDescriptor,
    access: Option<&Token>,
) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if descriptor.body().is_some() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (name, value) in descriptor.headers() {
        if name.eq_ignore_ascii_case(AUTHORIZATION_HEADER_KEY) {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        headers.insert(name, value);
    }

    if let Some(token) = access {
        headers.insert(reqwest::header::AUTHORIZATION, bearer(token)?);
    }

    debug!(
        "Built {} headers for {} (authenticated: {})",
        headers.len(),
        descriptor,
        access.is_some()
    );
    Ok(headers)
}

pub(crate) fn bearer(token: &Token) -> Result<HeaderValue, TransportError> {
    let mut value = HeaderValue::from_str(&format!("{} {}", BEARER_PREFIX, token.expose()))
        .map_err(|_| TransportError::InvalidRequest("credential is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}
