/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 7/10/26
******************************************************************************/

pub(crate) const AUTHORIZATION_HEADER_KEY: &str = "Authorization";
pub(crate) const BEARER_PREFIX: &str = "Bearer";

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_LOGIN_PATH: &str = "/api/auth/get-access-token/";
pub(crate) const DEFAULT_REFRESH_PATH: &str = "/api/auth/get-refresh-token/";
pub(crate) const DEFAULT_REGISTER_PATH: &str = "/api/auth/register/";
pub(crate) const DEFAULT_STORAGE_DIR: &str = ".cms_client";
pub(crate) const DEFAULT_STORAGE_KEY: &str = "tokens";

/// Body field carrying the refresh credential when refreshing in body mode.
pub(crate) const REFRESH_BODY_FIELD: &str = "refresh";

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred.";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Received a malformed response from the server.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please login again.";
pub const CALL_PENDING_MESSAGE: &str = "The call has not settled.";
