/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 3/9/24
******************************************************************************/

//! Client-side session layer for the CMS REST API.
//!
//! Calls are described by a [`CallDescriptor`] and run through the [`ResilientPipeline`],
//! which attaches the stored access credential, refreshes it at most once per expiry no
//! matter how many calls are rejected at the same time, retries once, and reports every
//! failure as a [`NormalizedError`].

pub mod config;

pub(crate) mod constants;

pub mod error;

pub mod application;

pub mod presentation;

pub mod session;

pub mod transport;

pub mod utils;

pub use application::client::CmsClient;
pub use application::pipeline::{CallHandle, CallResult, CallStatus, ResilientPipeline};
pub use config::{Config, RefreshMode};
pub use constants::{
    CALL_PENDING_MESSAGE, GENERIC_ERROR_MESSAGE, MALFORMED_RESPONSE_MESSAGE,
    SESSION_EXPIRED_MESSAGE,
};
pub use error::{AppError, ErrorKind, NormalizedError, StorageError, TransportError};
pub use session::credentials::{CredentialPair, Session, Token};
pub use session::refresh::{RefreshCoordinator, RefreshFailure, RefreshOutcome};
pub use session::storage::{FileStorage, MemoryStorage, StorageBackend};
pub use session::store::CredentialStore;
pub use transport::http_client::{HttpExecutor, RequestExecutor};
pub use transport::model::{AuthRequirement, CallDescriptor, RawResponse, ResponseBody};
