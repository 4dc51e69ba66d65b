/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 10/10/26
******************************************************************************/
use crate::config::{AuthConfig, RefreshMode};
use crate::constants::REFRESH_BODY_FIELD;
use crate::session::credentials::{CredentialPair, Token};
use crate::session::store::CredentialStore;
use crate::transport::http_client::RequestExecutor;
use crate::transport::model::CallDescriptor;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Why a refresh did not yield a new access credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// No refresh credential was stored when the refresh was requested.
    NoCredential,
    /// The refresh endpoint answered with a non-success status.
    Rejected(StatusCode),
    /// The refresh call never completed.
    Network(String),
    /// A success status without a usable `{access, refresh?}` body.
    MalformedResponse,
    /// The new pair could not be persisted.
    Storage(String),
    /// The pair the refresh started from was cleared or replaced before it completed.
    Superseded,
    /// The refresh task ended without producing an outcome.
    Aborted,
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshFailure::NoCredential => write!(f, "no refresh credential"),
            RefreshFailure::Rejected(status) => write!(f, "refresh rejected with status {status}"),
            RefreshFailure::Network(e) => write!(f, "refresh call failed: {e}"),
            RefreshFailure::MalformedResponse => write!(f, "malformed refresh response"),
            RefreshFailure::Storage(e) => write!(f, "failed to persist refreshed credentials: {e}"),
            RefreshFailure::Superseded => write!(f, "credentials changed during refresh"),
            RefreshFailure::Aborted => write!(f, "refresh aborted"),
        }
    }
}

/// Settled value of a refresh ticket, fanned out to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(Token),
    Failed(RefreshFailure),
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// One in-flight refresh. Cloning attaches another waiter to the same outcome.
#[derive(Clone)]
struct RefreshTicket {
    id: Uuid,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

struct Inner {
    executor: Arc<dyn RequestExecutor>,
    store: Arc<CredentialStore>,
    refresh_path: String,
    mode: RefreshMode,
    active: Mutex<Option<RefreshTicket>>,
}

/// Drops the ticket from `active` when the refresh task finishes, panics included.
struct TicketSettler {
    inner: Arc<Inner>,
    id: Uuid,
}

impl Drop for TicketSettler {
    fn drop(&mut self) {
        let mut active = self.inner.active.lock();
        if active.as_ref().is_some_and(|ticket| ticket.id == self.id) {
            *active = None;
            debug!(ticket = %self.id, "Refresh ticket settled");
        }
    }
}

/// Guarantees at most one refresh call in flight.
///
/// The first caller that finds no active ticket opens one: the refresh credential is read
/// from the store at that moment and the call runs on its own task. Callers arriving while
/// the ticket is open attach to it and receive the same outcome. Because the call runs on a
/// spawned task, a waiter that goes away never cancels the refresh or its write to the store.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        store: Arc<CredentialStore>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                store,
                refresh_path: auth.refresh_path.clone(),
                mode: auth.refresh_mode,
                active: Mutex::new(None),
            }),
        }
    }

    /// Asks for a fresh access credential after `rejected` was answered with 401.
    ///
    /// If the stored access credential is no longer `rejected`, another caller already
    /// rotated it and that credential is returned without a network call.
    pub async fn request_refresh(&self, rejected: &Token) -> RefreshOutcome {
        let ticket = {
            let mut active = self.inner.active.lock();
            match active.as_ref() {
                Some(ticket) => {
                    debug!(ticket = %ticket.id, "Attaching to in-flight refresh");
                    ticket.clone()
                }
                None => match self.inner.store.current() {
                    None => {
                        warn!("Refresh requested without stored credentials");
                        return RefreshOutcome::Failed(RefreshFailure::NoCredential);
                    }
                    Some(pair) if pair.access != *rejected => {
                        debug!("Access credential already rotated, skipping refresh");
                        return RefreshOutcome::Refreshed(pair.access);
                    }
                    Some(pair) => {
                        let ticket = self.open_ticket(pair.refresh);
                        *active = Some(ticket.clone());
                        ticket
                    }
                },
            }
        };

        ticket.outcome.await
    }

    /// Whether a refresh ticket is currently open.
    pub fn is_refreshing(&self) -> bool {
        self.inner.active.lock().is_some()
    }

    // Called with `active` locked, so the task cannot settle before the ticket is stored.
    fn open_ticket(&self, refresh: Token) -> RefreshTicket {
        let id = Uuid::new_v4();
        let inner = self.inner.clone();
        info!(ticket = %id, "Opening refresh ticket");

        let task = tokio::spawn(async move {
            let _settler = TicketSettler {
                inner: inner.clone(),
                id,
            };
            inner.perform_refresh(id, refresh).await
        });

        let outcome = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(ticket = %id, "Refresh task failed: {}", e);
                    RefreshOutcome::Failed(RefreshFailure::Aborted)
                }
            }
        }
        .boxed()
        .shared();

        RefreshTicket { id, outcome }
    }
}

impl Inner {
    fn refresh_descriptor(&self, refresh: &Token) -> CallDescriptor {
        let descriptor = CallDescriptor::new(Method::POST, self.refresh_path.clone());
        let mut body = Map::new();
        if self.mode == RefreshMode::Body {
            body.insert(
                REFRESH_BODY_FIELD.to_string(),
                Value::String(refresh.expose().to_string()),
            );
        }
        descriptor.with_body(Value::Object(body))
    }

    async fn perform_refresh(&self, ticket: Uuid, refresh: Token) -> RefreshOutcome {
        let descriptor = self.refresh_descriptor(&refresh);
        let bearer = match self.mode {
            RefreshMode::Body => None,
            RefreshMode::Bearer => Some(&refresh),
        };

        let response = match self.executor.execute(&descriptor, bearer).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%ticket, "Refresh call failed: {}", e);
                return RefreshOutcome::Failed(RefreshFailure::Network(e.to_string()));
            }
        };

        if !response.status.is_success() {
            warn!(%ticket, "Refresh rejected with status {}", response.status);
            return RefreshOutcome::Failed(RefreshFailure::Rejected(response.status));
        }

        let parsed = response
            .body
            .as_json()
            .and_then(|body| serde_json::from_value::<RefreshResponse>(body.clone()).ok())
            .filter(|parsed| !parsed.access.trim().is_empty());
        let Some(parsed) = parsed else {
            warn!(%ticket, "Refresh response did not contain an access credential");
            return RefreshOutcome::Failed(RefreshFailure::MalformedResponse);
        };

        let rotated = parsed
            .refresh
            .filter(|token| !token.trim().is_empty())
            .map(Token::new);
        let pair = CredentialPair {
            access: Token::new(parsed.access),
            refresh: rotated.unwrap_or_else(|| refresh.clone()),
        };
        let access = pair.access.clone();

        match self.store.replace_if(&refresh, pair) {
            Ok(true) => {}
            Ok(false) => {
                warn!(%ticket, "Credentials changed while refreshing, discarding result");
                return RefreshOutcome::Failed(RefreshFailure::Superseded);
            }
            Err(e) => {
                error!(%ticket, "Failed to store refreshed credentials: {}", e);
                return RefreshOutcome::Failed(RefreshFailure::Storage(e.to_string()));
            }
        }

        info!(%ticket, "Access credential refreshed");
        RefreshOutcome::Refreshed(access)
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_path", &self.inner.refresh_path)
            .field("mode", &self.inner.mode)
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}
