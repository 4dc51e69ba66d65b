/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/10/26
******************************************************************************/
use crate::application::normalizer::normalize_body;
use crate::config::AuthConfig;
use crate::constants::{CALL_PENDING_MESSAGE, MALFORMED_RESPONSE_MESSAGE};
use crate::error::NormalizedError;
use crate::session::credentials::Token;
use crate::session::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::session::store::CredentialStore;
use crate::transport::http_client::RequestExecutor;
use crate::transport::model::{AuthRequirement, CallDescriptor, RawResponse, ResponseBody};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn, Instrument};
use uuid::Uuid;

/// Where a call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Idle,
    Loading,
    Success,
    Failed,
}

/// Observable state of one logical call.
///
/// Settled states carry either data or an error, never both.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallResult {
    #[default]
    Idle,
    Loading,
    Success(Value),
    Failed(NormalizedError),
}

impl CallResult {
    pub fn status(&self) -> CallStatus {
        match self {
            CallResult::Idle => CallStatus::Idle,
            CallResult::Loading => CallStatus::Loading,
            CallResult::Success(_) => CallStatus::Success,
            CallResult::Failed(_) => CallStatus::Failed,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            CallResult::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&NormalizedError> {
        match self {
            CallResult::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, CallResult::Success(_) | CallResult::Failed(_))
    }

    pub fn into_result(self) -> Result<Value, NormalizedError> {
        match self {
            CallResult::Success(data) => Ok(data),
            CallResult::Failed(error) => Err(error),
            CallResult::Idle | CallResult::Loading => {
                Err(NormalizedError::form(CALL_PENDING_MESSAGE))
            }
        }
    }
}

/// A call site's view of a dispatched call.
///
/// Dropping the handle only stops observation: the request, and any refresh it started,
/// run to completion in the background.
#[derive(Debug)]
pub struct CallHandle {
    id: Uuid,
    rx: watch::Receiver<CallResult>,
}

impl CallHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CallResult {
        self.rx.borrow().clone()
    }

    pub fn status(&self) -> CallStatus {
        self.rx.borrow().status()
    }

    /// Waits for the next state transition and returns the new state.
    pub async fn changed(&mut self) -> CallResult {
        // the sender lives until the call settles, so an error means nothing else will change
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    /// Waits until the call is settled.
    pub async fn settled(mut self) -> CallResult {
        if let Ok(state) = self.rx.wait_for(CallResult::is_settled).await {
            return state.clone();
        }
        self.rx.borrow().clone()
    }
}

/// Executes calls with the current credential, refreshing and retrying once on 401.
///
/// Every call site goes through [`ResilientPipeline::execute`] or
/// [`ResilientPipeline::dispatch`]; they differ only in the descriptor they pass and in what
/// they do with the result.
pub struct ResilientPipeline {
    executor: Arc<dyn RequestExecutor>,
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
}

impl ResilientPipeline {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        store: Arc<CredentialStore>,
        auth: &AuthConfig,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(executor.clone(), store.clone(), auth);
        Self {
            executor,
            store,
            coordinator,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Runs one call to completion. Never fails: every failure is a `CallResult::Failed`.
    #[instrument(skip(self, descriptor), fields(call = %Uuid::new_v4(), request = %descriptor))]
    pub async fn execute(&self, descriptor: &CallDescriptor) -> CallResult {
        match self.run(descriptor).await {
            Ok(response) => Self::settle(response),
            Err(error) => {
                debug!("Call failed: {}", error);
                CallResult::Failed(error)
            }
        }
    }

    /// Executes and deserializes the data into `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        descriptor: &CallDescriptor,
    ) -> Result<T, NormalizedError> {
        let data = self.execute(descriptor).await.into_result()?;
        serde_json::from_value(data).map_err(|e| {
            warn!("Failed to decode {} response: {}", descriptor, e);
            NormalizedError::form(MALFORMED_RESPONSE_MESSAGE)
        })
    }

    /// Starts a call in the background and returns a handle observing
    /// `Idle → Loading → Success | Failed`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(self: &Arc<Self>, descriptor: CallDescriptor) -> CallHandle {
        let id = Uuid::new_v4();
        let (tx, rx) = watch::channel(CallResult::Idle);
        let pipeline = Arc::clone(self);

        tokio::spawn(
            async move {
                tx.send_replace(CallResult::Loading);
                let outcome = pipeline.execute(&descriptor).await;
                if tx.is_closed() {
                    debug!("Call site went away before {} settled", descriptor);
                }
                tx.send_replace(outcome);
            }
            .instrument(tracing::debug_span!("dispatch", %id)),
        );

        CallHandle { id, rx }
    }

    async fn run(&self, descriptor: &CallDescriptor) -> Result<RawResponse, NormalizedError> {
        let access = self.store.access_token();
        if access.is_none() && descriptor.auth() == AuthRequirement::Required {
            warn!("{} requires a credential and none is stored", descriptor);
            return Err(NormalizedError::SessionExpired);
        }

        let response = self.executor.execute(descriptor, access.as_ref()).await?;
        // anonymous calls never refresh, a 401 there is an ordinary error response
        let Some(rejected) = access.filter(|_| response.is_unauthorized()) else {
            return Ok(response);
        };

        info!("Access credential rejected, requesting refresh");
        let fresh = match self.coordinator.request_refresh(&rejected).await {
            RefreshOutcome::Refreshed(token) => token,
            RefreshOutcome::Failed(reason) => {
                warn!("Refresh failed ({}), ending session", reason);
                self.end_session(&rejected);
                return Err(NormalizedError::SessionExpired);
            }
        };

        let retried = self.executor.execute(descriptor, Some(&fresh)).await?;
        if retried.is_unauthorized() {
            warn!("Refreshed credential rejected as well, ending session");
            self.end_session(&fresh);
            return Err(NormalizedError::SessionExpired);
        }
        Ok(retried)
    }

    // Only the session this call was made with is ended; a newer login stays.
    fn end_session(&self, used: &Token) {
        match self.store.clear_if(used) {
            Ok(true) => {}
            Ok(false) => debug!("Credentials changed since the call was sent, keeping them"),
            Err(e) => warn!("Failed to clear persisted credentials: {}", e),
        }
    }

    fn settle(response: RawResponse) -> CallResult {
        if response.status.is_success() {
            return match response.body {
                ResponseBody::Json(data) => CallResult::Success(data),
                ResponseBody::Malformed(_) => {
                    warn!("Success status {} with a non-JSON body", response.status);
                    CallResult::Failed(NormalizedError::form(MALFORMED_RESPONSE_MESSAGE))
                }
            };
        }

        debug!("Normalizing error response with status {}", response.status);
        CallResult::Failed(normalize_body(&response.body))
    }
}
