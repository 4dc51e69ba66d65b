/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 12/10/26
******************************************************************************/
use crate::application::pipeline::{CallHandle, CallResult, ResilientPipeline};
use crate::config::Config;
use crate::error::{AppError, NormalizedError};
use crate::session::auth::AuthClient;
use crate::session::credentials::Session;
use crate::session::storage::{FileStorage, StorageBackend};
use crate::session::store::CredentialStore;
use crate::transport::http_client::{HttpExecutor, RequestExecutor};
use crate::transport::model::CallDescriptor;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// One process-wide client: a single credential store, refresh coordinator and executor
/// shared by every call site.
pub struct CmsClient {
    pipeline: Arc<ResilientPipeline>,
    auth: AuthClient,
}

impl CmsClient {
    /// Builds the client from `config`, persisting credentials under `config.storage.dir`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let backend = FileStorage::new(&config.storage.dir)?;
        let executor = HttpExecutor::from_config(config).map_err(AppError::HttpClient)?;
        info!("Creating client for {}", executor);
        Ok(Self::with_parts(Arc::new(executor), Arc::new(backend), config))
    }

    /// Builds the client over an arbitrary executor and storage backend.
    pub fn with_parts(
        executor: Arc<dyn RequestExecutor>,
        backend: Arc<dyn StorageBackend>,
        config: &Config,
    ) -> Self {
        let store = Arc::new(CredentialStore::load(backend, config.storage.key.as_str()));
        let pipeline = Arc::new(ResilientPipeline::new(
            executor.clone(),
            store.clone(),
            &config.auth,
        ));
        let auth = AuthClient::new(executor, store, &config.auth);
        Self { pipeline, auth }
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn pipeline(&self) -> &Arc<ResilientPipeline> {
        &self.pipeline
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.pipeline.store()
    }

    pub fn session(&self) -> Session {
        self.store().session()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store().subscribe()
    }

    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session, NormalizedError> {
        self.auth.login(identifier, secret).await
    }

    pub async fn register(&self, payload: &Value) -> Result<Value, NormalizedError> {
        self.auth.register(payload).await
    }

    pub fn logout(&self) {
        self.auth.logout()
    }

    pub async fn execute(&self, descriptor: &CallDescriptor) -> CallResult {
        self.pipeline.execute(descriptor).await
    }

    pub async fn fetch<T: DeserializeOwned>(
        &self,
        descriptor: &CallDescriptor,
    ) -> Result<T, NormalizedError> {
        self.pipeline.fetch(descriptor).await
    }

    pub fn dispatch(&self, descriptor: CallDescriptor) -> CallHandle {
        self.pipeline.dispatch(descriptor)
    }
}
