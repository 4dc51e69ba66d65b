/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/10/26
******************************************************************************/
use crate::error::StorageError;
use crate::presentation::serialization::Serializer;
use crate::session::credentials::{CredentialPair, Session, Token};
use crate::session::storage::StorageBackend;
use chrono::Utc;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Single source of truth for the credential pair.
///
/// Every read and write of the pair, in memory or on the durable medium, goes through
/// `current`, `set` and `clear` (or their conditional forms `replace_if` and `clear_if`,
/// for writes made on behalf of an older pair). A write holds the lock across the check,
/// persistence, the in-memory swap and the subscriber notification, so readers see either
/// the old pair or the new one and subscribers observe writes in order.
pub struct CredentialStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    pair: RwLock<Option<CredentialPair>>,
    session_tx: watch::Sender<Session>,
}

impl CredentialStore {
    /// Restores a persisted pair, if any.
    ///
    /// Unreadable or structurally invalid blobs are discarded and the store starts without
    /// a session. This never fails.
    pub fn load(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        let key = key.into();
        let pair = match backend.get(&key) {
            Ok(Some(blob)) => match Serializer::from_json::<CredentialPair>(&blob) {
                Ok(pair) if pair.is_well_formed() => {
                    debug!("Restored persisted credentials under key {}", key);
                    Some(pair)
                }
                Ok(_) => {
                    warn!("Persisted credentials under key {} are incomplete, discarding", key);
                    Self::discard(backend.as_ref(), &key);
                    None
                }
                Err(e) => {
                    warn!("Persisted credentials under key {} are malformed ({}), discarding", key, e);
                    Self::discard(backend.as_ref(), &key);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read persisted credentials: {}", e);
                None
            }
        };

        let (session_tx, _) = watch::channel(Session::derive(pair.as_ref(), Utc::now()));
        Self {
            backend,
            key,
            pair: RwLock::new(pair),
            session_tx,
        }
    }

    fn discard(backend: &dyn StorageBackend, key: &str) {
        if let Err(e) = backend.remove(key) {
            warn!("Failed to discard persisted credentials: {}", e);
        }
    }

    /// The live pair, or `None`.
    pub fn current(&self) -> Option<CredentialPair> {
        self.pair.read().clone()
    }

    pub fn access_token(&self) -> Option<Token> {
        self.pair.read().as_ref().map(|pair| pair.access.clone())
    }

    pub fn session(&self) -> Session {
        Session::derive(self.pair.read().as_ref(), Utc::now())
    }

    /// Session updates, published before `set`/`clear` return.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session_tx.subscribe()
    }

    /// Replaces both tokens and persists them.
    ///
    /// When persistence fails the in-memory pair is left untouched.
    pub fn set(&self, pair: CredentialPair) -> Result<(), StorageError> {
        if !pair.is_well_formed() {
            return Err(StorageError::Rejected(
                "access and refresh tokens must both be present".to_string(),
            ));
        }
        let blob = Serializer::to_json(&pair)?;

        let mut guard = self.pair.write();
        self.swap(&mut guard, pair, &blob)
    }

    /// Like [`CredentialStore::set`], but only while the stored refresh token is still
    /// `expected_refresh`.
    ///
    /// Returns `Ok(false)` and leaves the store untouched when the pair was cleared or
    /// replaced in the meantime.
    pub fn replace_if(
        &self,
        expected_refresh: &Token,
        pair: CredentialPair,
    ) -> Result<bool, StorageError> {
        if !pair.is_well_formed() {
            return Err(StorageError::Rejected(
                "access and refresh tokens must both be present".to_string(),
            ));
        }
        let blob = Serializer::to_json(&pair)?;

        let mut guard = self.pair.write();
        if (*guard).as_ref().map(|current| &current.refresh) != Some(expected_refresh) {
            debug!("Stored credentials changed, skipping replacement");
            return Ok(false);
        }
        self.swap(&mut guard, pair, &blob)?;
        Ok(true)
    }

    fn swap(
        &self,
        guard: &mut Option<CredentialPair>,
        pair: CredentialPair,
        blob: &str,
    ) -> Result<(), StorageError> {
        self.backend.set(&self.key, blob)?;
        let session = Session::derive(Some(&pair), Utc::now());
        *guard = Some(pair);
        self.session_tx.send_replace(session);
        debug!("Credentials replaced");
        Ok(())
    }

    /// Clears the store only while its access token is still `access`.
    ///
    /// Returns `Ok(false)` without touching anything when another pair, or none, is stored.
    pub fn clear_if(&self, access: &Token) -> Result<bool, StorageError> {
        let mut guard = self.pair.write();
        if (*guard).as_ref().map(|current| &current.access) != Some(access) {
            debug!("Stored credentials changed, skipping clear");
            return Ok(false);
        }
        self.remove_locked(&mut guard)?;
        Ok(true)
    }

    /// Drops the pair from memory and from storage. Clearing an empty store succeeds.
    ///
    /// Memory is cleared even if the backend fails to remove the blob.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self.pair.write();
        self.remove_locked(&mut guard)
    }

    fn remove_locked(&self, guard: &mut Option<CredentialPair>) -> Result<(), StorageError> {
        let removed = self.backend.remove(&self.key);
        let had_session = guard.take().is_some();
        self.session_tx.send_replace(Session::anonymous());

        if had_session {
            info!("Credentials cleared");
        }
        removed
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .field("pair", &*self.pair.read())
            .finish()
    }
}
