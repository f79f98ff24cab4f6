//! Credential persistence.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Minimal description of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescriptor {
    pub id: String,
    pub name: String,
    pub role: String,
}

/// A bearer credential and the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserDescriptor,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential was stored.
    SignedIn,
    /// The caller signed out.
    SignedOut,
    /// The backend rejected the credential; consumers should route to login.
    Expired,
}

/// Shared, optionally file-backed session store.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
    persistence_path: Option<PathBuf>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(RwLock::new(None)),
            persistence_path,
            events,
        }
    }

    /// Load from file if it exists.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let session: Session = serde_json::from_reader(reader)?;
            tracing::info!(user = %session.user.id, "Loaded session from file");
            *store.write() = Some(session);
        }
        Ok(store)
    }

    /// Store a credential, replacing any previous one.
    pub fn sign_in(&self, session: Session) -> std::io::Result<()> {
        *self.write() = Some(session);
        self.save_to_file()?;
        let _ = self.events.send(SessionEvent::SignedIn);
        Ok(())
    }

    /// Explicit sign-out.
    pub fn sign_out(&self) -> std::io::Result<()> {
        self.clear()?;
        let _ = self.events.send(SessionEvent::SignedOut);
        Ok(())
    }

    /// Drop the credential after the backend rejected it.
    ///
    /// Never fails: persistence errors are logged, the in-memory credential is
    /// always cleared and `Expired` is always broadcast.
    pub fn expire(&self) {
        if let Err(e) = self.clear() {
            tracing::warn!(error = %e, "Failed to remove session file");
        }
        tracing::warn!("Session expired, credentials cleared");
        let _ = self.events.send(SessionEvent::Expired);
    }

    /// Current bearer token, if signed in.
    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    /// Current user, if signed in.
    pub fn user(&self) -> Option<UserDescriptor> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Write the current session to the persistence path, if any.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        match self.read().as_ref() {
            Some(session) => {
                let writer = BufWriter::new(File::create(path)?);
                serde_json::to_writer(writer, session)?;
            }
            None => remove_if_exists(path)?,
        }
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.write() = None;
        match &self.persistence_path {
            Some(path) => remove_if_exists(path),
            None => Ok(()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("signed_in", &self.read().is_some())
            .field("persistence_path", &self.persistence_path)
            .finish()
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
