//! Session and access key management
//!
//! The session owns the single active credential. It is injected into the
//! gateway rather than read from ambient state, and mirrors the key into a
//! [`SessionStore`] so a later invocation can pick it up again.

use crate::config::AuthConfig;
use crate::error::{PanelError, ValidationError};
use crate::http::{ApiRequest, Transport};
use serde_json::json;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

const LOGIN_PATH: &str = "/auth/login";

/// Opaque access key
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Where the key survives between invocations
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, PanelError>;
    fn save(&self, key: &str) -> Result<(), PanelError>;
    fn clear(&self) -> Result<(), PanelError>;
}

/// Key kept in a file readable only by the current user
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>, PanelError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let key = contents.trim();
                Ok((!key.is_empty()).then(|| key.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str) -> Result<(), PanelError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // mode() only applies on creation; tighten a file left by an older run
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(key.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), PanelError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Store that forgets everything when the process exits
#[derive(Default)]
pub struct MemorySessionStore {
    key: Mutex<Option<String>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>, PanelError> {
        Ok(self.key.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, key: &str) -> Result<(), PanelError> {
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = Some(key.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), PanelError> {
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

pub struct Session {
    current: RwLock<Option<Credential>>,
    store: Box<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self {
            current: RwLock::new(None),
            store,
        }
    }

    /// Session that is never persisted
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySessionStore::default()))
    }

    /// Session backed by the store `auth` asks for
    pub fn from_config(auth: &AuthConfig) -> Self {
        if !auth.persist {
            return Self::in_memory();
        }
        Self::persisted_at(auth.session_path())
    }

    fn persisted_at(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::new(Box::new(FileSessionStore::new(path))),
            None => {
                tracing::warn!(
                    "No runtime directory to keep the access key in; it lasts for this command only. \
                     Set auth.session_file to keep it elsewhere"
                );
                Self::in_memory()
            }
        }
    }

    /// Verify `key` against the backend and make it the active credential
    pub async fn login(&self, transport: &dyn Transport, key: &str) -> Result<(), PanelError> {
        let key = normalize_key(key)?;

        let request = ApiRequest::post(LOGIN_PATH).json(json!({ "key": key })).public();
        let resp = transport.send(&request).await?;

        if !resp.status.is_success() {
            tracing::warn!("Login rejected ({})", resp.status);
            return Err(PanelError::InvalidKey);
        }

        self.activate(key)?;
        tracing::info!("Logged in");
        Ok(())
    }

    /// Make `key` the active credential without asking the backend
    pub fn use_key(&self, key: &str) -> Result<(), PanelError> {
        let key = normalize_key(key)?;
        self.activate(key)?;
        tracing::info!("Access key stored");
        Ok(())
    }

    /// Pick up a key persisted by an earlier login.
    ///
    /// The restored key is trusted as-is; the backend is not asked again.
    pub fn restore(&self) -> Result<bool, PanelError> {
        match self.store.load()? {
            Some(key) => {
                *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Credential(key));
                tracing::debug!("Restored access key from session store");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn logout(&self) -> Result<(), PanelError> {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.store.clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    pub fn current(&self) -> Option<Credential> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    fn activate(&self, key: String) -> Result<(), PanelError> {
        self.store.save(&key)?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Credential(key));
        Ok(())
    }
}

fn normalize_key(key: &str) -> Result<String, PanelError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::new("key", "enter an access key").into());
    }
    Ok(key.to_string())
}
