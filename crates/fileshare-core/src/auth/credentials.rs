use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use keyring::Entry;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::session::FileBackend;
use crate::config::{Config, CredentialBackendKind};

const SERVICE_NAME: &str = "fileshare";

const KEYRING_ACCOUNT: &str = "access-token";

/// Opaque bearer token authorizing API calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the Authorization header and persistence only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Durable storage behind the credential store.
pub trait CredentialBackend: Send + Sync {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
    fn remove(&self) -> Result<()>;
}

/// Access token kept in the OS keychain.
pub struct KeyringBackend {
    account: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self {
            account: KEYRING_ACCOUNT.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialBackend for KeyringBackend {
    fn load(&self) -> Result<Option<Credential>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(Credential::new(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        self.entry()?
            .set_password(credential.expose())
            .context("Failed to store token in keychain")
    }

    fn remove(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

/// Process-local storage; nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<Credential>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot.lock() = Some(credential.clone());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// The single holder of the current access credential.
///
/// Reads come from the in-process copy; every `set`/`clear` updates it and
/// writes through to the backend before returning.
pub struct CredentialStore {
    backend: Box<dyn CredentialBackend>,
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    /// Open a store, loading whatever the backend persisted last.
    pub fn open(backend: Box<dyn CredentialBackend>) -> Self {
        let current = match backend.load() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted credential");
                None
            }
        };
        debug!(has_credential = current.is_some(), "Credential store opened");
        Self {
            backend,
            current: RwLock::new(current),
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryBackend::new()))
    }

    /// Open the store selected by the configuration.
    pub fn from_config(config: &Config) -> Result<Arc<Self>> {
        let backend: Box<dyn CredentialBackend> = match config.credential_backend {
            CredentialBackendKind::File => Box::new(FileBackend::new(config.data_dir()?)),
            CredentialBackendKind::Keyring => Box::new(KeyringBackend::new()),
            CredentialBackendKind::Memory => Box::new(MemoryBackend::new()),
        };
        Ok(Arc::new(Self::open(backend)))
    }

    pub fn get(&self) -> Option<Credential> {
        self.current.read().clone()
    }

    pub fn set(&self, credential: Credential) {
        let mut current = self.current.write();
        if let Err(e) = self.backend.save(&credential) {
            warn!(error = %e, "Failed to persist credential");
        }
        *current = Some(credential);
    }

    pub fn clear(&self) {
        let mut current = self.current.write();
        if let Err(e) = self.backend.remove() {
            warn!(error = %e, "Failed to remove persisted credential");
        }
        *current = None;
    }

    pub fn has_credential(&self) -> bool {
        self.current.read().is_some()
    }
}
