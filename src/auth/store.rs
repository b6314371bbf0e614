// Credential storage
// Collaborator contract for holding the current session credential

use std::sync::RwLock;

use super::types::Credential;

/// Holds the current session credential.
///
/// Persistence is the implementor's responsibility; the client only ever
/// reads the current value, replaces it after a successful refresh, and
/// clears it when the session ends. Implementations must tolerate being
/// empty at any time (first load, post-logout) and must not block.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: Credential);
    fn clear(&self);
}

/// In-memory store, the default for tests and short-lived clients.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            inner: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, credential: Credential) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(credential),
            Err(poisoned) => *poisoned.into_inner() = Some(credential),
        }
    }

    fn clear(&self) {
        match self.inner.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}
