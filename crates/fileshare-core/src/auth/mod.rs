//! Authentication module: the access credential and who is logged in.
//!
//! This module provides:
//! - `CredentialStore`: the single holder of the access credential, written
//!   through to a file, the OS keychain, or memory
//! - `RefreshCoordinator`: single-flight exchange of the refresh cookie for a
//!   new access credential
//! - `AuthStatePublisher`: current user and auth state for UI consumers

pub mod credentials;
pub mod refresh;
pub mod session;
pub mod state;

pub use credentials::{Credential, CredentialBackend, CredentialStore, KeyringBackend, MemoryBackend};
pub use refresh::RefreshCoordinator;
pub use session::{FileBackend, SessionData};
pub use state::{AuthState, AuthStatePublisher};
