//! Core library for the fileshare client.
//!
//! The interesting part is the session layer: a `CredentialStore` holding the
//! access credential, a `Transport` executing calls, a `RefreshCoordinator`
//! that runs at most one refresh at a time, the `SessionClient` retry-on-expiry
//! request primitive, and the `AuthStatePublisher` that tells consumers who is
//! logged in.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiError, HttpTransport, RequestEnvelope, ResponseEnvelope, SessionClient, Transport};
pub use auth::{AuthState, AuthStatePublisher, Credential, CredentialStore};
pub use config::Config;
pub use models::{FileRecord, NotificationPreferences, User, UserStats};
