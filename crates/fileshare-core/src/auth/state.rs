//! Auth state publisher: the single source of truth for who is logged in.
//!
//! State moves `Unresolved -> Checking -> Authenticated | Anonymous` and is
//! published on a `watch` channel so any number of consumers can follow it.

use std::future::Future;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, RequestEnvelope, SessionClient};
use crate::models::{FileRecord, User, UserStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Startup, before hydration has run.
    Unresolved,
    /// Hydration in progress.
    Checking,
    Authenticated(User),
    Anonymous,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Unresolved | AuthState::Checking)
    }

    fn label(&self) -> &'static str {
        match self {
            AuthState::Unresolved => "unresolved",
            AuthState::Checking => "checking",
            AuthState::Authenticated(_) => "authenticated",
            AuthState::Anonymous => "anonymous",
        }
    }
}

pub struct AuthStatePublisher {
    session: SessionClient,
    state: watch::Sender<AuthState>,
}

impl AuthStatePublisher {
    pub fn new(session: SessionClient) -> Self {
        let (state, _) = watch::channel(AuthState::Unresolved);
        Self { session, state }
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    /// Derived from the current user; never tracked separately.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    fn publish(&self, next: AuthState) {
        debug!(state = next.label(), "Auth state changed");
        self.state.send_replace(next);
    }

    /// Hydrate from a persisted credential.
    pub async fn initialize(&self) -> AuthState {
        if !self.session.has_credential() {
            self.publish(AuthState::Anonymous);
            return self.state();
        }

        self.publish(AuthState::Checking);

        let user = match self.session.me().await {
            Ok(user) => Some(user),
            // The session client already refreshed once on this call.
            Err(e) if e.is_auth_expired() || e.is_session_expired() => {
                warn!(error = %e, "Stored session is no longer valid");
                None
            }
            Err(e) => {
                warn!(error = %e, "Auth check failed, attempting refresh");
                self.recover().await
            }
        };

        match user {
            Some(user) => {
                info!("Session restored");
                self.publish(AuthState::Authenticated(user));
            }
            None => {
                self.session.logout();
                self.publish(AuthState::Anonymous);
            }
        }
        self.state()
    }

    async fn recover(&self) -> Option<User> {
        if let Err(e) = self.session.refresh().await {
            warn!(error = %e, "Token refresh failed");
            return None;
        }
        match self.session.me().await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Auth check failed after refresh");
                None
            }
        }
    }

    /// Log in and load the profile. On failure the published state is unchanged.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        self.session.login(email, password).await?;
        let user = self.session.me().await?;
        self.publish(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Register and load the profile. On failure the published state is unchanged.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, ApiError> {
        self.session.register(email, password).await?;
        let user = self.session.me().await?;
        self.publish(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Finish an OAuth sign-in with the access token from the redirect.
    pub async fn complete_oauth(&self, token: &str) -> Result<User, ApiError> {
        self.session.adopt_credential(token)?;
        match self.session.me().await {
            Ok(user) => {
                info!("OAuth sign-in complete");
                self.publish(AuthState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "OAuth sign-in failed");
                self.session.logout();
                self.publish(AuthState::Anonymous);
                Err(e)
            }
        }
    }

    pub fn logout(&self) {
        self.session.logout();
        self.publish(AuthState::Anonymous);
    }

    /// Run a session operation; an expired session signs the user out.
    async fn guarded<T>(
        &self,
        operation: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        let result = operation.await;
        if let Err(ApiError::SessionExpired) = &result {
            warn!("Session expired, signing out");
            self.logout();
        }
        result
    }

    /// Generic authenticated request for data features.
    pub async fn request<T: DeserializeOwned>(&self, envelope: &RequestEnvelope) -> Result<T, ApiError> {
        self.guarded(self.session.authenticated_request(envelope)).await
    }

    pub async fn refresh_user(&self) -> Result<User, ApiError> {
        let user = self.guarded(self.session.me()).await?;
        self.publish(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        self.guarded(self.session.change_password(current_password, new_password)).await
    }

    pub async fn update_notification_preferences(
        &self,
        download_alerts: bool,
        expiry_reminders: bool,
    ) -> Result<User, ApiError> {
        let user = self
            .guarded(
                self.session
                    .update_notification_preferences(download_alerts, expiry_reminders),
            )
            .await?;
        self.publish(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.guarded(self.session.delete_account()).await?;
        self.publish(AuthState::Anonymous);
        Ok(())
    }

    pub async fn user_stats(&self) -> Result<UserStats, ApiError> {
        self.guarded(self.session.user_stats()).await
    }

    pub async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        self.guarded(self.session.list_files()).await
    }

    pub async fn rename_file(&self, id: &str, new_name: &str) -> Result<(), ApiError> {
        self.guarded(self.session.rename_file(id, new_name)).await
    }

    pub async fn delete_file(&self, id: &str) -> Result<(), ApiError> {
        self.guarded(self.session.delete_file(id)).await
    }
}
