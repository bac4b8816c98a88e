//! Session client: the authenticated-request primitive and the named
//! account and file operations built on it.

use std::sync::Arc;

use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, info};

use super::envelope::RequestEnvelope;
use super::transport::{HttpTransport, Transport};
use super::{operations, ApiError};
use crate::auth::{Credential, CredentialStore, RefreshCoordinator};
use crate::config::Config;
use crate::models::{AuthPayload, FileRecord, User, UserStats};

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginResponse {
    login: AuthPayload,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    register: AuthPayload,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    me: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordResponse {
    change_password: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePreferencesResponse {
    update_notification_preferences: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAccountResponse {
    delete_account: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatsResponse {
    user_stats: UserStats,
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Composes the transport, credential store and refresh coordinator.
/// Clone is cheap - all parts are shared.
#[derive(Clone)]
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    refresher: RefreshCoordinator,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<CredentialStore>) -> Self {
        let refresher = RefreshCoordinator::new(Arc::clone(&transport), Arc::clone(&store));
        Self {
            transport,
            store,
            refresher,
        }
    }

    /// Build an HTTP-backed client with the credential store the config selects.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let store = CredentialStore::from_config(config)?;
        Ok(Self::new(transport, store))
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn has_credential(&self) -> bool {
        self.store.has_credential()
    }

    /// Execute an operation with the current credential, recovering once
    /// from credential expiry.
    ///
    /// On an auth-expired failure the refresh coordinator is asked for a new
    /// credential and the envelope is sent exactly one more time. Whatever
    /// the second attempt returns is final. A failed refresh surfaces as
    /// `SessionExpired`.
    pub async fn authenticated_request<T: DeserializeOwned>(
        &self,
        envelope: &RequestEnvelope,
    ) -> Result<T, ApiError> {
        let credential = self.store.get();

        let data = match self.attempt(envelope, credential.as_ref()).await {
            Err(e) if e.is_auth_expired() => {
                debug!(operation = envelope.operation.name(), error = %e, "Credential rejected, refreshing");
                let fresh = self.refresher.refresh(credential.as_ref()).await?;
                self.attempt(envelope, Some(&fresh)).await?
            }
            other => other?,
        };

        decode(data)
    }

    /// One transport round trip, with envelope errors lifted into `ApiError`.
    async fn attempt(
        &self,
        envelope: &RequestEnvelope,
        credential: Option<&Credential>,
    ) -> Result<Value, ApiError> {
        self.transport
            .execute(envelope, credential)
            .await?
            .into_data()
    }

    // ===== Account =====

    pub async fn register(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let data = self.attempt(&operations::register(email, password), None).await?;
        let payload = decode::<RegisterResponse>(data)?.register;
        self.refresher
            .begin_session(Credential::new(payload.access_token.clone()));
        info!("Registration successful");
        Ok(payload)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let data = self.attempt(&operations::login(email, password), None).await?;
        let payload = decode::<LoginResponse>(data)?.login;
        self.refresher
            .begin_session(Credential::new(payload.access_token.clone()));
        info!("Login successful");
        Ok(payload)
    }

    /// Store a credential obtained out of band (OAuth redirect).
    pub fn adopt_credential(&self, token: &str) -> Result<(), ApiError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::Operation("No token found".to_string()));
        }
        self.refresher.begin_session(Credential::new(token));
        Ok(())
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let response: MeResponse = self.authenticated_request(&operations::me()).await?;
        Ok(response.me)
    }

    /// Explicitly refresh the current credential.
    pub async fn refresh(&self) -> Result<Credential, ApiError> {
        let current = self.store.get();
        self.refresher.refresh(current.as_ref()).await
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let response: ChangePasswordResponse = self
            .authenticated_request(&operations::change_password(current_password, new_password))
            .await?;
        if response.change_password {
            Ok(())
        } else {
            Err(ApiError::Operation("Password change was rejected".to_string()))
        }
    }

    pub async fn update_notification_preferences(
        &self,
        download_alerts: bool,
        expiry_reminders: bool,
    ) -> Result<User, ApiError> {
        let response: UpdatePreferencesResponse = self
            .authenticated_request(&operations::update_notification_preferences(
                download_alerts,
                expiry_reminders,
            ))
            .await?;
        Ok(response.update_notification_preferences)
    }

    pub async fn delete_account(&self) -> Result<(), ApiError> {
        let response: DeleteAccountResponse = self
            .authenticated_request(&operations::delete_account())
            .await?;
        if !response.delete_account {
            return Err(ApiError::Operation("Account deletion was rejected".to_string()));
        }
        self.refresher.end_session();
        info!("Account deleted");
        Ok(())
    }

    /// Clear the credential. A refresh still running cannot bring it back.
    pub fn logout(&self) {
        self.refresher.end_session();
        info!("Logged out");
    }

    // ===== Files =====

    pub async fn user_stats(&self) -> Result<UserStats, ApiError> {
        let response: UserStatsResponse = self
            .authenticated_request(&operations::user_stats())
            .await?;
        Ok(response.user_stats)
    }

    pub async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        self.authenticated_request(&operations::list_files()).await
    }

    pub async fn rename_file(&self, id: &str, new_name: &str) -> Result<(), ApiError> {
        let _: Value = self
            .authenticated_request(&operations::rename_file(id, new_name))
            .await?;
        Ok(())
    }

    pub async fn delete_file(&self, id: &str) -> Result<(), ApiError> {
        let _: Value = self
            .authenticated_request(&operations::delete_file(id))
            .await?;
        Ok(())
    }
}
