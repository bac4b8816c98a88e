//! Account models: the authenticated principal and its settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user, as returned by the `me` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub download_alerts: bool,
    #[serde(default)]
    pub expiry_reminders: bool,
}

impl User {
    pub fn preferences(&self) -> NotificationPreferences {
        NotificationPreferences {
            download_alerts: self.download_alerts,
            expiry_reminders: self.expiry_reminders,
        }
    }
}

/// Identity summary carried inside an `AuthPayload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Result of login, register and refresh.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub access_token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NotificationPreferences {
    pub download_alerts: bool,
    pub expiry_reminders: bool,
}

/// Dashboard totals for the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserStats {
    pub total_files: u64,
    pub total_downloads: u64,
    pub storage_used: String,
}
