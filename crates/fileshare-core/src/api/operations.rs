//! Operation catalogue: GraphQL documents and REST routes used by the client.

use serde_json::{json, Value};

use super::envelope::{RequestEnvelope, RestMethod};

pub const REGISTER: &str = r#"
mutation Register($email: String!, $password: String!) {
  register(email: $email, password: $password) {
    accessToken
    user { id email }
  }
}"#;

pub const LOGIN: &str = r#"
mutation Login($email: String!, $password: String!) {
  login(email: $email, password: $password) {
    accessToken
    user { id email }
  }
}"#;

pub const ME: &str = r#"
query Me {
  me { id email createdAt downloadAlerts expiryReminders }
}"#;

// The refresh credential travels in an HTTP-only cookie; the argument stays empty.
pub const REFRESH_TOKEN: &str = r#"
mutation RefreshToken($token: String!) {
  refreshToken(token: $token) {
    accessToken
    user { id email }
  }
}"#;

pub const CHANGE_PASSWORD: &str = r#"
mutation ChangePassword($currentPassword: String!, $newPassword: String!) {
  changePassword(currentPassword: $currentPassword, newPassword: $newPassword)
}"#;

pub const UPDATE_NOTIFICATION_PREFERENCES: &str = r#"
mutation UpdateNotificationPreferences($downloadAlerts: Boolean!, $expiryReminders: Boolean!) {
  updateNotificationPreferences(downloadAlerts: $downloadAlerts, expiryReminders: $expiryReminders) {
    id email createdAt downloadAlerts expiryReminders
  }
}"#;

pub const DELETE_ACCOUNT: &str = r#"
mutation DeleteAccount {
  deleteAccount
}"#;

pub const USER_STATS: &str = r#"
query UserStats {
  userStats { totalFiles totalDownloads storageUsed }
}"#;

const FILES_PATH: &str = "/api/files/";

pub fn register(email: &str, password: &str) -> RequestEnvelope {
    RequestEnvelope::graphql(
        "register",
        REGISTER,
        json!({ "email": email, "password": password }),
    )
}

pub fn login(email: &str, password: &str) -> RequestEnvelope {
    RequestEnvelope::graphql(
        "login",
        LOGIN,
        json!({ "email": email, "password": password }),
    )
}

pub fn me() -> RequestEnvelope {
    RequestEnvelope::graphql("me", ME, Value::Null)
}

pub fn refresh_token() -> RequestEnvelope {
    RequestEnvelope::graphql("refreshToken", REFRESH_TOKEN, json!({ "token": "" }))
}

pub fn change_password(current_password: &str, new_password: &str) -> RequestEnvelope {
    RequestEnvelope::graphql(
        "changePassword",
        CHANGE_PASSWORD,
        json!({ "currentPassword": current_password, "newPassword": new_password }),
    )
}

pub fn update_notification_preferences(
    download_alerts: bool,
    expiry_reminders: bool,
) -> RequestEnvelope {
    RequestEnvelope::graphql(
        "updateNotificationPreferences",
        UPDATE_NOTIFICATION_PREFERENCES,
        json!({ "downloadAlerts": download_alerts, "expiryReminders": expiry_reminders }),
    )
}

pub fn delete_account() -> RequestEnvelope {
    RequestEnvelope::graphql("deleteAccount", DELETE_ACCOUNT, Value::Null)
}

pub fn user_stats() -> RequestEnvelope {
    RequestEnvelope::graphql("userStats", USER_STATS, Value::Null)
}

pub fn list_files() -> RequestEnvelope {
    RequestEnvelope::rest(RestMethod::Get, FILES_PATH, Value::Null)
}

pub fn rename_file(id: &str, new_name: &str) -> RequestEnvelope {
    RequestEnvelope::rest(
        RestMethod::Put,
        format!("{}{}/rename", FILES_PATH, id),
        json!({ "newName": new_name }),
    )
}

pub fn delete_file(id: &str) -> RequestEnvelope {
    RequestEnvelope::rest(RestMethod::Delete, format!("{}{}", FILES_PATH, id), Value::Null)
}
