//! In-memory stand-in for the fileshare API.
//!
//! Accepts exactly one access token at a time, rotates it on refresh, and
//! records every request so tests can check which credential was sent.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fileshare_core::api::{Operation, RestMethod};
use fileshare_core::{
    ApiError, Credential, CredentialStore, RequestEnvelope, ResponseEnvelope, SessionClient,
    Transport,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const CREATED_AT: &str = "2024-12-18T10:00:00Z";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub operation: String,
    pub credential: Option<String>,
}

struct Account {
    id: String,
    password: String,
    download_alerts: bool,
    expiry_reminders: bool,
}

#[derive(Default)]
struct ServerState {
    accounts: HashMap<String, Account>,
    /// The access token the server currently accepts.
    valid_token: Option<String>,
    /// Whose refresh cookie the client holds.
    cookie_email: Option<String>,
    issued: usize,
    refresh_ok: bool,
    always_expired: bool,
    /// Reject GraphQL calls with HTTP 401 instead of an error message.
    graphql_401: bool,
    network_failures: usize,
    files: Vec<Value>,
    sent: Vec<Sent>,
}

pub struct FakeApi {
    state: Mutex<ServerState>,
    refresh_calls: AtomicUsize,
    refresh_delay: Duration,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState {
                refresh_ok: true,
                ..ServerState::default()
            }),
            refresh_calls: AtomicUsize::new(0),
            refresh_delay: Duration::from_millis(25),
        }
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        {
            let mut state = self.state.lock();
            let id = format!("u{}", state.accounts.len() + 1);
            state.accounts.insert(
                email.to_string(),
                Account {
                    id,
                    password: password.to_string(),
                    download_alerts: true,
                    expiry_reminders: true,
                },
            );
        }
        self
    }

    /// The client holds `email`'s refresh cookie; `token` is the accepted
    /// access token, or `None` when every access token has expired.
    pub fn with_session(self, email: &str, token: Option<&str>) -> Self {
        {
            let mut state = self.state.lock();
            state.cookie_email = Some(email.to_string());
            state.valid_token = token.map(str::to_string);
        }
        self
    }

    pub fn with_refresh_failing(self) -> Self {
        self.state.lock().refresh_ok = false;
        self
    }

    pub fn with_always_expired(self) -> Self {
        self.state.lock().always_expired = true;
        self
    }

    pub fn with_graphql_401(self) -> Self {
        self.state.lock().graphql_401 = true;
        self
    }

    pub fn with_network_failures(self, count: usize) -> Self {
        self.state.lock().network_failures = count;
        self
    }

    pub fn with_file(self, id: &str, name: &str) -> Self {
        self.state.lock().files.push(json!({
            "id": id,
            "originalName": name,
            "fileSize": 1024,
            "contentType": "application/pdf",
            "createdAt": CREATED_AT,
            "expiresAt": "2099-01-01T00:00:00Z",
            "downloadCount": 3,
            "shareableURL": format!("https://fileshare.co/{}", id),
        }));
        self
    }

    /// Server-side expiry of the current access token.
    pub fn expire_access_token(&self) {
        self.state.lock().valid_token = None;
    }

    /// Server-side revocation of the refresh cookie.
    pub fn revoke_refresh(&self) {
        self.state.lock().refresh_ok = false;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().sent.clone()
    }

    pub fn sent_for(&self, operation: &str) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.operation == operation)
            .collect()
    }

    pub fn valid_token(&self) -> Option<String> {
        self.state.lock().valid_token.clone()
    }

    fn issue(state: &mut ServerState, email: &str) -> Value {
        state.issued += 1;
        let token = format!("token-{}", state.issued);
        state.valid_token = Some(token.clone());
        state.cookie_email = Some(email.to_string());
        let id = state.accounts.get(email).map(|a| a.id.clone()).unwrap_or_default();
        json!({ "accessToken": token, "user": { "id": id, "email": email } })
    }

    fn user_json(state: &ServerState, email: &str) -> Value {
        let account = &state.accounts[email];
        json!({
            "id": account.id,
            "email": email,
            "createdAt": CREATED_AT,
            "downloadAlerts": account.download_alerts,
            "expiryReminders": account.expiry_reminders,
        })
    }

    async fn refresh(&self) -> ResponseEnvelope {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.refresh_delay).await;

        let mut state = self.state.lock();
        match state.cookie_email.clone() {
            Some(email) if state.refresh_ok => {
                let payload = Self::issue(&mut state, &email);
                ResponseEnvelope::success(json!({ "refreshToken": payload }))
            }
            _ => ResponseEnvelope::failure("Unauthorized: invalid refresh token"),
        }
    }

    fn authenticated(
        state: &mut ServerState,
        envelope: &RequestEnvelope,
        credential: Option<&Credential>,
    ) -> Result<ResponseEnvelope, ApiError> {
        let accepted = !state.always_expired
            && credential.is_some()
            && credential.map(|c| c.expose().to_string()) == state.valid_token;

        if !accepted {
            return match envelope.operation {
                Operation::GraphQl { .. } if !state.graphql_401 => {
                    Ok(ResponseEnvelope::failure("Token expired"))
                }
                _ => Err(ApiError::Http {
                    status: 401,
                    body: "unauthorized".to_string(),
                }),
            };
        }

        let email = state.cookie_email.clone().unwrap_or_default();
        let vars = &envelope.variables;

        let data = match &envelope.operation {
            Operation::GraphQl { name, .. } => match *name {
                "me" => json!({ "me": Self::user_json(state, &email) }),
                "userStats" => json!({
                    "userStats": { "totalFiles": state.files.len(), "totalDownloads": 3 * state.files.len(), "storageUsed": "1 KB" }
                }),
                "changePassword" => {
                    let account = state.accounts.get_mut(&email).expect("account");
                    if vars["currentPassword"] != account.password.as_str() {
                        return Ok(ResponseEnvelope::failure("Current password is incorrect"));
                    }
                    account.password = vars["newPassword"].as_str().unwrap_or_default().to_string();
                    json!({ "changePassword": true })
                }
                "updateNotificationPreferences" => {
                    let account = state.accounts.get_mut(&email).expect("account");
                    account.download_alerts = vars["downloadAlerts"].as_bool().unwrap_or(false);
                    account.expiry_reminders = vars["expiryReminders"].as_bool().unwrap_or(false);
                    json!({ "updateNotificationPreferences": Self::user_json(state, &email) })
                }
                "deleteAccount" => {
                    state.accounts.remove(&email);
                    state.valid_token = None;
                    state.cookie_email = None;
                    json!({ "deleteAccount": true })
                }
                other => return Ok(ResponseEnvelope::failure(format!("Unknown operation {}", other))),
            },
            Operation::Rest { method, path } => {
                let id = path
                    .trim_start_matches("/api/files/")
                    .trim_end_matches("/rename")
                    .to_string();
                match method {
                    RestMethod::Get => Value::Array(state.files.clone()),
                    RestMethod::Put => {
                        let file = state.files.iter_mut().find(|f| f["id"] == id.as_str());
                        match file {
                            Some(file) => {
                                file["originalName"] = vars["newName"].clone();
                                json!({ "ok": true })
                            }
                            None => return Err(ApiError::Http { status: 404, body: "not found".into() }),
                        }
                    }
                    RestMethod::Delete => {
                        let before = state.files.len();
                        state.files.retain(|f| f["id"] != id.as_str());
                        if state.files.len() == before {
                            return Err(ApiError::Http { status: 404, body: "not found".into() });
                        }
                        Value::Null
                    }
                }
            }
        };

        Ok(ResponseEnvelope::success(data))
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn execute(
        &self,
        envelope: &RequestEnvelope,
        credential: Option<&Credential>,
    ) -> Result<ResponseEnvelope, ApiError> {
        {
            let mut state = self.state.lock();
            state.sent.push(Sent {
                operation: envelope.operation.name().to_string(),
                credential: credential.map(|c| c.expose().to_string()),
            });
            if state.network_failures > 0 {
                state.network_failures -= 1;
                return Err(ApiError::Network("connection refused".to_string()));
            }
        }

        // Let concurrent callers interleave like real network calls would.
        tokio::task::yield_now().await;

        let name = envelope.operation.name().to_string();
        match name.as_str() {
            "refreshToken" => Ok(self.refresh().await),
            "login" | "register" => {
                let mut state = self.state.lock();
                let email = envelope.variables["email"].as_str().unwrap_or_default().to_string();
                let password = envelope.variables["password"].as_str().unwrap_or_default().to_string();
                if name == "register" {
                    if state.accounts.contains_key(&email) {
                        return Ok(ResponseEnvelope::failure("Email already registered"));
                    }
                    let id = format!("u{}", state.accounts.len() + 1);
                    state.accounts.insert(
                        email.clone(),
                        Account { id, password, download_alerts: true, expiry_reminders: true },
                    );
                } else if state.accounts.get(&email).map(|a| a.password != password).unwrap_or(true) {
                    return Ok(ResponseEnvelope::failure("Invalid email or password"));
                }
                let payload = Self::issue(&mut state, &email);
                let mut data = serde_json::Map::new();
                data.insert(name.clone(), payload);
                Ok(ResponseEnvelope::success(Value::Object(data)))
            }
            _ => {
                let mut state = self.state.lock();
                Self::authenticated(&mut state, envelope, credential)
            }
        }
    }
}

pub fn store_with(token: Option<&str>) -> Arc<CredentialStore> {
    let store = Arc::new(CredentialStore::in_memory());
    if let Some(token) = token {
        store.set(Credential::new(token));
    }
    store
}

pub fn session(api: &Arc<FakeApi>, token: Option<&str>) -> SessionClient {
    SessionClient::new(api.clone(), store_with(token))
}
