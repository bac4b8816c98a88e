//! Single-flight refresh of the access credential.
//!
//! At most one `refreshToken` call is outstanding at any time. Callers that
//! arrive while it runs share its future and observe the same credential or
//! the same failure. The refresh is the only place a new access credential
//! is minted outside of login/register.
//!
//! Sessions are numbered. Login, logout and credential adoption start a new
//! session, and a refresh that settles after its session ended never writes
//! to the store.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{Credential, CredentialStore};
use crate::api::{operations, ApiError, Transport};
use crate::models::AuthPayload;

#[derive(Debug, Clone)]
enum RefreshFailure {
    /// The server refused the refresh.
    Rejected(String),
    /// The session ended while the call was running.
    Superseded,
}

type RefreshOutcome = Result<Credential, RefreshFailure>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    refresh_token: AuthPayload,
}

/// Outcome of the last refresh, keyed by the credential it replaced.
struct Settled {
    replaced: Credential,
    succeeded: bool,
}

#[derive(Default)]
struct RefreshState {
    in_flight: Option<InFlight>,
    last: Option<Settled>,
    epoch: u64,
    signed_out: bool,
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    state: Arc<Mutex<RefreshState>>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<CredentialStore>) -> Self {
        Self {
            transport,
            store,
            state: Arc::new(Mutex::new(RefreshState::default())),
        }
    }

    /// Start a new session holding `credential`.
    pub fn begin_session(&self, credential: Credential) {
        let mut state = self.state.lock();
        Self::next_epoch(&mut state);
        state.signed_out = false;
        self.store.set(credential);
    }

    /// End the current session and clear the store. No refresh started
    /// before this call can repopulate it, and none is started until the
    /// next `begin_session`.
    pub fn end_session(&self) {
        let mut state = self.state.lock();
        Self::next_epoch(&mut state);
        state.signed_out = true;
        self.store.clear();
    }

    fn next_epoch(state: &mut RefreshState) {
        state.epoch += 1;
        state.in_flight = None;
        state.last = None;
    }

    /// Obtain a credential to replace `rejected`, the one the server refused.
    ///
    /// Joins the in-flight refresh if there is one. A caller whose rejected
    /// credential was already replaced gets the current one without a call,
    /// and a caller whose credential already failed to refresh gets
    /// `SessionExpired` without a call. After a logout every caller gets
    /// `SessionExpired` without a call.
    pub async fn refresh(&self, rejected: Option<&Credential>) -> Result<Credential, ApiError> {
        let flight = {
            let mut state = self.state.lock();
            match &state.in_flight {
                Some(flight) => {
                    debug!("Joining in-flight credential refresh");
                    flight.clone()
                }
                None => {
                    let current = self.store.get();
                    if let Some(current) = current.as_ref() {
                        if Some(current) != rejected {
                            debug!("Credential already replaced, skipping refresh");
                            return Ok(current.clone());
                        }
                    } else if state.signed_out {
                        debug!("Signed out, not refreshing");
                        return Err(ApiError::SessionExpired);
                    }

                    if let (Some(rejected), Some(last)) = (rejected, state.last.as_ref()) {
                        if &last.replaced == rejected && (!last.succeeded || current.is_none()) {
                            debug!("Credential already failed to refresh");
                            return Err(ApiError::SessionExpired);
                        }
                    }

                    let flight = Self::run(
                        Arc::clone(&self.transport),
                        Arc::clone(&self.store),
                        Arc::clone(&self.state),
                        state.epoch,
                        rejected.cloned(),
                    )
                    .boxed()
                    .shared();
                    state.in_flight = Some(flight.clone());
                    flight
                }
            }
        };

        match flight.await {
            Ok(credential) => Ok(credential),
            Err(RefreshFailure::Rejected(reason)) => {
                debug!(%reason, "Waiter observed failed refresh");
                Err(ApiError::SessionExpired)
            }
            // A newer session owns the store now; its credential belongs to
            // whoever signed in, not to this caller.
            Err(RefreshFailure::Superseded) if self.store.has_credential() => Err(
                ApiError::AuthExpired("Session changed during refresh".to_string()),
            ),
            Err(RefreshFailure::Superseded) => Err(ApiError::SessionExpired),
        }
    }

    async fn run(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        state: Arc<Mutex<RefreshState>>,
        epoch: u64,
        rejected: Option<Credential>,
    ) -> RefreshOutcome {
        debug!("Refreshing access credential");
        let outcome = Self::exchange(transport.as_ref()).await;

        // Store writes happen under the state lock so a concurrent
        // begin/end_session is ordered strictly before or after them.
        let mut guard = state.lock();
        if guard.epoch != epoch {
            debug!("Session ended during refresh, discarding result");
            return Err(RefreshFailure::Superseded);
        }

        match &outcome {
            Ok(credential) => {
                store.set(credential.clone());
                info!("Access credential refreshed");
            }
            Err(e) => {
                warn!(error = %e, "Credential refresh failed, clearing session");
                store.clear();
            }
        }

        guard.in_flight = None;
        if let Some(replaced) = rejected {
            guard.last = Some(Settled {
                replaced,
                succeeded: outcome.is_ok(),
            });
        }

        outcome.map_err(|e| RefreshFailure::Rejected(e.to_string()))
    }

    /// The physical refresh call. Goes straight to the transport, so an
    /// auth-looking rejection here can never trigger another refresh.
    async fn exchange(transport: &dyn Transport) -> Result<Credential, ApiError> {
        let data = transport
            .execute(&operations::refresh_token(), None)
            .await?
            .into_data()?;
        let response: RefreshResponse =
            serde_json::from_value(data).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(Credential::new(response.refresh_token.access_token))
    }
}
