// Refresh coordination
// Single-flight token refresh shared by every in-flight request

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use super::store::CredentialStore;
use super::types::Credential;
use crate::error::{ApiError, NetworkErrorKind};
use crate::navigation::SessionNavigator;

/// Coordinator state. The waiter queue is non-empty only while
/// `Refreshing`; it is fully drained before the state returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Idle,
    Refreshing,
}

type Waiter = oneshot::Sender<Result<Credential, ApiError>>;

struct Inner {
    state: RefreshState,
    waiters: VecDeque<Waiter>,
}

/// Collapses concurrent refresh demands into at most one backend call.
///
/// The first caller to find the coordinator `Idle` becomes the leader:
/// it flips the state to `Refreshing` and runs the refresh operation.
/// Every caller arriving while a refresh is in flight enqueues a waiter
/// and shares the leader's outcome instead of issuing a second call.
/// Waiters are settled in enqueue order once the refresh terminates,
/// each exactly once, never before.
///
/// On success the new credential is written to the store before any
/// waiter observes it. On failure the store is cleared and the navigator
/// is redirected once; the session ends here, not in the callers.
///
/// State transitions happen in non-suspending critical sections (the
/// lock is never held across an await), so the single-flight invariant
/// holds under any task interleaving.
pub struct RefreshCoordinator {
    inner: Mutex<Inner>,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn SessionNavigator>,
}

impl RefreshCoordinator {
    /// Create a coordinator. One per client instance; no global state.
    pub fn new(store: Arc<dyn CredentialStore>, navigator: Arc<dyn SessionNavigator>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RefreshState::Idle,
                waiters: VecDeque::new(),
            }),
            store,
            navigator,
        }
    }

    /// Obtain a fresh credential, running `refresh_op` only if no refresh
    /// is already in flight. Followers' `refresh_op` futures are dropped
    /// unpolled; the leader's runs to completion regardless of how many
    /// callers queue behind it.
    pub async fn refresh<F>(&self, refresh_op: F) -> Result<Credential, ApiError>
    where
        F: Future<Output = Result<Credential, ApiError>>,
    {
        let waiter_rx = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                RefreshState::Refreshing => {
                    let (tx, rx) = oneshot::channel();
                    inner.waiters.push_back(tx);
                    Some(rx)
                }
                RefreshState::Idle => {
                    inner.state = RefreshState::Refreshing;
                    None
                }
            }
        };

        if let Some(rx) = waiter_rx {
            tracing::debug!("refresh already in flight; waiting for its outcome");
            return match rx.await {
                Ok(outcome) => outcome,
                // The leader can only vanish if its task was dropped
                // mid-refresh; surface that as a transport-level failure.
                Err(_) => Err(ApiError::Network {
                    kind: NetworkErrorKind::Other,
                    message: "Token refresh was interrupted".to_string(),
                }),
            };
        }

        tracing::info!("starting token refresh");
        let outcome = refresh_op.await;

        match &outcome {
            Ok(credential) => {
                self.store.set(credential.clone());
                tracing::info!("token refresh succeeded");
            }
            Err(err) => {
                tracing::error!(error = %err, "token refresh failed; ending session");
                self.store.clear();
                self.navigator.redirect_to_login();
            }
        }

        // Flip to Idle and take the queue in one critical section so a
        // caller arriving now either sees Idle (and leads the next
        // refresh) or was already queued and gets settled below.
        let waiters = {
            let mut inner = self.inner.lock().await;
            inner.state = RefreshState::Idle;
            std::mem::take(&mut inner.waiters)
        };

        for waiter in waiters {
            // A caller that dropped its pending future must not wedge the
            // drain; everyone else still gets settled in FIFO order.
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    #[cfg(test)]
    async fn waiter_count(&self) -> usize {
        self.inner.lock().await.waiters.len()
    }
}
