use crate::application_port::{AuthError, SessionService};
use crate::domain_model::AccessToken;
use crate::domain_port::Navigator;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

type RefreshOutcome = Result<AccessToken, AuthError>;
type RefreshHandle = Shared<BoxFuture<'static, RefreshOutcome>>;

enum RefreshState {
    Idle,
    Refreshing {
        generation: u64,
        handle: RefreshHandle,
    },
}

struct Slot {
    state: RefreshState,
    next_generation: u64,
}

/// Collapses concurrent refresh requests into a single call to the session
/// service. Every caller that arrives while a refresh is running awaits the
/// same handle and receives the same outcome.
pub struct RefreshCoordinator {
    session: Arc<dyn SessionService>,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
    slot: Arc<Mutex<Slot>>,
}

impl RefreshCoordinator {
    pub fn new(
        session: Arc<dyn SessionService>,
        navigator: Arc<dyn Navigator>,
        sign_in_path: impl Into<String>,
    ) -> Self {
        Self {
            session,
            navigator,
            sign_in_path: sign_in_path.into(),
            slot: Arc::new(Mutex::new(Slot {
                state: RefreshState::Idle,
                next_generation: 0,
            })),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self.lock().state, RefreshState::Refreshing { .. })
    }

    /// Joins the running refresh, or starts one. On failure the session is
    /// logged out and the user sent to sign-in once, whatever the number of
    /// waiters.
    pub async fn refresh(&self) -> RefreshOutcome {
        let handle = {
            let mut slot = self.lock();
            let in_flight = match &slot.state {
                RefreshState::Refreshing { handle, .. } => Some(handle.clone()),
                RefreshState::Idle => None,
            };
            match in_flight {
                Some(handle) => {
                    debug!("joining refresh in flight");
                    handle
                }
                None => {
                    let generation = slot.next_generation;
                    slot.next_generation += 1;
                    let handle = self.start(generation);
                    slot.state = RefreshState::Refreshing {
                        generation,
                        handle: handle.clone(),
                    };
                    handle
                }
            }
        };

        handle.await
    }

    fn start(&self, generation: u64) -> RefreshHandle {
        let session = self.session.clone();
        let navigator = self.navigator.clone();
        let sign_in_path = self.sign_in_path.clone();
        let slot = self.slot.clone();

        async move {
            debug!(generation, "refresh started");
            let outcome = session.refresh_access_token().await;

            // Callers arriving during teardown join this outcome instead of
            // refreshing with the rejected token.
            if let Err(e) = &outcome {
                warn!("token refresh failed: {}", e);
                session.logout().await;
                navigator.navigate(&sign_in_path);
            }

            {
                let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
                let current = matches!(
                    slot.state,
                    RefreshState::Refreshing { generation: g, .. } if g == generation
                );
                if current {
                    slot.state = RefreshState::Idle;
                }
            }
            outcome
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
