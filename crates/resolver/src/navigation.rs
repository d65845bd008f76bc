//! Deferred, cancellable navigation.
//!
//! The timer task and the handle share one atomic state. Whichever side
//! moves it out of `PENDING` first wins: either the timer navigates, or a
//! cancel/abort prevents it. Never both.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use evoapp_protocol::constants::ABORT_BASE;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ports::Navigator;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Observable state of a scheduled navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Pending,
    Fired,
    Cancelled,
}

/// Handle to a navigation that fires after a delay unless cancelled first.
pub struct DeferredNavigation {
    state: Arc<AtomicU8>,
    navigator: Arc<dyn Navigator>,
    timer: JoinHandle<()>,
}

impl DeferredNavigation {
    /// Schedules navigation to `url` after `delay`. Must be called inside a
    /// Tokio runtime.
    pub fn schedule(navigator: Arc<dyn Navigator>, url: String, delay: Duration) -> Self {
        let state = Arc::new(AtomicU8::new(PENDING));

        let timer = {
            let state = Arc::clone(&state);
            let navigator = Arc::clone(&navigator);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if state
                    .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    debug!(url = %url, "navigating");
                    navigator.navigate(&url);
                }
            })
        };

        Self {
            state,
            navigator,
            timer,
        }
    }

    pub fn state(&self) -> NavigationState {
        match self.state.load(Ordering::Acquire) {
            PENDING => NavigationState::Pending,
            FIRED => NavigationState::Fired,
            _ => NavigationState::Cancelled,
        }
    }

    /// Prevents the navigation. Returns `true` only for the call that
    /// actually stopped it; later calls and calls after the timer fired
    /// return `false`.
    pub fn cancel(&self) -> bool {
        let won = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.timer.abort();
            debug!("navigation cancelled");
        }
        won
    }

    /// Cancels and navigates to `url` instead, if the cancel won the race.
    /// After the timer fired this is a no-op.
    pub fn abort(&self, url: &str) -> bool {
        if self.cancel() {
            self.navigator.navigate(url);
            true
        } else {
            false
        }
    }
}

/// Escape destination: the app page for this wrapper when known, else the
/// site root.
pub fn abort_url(wrapper_id: Option<&str>, base_id: &str) -> String {
    match wrapper_id {
        Some(wrapper) => format!("{ABORT_BASE}#/app?tx={wrapper}&baseId={base_id}"),
        None => ABORT_BASE.to_string(),
    }
}
