use crate::domain_port::Navigator;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Navigator for non-interactive hosts: there is no page to move, so the
/// request to go to sign-in is logged.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, to: &str) {
        warn!(destination = to, "session ended, sign in again");
    }
}

/// Keeps every destination it was asked to visit.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, to: &str) {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(to.to_string());
    }
}
