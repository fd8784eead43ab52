use sheen_core::KeyResponse;
use std::cell::OnceCell;
use tracing::debug;

/// Holds the first response of a trial. Later responses are dropped.
#[derive(Debug, Default)]
pub struct ResponseSlot {
    cell: OnceCell<KeyResponse>,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a response was already recorded.
    pub fn record(&self, response: KeyResponse) -> bool {
        match self.cell.set(response) {
            Ok(()) => true,
            Err(ignored) => {
                debug!(key = %ignored.key, "response already recorded");
                false
            }
        }
    }

    pub fn get(&self) -> Option<&KeyResponse> {
        self.cell.get()
    }

    pub fn is_recorded(&self) -> bool {
        self.cell.get().is_some()
    }
}
