use crate::keys::Key;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One-shot timers a trial can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialTimer {
    HideStimulus,
    PrePhaseEnd,
    WorkerDeadline,
    EndTrial,
}

/// A key accepted by an armed listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResponse {
    pub key: Key,
    /// Measured from the moment the listener was armed.
    pub rt: Duration,
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    #[serde(rename = "rt")]
    pub reaction_time_ms: Option<f64>,
    #[serde(rename = "filename")]
    pub stimulus_name: String,
    #[serde(rename = "key_press")]
    pub key: Option<Key>,
}

impl TrialResult {
    pub fn new(stimulus_name: impl Into<String>, response: Option<&KeyResponse>) -> Self {
        Self {
            reaction_time_ms: response.map(|r| r.rt.as_secs_f64() * 1_000.0),
            stimulus_name: stimulus_name.into(),
            key: response.map(|r| r.key.clone()),
        }
    }

    pub fn responded(&self) -> bool {
        self.key.is_some()
    }
}
