use crate::error::{ConfigError, TrialError};
use serde::{Deserialize, Serialize};
use sheen_core::{Choices, Stimulus};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Parameters of one trial, shared by both trial kinds.
///
/// Durations are milliseconds from trial start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub stimulus: Stimulus,
    pub stimulus_name: String,
    #[serde(default)]
    pub choices: Choices,
    #[serde(default)]
    pub stimulus_duration: Option<u64>,
    #[serde(default)]
    pub trial_duration: Option<u64>,
    /// Only used by two-phase trials.
    #[serde(default)]
    pub pretrial_duration: Option<u64>,
    #[serde(default = "default_true")]
    pub response_ends_trial: bool,
}

fn default_true() -> bool {
    true
}

impl TrialConfig {
    pub fn new(stimulus_name: impl Into<String>, stimulus: Stimulus) -> Self {
        Self {
            stimulus,
            stimulus_name: stimulus_name.into(),
            choices: Choices::default(),
            stimulus_duration: None,
            trial_duration: None,
            pretrial_duration: None,
            response_ends_trial: true,
        }
    }

    pub fn with_choices(mut self, choices: Choices) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_stimulus_duration(mut self, ms: u64) -> Self {
        self.stimulus_duration = Some(ms);
        self
    }

    pub fn with_trial_duration(mut self, ms: u64) -> Self {
        self.trial_duration = Some(ms);
        self
    }

    pub fn with_pretrial_duration(mut self, ms: u64) -> Self {
        self.pretrial_duration = Some(ms);
        self
    }

    pub fn with_response_ends_trial(mut self, ends: bool) -> Self {
        self.response_ends_trial = ends;
        self
    }

    pub fn hide_after(&self) -> Option<Duration> {
        self.stimulus_duration.map(Duration::from_millis)
    }

    pub fn end_after(&self) -> Option<Duration> {
        self.trial_duration.map(Duration::from_millis)
    }

    pub fn pretrial(&self) -> Duration {
        Duration::from_millis(self.pretrial_duration.unwrap_or(0))
    }

    /// Checks everything a trial needs before any timer starts.
    pub fn validate(&self) -> Result<(), TrialError> {
        let bad = |msg: String| Err(TrialError::Configuration(msg));

        if self.stimulus_name.trim().is_empty() {
            return bad("stimulus_name is empty".into());
        }

        let surface = &self.stimulus.surface_data;
        if surface.vertices.is_empty() || surface.vertices.len() % 3 != 0 {
            return bad(format!(
                "surfaceData.vertices has {} values, expected a positive multiple of 3",
                surface.vertices.len()
            ));
        }
        if surface.vertices.iter().any(|v| !v.is_finite()) {
            return bad("surfaceData.vertices contains a non-finite value".into());
        }
        if surface.extremum().is_none() {
            return bad(format!(
                "extremaIndex {} does not address a vertex",
                surface.extrema_index
            ));
        }
        match &surface.indices {
            Some(indices) => {
                if indices.is_empty() || indices.len() % 3 != 0 {
                    return bad(format!(
                        "surfaceData.indices has {} entries, expected a positive multiple of 3",
                        indices.len()
                    ));
                }
                let count = surface.vertex_count();
                if let Some(i) = indices.iter().find(|&&i| i as usize >= count) {
                    return bad(format!("index {i} out of range for {count} vertices"));
                }
            }
            None if surface.grid_side().is_none() => {
                return bad(format!(
                    "{} vertices without indices do not form a square grid",
                    surface.vertex_count()
                ));
            }
            None => {}
        }

        let gamma = self.stimulus.gamma;
        for (name, g) in ["gammaRed", "gammaGreen", "gammaBlue"]
            .into_iter()
            .zip(gamma.channels())
        {
            if !g.is_finite() || g <= 0.0 {
                return bad(format!("{name} must be a positive number, got {g}"));
            }
        }
        if !self.stimulus.surface_slant.is_finite() || !self.stimulus.light_slant.is_finite() {
            return bad("slants must be finite".into());
        }

        if self.choices.is_no_keys() && self.trial_duration.is_none() {
            warn!(
                stimulus = %self.stimulus_name,
                "NO_KEYS without trial_duration: the trial can never end"
            );
        } else if !self.response_ends_trial && self.trial_duration.is_none() {
            warn!(
                stimulus = %self.stimulus_name,
                "response_ends_trial is false without trial_duration: the trial can never end"
            );
        }
        Ok(())
    }
}

/// One entry of a session's trial list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TrialSpec {
    /// A single static frame.
    CanvasKeyboardResponse(TrialConfig),
    /// Disk frame during the pretrial period, then the worker's pip frame.
    TrialKeyboardResponse(TrialConfig),
}

impl TrialSpec {
    pub fn config(&self) -> &TrialConfig {
        match self {
            TrialSpec::CanvasKeyboardResponse(c) | TrialSpec::TrialKeyboardResponse(c) => c,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TrialSpec::CanvasKeyboardResponse(_) => "canvas-keyboard-response",
            TrialSpec::TrialKeyboardResponse(_) => "trial-keyboard-response",
        }
    }

    pub fn is_two_phase(&self) -> bool {
        matches!(self, TrialSpec::TrialKeyboardResponse(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub canvas: CanvasSize,
    #[serde(default)]
    pub inter_trial_interval_ms: u64,
    /// How long a two-phase trial waits for the worker past its pretrial period.
    #[serde(default = "default_worker_grace_ms")]
    pub worker_grace_ms: u64,
    #[serde(default)]
    pub randomize_order: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    pub trials: Vec<TrialSpec>,
}

fn default_worker_grace_ms() -> u64 {
    250
}

impl SessionConfig {
    pub fn new(trials: Vec<TrialSpec>) -> Self {
        Self {
            canvas: CanvasSize::default(),
            inter_trial_interval_ms: 0,
            worker_grace_ms: default_worker_grace_ms(),
            randomize_order: false,
            seed: None,
            trials,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SessionConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials.is_empty() {
            return Err(ConfigError::EmptySession);
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Canvas {
                width: self.canvas.width,
                height: self.canvas.height,
            });
        }
        for (index, trial) in self.trials.iter().enumerate() {
            trial
                .config()
                .validate()
                .map_err(|source| ConfigError::Trial { index, source })?;
        }
        Ok(())
    }

    pub fn worker_grace(&self) -> Duration {
        Duration::from_millis(self.worker_grace_ms)
    }

    pub fn inter_trial_interval(&self) -> Duration {
        Duration::from_millis(self.inter_trial_interval_ms)
    }
}
