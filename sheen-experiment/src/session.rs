use crate::config::{SessionConfig, TrialSpec};
use crate::error::{ConfigError, TrialError};
use crate::host::Host;
use crate::static_trial::StaticTrial;
use crate::two_phase::TwoPhaseTrial;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sheen_core::TrialResult;
use sheen_render::{ImageWorker, RendererContext, SceneRenderer};
use std::path::Path;
use tokio::time::{Instant, sleep};
use tracing::{Instrument, error, info, info_span, warn};

/// One row of the session's data output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Position in the order trials were run.
    pub trial_index: usize,
    pub trial_type: String,
    /// Milliseconds from session start to the end of this trial.
    pub time_elapsed_ms: f64,
    #[serde(flatten)]
    pub result: TrialResult,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
    Failed(TrialError),
}

#[derive(Debug)]
pub struct SessionReport {
    pub records: Vec<SessionRecord>,
    pub outcome: SessionOutcome,
}

impl SessionReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, SessionOutcome::Completed)
    }
}

/// Runs a session's trials one after another.
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Indices into the trial list in the order they will run.
    pub fn trial_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.config.trials.len()).collect();
        if self.config.randomize_order {
            let mut rng = match self.config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            order.shuffle(&mut rng);
        }
        order
    }

    /// Runs every trial until the list is done, the host is cancelled or a
    /// trial fails. Records of finished trials are kept in every case.
    pub async fn run<R: SceneRenderer, W: ImageWorker>(
        &self,
        ctx: &mut RendererContext<R, W>,
        host: &mut Host,
    ) -> SessionReport {
        let started = Instant::now();
        let order = self.trial_order();
        let iti = self.config.inter_trial_interval();
        let two_phase = TwoPhaseTrial::new(self.config.worker_grace());
        let mut records = Vec::with_capacity(order.len());

        info!(
            trials = order.len(),
            randomized = self.config.randomize_order,
            "session started"
        );

        for (position, &index) in order.iter().enumerate() {
            if position > 0 && !iti.is_zero() {
                tokio::select! {
                    biased;
                    _ = host.cancel.cancelled() => {}
                    _ = sleep(iti) => {}
                }
            }
            if host.cancel.is_cancelled() {
                return cancelled(records);
            }

            let spec = &self.config.trials[index];
            let config = spec.config();
            let span = info_span!(
                "trial",
                index = position,
                kind = spec.type_name(),
                stimulus = %config.stimulus_name
            );

            let outcome = match spec {
                TrialSpec::CanvasKeyboardResponse(config) => {
                    StaticTrial::run_trial(config, ctx, host)
                        .instrument(span)
                        .await
                }
                TrialSpec::TrialKeyboardResponse(config) => {
                    let outcome = two_phase.run_trial(config, ctx, host).instrument(span).await;
                    ctx.reset_scene(&config.stimulus);
                    outcome
                }
            };

            let result = match outcome {
                Ok(result) => result,
                Err(TrialError::Cancelled) => return cancelled(records),
                Err(err) => {
                    error!(trial = position, error = %err, "trial failed, stopping session");
                    return SessionReport {
                        records,
                        outcome: SessionOutcome::Failed(err),
                    };
                }
            };

            info!(
                trial = position,
                stimulus = %result.stimulus_name,
                rt = ?result.reaction_time_ms,
                key = ?result.key,
                "trial finished"
            );
            records.push(SessionRecord {
                trial_index: position,
                trial_type: spec.type_name().to_owned(),
                time_elapsed_ms: started.elapsed().as_secs_f64() * 1_000.0,
                result,
            });
        }

        info!(trials = records.len(), "session complete");
        SessionReport {
            records,
            outcome: SessionOutcome::Completed,
        }
    }
}

fn cancelled(records: Vec<SessionRecord>) -> SessionReport {
    warn!(finished = records.len(), "session cancelled");
    SessionReport {
        records,
        outcome: SessionOutcome::Cancelled,
    }
}

/// Writes `records` as a pretty-printed JSON array.
pub fn write_results(path: impl AsRef<Path>, records: &[SessionRecord]) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(records).map_err(|source| ConfigError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), records = records.len(), "results written");
    Ok(())
}
