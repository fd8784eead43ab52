use sheen_core::TrialState;
use sheen_render::RenderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("invalid trial configuration: {0}")]
    Configuration(String),

    #[error("render target unavailable: {0}")]
    RenderTargetUnavailable(#[source] RenderError),

    #[error("phase-two frame still missing {grace_ms} ms after the pretrial period")]
    WorkerTimeout { grace_ms: u64 },

    #[error("rendering failed: {0}")]
    Render(#[source] RenderError),

    #[error("illegal trial state transition {from:?} -> {to:?}")]
    PhaseOrder { from: TrialState, to: TrialState },

    #[error("trial cancelled")]
    Cancelled,
}

impl From<RenderError> for TrialError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::SurfaceMissing | RenderError::ElementNotFound(_) => {
                TrialError::RenderTargetUnavailable(err)
            }
            other => TrialError::Render(other),
        }
    }
}

/// Failures loading a session file or writing its results.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed session file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode results for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("session has no trials")]
    EmptySession,

    #[error("canvas size {width}x{height} is not drawable")]
    Canvas { width: u32, height: u32 },

    #[error("trial {index}: {source}")]
    Trial {
        index: usize,
        #[source]
        source: TrialError,
    },
}
