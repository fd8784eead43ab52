pub mod config;
mod controller;
pub mod error;
pub mod host;
pub mod response;
pub mod session;
pub mod static_trial;
pub mod two_phase;

pub use config::{CanvasSize, SessionConfig, TrialConfig, TrialSpec};
pub use error::{ConfigError, TrialError};
pub use host::Host;
pub use response::ResponseSlot;
pub use session::{Session, SessionOutcome, SessionRecord, SessionReport, write_results};
pub use static_trial::StaticTrial;
pub use two_phase::TwoPhaseTrial;
