pub mod keys;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use keys::{Choices, Key};
pub use phase::TrialState;
pub use stimulus::{Gamma, LightConfig, LightKind, Marker, MaterialKind, Stimulus, SurfaceData};
pub use trial::{KeyResponse, TrialResult, TrialTimer};
