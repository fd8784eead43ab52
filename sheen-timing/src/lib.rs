pub mod frame;
pub mod keyboard;
pub mod timer;

pub use frame::{FrameStats, FrameTimer};
pub use keyboard::{KeyEvent, KeySender, KeyboardService, ListenerHandle, channel};
pub use timer::{TimerHandle, TimerService};
