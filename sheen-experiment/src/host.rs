use sheen_core::TrialTimer;
use sheen_timing::{KeySender, KeyboardService, TimerService};
use tokio_util::sync::CancellationToken;

/// Timer and keyboard services a trial runs against.
///
/// Trials leave the host idle when they return: no pending timers and no
/// armed listener.
#[derive(Debug)]
pub struct Host {
    pub keyboard: KeyboardService,
    pub timers: TimerService<TrialTimer>,
    pub cancel: CancellationToken,
}

impl Host {
    pub fn new(keyboard: KeyboardService) -> Self {
        Self::with_cancellation(keyboard, CancellationToken::new())
    }

    pub fn with_cancellation(keyboard: KeyboardService, cancel: CancellationToken) -> Self {
        Self {
            keyboard,
            timers: TimerService::new(),
            cancel,
        }
    }

    /// A host plus the sender that feeds its keyboard.
    pub fn channel() -> (KeySender, Self) {
        let (keys, keyboard) = sheen_timing::channel();
        (keys, Self::new(keyboard))
    }

    pub fn is_idle(&self) -> bool {
        self.timers.pending() == 0 && !self.keyboard.is_armed()
    }
}
