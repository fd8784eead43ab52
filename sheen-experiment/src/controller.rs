//! Bookkeeping shared by both trial kinds: state transitions, the response
//! slot, duration timers, the keyboard listener and teardown.

use crate::config::TrialConfig;
use crate::error::TrialError;
use crate::host::Host;
use crate::response::ResponseSlot;
use sheen_core::{KeyResponse, TrialResult, TrialState, TrialTimer};
use sheen_render::{DisplaySurface, RESPONDED_CLASS, STIMULUS_ELEMENT_ID};
use sheen_timing::ListenerHandle;
use tracing::{debug, trace};

/// What woke a trial's event loop.
#[derive(Debug)]
pub(crate) enum Wake<R> {
    Cancelled,
    Timer(TrialTimer),
    Reply(R),
    Key(Option<KeyResponse>),
}

pub(crate) struct TrialRun<'a> {
    config: &'a TrialConfig,
    state: TrialState,
    response: ResponseSlot,
    listener: Option<ListenerHandle>,
}

impl<'a> TrialRun<'a> {
    pub(crate) fn new(config: &'a TrialConfig) -> Self {
        Self {
            config,
            state: TrialState::Idle,
            response: ResponseSlot::new(),
            listener: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> TrialState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: TrialState) -> Result<(), TrialError> {
        if !self.state.can_advance_to(next) {
            return Err(TrialError::PhaseOrder {
                from: self.state,
                to: next,
            });
        }
        trace!(from = ?self.state, to = ?next, "trial state");
        self.state = next;
        Ok(())
    }

    /// Schedules the hide and end timers, both relative to now.
    pub(crate) fn schedule_durations(&self, host: &mut Host) {
        if let Some(delay) = self.config.hide_after() {
            host.timers.schedule_once(delay, TrialTimer::HideStimulus);
        }
        if let Some(delay) = self.config.end_after() {
            host.timers.schedule_once(delay, TrialTimer::EndTrial);
        }
    }

    /// Arms the keyboard over the trial's choices unless they are `NO_KEYS`.
    pub(crate) fn arm(&mut self, host: &mut Host) -> Result<(), TrialError> {
        if self.config.choices.is_no_keys() {
            debug!("no keys allowed, listener not armed");
            return Ok(());
        }
        self.advance(TrialState::Armed)?;
        self.listener = Some(host.keyboard.arm(&self.config.choices));
        Ok(())
    }

    pub(crate) fn hide(&self, surface: &mut DisplaySurface) -> Result<(), TrialError> {
        surface.set_visible(STIMULUS_ELEMENT_ID, false)?;
        debug!("stimulus hidden");
        Ok(())
    }

    /// Records a key and marks the frame. Returns whether the trial should end.
    pub(crate) fn on_key(
        &mut self,
        key: Option<KeyResponse>,
        host: &mut Host,
        surface: &mut DisplaySurface,
    ) -> Result<bool, TrialError> {
        let Some(response) = key else {
            // Every sender is gone; stop polling a closed channel.
            if let Some(listener) = self.listener.take() {
                host.keyboard.cancel(listener);
            }
            debug!("keyboard closed, waiting on timers only");
            return Ok(false);
        };

        // The listener is one-shot and already disarmed itself.
        self.listener = None;
        surface.add_class(STIMULUS_ELEMENT_ID, RESPONDED_CLASS)?;
        self.response.record(response);
        Ok(self.config.response_ends_trial)
    }

    /// Cancels every timer and the listener and clears the display.
    ///
    /// Does nothing once the trial has ended.
    pub(crate) fn teardown(&mut self, host: &mut Host, surface: Option<&mut DisplaySurface>) {
        if self.state.is_ended() {
            return;
        }
        let cancelled = host.timers.cancel_all();
        if let Some(listener) = self.listener.take() {
            host.keyboard.cancel(listener);
        }
        if let Some(surface) = surface {
            surface.remove(STIMULUS_ELEMENT_ID);
            surface.clear();
        }
        self.state = TrialState::Ended;
        debug!(cancelled_timers = cancelled, "trial torn down");
    }

    pub(crate) fn finish(self) -> TrialResult {
        TrialResult::new(self.config.stimulus_name.clone(), self.response.get())
    }
}
