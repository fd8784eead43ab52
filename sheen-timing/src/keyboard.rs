use sheen_core::{Choices, Key, KeyResponse};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// A raw key press as delivered by the windowing layer.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: Key,
    pub at: Instant,
    /// Auto-repeat from a held key.
    pub repeat: bool,
}

impl KeyEvent {
    pub fn pressed(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            at: Instant::now(),
            repeat: false,
        }
    }
}

/// Producer side handed to whatever owns the physical keyboard.
#[derive(Debug, Clone)]
pub struct KeySender {
    tx: mpsc::UnboundedSender<KeyEvent>,
}

impl KeySender {
    /// Returns false once the keyboard service is gone.
    pub fn send(&self, event: KeyEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Sends a press of `key` stamped with the current time.
    pub fn press(&self, key: impl Into<Key>) -> bool {
        self.send(KeyEvent::pressed(key))
    }
}

/// Handle to the listener returned by [`KeyboardService::arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

#[derive(Debug)]
struct Listener {
    id: u64,
    choices: Choices,
    armed_at: Instant,
}

/// Keyboard capture with at most one one-shot listener.
///
/// Presses that arrive while nothing is armed, that were made before the
/// listener was armed, that are auto-repeats, or that are not in the
/// listener's choices are discarded. The first accepted key disarms the
/// listener.
#[derive(Debug)]
pub struct KeyboardService {
    rx: mpsc::UnboundedReceiver<KeyEvent>,
    listener: Option<Listener>,
    next_id: u64,
}

pub fn channel() -> (KeySender, KeyboardService) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        KeySender { tx },
        KeyboardService {
            rx,
            listener: None,
            next_id: 0,
        },
    )
}

impl KeyboardService {
    pub fn arm(&mut self, choices: &Choices) -> ListenerHandle {
        if let Some(previous) = self.listener.take() {
            warn!(listener = previous.id, "replacing a listener that was still armed");
        }
        let id = self.next_id;
        self.next_id += 1;
        self.listener = Some(Listener {
            id,
            choices: choices.clone(),
            armed_at: Instant::now(),
        });
        debug!(listener = id, ?choices, "keyboard listener armed");
        ListenerHandle(id)
    }

    /// Returns false if the listener already fired or was cancelled.
    pub fn cancel(&mut self, handle: ListenerHandle) -> bool {
        match &self.listener {
            Some(listener) if listener.id == handle.0 => {
                self.listener = None;
                debug!(listener = handle.0, "keyboard listener cancelled");
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.listener.is_some()
    }

    pub fn armed_at(&self) -> Option<Instant> {
        self.listener.as_ref().map(|l| l.armed_at)
    }

    /// Waits for the first key accepted by the armed listener.
    ///
    /// Pending forever while nothing is armed; `None` once every
    /// [`KeySender`] has been dropped.
    pub async fn next_response(&mut self) -> Option<KeyResponse> {
        let Some(listener) = self.listener.as_ref() else {
            return std::future::pending().await;
        };

        let response = loop {
            let event = self.rx.recv().await?;
            if event.repeat {
                trace!(key = %event.key, "ignoring held key");
                continue;
            }
            if event.at < listener.armed_at {
                trace!(key = %event.key, "ignoring key pressed before the listener was armed");
                continue;
            }
            if !listener.choices.accepts(&event.key) {
                trace!(key = %event.key, "ignoring key outside the allowed choices");
                continue;
            }
            break KeyResponse {
                rt: event.at.saturating_duration_since(listener.armed_at),
                key: event.key,
            };
        };

        self.listener = None;
        debug!(key = %response.key, rt_ms = response.rt.as_secs_f64() * 1e3, "key accepted");
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn measures_rt_from_arming() {
        let (keys, mut keyboard) = channel();
        keyboard.arm(&Choices::keys(["a"]));
        advance(Duration::from_millis(250)).await;
        keys.press("a");

        let response = keyboard.next_response().await.unwrap();
        assert_eq!(response.key, Key::new("a"));
        assert_eq!(response.rt, Duration::from_millis(250));
        assert!(!keyboard.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn skips_disallowed_repeated_and_stale_keys() {
        let (keys, mut keyboard) = channel();
        keys.press("j");
        advance(Duration::from_millis(10)).await;
        keyboard.arm(&Choices::keys(["j", "f"]));

        keys.press("x");
        keys.send(KeyEvent {
            key: Key::new("f"),
            at: Instant::now(),
            repeat: true,
        });
        advance(Duration::from_millis(5)).await;
        keys.press("F");

        let response = keyboard.next_response().await.unwrap();
        assert_eq!(response.key, Key::new("f"));
        assert_eq!(response.rt, Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn unarmed_service_does_not_consume_keys() {
        let (keys, mut keyboard) = channel();
        keys.press("a");
        let idle = timeout(Duration::from_millis(100), keyboard.next_response()).await;
        assert!(idle.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_only_matches_the_live_listener() {
        let (_keys, mut keyboard) = channel();
        let first = keyboard.arm(&Choices::AllKeys);
        assert!(keyboard.cancel(first));
        assert!(!keyboard.cancel(first));
        let second = keyboard.arm(&Choices::AllKeys);
        assert_ne!(first, second);
        assert!(keyboard.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_ends_listening() {
        let (keys, mut keyboard) = channel();
        keyboard.arm(&Choices::AllKeys);
        drop(keys);
        assert!(keyboard.next_response().await.is_none());
    }
}
