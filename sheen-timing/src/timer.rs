use std::fmt::Debug;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Handle returned by [`TimerService::schedule_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<E> {
    id: u64,
    due: Instant,
    event: E,
}

/// Cancellable one-shot timers.
///
/// Timers are polled through [`TimerService::fired`], which resolves with the
/// event of the earliest due timer. Timers due at the same instant fire in
/// scheduling order. Dropping the `fired` future before it resolves leaves
/// every timer pending, so it can sit in a `select!` loop.
#[derive(Debug)]
pub struct TimerService<E> {
    next_id: u64,
    pending: Vec<Pending<E>>,
}

impl<E: Copy + Debug> TimerService<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn schedule_once(&mut self, delay: Duration, event: E) -> TimerHandle {
        self.schedule_at(Instant::now() + delay, event)
    }

    pub fn schedule_at(&mut self, due: Instant, event: E) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        trace!(timer = id, ?event, "timer scheduled");
        self.pending.push(Pending { id, due, event });
        TimerHandle(id)
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != handle.0);
        before != self.pending.len()
    }

    /// Cancels every pending timer and returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.id == handle.0)
    }

    /// Waits for the earliest pending timer, removes it and yields its event.
    ///
    /// Never resolves while nothing is scheduled.
    pub async fn fired(&mut self) -> E {
        let Some((index, due)) = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| (p.due, p.id))
            .map(|(index, p)| (index, p.due))
        else {
            return std::future::pending().await;
        };

        // `self` stays borrowed across the sleep, so `index` is still valid.
        sleep_until(due).await;

        let fired = self.pending.remove(index);
        trace!(timer = fired.id, event = ?fired.event, "timer fired");
        fired.event
    }
}

impl<E: Copy + Debug> Default for TimerService<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Tick {
        Early,
        Late,
        Same,
    }

    #[tokio::test(start_paused = true)]
    async fn fires_in_due_order() {
        let start = Instant::now();
        let mut timers = TimerService::new();
        timers.schedule_once(Duration::from_millis(800), Tick::Late);
        timers.schedule_once(Duration::from_millis(200), Tick::Early);

        assert_eq!(timers.fired().await, Tick::Early);
        assert_eq!(start.elapsed(), Duration::from_millis(200));
        assert_eq!(timers.fired().await, Tick::Late);
        assert_eq!(start.elapsed(), Duration::from_millis(800));
        assert_eq!(timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn equal_deadlines_fire_in_scheduling_order() {
        let mut timers = TimerService::new();
        let due = Instant::now() + Duration::from_millis(50);
        timers.schedule_at(due, Tick::Same);
        timers.schedule_at(due, Tick::Early);
        assert_eq!(timers.fired().await, Tick::Same);
        assert_eq!(timers.fired().await, Tick::Early);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let mut timers = TimerService::new();
        let early = timers.schedule_once(Duration::from_millis(10), Tick::Early);
        timers.schedule_once(Duration::from_millis(20), Tick::Late);

        assert!(timers.cancel(early));
        assert!(!timers.cancel(early));
        assert_eq!(timers.fired().await, Tick::Late);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_empties_the_service() {
        let mut timers = TimerService::new();
        timers.schedule_once(Duration::from_millis(10), Tick::Early);
        timers.schedule_once(Duration::from_millis(20), Tick::Late);
        assert_eq!(timers.cancel_all(), 2);
        assert_eq!(timers.pending(), 0);

        let idle = tokio::time::timeout(Duration::from_secs(5), timers.fired()).await;
        assert!(idle.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_fired_keeps_the_timer() {
        let mut timers = TimerService::new();
        let handle = timers.schedule_once(Duration::from_millis(100), Tick::Late);

        let raced = tokio::time::timeout(Duration::from_millis(40), timers.fired()).await;
        assert!(raced.is_err());
        assert!(timers.is_pending(handle));
        assert_eq!(timers.fired().await, Tick::Late);
    }
}
