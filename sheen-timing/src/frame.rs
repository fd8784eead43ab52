use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

/// Rolling window of presented frame durations.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    start: Instant,
    last_frame: Option<Instant>,
    frame_times: VecDeque<Duration>,
    max_samples: usize,
}

impl FrameTimer {
    pub fn new(max_samples: usize) -> Self {
        Self {
            start: Instant::now(),
            last_frame: None,
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    /// Marks a presented frame, recording the time since the previous one.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_frame.replace(now) {
            self.record_frame(now - last);
        }
    }

    pub fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(d);
    }

    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }

    pub fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stats(&self) -> Option<FrameStats> {
        if self.frame_times.is_empty() {
            return None;
        }
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(FrameStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        })
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_timer_has_no_stats() {
        assert!(FrameTimer::default().stats().is_none());
    }

    #[test]
    fn stats_over_steady_frames() {
        let mut timer = FrameTimer::new(10);
        for _ in 0..4 {
            timer.record_frame(Duration::from_millis(10));
        }
        let stats = timer.stats().unwrap();
        assert_eq!(stats.average_frame_time_ns, 10_000_000.0);
        assert_eq!(stats.jitter_ns, 0.0);
        assert!((stats.effective_fps - 100.0).abs() < 1e-9);
    }

    #[test]
    fn window_drops_oldest_samples() {
        let mut timer = FrameTimer::new(2);
        timer.record_frame(Duration::from_millis(100));
        timer.record_frame(Duration::from_millis(10));
        timer.record_frame(Duration::from_millis(20));
        let stats = timer.stats().unwrap();
        assert_eq!(timer.frame_count(), 2);
        assert_eq!(stats.max_frame_time_ns, 20_000_000.0);
        assert_eq!(stats.min_frame_time_ns, 10_000_000.0);
    }
}
