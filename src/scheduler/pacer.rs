//! Fixed-period frame pacing
//!
//! Sleeps until the next deadline on the monotonic clock. A tick that
//! overruns its deadline does not try to catch up; the schedule restarts
//! from "now" so one slow frame never causes a burst of fast ones.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct FramePacer {
    period: Option<Duration>,
    deadline: Option<Instant>,
    late_ticks: u64,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            period: Some(Duration::from_secs(1) / fps.max(1)),
            deadline: None,
            late_ticks: 0,
        }
    }

    /// A pacer that never sleeps
    #[cfg(test)]
    pub fn unpaced() -> Self {
        Self {
            period: None,
            deadline: None,
            late_ticks: 0,
        }
    }

    /// Arm the first deadline one period from now
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    fn start_at(&mut self, now: Instant) {
        self.deadline = self.period.map(|period| now + period);
    }

    /// Block until the current deadline, then advance it by one period
    pub fn wait(&mut self) {
        let Some(period) = self.period else {
            return;
        };

        let now = Instant::now();
        let deadline = *self.deadline.get_or_insert(now + period);
        if let Some(remaining) = deadline.checked_duration_since(now) {
            std::thread::sleep(remaining);
            self.deadline = Some(deadline + period);
        } else {
            self.late_ticks += 1;
            self.deadline = Some(now + period);
        }
    }

    pub fn late_ticks(&self) -> u64 {
        self.late_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_fps() {
        let pacer = FramePacer::new(30);
        assert_eq!(pacer.period, Some(Duration::from_nanos(33_333_333)));
        assert_eq!(FramePacer::unpaced().period, None);
    }

    #[test]
    fn test_unpaced_never_sleeps() {
        let mut pacer = FramePacer::unpaced();
        pacer.start();
        let started = Instant::now();
        for _ in 0..1000 {
            pacer.wait();
        }
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(pacer.late_ticks(), 0);
    }

    #[test]
    fn test_wait_holds_cadence() {
        let mut pacer = FramePacer::new(100);
        pacer.start();
        let started = Instant::now();
        for _ in 0..5 {
            pacer.wait();
        }
        // Five 10ms periods, never less
        assert!(started.elapsed() >= Duration::from_millis(49));
    }

    #[test]
    fn test_overrun_counts_late_tick() {
        let mut pacer = FramePacer::new(10);
        pacer.start_at(Instant::now() - Duration::from_millis(200));
        pacer.wait();
        assert_eq!(pacer.late_ticks(), 1);

        // Schedule restarts from now, so the next tick is on time
        pacer.wait();
        assert_eq!(pacer.late_ticks(), 1);
    }
}
