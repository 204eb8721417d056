//! Locally synthesized progress for remote jobs
//!
//! The service only reports a coarse status, so the percentage shown to
//! users is estimated from elapsed time:
//!
//! - Waiting: 0..=10, scaled against the maximum wait
//! - Running: 10..=95, scaled against the expected generation time and
//!   measured from the first poll that saw the job running
//! - Done: 100
//!
//! Reported values never decrease.

use crate::provider::JobPhase;
use serde::Serialize;
use std::time::Duration;

/// Typical generation time once a job leaves the queue. A tuning knob for
/// the progress curve only.
pub const ESTIMATED_GENERATION: Duration = Duration::from_secs(150);

const WAITING_SPAN: f64 = 10.0;
const RUNNING_SPAN: f64 = 85.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    /// 0..=100
    pub percent: u8,
    pub phase: JobPhase,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    max_wait: Duration,
    estimated_generation: Duration,
    running_since: Option<Duration>,
    last_percent: u8,
}

impl ProgressEstimator {
    pub fn new(max_wait: Duration, estimated_generation: Duration) -> Self {
        Self {
            max_wait,
            estimated_generation,
            running_since: None,
            last_percent: 0,
        }
    }

    /// Record one poll observed `elapsed` after waiting began.
    /// Returns `None` for `Failed`, which has no meaningful percentage.
    pub fn observe(&mut self, phase: JobPhase, elapsed: Duration) -> Option<ProgressUpdate> {
        // Running is sticky: a stale Waiting after Running counts as Running
        let phase = match (phase, self.running_since) {
            (JobPhase::Waiting, Some(_)) => JobPhase::Running,
            (p, _) => p,
        };

        let (raw, message) = match phase {
            JobPhase::Waiting => (
                WAITING_SPAN * fraction(elapsed, self.max_wait),
                format!("Waiting in queue ({}s)", elapsed.as_secs()),
            ),
            JobPhase::Running => {
                let since = *self.running_since.get_or_insert(elapsed);
                let run_elapsed = elapsed.saturating_sub(since);
                (
                    WAITING_SPAN + RUNNING_SPAN * fraction(run_elapsed, self.estimated_generation),
                    format!("Generating 3D model ({}s)", elapsed.as_secs()),
                )
            }
            JobPhase::Done => (100.0, "Generation complete".to_string()),
            JobPhase::Failed => return None,
        };

        let percent = (raw.floor() as u8).max(self.last_percent);
        self.last_percent = percent;
        Some(ProgressUpdate {
            percent,
            phase,
            message,
        })
    }

    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }
}

fn fraction(part: Duration, whole: Duration) -> f64 {
    if whole.is_zero() {
        return 1.0;
    }
    (part.as_secs_f64() / whole.as_secs_f64()).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn estimator() -> ProgressEstimator {
        ProgressEstimator::new(secs(600), ESTIMATED_GENERATION)
    }

    #[test]
    fn test_waiting_stays_within_ten() {
        let mut est = estimator();
        let mut prev = 0;
        for t in (0..=1200).step_by(30) {
            let p = est.observe(JobPhase::Waiting, secs(t)).unwrap().percent;
            assert!(p <= 10);
            assert!(p >= prev);
            prev = p;
        }
        assert_eq!(prev, 10);
    }

    #[test]
    fn test_running_measured_from_first_observation() {
        let mut est = estimator();
        est.observe(JobPhase::Waiting, secs(60));
        let first = est.observe(JobPhase::Running, secs(120)).unwrap();
        assert_eq!(first.percent, 10);
        let later = est.observe(JobPhase::Running, secs(195)).unwrap();
        // 75s of 150s running -> 10 + 42.5
        assert_eq!(later.percent, 52);
        let capped = est.observe(JobPhase::Running, secs(2000)).unwrap();
        assert_eq!(capped.percent, 95);
    }

    #[test]
    fn test_waiting_after_running_is_running() {
        let mut est = estimator();
        est.observe(JobPhase::Running, secs(0));
        let update = est.observe(JobPhase::Waiting, secs(150)).unwrap();
        assert_eq!(update.phase, JobPhase::Running);
        assert_eq!(update.percent, 95);
    }

    #[test]
    fn test_never_decreases() {
        let mut est = ProgressEstimator::new(secs(10), secs(1000));
        assert_eq!(est.observe(JobPhase::Waiting, secs(10)).unwrap().percent, 10);
        // Running at run_elapsed 0 computes 10, never below the previous value
        assert_eq!(est.observe(JobPhase::Running, secs(10)).unwrap().percent, 10);
        assert_eq!(est.last_percent(), 10);
    }

    #[test]
    fn test_done_and_failed() {
        let mut est = estimator();
        assert_eq!(est.observe(JobPhase::Done, secs(1)).unwrap().percent, 100);
        assert!(est.observe(JobPhase::Failed, secs(2)).is_none());
    }
}
