//! Progress reporting for one transfer (fraction, remaining size, rate, ETA).
//!
//! The tracker keeps only the latest derived view; it holds no sample history.
//! Every recorded view is also published on a watch channel so a caller can
//! follow a job while its transfer runs on a worker thread.

use std::time::Instant;

use tokio::sync::watch;

use crate::format::{format_file_size, format_speed};

/// One raw observation during a transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub bytes_downloaded: u64,
    pub bytes_total: u64,
    pub elapsed_secs: f64,
}

impl ProgressSample {
    /// Fraction complete in [0.0, 1.0]; 0.0 while the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.bytes_total == 0 {
            return 0.0;
        }
        (self.bytes_downloaded as f64 / self.bytes_total as f64).min(1.0)
    }

    /// Average rate in bytes per second (0 if no time has elapsed).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_downloaded as f64 / self.elapsed_secs
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.bytes_total.saturating_sub(self.bytes_downloaded)
    }

    /// Estimated seconds remaining (0 if the rate is 0).
    pub fn eta_secs(&self) -> f64 {
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return 0.0;
        }
        self.remaining_bytes() as f64 / rate
    }
}

/// Display-ready snapshot derived from the latest sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub fraction: f64,
    pub bytes_downloaded: u64,
    pub bytes_total: u64,
    pub remaining_bytes: u64,
    /// Remaining size, e.g. `"12.40 MB"`.
    pub remaining: String,
    pub speed_bytes_per_sec: f64,
    /// Rate, e.g. `"1.25 MB/s"`.
    pub speed: String,
    pub eta_secs: f64,
}

impl ProgressView {
    pub fn from_sample(sample: &ProgressSample) -> Self {
        let remaining_bytes = sample.remaining_bytes();
        let speed_bytes_per_sec = sample.bytes_per_sec();
        Self {
            fraction: sample.fraction(),
            bytes_downloaded: sample.bytes_downloaded,
            bytes_total: sample.bytes_total,
            remaining_bytes,
            remaining: format_file_size(remaining_bytes),
            speed_bytes_per_sec,
            speed: format_speed(speed_bytes_per_sec),
            eta_secs: sample.eta_secs(),
        }
    }
}

impl Default for ProgressView {
    fn default() -> Self {
        Self::from_sample(&ProgressSample {
            bytes_downloaded: 0,
            bytes_total: 0,
            elapsed_secs: 0.0,
        })
    }
}

/// Per-job progress counter. Owned by exactly one job.
#[derive(Debug)]
pub struct ProgressTracker {
    started_at: Option<Instant>,
    latest: ProgressView,
    tx: watch::Sender<ProgressView>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressView::default());
        Self {
            started_at: None,
            latest: ProgressView::default(),
            tx,
        }
    }

    /// Marks the start of a transfer attempt and clears the previous view.
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.publish(ProgressView::default());
    }

    /// Records one chunk callback. Elapsed time is measured from `start()`;
    /// a sample taken before `start()` counts as zero elapsed.
    pub fn on_sample(&mut self, bytes_downloaded: u64, bytes_total: u64) {
        let elapsed_secs = self
            .started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.record(ProgressSample {
            bytes_downloaded,
            bytes_total,
            elapsed_secs,
        });
    }

    /// Records a sample with an explicit elapsed time.
    pub fn record(&mut self, sample: ProgressSample) {
        self.publish(ProgressView::from_sample(&sample));
    }

    /// Latest view; reflects the most recent sample.
    pub fn snapshot(&self) -> ProgressView {
        self.latest.clone()
    }

    /// Live receiver of every view this tracker records.
    pub fn subscribe(&self) -> watch::Receiver<ProgressView> {
        self.tx.subscribe()
    }

    fn publish(&mut self, view: ProgressView) {
        self.latest = view.clone();
        self.tx.send_replace(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_right_after_start_has_no_speed() {
        let mut t = ProgressTracker::new();
        t.start();
        t.on_sample(0, 1000);
        let v = t.snapshot();
        assert_eq!(v.fraction, 0.0);
        assert_eq!(v.speed_bytes_per_sec, 0.0);
        assert_eq!(v.eta_secs, 0.0);
        assert_eq!(v.remaining_bytes, 1000);
    }

    #[test]
    fn zero_elapsed_does_not_divide() {
        let mut t = ProgressTracker::new();
        t.record(ProgressSample {
            bytes_downloaded: 400,
            bytes_total: 1000,
            elapsed_secs: 0.0,
        });
        let v = t.snapshot();
        assert_eq!(v.speed_bytes_per_sec, 0.0);
        assert_eq!(v.eta_secs, 0.0);
        assert!((v.fraction - 0.4).abs() < 1e-9);
    }

    #[test]
    fn complete_sample_has_nothing_remaining() {
        let mut t = ProgressTracker::new();
        t.start();
        t.on_sample(1000, 1000);
        let v = t.snapshot();
        assert_eq!(v.fraction, 1.0);
        assert_eq!(v.remaining_bytes, 0);
        assert_eq!(v.remaining, "0.00 KB");
        assert_eq!(v.eta_secs, 0.0);
    }

    #[test]
    fn rate_and_eta_from_elapsed() {
        let mut t = ProgressTracker::new();
        t.record(ProgressSample {
            bytes_downloaded: 2 * 1024 * 1024,
            bytes_total: 6 * 1024 * 1024,
            elapsed_secs: 2.0,
        });
        let v = t.snapshot();
        assert!((v.speed_bytes_per_sec - 1024.0 * 1024.0).abs() < 1e-6);
        assert_eq!(v.speed, "1.00 MB/s");
        assert_eq!(v.remaining, "4.00 MB");
        assert!((v.eta_secs - 4.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_total_reports_zero_fraction() {
        let s = ProgressSample {
            bytes_downloaded: 10,
            bytes_total: 0,
            elapsed_secs: 1.0,
        };
        assert_eq!(s.fraction(), 0.0);
        assert_eq!(s.remaining_bytes(), 0);
    }

    #[test]
    fn only_latest_sample_is_kept() {
        let mut t = ProgressTracker::new();
        t.start();
        t.on_sample(100, 1000);
        t.on_sample(700, 1000);
        assert_eq!(t.snapshot().bytes_downloaded, 700);
    }

    #[test]
    fn subscribers_see_latest_view_and_start_resets() {
        let mut t = ProgressTracker::new();
        let rx = t.subscribe();
        t.start();
        t.on_sample(500, 1000);
        assert_eq!(rx.borrow().bytes_downloaded, 500);
        t.start();
        assert_eq!(rx.borrow().bytes_downloaded, 0);
        assert_eq!(t.snapshot(), ProgressView::default());
    }
}
