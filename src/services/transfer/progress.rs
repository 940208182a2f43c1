//! Coarse progress reporting for transfers
//!
//! The transport reports every chunk; observers only hear about it when the
//! percentage enters a new `step` bucket. Throughput is measured over a
//! sliding window and is display-only.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::utils::format_file_size;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub transfer_id: Uuid,
    pub bytes_transferred: u64,
    pub bytes_total: u64,
    /// Floor of the completed percentage, 0..=100
    pub percent: u8,
    /// Bytes per second over the recent window, `None` until two samples exist
    pub throughput: Option<f64>,
}

impl ProgressEvent {
    /// One-line summary, e.g. `45% 1.8MB/4.0MB @ 512.0KB/s`
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}% {}/{}",
            self.percent,
            format_file_size(self.bytes_transferred),
            format_file_size(self.bytes_total)
        );
        if let Some(rate) = self.throughput {
            line.push_str(&format!(" @ {}/s", format_file_size(rate as u64)));
        }
        line
    }
}

/// Receives coarse progress events; never called re-entrantly for one transfer
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that drops every event
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

struct TrackerState {
    /// Highest bucket already reported in the current attempt
    last_bucket: Option<u8>,
    samples: VecDeque<(Instant, u64)>,
}

pub struct ProgressTracker {
    transfer_id: Uuid,
    step: u8,
    window: Duration,
    observer: Arc<dyn ProgressObserver>,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new(
        transfer_id: Uuid,
        step_percent: u8,
        window: Duration,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            transfer_id,
            step: step_percent.clamp(1, 100),
            window,
            observer,
            state: Mutex::new(TrackerState {
                last_bucket: None,
                samples: VecDeque::new(),
            }),
        }
    }

    /// Feed a raw `(transferred, total)` report from the transport
    pub fn update(&self, bytes_transferred: u64, bytes_total: u64) {
        let now = Instant::now();
        // 持锁回调观察者，保证同一传输的回调串行
        let mut state = self.state.lock();

        state.samples.push_back((now, bytes_transferred));
        while state.samples.len() > 2
            && state
                .samples
                .get(1)
                .is_some_and(|(t, _)| now.duration_since(*t) >= self.window)
        {
            state.samples.pop_front();
        }

        let percent = percent_of(bytes_transferred, bytes_total);
        let bucket = percent - percent % self.step;
        if state.last_bucket.is_some_and(|last| bucket <= last) {
            return;
        }
        state.last_bucket = Some(bucket);

        let event = ProgressEvent {
            transfer_id: self.transfer_id,
            bytes_transferred,
            bytes_total,
            percent,
            throughput: throughput(&state.samples),
        };
        self.observer.on_progress(&event);
    }

    /// Forget everything reported so far; a re-issued transfer starts from zero bytes
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.last_bucket = None;
        state.samples.clear();
    }
}

fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u128 * 100) / total as u128) as u8
}

fn throughput(samples: &VecDeque<(Instant, u64)>) -> Option<f64> {
    let (first_at, first_bytes) = samples.front()?;
    let (last_at, last_bytes) = samples.back()?;
    let elapsed = last_at.duration_since(*first_at).as_secs_f64();
    if elapsed <= 0.0 {
        return None;
    }
    Some(last_bytes.saturating_sub(*first_bytes) as f64 / elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_tracker(step: u8) -> (ProgressTracker, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let tracker = ProgressTracker::new(
            Uuid::new_v4(),
            step,
            Duration::from_secs(5),
            Arc::new(move |e: &ProgressEvent| sink.lock().push(e.clone())),
        );
        (tracker, events)
    }

    #[test]
    fn test_reports_only_on_new_step() {
        let (tracker, events) = recording_tracker(5);

        for done in (0..=1000).step_by(10) {
            tracker.update(done, 1000);
        }

        let percents: Vec<u8> = events.lock().iter().map(|e| e.percent).collect();
        let expected: Vec<u8> = (0..=100).step_by(5).collect();
        assert_eq!(percents, expected);
    }

    #[test]
    fn test_large_jumps_report_once() {
        let (tracker, events) = recording_tracker(5);

        tracker.update(1, 100);
        tracker.update(4, 100);
        tracker.update(63, 100);
        tracker.update(64, 100);

        let percents: Vec<u8> = events.lock().iter().map(|e| e.percent).collect();
        assert_eq!(percents, vec![1, 63]);
    }

    #[test]
    fn test_reset_reports_again_from_zero() {
        let (tracker, events) = recording_tracker(10);

        tracker.update(50, 100);
        tracker.reset();
        tracker.update(10, 100);

        let percents: Vec<u8> = events.lock().iter().map(|e| e.percent).collect();
        assert_eq!(percents, vec![50, 10]);
    }

    #[test]
    fn test_zero_total_is_complete() {
        assert_eq!(percent_of(0, 0), 100);
        assert_eq!(percent_of(7, 5), 100);
        assert_eq!(percent_of(u64::MAX / 2, u64::MAX), 49);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throughput_over_window() {
        let (tracker, events) = recording_tracker(1);

        tracker.update(0, 10_000);
        tokio::time::advance(Duration::from_secs(1)).await;
        tracker.update(1_000, 10_000);
        tokio::time::advance(Duration::from_secs(1)).await;
        tracker.update(2_000, 10_000);

        let events = events.lock();
        assert_eq!(events[0].throughput, None);
        let rate = events.last().and_then(|e| e.throughput).unwrap();
        assert!((rate - 1_000.0).abs() < 1.0, "rate was {}", rate);
    }

    #[test]
    fn test_summary_line() {
        let event = ProgressEvent {
            transfer_id: Uuid::nil(),
            bytes_transferred: 1536,
            bytes_total: 4096,
            percent: 37,
            throughput: Some(512.0),
        };
        assert_eq!(event.summary(), "37% 1.5KB/4.0KB @ 512.0B/s");
    }
}
