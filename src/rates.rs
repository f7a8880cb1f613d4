//! Rate computation for counter-based metrics.
//!
//! Turns cumulative counters (CPU ticks, disk bytes) into percentages and
//! throughput by remembering the previous sample per key. All rate math in
//! the crate goes through [`RateTracker`].
//!
//! Anomalies never surface as errors. A first observation, a counter that
//! went backwards, or a sample that is not newer than its baseline all yield
//! a zero-delta result and leave the current sample as the new baseline.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{CpuPercents, CpuTicks, DiskIoCounters, DiskIoRates};

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Compute u64 delta, returning `None` on counter regression (reset).
pub fn du64(curr: u64, prev: u64) -> Option<u64> {
    curr.checked_sub(prev)
}

/// Percentage of `part` in `whole`, clamped to [0, 100].
fn percent(part: u64, whole: u64) -> f32 {
    ((part as f64 / whole as f64) * 100.0).clamp(0.0, 100.0) as f32
}

/// Elapsed wall-clock time, `None` unless strictly positive.
fn elapsed(curr: DateTime<Utc>, prev: DateTime<Utc>) -> Option<Duration> {
    (curr - prev).to_std().ok().filter(|d| !d.is_zero())
}

// ---------------------------------------------------------------------------
// Tracker state
// ---------------------------------------------------------------------------

/// Logical identity of a tracked counter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateKey {
    /// Whole-system CPU.
    Cpu,
    /// One block device, by name.
    Disk(String),
}

#[derive(Debug, Clone)]
enum Baseline {
    Cpu(CpuTicks),
    Disk(DiskIoCounters),
}

/// Last-seen sample per key.
///
/// Entries are created on first observation and overwritten on every later
/// one; they are never removed. One lock guards the whole map; the critical
/// section is a hash lookup plus arithmetic, so contention is negligible
/// next to the probe reads that precede it.
#[derive(Debug, Default)]
pub struct RateTracker {
    baselines: Mutex<HashMap<RateKey, Baseline>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a baseline.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every baseline.
    pub fn reset(&self) {
        let mut baselines = self.lock();
        baselines.clear();
        baselines.shrink_to_fit();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RateKey, Baseline>> {
        // A panic elsewhere cannot leave a half-written baseline behind:
        // every update is a single insert.
        self.baselines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `ticks` and returns CPU shares since the previous sample.
    pub fn observe_cpu(&self, ticks: &CpuTicks) -> CpuPercents {
        let prev = self
            .lock()
            .insert(RateKey::Cpu, Baseline::Cpu(ticks.clone()));

        let Some(Baseline::Cpu(prev)) = prev else {
            return CpuPercents::default();
        };

        let total = match du64(ticks.total, prev.total) {
            Some(d) if d > 0 => d,
            _ => {
                debug!(
                    "cpu ticks did not advance ({} -> {}), resetting baseline",
                    prev.total, ticks.total
                );
                return CpuPercents::default();
            }
        };

        // A single category can still regress (e.g. guest accounting quirks);
        // treat it as zero rather than negative.
        let share = |curr: u64, prev: u64| percent(du64(curr, prev).unwrap_or(0), total);

        CpuPercents {
            user: share(ticks.user, prev.user),
            kernel: share(ticks.kernel, prev.kernel),
            idle: share(ticks.idle, prev.idle),
            iowait: share(ticks.iowait, prev.iowait),
            swap: share(ticks.swap, prev.swap),
            nice: share(ticks.nice, prev.nice),
            time_taken: elapsed(ticks.systime, prev.systime).unwrap_or_default(),
        }
    }

    /// Records `counters` and returns the device's transfer since the previous sample.
    pub fn observe_disk(&self, counters: &DiskIoCounters) -> DiskIoRates {
        let prev = self.lock().insert(
            RateKey::Disk(counters.disk_name.clone()),
            Baseline::Disk(counters.clone()),
        );

        let zero = DiskIoRates {
            disk_name: counters.disk_name.clone(),
            ..Default::default()
        };

        let Some(Baseline::Disk(prev)) = prev else {
            return zero;
        };

        let Some(dt) = elapsed(counters.systime, prev.systime) else {
            debug!(
                "disk {}: sample not newer than baseline, resetting",
                counters.disk_name
            );
            return zero;
        };

        let (Some(read), Some(written)) = (
            du64(counters.read_bytes, prev.read_bytes),
            du64(counters.write_bytes, prev.write_bytes),
        ) else {
            debug!(
                "disk {}: counters went backwards, resetting baseline",
                counters.disk_name
            );
            return zero;
        };

        let secs = dt.as_secs_f64();
        DiskIoRates {
            disk_name: counters.disk_name.clone(),
            read_bytes: read,
            write_bytes: written,
            read_bytes_per_sec: read as f64 / secs,
            write_bytes_per_sec: written as f64 / secs,
            time_taken: dt,
        }
    }

    /// Observes every device of one sample.
    pub fn observe_disks(&self, counters: &[DiskIoCounters]) -> Vec<DiskIoRates> {
        counters.iter().map(|c| self.observe_disk(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn cpu(user: u64, kernel: u64, idle: u64, iowait: u64, nice: u64, t: i64) -> CpuTicks {
        CpuTicks {
            user,
            kernel,
            idle,
            iowait,
            swap: 0,
            nice,
            total: user + kernel + idle + iowait + nice,
            systime: at(t),
        }
    }

    fn disk(name: &str, read: u64, write: u64, t: i64) -> DiskIoCounters {
        DiskIoCounters {
            disk_name: name.to_string(),
            read_bytes: read,
            write_bytes: write,
            systime: at(t),
        }
    }

    #[test]
    fn test_du64() {
        assert_eq!(du64(10, 3), Some(7));
        assert_eq!(du64(3, 3), Some(0));
        assert_eq!(du64(3, 10), None);
    }

    #[test]
    fn test_first_cpu_observation_is_zero() {
        let tracker = RateTracker::new();
        let p = tracker.observe_cpu(&cpu(100, 50, 800, 10, 5, 0));

        assert_eq!(p, CpuPercents::default());
        assert_eq!(p.sum(), 0.0);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_cpu_percentages() {
        let tracker = RateTracker::new();
        tracker.observe_cpu(&cpu(100, 50, 800, 10, 5, 0));
        // +200 ticks: 50 user, 30 kernel, 100 idle, 10 iowait, 10 nice
        let p = tracker.observe_cpu(&cpu(150, 80, 900, 20, 15, 2));

        assert!((p.user - 25.0).abs() < 1e-4);
        assert!((p.kernel - 15.0).abs() < 1e-4);
        assert!((p.idle - 50.0).abs() < 1e-4);
        assert!((p.iowait - 5.0).abs() < 1e-4);
        assert!((p.nice - 5.0).abs() < 1e-4);
        assert_eq!(p.swap, 0.0);
        assert_eq!(p.time_taken, Duration::from_secs(2));
    }

    #[test]
    fn test_cpu_percentages_bounded_and_sum_to_100() {
        let tracker = RateTracker::new();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = |bound: u64| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed % bound
        };

        let (mut u, mut k, mut i, mut w, mut n) = (0, 0, 0, 0, 0);
        tracker.observe_cpu(&cpu(u, k, i, w, n, 0));
        for t in 1..200 {
            u += next(1000);
            k += next(1000);
            i += next(1000);
            w += next(10);
            n += next(100) + 1;
            let p = tracker.observe_cpu(&cpu(u, k, i, w, n, t));

            for v in [p.user, p.kernel, p.idle, p.iowait, p.swap, p.nice] {
                assert!((0.0..=100.0).contains(&v), "out of range: {v}");
            }
            assert!((p.sum() - 100.0).abs() < 0.01, "sum {}", p.sum());
        }
    }

    #[test]
    fn test_cpu_rollback_resets_baseline() {
        let tracker = RateTracker::new();
        tracker.observe_cpu(&cpu(1000, 500, 8000, 100, 50, 0));

        // Counters reset (e.g. restored VM snapshot)
        let p = tracker.observe_cpu(&cpu(10, 5, 80, 1, 0, 1));
        assert_eq!(p, CpuPercents::default());

        // Next sample measures against the reset baseline
        let p = tracker.observe_cpu(&cpu(60, 5, 130, 1, 0, 2));
        assert!((p.user - 50.0).abs() < 1e-4);
        assert!((p.idle - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_cpu_no_progress_is_zero() {
        let tracker = RateTracker::new();
        tracker.observe_cpu(&cpu(100, 50, 800, 10, 5, 0));
        let p = tracker.observe_cpu(&cpu(100, 50, 800, 10, 5, 1));
        assert_eq!(p.sum(), 0.0);
    }

    #[test]
    fn test_disk_rate_end_to_end() {
        let tracker = RateTracker::new();

        let first = tracker.observe_disk(&disk("sda", 1000, 0, 0));
        assert_eq!(first.disk_name, "sda");
        assert_eq!(first.read_bytes_per_sec, 0.0);

        let second = tracker.observe_disk(&disk("sda", 3000, 0, 2));
        assert_eq!(second.read_bytes, 2000);
        assert!((second.read_bytes_per_sec - 1000.0).abs() < 1e-9);
        assert_eq!(second.write_bytes_per_sec, 0.0);
        assert_eq!(second.time_taken, Duration::from_secs(2));
    }

    #[test]
    fn test_disk_rollback_resets_baseline() {
        let tracker = RateTracker::new();
        tracker.observe_disk(&disk("sdb", 5000, 5000, 0));

        let r = tracker.observe_disk(&disk("sdb", 100, 6000, 1));
        assert_eq!(r.read_bytes, 0);
        assert_eq!(r.write_bytes, 0);
        assert_eq!(r.read_bytes_per_sec, 0.0);

        let r = tracker.observe_disk(&disk("sdb", 600, 6000, 2));
        assert_eq!(r.read_bytes, 500);
        assert!((r.read_bytes_per_sec - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_disk_clock_backwards_is_zero() {
        let tracker = RateTracker::new();
        tracker.observe_disk(&disk("sda", 0, 0, 10));

        let r = tracker.observe_disk(&disk("sda", 1000, 1000, 10));
        assert_eq!(r.read_bytes_per_sec, 0.0);
        let r = tracker.observe_disk(&disk("sda", 2000, 2000, 5));
        assert_eq!(r.write_bytes_per_sec, 0.0);
    }

    #[test]
    fn test_disks_are_tracked_independently() {
        let tracker = RateTracker::new();
        tracker.observe_disks(&[disk("sda", 0, 0, 0), disk("nvme0n1", 0, 0, 0)]);

        let rates = tracker.observe_disks(&[disk("sda", 400, 0, 4), disk("nvme0n1", 0, 800, 4)]);
        assert_eq!(rates.len(), 2);
        assert!((rates[0].read_bytes_per_sec - 100.0).abs() < 1e-9);
        assert!((rates[1].write_bytes_per_sec - 200.0).abs() < 1e-9);

        // New device gets its own zero-delta bootstrap
        let r = tracker.observe_disk(&disk("sdc", 999, 999, 5));
        assert_eq!(r.read_bytes, 0);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_reset_forgets_baselines() {
        let tracker = RateTracker::new();
        tracker.observe_cpu(&cpu(1, 1, 1, 1, 1, 0));
        tracker.observe_disk(&disk("sda", 1, 1, 0));
        assert_eq!(tracker.len(), 2);

        tracker.reset();
        assert!(tracker.is_empty());
    }
}
