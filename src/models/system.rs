//! System-wide snapshot records.
//!
//! Sizes are in bytes, percentages in [0, 100], durations serialize as
//! fractional seconds. Records are plain values; nothing mutates them after
//! the collector builds them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::duration_secs;
use crate::error::CollectError;

/// Cumulative CPU time counters since boot.
///
/// Contains raw clock ticks for the whole system. The six categories are
/// disjoint, so `total` is their sum.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CpuTicks {
    /// Ticks spent in user mode (including guest time).
    pub user: u64,
    /// Ticks spent in kernel mode, interrupt handling and stolen by a hypervisor.
    pub kernel: u64,
    /// Ticks spent idle.
    pub idle: u64,
    /// Ticks spent waiting for I/O.
    pub iowait: u64,
    /// Ticks spent swapping. Linux does not account this separately: always 0.
    pub swap: u64,
    /// Ticks spent in user mode with low priority.
    pub nice: u64,
    /// Sum of all categories.
    pub total: u64,
    /// When the counters were sampled.
    pub systime: DateTime<Utc>,
}

/// Share of CPU time per category between two samples.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct CpuPercents {
    pub user: f32,
    pub kernel: f32,
    pub idle: f32,
    pub iowait: f32,
    pub swap: f32,
    pub nice: f32,
    /// Wall-clock time since the previous sample; zero on the first call.
    #[serde(with = "duration_secs")]
    pub time_taken: Duration,
}

impl CpuPercents {
    /// Sum of all categories; about 100 once a baseline exists, 0 before.
    pub fn sum(&self) -> f32 {
        self.user + self.kernel + self.idle + self.iowait + self.swap + self.nice
    }
}

/// Cumulative I/O transfers of one block device since boot.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct DiskIoCounters {
    /// Device name, unique per device (sda, nvme0n1, ...).
    pub disk_name: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// When the counters were sampled.
    pub systime: DateTime<Utc>,
}

/// I/O transfers of one block device since the previous sample.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct DiskIoRates {
    pub disk_name: String,
    /// Bytes read since the previous sample.
    pub read_bytes: u64,
    /// Bytes written since the previous sample.
    pub write_bytes: u64,
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    /// Wall-clock time since the previous sample; zero on the first call.
    #[serde(with = "duration_secs")]
    pub time_taken: Duration,
}

/// Physical memory capacity and usage.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub total: u64,
    pub free: u64,
    /// `total - free`; includes cache.
    pub used: u64,
    /// Page cache. Overlaps `used`.
    pub cache: u64,
}

/// Swap capacity and usage.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct SwapStats {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

/// Capacity and usage of one mounted filesystem, keyed by mount point.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct FilesystemStats {
    /// Device name, as mounted.
    pub device_name: String,
    pub fs_type: String,
    pub mnt_point: String,
    /// Size in bytes.
    pub size: u64,
    /// Bytes used.
    pub used: u64,
    /// Bytes available to unprivileged users. Excludes reserved blocks.
    pub avail: u64,
    pub total_inodes: u64,
    pub used_inodes: u64,
    pub free_inodes: u64,
    pub avail_inodes: u64,
    /// Optimal transfer block size.
    pub io_size: u64,
    /// Fundamental block size; the unit of the block counts.
    pub block_size: u64,
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub used_blocks: u64,
    pub avail_blocks: u64,
}

impl FilesystemStats {
    /// Checks the capacity invariants, rejecting inconsistent raw data.
    pub fn validate(&self) -> Result<(), CollectError> {
        let malformed = |reason: String| CollectError::Malformed {
            what: format!("filesystem {}", self.mnt_point),
            reason,
        };

        if self.used.saturating_add(self.avail) > self.size {
            return Err(malformed(format!(
                "used {} + avail {} exceeds size {}",
                self.used, self.avail, self.size
            )));
        }
        if self.used_inodes.saturating_add(self.avail_inodes) > self.total_inodes {
            return Err(malformed(format!(
                "used inodes {} + avail inodes {} exceeds total {}",
                self.used_inodes, self.avail_inodes, self.total_inodes
            )));
        }
        Ok(())
    }
}

/// Host identity, fixed for the lifetime of a boot.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct HostInfo {
    /// Equivalent to `uname -s`.
    pub os_name: String,
    /// Equivalent to `uname -r`.
    pub os_release: String,
    /// Equivalent to `uname -v`.
    pub os_version: String,
    /// Equivalent to `uname -m`.
    pub platform: String,
    pub hostname: String,
    /// Time since boot.
    #[serde(with = "duration_secs")]
    pub uptime: Duration,
}
