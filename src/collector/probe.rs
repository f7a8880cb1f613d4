//! Platform probe layer: one raw read per metric family.
//!
//! A [`Probe`] returns values in the platform's native units (clock ticks,
//! kibibytes, pages, filesystem blocks). Converting them into the public
//! model is the collector's job, so probes stay thin and easy to fake.
//!
//! Enumerations come back in implementation order: whatever order the
//! directory listing or kernel file yields. Callers must not depend on it.

use chrono::{DateTime, Utc};

use crate::collector::procfs::parser::{CpuStat, ProcStat, ProcStatus};
use crate::collector::procfs::{ProcessCollector, SystemCollector};
use crate::collector::traits::{FileSystem, StatVfs};
use crate::error::CollectError;
use crate::models::DiskIoCounters;

/// Aggregate CPU counters with their sample time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCpuTicks {
    pub counters: CpuStat,
    pub sampled_at: DateTime<Utc>,
}

/// Memory figures in kibibytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawMemory {
    pub total_kib: u64,
    pub free_kib: u64,
    pub cached_kib: u64,
}

/// Swap figures in kibibytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSwap {
    pub total_kib: u64,
    pub free_kib: u64,
}

/// A mounted filesystem and its `statvfs` answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawMount {
    pub device: String,
    pub fs_type: String,
    pub mount_point: String,
    pub stat: StatVfs,
}

/// Host identity strings and uptime in seconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawHost {
    pub os_name: String,
    pub os_release: String,
    pub os_version: String,
    pub platform: String,
    pub hostname: String,
    pub uptime_secs: f64,
}

/// One process as read from `/proc/[pid]/`.
#[derive(Debug, Clone, Default)]
pub struct RawProcess {
    pub stat: ProcStat,
    pub status: ProcStatus,
    pub cmdline: String,
}

/// The process table together with the uptime it was read at.
#[derive(Debug, Clone, Default)]
pub struct RawProcessTable {
    pub uptime_secs: f64,
    pub processes: Vec<RawProcess>,
}

/// Uniform access to operating-system statistics.
///
/// Each operation either returns a fully populated value or fails as a
/// whole. Enumerations skip entities that vanish mid-read.
pub trait Probe: Send + Sync {
    fn cpu_ticks(&self) -> Result<RawCpuTicks, CollectError>;

    /// Cumulative per-device I/O, already in bytes.
    fn disk_io(&self) -> Result<Vec<DiskIoCounters>, CollectError>;

    fn memory(&self) -> Result<RawMemory, CollectError>;

    fn swap(&self) -> Result<RawSwap, CollectError>;

    fn filesystems(&self) -> Result<Vec<RawMount>, CollectError>;

    fn host(&self) -> Result<RawHost, CollectError>;

    fn processes(&self) -> Result<RawProcessTable, CollectError>;

    /// Releases handles held by the probe. Called at most once.
    fn close(&self) -> Result<(), CollectError> {
        Ok(())
    }
}

/// Probe reading the Linux `/proc` filesystem.
pub struct ProcfsProbe<F: FileSystem + Clone> {
    system: SystemCollector<F>,
    processes: ProcessCollector<F>,
}

impl<F: FileSystem + Clone> ProcfsProbe<F> {
    /// Creates a probe over `fs` rooted at `proc_path` (usually "/proc").
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        let proc_path = proc_path.into();
        Self {
            system: SystemCollector::new(fs.clone(), &proc_path),
            processes: ProcessCollector::new(fs, &proc_path),
        }
    }
}

impl<F: FileSystem + Clone> Probe for ProcfsProbe<F> {
    fn cpu_ticks(&self) -> Result<RawCpuTicks, CollectError> {
        self.system.collect_cpu()
    }

    fn disk_io(&self) -> Result<Vec<DiskIoCounters>, CollectError> {
        self.system.collect_diskstats()
    }

    fn memory(&self) -> Result<RawMemory, CollectError> {
        self.system.collect_meminfo()
    }

    fn swap(&self) -> Result<RawSwap, CollectError> {
        self.system.collect_swap()
    }

    fn filesystems(&self) -> Result<Vec<RawMount>, CollectError> {
        self.system.collect_mounts()
    }

    fn host(&self) -> Result<RawHost, CollectError> {
        self.system.collect_host()
    }

    fn processes(&self) -> Result<RawProcessTable, CollectError> {
        // Uptime first: a process started after it would get a negative age.
        let uptime_secs = self.system.collect_uptime()?;
        let processes = self.processes.collect_all_processes()?;
        Ok(RawProcessTable {
            uptime_secs,
            processes,
        })
    }
}
