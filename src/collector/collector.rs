//! Main collector that turns probe readings into snapshot records.
//!
//! The `Collector` owns a [`Probe`], the scale factors resolved at start-up
//! and the rate tracker for counter-based metrics. It has an explicit
//! lifecycle: [`Collector::init`] (or [`Collector::live`]) to construct,
//! [`Collector::shutdown`] to release the probe. Independent collectors never
//! share state, so tests can run several side by side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::collector::platform::{ScaleFactors, drop_privileges};
use crate::collector::probe::{Probe, ProcfsProbe, RawCpuTicks, RawMount, RawProcess};
use crate::collector::traits::RealFs;
use crate::error::CollectError;
use crate::models::{
    CpuPercents, CpuTicks, DiskIoCounters, DiskIoRates, FilesystemStats, HostInfo, MemoryStats,
    ProcessCount, ProcessRecord, ProcessState, SwapStats,
};
use crate::rates::RateTracker;

/// `/proc/meminfo` reports kibibytes.
const KIB: u64 = 1024;

/// Collector reading the running system.
pub type LiveCollector = Collector<ProcfsProbe<RealFs>>;

/// Snapshot assembler over a platform probe.
pub struct Collector<P: Probe> {
    probe: P,
    scale: ScaleFactors,
    rates: RateTracker,
    closed: AtomicBool,
}

impl LiveCollector {
    /// Sets up collection from the `/proc` tree at `proc_path`.
    ///
    /// Resolves scale factors, then drops elevated effective ids: a set-id
    /// installation keeps its privileges only for set-up.
    pub fn live(proc_path: impl Into<String>) -> Result<Self, CollectError> {
        let scale = ScaleFactors::detect()?;
        let probe = ProcfsProbe::new(RealFs::new(), proc_path);
        drop_privileges().map_err(|e| CollectError::Init(e.to_string()))?;
        Ok(Collector::init(probe, scale))
    }
}

impl<P: Probe> Collector<P> {
    /// Creates a collector over `probe` with fixed `scale` factors.
    pub fn init(probe: P, scale: ScaleFactors) -> Self {
        Self {
            probe,
            scale,
            rates: RateTracker::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the underlying probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn scale(&self) -> ScaleFactors {
        self.scale
    }

    /// Returns the rate tracker holding the CPU and disk baselines.
    pub fn rates(&self) -> &RateTracker {
        &self.rates
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Releases the probe. A second call is a no-op.
    ///
    /// Callers are responsible for letting in-flight operations finish first.
    pub fn shutdown(&self) -> Result<(), CollectError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!("shutting down collector");
        self.probe.close()
    }

    fn timed<T>(
        &self,
        what: &str,
        read: impl FnOnce(&P) -> Result<T, CollectError>,
    ) -> Result<T, CollectError> {
        if self.is_shut_down() {
            return Err(CollectError::Shutdown);
        }
        let start = Instant::now();
        let result = read(&self.probe);
        trace!("{} probe took {:?}", what, start.elapsed());
        result
    }

    /// Cumulative CPU ticks since boot.
    pub fn cpu_ticks(&self) -> Result<CpuTicks, CollectError> {
        let raw = self.timed("cpu", |p| p.cpu_ticks())?;
        Ok(cpu_ticks_from_raw(&raw))
    }

    /// CPU shares since the previous call on this collector.
    ///
    /// The first call returns all zeros and establishes the baseline.
    pub fn cpu_percents(&self) -> Result<CpuPercents, CollectError> {
        let ticks = self.cpu_ticks()?;
        Ok(self.rates.observe_cpu(&ticks))
    }

    /// Cumulative per-device I/O counters.
    pub fn disk_io_stats(&self) -> Result<Vec<DiskIoCounters>, CollectError> {
        self.timed("disk io", |p| p.disk_io())
    }

    /// Per-device I/O since the previous call on this collector.
    pub fn disk_io_stats_diff(&self) -> Result<Vec<DiskIoRates>, CollectError> {
        let counters = self.disk_io_stats()?;
        Ok(self.rates.observe_disks(&counters))
    }

    pub fn memory_stats(&self) -> Result<MemoryStats, CollectError> {
        let raw = self.timed("memory", |p| p.memory())?;
        let total = raw.total_kib.saturating_mul(KIB);
        let free = raw.free_kib.saturating_mul(KIB);
        Ok(MemoryStats {
            total,
            free,
            used: total.saturating_sub(free),
            cache: raw.cached_kib.saturating_mul(KIB),
        })
    }

    pub fn swap_stats(&self) -> Result<SwapStats, CollectError> {
        let raw = self.timed("swap", |p| p.swap())?;
        let total = raw.total_kib.saturating_mul(KIB);
        let free = raw.free_kib.saturating_mul(KIB);
        Ok(SwapStats {
            total,
            free,
            used: total.saturating_sub(free),
        })
    }

    /// Capacity of every mounted block-backed or network filesystem.
    ///
    /// Mounts whose raw figures are inconsistent are left out.
    pub fn filesystem_stats(&self) -> Result<Vec<FilesystemStats>, CollectError> {
        let mounts = self.timed("filesystems", |p| p.filesystems())?;
        Ok(mounts
            .into_iter()
            .filter_map(|raw| match filesystem_from_raw(raw) {
                Ok(stats) => Some(stats),
                Err(e) => {
                    debug!("skipping filesystem: {}", e);
                    None
                }
            })
            .collect())
    }

    pub fn host_info(&self) -> Result<HostInfo, CollectError> {
        let raw = self.timed("host", |p| p.host())?;
        Ok(HostInfo {
            os_name: raw.os_name,
            os_release: raw.os_release,
            os_version: raw.os_version,
            platform: raw.platform,
            hostname: raw.hostname,
            uptime: secs_to_duration("uptime", raw.uptime_secs)?,
        })
    }

    /// One record per process, in enumeration order.
    pub fn process_stats(&self) -> Result<Vec<ProcessRecord>, CollectError> {
        let table = self.timed("processes", |p| p.processes())?;
        Ok(table
            .processes
            .iter()
            .map(|p| self.process_from_raw(p, table.uptime_secs))
            .collect())
    }

    /// Process tallies by state.
    pub fn process_count(&self) -> Result<ProcessCount, CollectError> {
        let table = self.timed("processes", |p| p.processes())?;
        Ok(ProcessCount::from_states(
            table
                .processes
                .iter()
                .map(|p| ProcessState::from_stat_char(p.stat.state)),
        ))
    }

    fn process_from_raw(&self, raw: &RawProcess, uptime_secs: f64) -> ProcessRecord {
        let stat = &raw.stat;
        let cpu_secs = self.scale.ticks_to_secs(stat.utime.saturating_add(stat.stime));
        let age_secs = uptime_secs - self.scale.ticks_to_secs(stat.starttime);
        let cpu_percent = if age_secs > 0.0 {
            (cpu_secs / age_secs * 100.0) as f32
        } else {
            0.0
        };

        ProcessRecord {
            process_name: stat.comm.clone(),
            proctitle: raw.cmdline.clone(),
            pid: stat.pid,
            parent: stat.ppid,
            pgid: stat.pgrp,
            uid: raw.status.uid,
            euid: raw.status.euid,
            gid: raw.status.gid,
            egid: raw.status.egid,
            proc_size: stat.vsize,
            proc_resident: (stat.rss.max(0) as u64).saturating_mul(self.scale.page_size),
            time_spent: Duration::try_from_secs_f64(cpu_secs).unwrap_or_default(),
            cpu_percent,
            nice: stat.nice,
            state: ProcessState::from_stat_char(stat.state),
        }
    }
}

impl<P: Probe> Drop for Collector<P> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            debug!("probe close failed: {}", e);
        }
    }
}

fn cpu_ticks_from_raw(raw: &RawCpuTicks) -> CpuTicks {
    let c = &raw.counters;
    let kernel = [c.irq, c.softirq, c.steal]
        .into_iter()
        .fold(c.system, u64::saturating_add);
    // Linux does not account swap time separately.
    let swap = 0;
    let total = [kernel, c.idle, c.iowait, swap, c.nice]
        .into_iter()
        .fold(c.user, u64::saturating_add);
    CpuTicks {
        user: c.user,
        kernel,
        idle: c.idle,
        iowait: c.iowait,
        swap,
        nice: c.nice,
        total,
        systime: raw.sampled_at,
    }
}

fn secs_to_duration(what: &str, secs: f64) -> Result<Duration, CollectError> {
    Duration::try_from_secs_f64(secs).map_err(|e| CollectError::Malformed {
        what: what.to_string(),
        reason: format!("{}: {}", secs, e),
    })
}

/// Converts a `statvfs` answer into bytes and checks its consistency.
fn filesystem_from_raw(raw: RawMount) -> Result<FilesystemStats, CollectError> {
    let s = raw.stat;
    let malformed = |reason: String| CollectError::Malformed {
        what: format!("filesystem {}", raw.mount_point),
        reason,
    };

    if s.blocks_free > s.blocks || s.blocks_available > s.blocks_free {
        return Err(malformed(format!(
            "blocks total {} free {} available {}",
            s.blocks, s.blocks_free, s.blocks_available
        )));
    }
    if s.files_free > s.files || s.files_available > s.files_free {
        return Err(malformed(format!(
            "inodes total {} free {} available {}",
            s.files, s.files_free, s.files_available
        )));
    }

    // Block counts are in fragment units; old kernels leave f_frsize zero.
    let unit = if s.fragment_size > 0 {
        s.fragment_size
    } else {
        s.block_size
    };
    let used_blocks = s.blocks - s.blocks_free;

    let stats = FilesystemStats {
        device_name: raw.device,
        fs_type: raw.fs_type,
        mnt_point: raw.mount_point,
        size: s.blocks.saturating_mul(unit),
        used: used_blocks.saturating_mul(unit),
        avail: s.blocks_available.saturating_mul(unit),
        total_inodes: s.files,
        used_inodes: s.files - s.files_free,
        free_inodes: s.files_free,
        avail_inodes: s.files_available,
        io_size: s.block_size,
        block_size: unit,
        total_blocks: s.blocks,
        free_blocks: s.blocks_free,
        used_blocks,
        avail_blocks: s.blocks_available,
    };
    stats.validate()?;
    Ok(stats)
}
