//! Scriptable probe for collector and report tests.
//!
//! `StubProbe` answers each probe operation from a table that tests can
//! rewrite between calls. A family left as `None` fails with
//! `CollectError::Unsupported`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::collector::probe::{
    Probe, RawCpuTicks, RawHost, RawMemory, RawMount, RawProcess, RawProcessTable, RawSwap,
};
use crate::collector::procfs::parser::{CpuStat, ProcStat, ProcStatus};
use crate::collector::traits::StatVfs;
use crate::error::CollectError;
use crate::models::DiskIoCounters;

/// Canned answers, one slot per probe operation.
#[derive(Debug, Clone, Default)]
pub struct StubData {
    pub cpu: Option<RawCpuTicks>,
    pub disks: Option<Vec<DiskIoCounters>>,
    pub memory: Option<RawMemory>,
    pub swap: Option<RawSwap>,
    pub filesystems: Option<Vec<RawMount>>,
    pub host: Option<RawHost>,
    pub processes: Option<RawProcessTable>,
}

/// Probe serving [`StubData`].
#[derive(Debug, Default)]
pub struct StubProbe {
    data: Mutex<StubData>,
    closed: AtomicUsize,
}

/// Fixed sample time used by [`StubProbe::healthy`].
pub fn stub_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

fn stub_process(pid: u32, comm: &str, state: char, utime: u64, starttime: u64) -> RawProcess {
    RawProcess {
        stat: ProcStat {
            pid,
            comm: comm.to_string(),
            state,
            ppid: 1,
            pgrp: pid as i32,
            utime,
            stime: 0,
            nice: 0,
            starttime,
            vsize: 1 << 20,
            rss: 64,
        },
        status: ProcStatus {
            uid: 1000,
            euid: 1000,
            gid: 1000,
            egid: 1000,
        },
        cmdline: comm.to_string(),
    }
}

impl StubProbe {
    /// Probe answering every family with small, consistent data.
    pub fn healthy() -> Self {
        let data = StubData {
            cpu: Some(RawCpuTicks {
                counters: CpuStat {
                    user: 400,
                    nice: 0,
                    system: 100,
                    idle: 500,
                    ..Default::default()
                },
                sampled_at: stub_epoch(),
            }),
            disks: Some(vec![DiskIoCounters {
                disk_name: "sda".to_string(),
                read_bytes: 1000,
                write_bytes: 0,
                systime: stub_epoch(),
            }]),
            memory: Some(RawMemory {
                total_kib: 1024,
                free_kib: 256,
                cached_kib: 128,
            }),
            swap: Some(RawSwap {
                total_kib: 512,
                free_kib: 512,
            }),
            filesystems: Some(vec![RawMount {
                device: "/dev/sda1".to_string(),
                fs_type: "ext4".to_string(),
                mount_point: "/".to_string(),
                stat: StatVfs {
                    block_size: 4096,
                    fragment_size: 4096,
                    blocks: 1000,
                    blocks_free: 400,
                    blocks_available: 350,
                    files: 100,
                    files_free: 60,
                    files_available: 60,
                },
            }]),
            host: Some(RawHost {
                os_name: "Linux".to_string(),
                os_release: "6.8.0".to_string(),
                os_version: "#1 SMP".to_string(),
                platform: "x86_64".to_string(),
                hostname: "stub".to_string(),
                uptime_secs: 100.0,
            }),
            processes: Some(RawProcessTable {
                uptime_secs: 100.0,
                processes: vec![
                    stub_process(1, "init", 'S', 100, 0),
                    stub_process(42, "worker", 'R', 1000, 5000),
                    stub_process(43, "reaped", 'Z', 0, 6000),
                ],
            }),
        };
        Self::with_data(data)
    }

    /// Probe failing every family.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_data(data: StubData) -> Self {
        Self {
            data: Mutex::new(data),
            closed: AtomicUsize::new(0),
        }
    }

    /// Rewrites the canned answers in place.
    pub fn update(&self, f: impl FnOnce(&mut StubData)) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *data);
    }

    /// Number of times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(
        &self,
        metric: &'static str,
        pick: impl FnOnce(&StubData) -> &Option<T>,
    ) -> Result<T, CollectError> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        pick(&*data)
            .clone()
            .ok_or(CollectError::Unsupported { metric })
    }
}

impl Probe for StubProbe {
    fn cpu_ticks(&self) -> Result<RawCpuTicks, CollectError> {
        self.answer("cpu ticks", |d| &d.cpu)
    }

    fn disk_io(&self) -> Result<Vec<DiskIoCounters>, CollectError> {
        self.answer("disk io", |d| &d.disks)
    }

    fn memory(&self) -> Result<RawMemory, CollectError> {
        self.answer("memory", |d| &d.memory)
    }

    fn swap(&self) -> Result<RawSwap, CollectError> {
        self.answer("swap", |d| &d.swap)
    }

    fn filesystems(&self) -> Result<Vec<RawMount>, CollectError> {
        self.answer("filesystems", |d| &d.filesystems)
    }

    fn host(&self) -> Result<RawHost, CollectError> {
        self.answer("host info", |d| &d.host)
    }

    fn processes(&self) -> Result<RawProcessTable, CollectError> {
        self.answer("processes", |d| &d.processes)
    }

    fn close(&self) -> Result<(), CollectError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
