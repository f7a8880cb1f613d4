//! System collector for gathering global system metrics from `/proc/`.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use chrono::Utc;
use tracing::debug;

use crate::collector::probe::{RawCpuTicks, RawHost, RawMemory, RawMount, RawSwap};
use crate::collector::procfs::parser::{
    parse_cpu_stat, parse_diskstats, parse_meminfo, parse_mounts, parse_uptime,
};
use crate::collector::traits::FileSystem;
use crate::error::CollectError;
use crate::models::DiskIoCounters;

/// `/proc/diskstats` counts in 512-byte sectors regardless of the device.
const SECTOR_SIZE: u64 = 512;

/// Filesystem types backed by a block device or a network share.
///
/// Pseudo filesystems (proc, sysfs, cgroup, tmpfs, ...) carry no capacity
/// worth reporting and are skipped.
const REPORTED_FS_TYPES: &[&str] = &[
    "adfs", "affs", "befs", "bfs", "btrfs", "cifs", "efs", "exfat", "ext2", "ext3", "ext4",
    "f2fs", "fuseblk", "hfs", "hfsplus", "hpfs", "jffs2", "jfs", "minix", "msdos", "nfs", "nfs4",
    "ntfs", "ntfs3", "qnx4", "reiserfs", "smbfs", "sysv", "udf", "ufs", "vfat", "vxfs", "xfs",
    "zfs",
];

/// Collects system-wide metrics from `/proc/`.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn read(&self, name: &str) -> Result<String, CollectError> {
        let path = format!("{}/{}", self.proc_path, name);
        self.fs
            .read_to_string(Path::new(&path))
            .map_err(|e| CollectError::io(&path, e))
    }

    /// Collects aggregate CPU ticks from `/proc/stat`.
    pub fn collect_cpu(&self) -> Result<RawCpuTicks, CollectError> {
        let content = self.read("stat")?;
        let counters = parse_cpu_stat(&content)?;
        Ok(RawCpuTicks {
            counters,
            sampled_at: Utc::now(),
        })
    }

    /// Collects disk I/O counters from `/proc/diskstats`.
    ///
    /// Devices that never transferred anything (unused loop and ram devices)
    /// are left out.
    pub fn collect_diskstats(&self) -> Result<Vec<DiskIoCounters>, CollectError> {
        let content = self.read("diskstats")?;
        let disks = parse_diskstats(&content)?;
        let sampled_at = Utc::now();

        Ok(disks
            .into_iter()
            .filter(|disk| disk.read_sectors > 0 || disk.write_sectors > 0)
            .map(|disk| DiskIoCounters {
                disk_name: disk.device,
                read_bytes: disk.read_sectors.saturating_mul(SECTOR_SIZE),
                write_bytes: disk.write_sectors.saturating_mul(SECTOR_SIZE),
                systime: sampled_at,
            })
            .collect())
    }

    /// Collects memory figures from `/proc/meminfo`.
    pub fn collect_meminfo(&self) -> Result<RawMemory, CollectError> {
        let content = self.read("meminfo")?;
        let info = parse_meminfo(&content)?;

        Ok(RawMemory {
            total_kib: info.require("MemTotal")?,
            free_kib: info.require("MemFree")?,
            cached_kib: info.get_or_zero("Cached"),
        })
    }

    /// Collects swap figures from `/proc/meminfo`.
    pub fn collect_swap(&self) -> Result<RawSwap, CollectError> {
        let content = self.read("meminfo")?;
        let info = parse_meminfo(&content)?;

        Ok(RawSwap {
            total_kib: info.require("SwapTotal")?,
            free_kib: info.require("SwapFree")?,
        })
    }

    /// Reads seconds since boot from `/proc/uptime`.
    pub fn collect_uptime(&self) -> Result<f64, CollectError> {
        let content = self.read("uptime")?;
        Ok(parse_uptime(&content)?)
    }

    /// Collects mounted filesystems from `/proc/mounts` with their capacity.
    ///
    /// A mount whose `statvfs` fails is skipped. When every candidate fails,
    /// the first failure is returned.
    pub fn collect_mounts(&self) -> Result<Vec<RawMount>, CollectError> {
        let content = self.read("mounts")?;

        // A later mount on the same point hides the earlier one.
        let mut by_point: HashMap<String, usize> = HashMap::new();
        let mut candidates = Vec::new();
        for entry in parse_mounts(&content)
            .into_iter()
            .filter(|m| REPORTED_FS_TYPES.contains(&m.fs_type.as_str()))
        {
            if let Some(&idx) = by_point.get(&entry.mount_point) {
                candidates[idx] = entry;
            } else {
                by_point.insert(entry.mount_point.clone(), candidates.len());
                candidates.push(entry);
            }
        }

        let mut mounts = Vec::with_capacity(candidates.len());
        let mut first_error = None;
        for entry in candidates {
            match self.fs.statvfs(Path::new(&entry.mount_point)) {
                Ok(stat) => mounts.push(RawMount {
                    device: entry.device,
                    fs_type: entry.fs_type,
                    mount_point: entry.mount_point,
                    stat,
                }),
                Err(e) => {
                    debug!("skipping filesystem {}: {}", entry.mount_point, e);
                    first_error.get_or_insert(CollectError::io(&entry.mount_point, e));
                }
            }
        }

        match first_error {
            Some(err) if mounts.is_empty() => Err(err),
            _ => Ok(mounts),
        }
    }

    /// Collects host identity from `/proc/sys/kernel/` and `/proc/uptime`.
    pub fn collect_host(&self) -> Result<RawHost, CollectError> {
        let kernel = |key: &str| -> Result<String, CollectError> {
            Ok(self.read(&format!("sys/kernel/{}", key))?.trim().to_string())
        };

        // `arch` appeared in Linux 6.1; older kernels only tell us through uname.
        let platform = match kernel("arch") {
            Err(CollectError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                std::env::consts::ARCH.to_string()
            }
            other => other?,
        };

        Ok(RawHost {
            os_name: kernel("ostype")?,
            os_release: kernel("osrelease")?,
            os_version: kernel("version")?,
            platform,
            hostname: kernel("hostname")?,
            uptime_secs: self.collect_uptime()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::traits::StatVfs;

    #[test]
    fn test_collect_cpu() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let cpu = collector.collect_cpu().unwrap();
        assert_eq!(cpu.counters.user, 10000);
        assert_eq!(cpu.counters.idle, 80000);
        assert_eq!(cpu.counters.steal, 0);
    }

    #[test]
    fn test_collect_cpu_missing_file() {
        let collector = SystemCollector::new(MockFs::new(), "/proc");
        let err = collector.collect_cpu().unwrap_err();
        assert!(matches!(err, CollectError::Io { .. }));
        assert!(err.to_string().contains("/proc/stat"));
    }

    #[test]
    fn test_collect_diskstats() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let disks = collector.collect_diskstats().unwrap();

        // loop0 never transferred anything
        let names: Vec<&str> = disks.iter().map(|d| d.disk_name.as_str()).collect();
        assert_eq!(names, vec!["sda", "sda1", "nvme0n1"]);
        assert_eq!(disks[0].read_bytes, 987654 * 512);
        assert_eq!(disks[0].write_bytes, 456789 * 512);
    }

    #[test]
    fn test_collect_meminfo() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let mem = collector.collect_meminfo().unwrap();
        assert_eq!(mem.total_kib, 16384000);
        assert_eq!(mem.free_kib, 8192000);
        assert_eq!(mem.cached_kib, 2048000);
    }

    #[test]
    fn test_collect_meminfo_partial_fails() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal:       16384000 kB\n");
        let collector = SystemCollector::new(fs, "/proc");

        let err = collector.collect_meminfo().unwrap_err();
        assert!(matches!(err, CollectError::Parse(_)));
    }

    #[test]
    fn test_collect_swap() {
        let fs = MockFs::memory_pressure();
        let collector = SystemCollector::new(fs, "/proc");

        let swap = collector.collect_swap().unwrap();
        assert_eq!(swap.total_kib, 4096000);
        assert_eq!(swap.free_kib, 1024000);
    }

    #[test]
    fn test_collect_mounts_filters_pseudo_filesystems() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let mounts = collector.collect_mounts().unwrap();
        let points: Vec<&str> = mounts.iter().map(|m| m.mount_point.as_str()).collect();
        assert_eq!(points, vec!["/", "/home"]);
        assert_eq!(mounts[0].device, "/dev/sda1");
        assert_eq!(mounts[0].fs_type, "ext4");
        assert_eq!(mounts[0].stat.fragment_size, 4096);
    }

    #[test]
    fn test_collect_mounts_skips_failed_statvfs() {
        let mut fs = MockFs::typical_system();
        fs.deny("/home");
        let collector = SystemCollector::new(fs, "/proc");

        let mounts = collector.collect_mounts().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_point, "/");
    }

    #[test]
    fn test_collect_mounts_all_failed() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/mounts", "/dev/sdb1 /data xfs rw 0 0\n");
        fs.deny("/data");
        let collector = SystemCollector::new(fs, "/proc");

        let err = collector.collect_mounts().unwrap_err();
        assert!(matches!(err, CollectError::PermissionDenied { .. }));
    }

    #[test]
    fn test_collect_mounts_overmount_keeps_last() {
        let mut fs = MockFs::new();
        fs.add_file(
            "/proc/mounts",
            "/dev/sdb1 /data xfs rw 0 0\n/dev/sdc1 /data ext4 rw 0 0\n",
        );
        fs.add_statvfs(
            "/data",
            StatVfs {
                fragment_size: 1024,
                ..Default::default()
            },
        );
        let collector = SystemCollector::new(fs, "/proc");

        let mounts = collector.collect_mounts().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].device, "/dev/sdc1");
    }

    #[test]
    fn test_collect_mounts_none_is_empty() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/mounts", "proc /proc proc rw 0 0\n");
        let collector = SystemCollector::new(fs, "/proc");

        assert!(collector.collect_mounts().unwrap().is_empty());
    }

    #[test]
    fn test_collect_host() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let host = collector.collect_host().unwrap();
        assert_eq!(host.os_name, "Linux");
        assert_eq!(host.os_release, "6.8.0-45-generic");
        assert_eq!(host.platform, "x86_64");
        assert_eq!(host.hostname, "testhost");
        assert!((host.uptime_secs - 12345.67).abs() < 1e-9);
    }

    #[test]
    fn test_collect_host_without_arch_file() {
        let mut fs = MockFs::typical_system();
        fs.remove_file("/proc/sys/kernel/arch");
        let collector = SystemCollector::new(fs, "/proc");

        let host = collector.collect_host().unwrap();
        assert_eq!(host.platform, std::env::consts::ARCH);
    }

    #[test]
    fn test_collect_host_denied_arch_file() {
        let mut fs = MockFs::typical_system();
        fs.deny("/proc/sys/kernel/arch");
        let collector = SystemCollector::new(fs, "/proc");

        let err = collector.collect_host().unwrap_err();
        assert!(matches!(err, CollectError::PermissionDenied { .. }));
    }

    #[test]
    fn test_collect_diskstats_invalid_counter() {
        let mut fs = MockFs::typical_system();
        fs.add_file(
            "/proc/diskstats",
            "   8       0 sda 100 0 ZZZ 0 50 0 4000 0 0 0 0 0 0 0 0\n",
        );
        let collector = SystemCollector::new(fs, "/proc");

        let err = collector.collect_diskstats().unwrap_err();
        assert!(matches!(err, CollectError::Parse(_)));
    }
}
