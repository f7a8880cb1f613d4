//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for testing various system conditions.

use super::filesystem::MockFs;
use crate::collector::traits::StatVfs;

const ROOT_STAT: &str = "1 (systemd) S 0 1 1 0 -1 4194560 50000 100000 100 200 500 300 1000 500 20 0 1 0 1 170000000 3000 18446744073709551615 1 1 0 0 0 0 671173123 4096 1260 0 0 0 17 0 0 0 0 0 0";
const ROOT_STATUS: &str = "Name:\tsystemd\nState:\tS (sleeping)\nPid:\t1\nPPid:\t0\nUid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\n";

impl MockFs {
    /// Creates a typical system with a few processes.
    ///
    /// Includes: init (PID 1), a bash shell (PID 1000) and a CPU-bound
    /// child (PID 1001); two real filesystems among pseudo mounts.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
Dirty:              1024 kB
Writeback:             0 kB
Slab:             512000 kB
SReclaimable:     256000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        fs.add_file(
            "/proc/diskstats",
            "\
   7       0 loop0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
",
        );

        fs.add_file(
            "/proc/mounts",
            "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/sda1 / ext4 rw,relatime 0 0
tmpfs /run tmpfs rw,nosuid,nodev,size=1638400k,mode=755 0 0
/dev/nvme0n1p1 /home xfs rw,relatime 0 0
",
        );
        fs.add_statvfs(
            "/",
            StatVfs {
                block_size: 4096,
                fragment_size: 4096,
                blocks: 25_000_000,
                blocks_free: 10_000_000,
                blocks_available: 8_750_000,
                files: 6_553_600,
                files_free: 6_000_000,
                files_available: 6_000_000,
            },
        );
        fs.add_statvfs(
            "/home",
            StatVfs {
                block_size: 4096,
                fragment_size: 4096,
                blocks: 50_000_000,
                blocks_free: 40_000_000,
                blocks_available: 40_000_000,
                files: 25_000_000,
                files_free: 24_900_000,
                files_available: 24_900_000,
            },
        );

        fs.add_file("/proc/sys/kernel/ostype", "Linux\n");
        fs.add_file("/proc/sys/kernel/osrelease", "6.8.0-45-generic\n");
        fs.add_file(
            "/proc/sys/kernel/version",
            "#45-Ubuntu SMP PREEMPT_DYNAMIC Fri Aug 30 12:02:04 UTC 2024\n",
        );
        fs.add_file("/proc/sys/kernel/hostname", "testhost\n");
        fs.add_file("/proc/sys/kernel/arch", "x86_64\n");

        fs.add_process(1, ROOT_STAT, ROOT_STATUS, "/sbin/init\0splash\0");

        // Interactive shell: 200 ticks of CPU, started 1000s after boot.
        fs.add_process(
            1000,
            "1000 (bash) S 1 1000 1000 34816 1000 4194304 2000 10000 5 20 150 50 10 5 20 0 1 0 100000 25000000 1500 18446744073709551615 1 1 0 0 0 0 65536 3686404 1266761467 0 0 0 17 2 0 0 0 0 0",
            "Name:\tbash\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n",
            "-bash\0",
        );

        // Busy niced child: 50s of CPU over the 1000s it has been alive.
        fs.add_process(
            1001,
            "1001 (stress) R 1000 1001 1000 34816 1001 4194304 100 0 0 0 4000 1000 0 0 25 5 1 0 1134567 8000000 500 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0",
            "Name:\tstress\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n",
            "stress\0--cpu\01\0",
        );

        fs
    }

    /// Creates a system under memory pressure.
    ///
    /// Low free memory, swap in use.
    pub fn memory_pressure() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:          256000 kB
MemAvailable:     512000 kB
Buffers:           32000 kB
Cached:           128000 kB
SwapTotal:       4096000 kB
SwapFree:        1024000 kB
",
        );
        fs
    }

    /// Creates a system with processes having special characters in names.
    pub fn with_special_names() -> Self {
        let mut fs = Self::new();
        fs.add_file("/proc/uptime", "500.00 1000.00\n");

        fs.add_process(
            5000,
            "5000 (Web Content) S 1 5000 5000 0 -1 4194304 100 0 0 0 10 5 0 0 20 0 25 0 1000 500000000 50000 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0",
            "Name:\tWeb Content\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n",
            "/usr/lib/firefox/firefox\0-contentproc\0",
        );
        fs.add_process(
            5001,
            "5001 ((sd-pam)) S 5000 5000 5000 0 -1 1077936448 30 0 0 0 0 0 0 0 20 0 1 0 1100 104857600 1024 18446744073709551615 1 1 0 0 0 0 0 4096 0 0 0 0 17 0 0 0 0 0 0",
            "Name:\t(sd-pam)\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n",
            "(sd-pam)\0",
        );
        fs
    }

    /// Creates a system with a zombie process.
    pub fn with_zombie_process() -> Self {
        let mut fs = Self::new();
        fs.add_file("/proc/uptime", "500.00 1000.00\n");

        fs.add_process(1, ROOT_STAT, ROOT_STATUS, "/sbin/init\0");
        fs.add_process(
            4000,
            "4000 (defunct) Z 1 4000 4000 0 -1 4227084 0 0 0 0 2 1 0 0 20 0 1 0 2000 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0",
            "Name:\tdefunct\nState:\tZ (zombie)\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n",
            "",
        );
        fs
    }
}
