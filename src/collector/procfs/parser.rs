//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parsed data from `/proc/[pid]/stat`.
#[derive(Debug, Clone, Default)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub pgrp: i32,
    pub utime: u64,
    pub stime: u64,
    pub nice: i32,
    /// Process start, in clock ticks after boot.
    pub starttime: u64,
    /// Virtual memory size in bytes.
    pub vsize: u64,
    /// Resident set size in pages.
    pub rss: i64,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let comm = content[open_paren + 1..close_paren].to_string();

    // Fields after the closing ')', starting with state.
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();

    if fields.len() < 22 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 22+, got {}",
            fields.len()
        )));
    }

    fn field<T: std::str::FromStr>(fields: &[&str], idx: usize, name: &str) -> Result<T, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    }

    Ok(ProcStat {
        pid,
        comm,
        state: fields[0].chars().next().unwrap_or('?'),
        ppid: field(&fields, 1, "ppid")?,
        pgrp: field(&fields, 2, "pgrp")?,
        utime: field(&fields, 11, "utime")?,
        stime: field(&fields, 12, "stime")?,
        nice: field(&fields, 16, "nice")?,
        starttime: field(&fields, 19, "starttime")?,
        vsize: field(&fields, 20, "vsize")?,
        rss: field(&fields, 21, "rss")?,
    })
}

/// Identity fields from `/proc/[pid]/status`.
#[derive(Debug, Clone, Default)]
pub struct ProcStatus {
    pub uid: u32,
    pub euid: u32,
    pub gid: u32,
    pub egid: u32,
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is key:\tvalue pairs, one per line. `Uid` and `Gid` are required.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }

    // Uid and Gid have format: real effective saved fs
    let id_pair = |key: &str| -> Result<(u32, u32), ParseError> {
        let line = fields
            .get(key)
            .ok_or_else(|| ParseError::new(format!("missing {} in status", key)))?;
        let mut parts = line.split_whitespace().map(str::parse::<u32>);
        match (parts.next(), parts.next()) {
            (Some(Ok(real)), Some(Ok(effective))) => Ok((real, effective)),
            _ => Err(ParseError::new(format!("invalid {} in status", key))),
        }
    };

    let (uid, euid) = id_pair("Uid")?;
    let (gid, egid) = id_pair("Gid")?;

    Ok(ProcStatus {
        uid,
        euid,
        gid,
        egid,
    })
}

/// Joins the NUL-separated arguments of `/proc/[pid]/cmdline` with spaces.
///
/// Kernel threads have an empty cmdline; the result is then empty.
pub fn parse_cmdline(content: &str) -> String {
    content
        .split('\0')
        .filter(|arg| !arg.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Key/value table from `/proc/meminfo`, values in kibibytes.
#[derive(Debug, Clone, Default)]
pub struct MemInfo {
    values: HashMap<String, u64>,
}

impl MemInfo {
    /// Returns the value for `key`, failing when the kernel did not report it.
    pub fn require(&self, key: &str) -> Result<u64, ParseError> {
        self.values
            .get(key)
            .copied()
            .ok_or_else(|| ParseError::new(format!("missing {} in meminfo", key)))
    }

    /// Returns the value for `key`, or 0 when absent.
    pub fn get_or_zero(&self, key: &str) -> u64 {
        self.values.get(key).copied().unwrap_or(0)
    }
}

/// Parses `/proc/meminfo` content.
///
/// Format: `Key:   value kB`, one per line.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut values = HashMap::new();

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| ParseError::new(format!("missing value for {}", key)))?
            .parse::<u64>()
            .map_err(|_| ParseError::new(format!("invalid value for {}", key)))?;
        values.insert(key.trim().to_string(), value);
    }

    if values.is_empty() {
        return Err(ParseError::new("empty meminfo"));
    }

    Ok(MemInfo { values })
}

/// Aggregate CPU counters from the `cpu` line of `/proc/stat`, in clock ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

/// Parses the aggregate `cpu` line from `/proc/stat` content.
///
/// Columns past `idle` were added in later kernels and default to 0.
pub fn parse_cpu_stat(content: &str) -> Result<CpuStat, ParseError> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| ParseError::new("missing cpu line in stat"))?;

    let values = line
        .split_whitespace()
        .skip(1)
        .map(|s| s.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ParseError::new("invalid cpu counter"))?;

    if values.len() < 4 {
        return Err(ParseError::new(format!(
            "not enough cpu columns: expected 4+, got {}",
            values.len()
        )));
    }

    let get_val = |idx: usize| -> u64 { values.get(idx).copied().unwrap_or(0) };

    Ok(CpuStat {
        user: get_val(0),
        nice: get_val(1),
        system: get_val(2),
        idle: get_val(3),
        iowait: get_val(4),
        irq: get_val(5),
        softirq: get_val(6),
        steal: get_val(7),
    })
}

/// Parsed data from `/proc/diskstats`.
#[derive(Debug, Clone, Default)]
pub struct DiskStats {
    /// Device name (sda, nvme0n1, etc.)
    pub device: String,
    /// Number of sectors read
    pub read_sectors: u64,
    /// Number of sectors written
    pub write_sectors: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged w_sectors w_time io_pending io_time w_io_time [discards ...]
pub fn parse_diskstats(content: &str) -> Result<Vec<DiskStats>, ParseError> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 14 {
            return Err(ParseError::new(format!(
                "not enough fields in diskstats: expected 14+, got {}",
                parts.len()
            )));
        }

        let device = parts[2];
        let sectors = |idx: usize, name: &str| -> Result<u64, ParseError> {
            parts[idx]
                .parse()
                .map_err(|_| ParseError::new(format!("invalid {} for {}", name, device)))
        };

        disks.push(DiskStats {
            device: device.to_string(),
            read_sectors: sectors(5, "read sectors")?,
            write_sectors: sectors(9, "write sectors")?,
        });
    }

    Ok(disks)
}

/// One line of `/proc/mounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
}

/// Parses `/proc/mounts` content.
///
/// Format: `device mount_point fs_type options dump pass`. Whitespace inside
/// paths is escaped as octal (`\040`).
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let device = parts.next()?;
            let mount_point = parts.next()?;
            let fs_type = parts.next()?;
            Some(MountEntry {
                device: unescape_octal(device),
                mount_point: unescape_octal(mount_point),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

fn unescape_octal(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push(code as u8);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parses `/proc/uptime` content into seconds since boot.
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?
        .parse()
        .map_err(|_| ParseError::new("invalid uptime"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASH_STAT: &str = "1234 (bash) S 1233 1234 1234 34816 1234 4194304 1000 5000 0 0 150 50 10 5 20 0 1 0 100000 25000000 1500 18446744073709551615 1 1 0 0 0 0 65536 3686404 1266761467 0 0 0 17 2 0 0 0 0 0";

    #[test]
    fn test_parse_proc_stat() {
        let stat = parse_proc_stat(BASH_STAT).unwrap();
        assert_eq!(stat.pid, 1234);
        assert_eq!(stat.comm, "bash");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1233);
        assert_eq!(stat.pgrp, 1234);
        assert_eq!(stat.utime, 150);
        assert_eq!(stat.stime, 50);
        assert_eq!(stat.nice, 0);
        assert_eq!(stat.starttime, 100000);
        assert_eq!(stat.vsize, 25000000);
        assert_eq!(stat.rss, 1500);
    }

    #[test]
    fn test_parse_proc_stat_comm_with_parens_and_spaces() {
        let content = "5000 (Web Content (x)) R 1 5000 5000 0 -1 0 0 0 0 0 7 3 0 0 20 -5 1 0 42 1024 2 0";
        let stat = parse_proc_stat(content).unwrap();
        assert_eq!(stat.comm, "Web Content (x)");
        assert_eq!(stat.state, 'R');
        assert_eq!(stat.nice, -5);
    }

    #[test]
    fn test_parse_proc_stat_truncated() {
        let err = parse_proc_stat("1 (init) S 0 1 1").unwrap_err();
        assert!(err.message.contains("not enough fields"));
    }

    #[test]
    fn test_parse_proc_status() {
        let content = "Name:\tbash\nUmask:\t0022\nState:\tS (sleeping)\nUid:\t1000\t1001\t1000\t1000\nGid:\t100\t101\t100\t100\n";
        let status = parse_proc_status(content).unwrap();
        assert_eq!(status.uid, 1000);
        assert_eq!(status.euid, 1001);
        assert_eq!(status.gid, 100);
        assert_eq!(status.egid, 101);
    }

    #[test]
    fn test_parse_proc_status_missing_uid() {
        let err = parse_proc_status("Name:\tbash\nGid:\t0\t0\t0\t0\n").unwrap_err();
        assert_eq!(err.message, "missing Uid in status");
    }

    #[test]
    fn test_parse_cmdline() {
        assert_eq!(parse_cmdline("/bin/bash\0--login\0"), "/bin/bash --login");
        assert_eq!(parse_cmdline(""), "");
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "MemTotal:       16384000 kB\nMemFree:         8192000 kB\nCached:          2048000 kB\nSwapCached:            0 kB\nHugePages_Total:       0\n";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.require("MemTotal").unwrap(), 16384000);
        assert_eq!(info.require("Cached").unwrap(), 2048000);
        assert_eq!(info.get_or_zero("HugePages_Total"), 0);
        assert!(info.require("SwapTotal").is_err());
    }

    #[test]
    fn test_parse_meminfo_empty() {
        assert!(parse_meminfo("").is_err());
    }

    #[test]
    fn test_parse_cpu_stat() {
        let content = "cpu  10000 500 3000 80000 1000 200 100 50 0 0\ncpu0 2500 125 750 20000 250 50 25 0 0 0\nctxt 500000\n";
        let cpu = parse_cpu_stat(content).unwrap();
        assert_eq!(
            cpu,
            CpuStat {
                user: 10000,
                nice: 500,
                system: 3000,
                idle: 80000,
                iowait: 1000,
                irq: 200,
                softirq: 100,
                steal: 50,
            }
        );
    }

    #[test]
    fn test_parse_cpu_stat_old_kernel() {
        let cpu = parse_cpu_stat("cpu 1 2 3 4\n").unwrap();
        assert_eq!(cpu.idle, 4);
        assert_eq!(cpu.iowait, 0);
        assert_eq!(cpu.steal, 0);
    }

    #[test]
    fn test_parse_cpu_stat_missing() {
        assert!(parse_cpu_stat("cpu0 1 2 3 4\nctxt 5\n").is_err());
        assert!(parse_cpu_stat("cpu 1 2\n").is_err());
    }

    #[test]
    fn test_parse_diskstats() {
        let content = "   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0\n\n   7       0 loop0 0 0 0 0 0 0 0 0 0 0 0\n";
        let disks = parse_diskstats(content).unwrap();
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].device, "sda");
        assert_eq!(disks[0].read_sectors, 987654);
        assert_eq!(disks[0].write_sectors, 456789);
        assert_eq!(disks[1].device, "loop0");
    }

    #[test]
    fn test_parse_diskstats_invalid_counter() {
        let content = "   8       0 sda 100 0 ZZZ 0 50 0 4000 0 0 0 0\n";
        let err = parse_diskstats(content).unwrap_err();
        assert_eq!(err.message, "invalid read sectors for sda");
    }

    #[test]
    fn test_parse_diskstats_truncated_line() {
        let content = "   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000\n   7       0 loop0 0 0 0\n";
        let err = parse_diskstats(content).unwrap_err();
        assert!(err.message.contains("not enough fields in diskstats"));
    }

    #[test]
    fn test_parse_mounts() {
        let content = "/dev/sda1 / ext4 rw,relatime 0 0\nproc /proc proc rw 0 0\n/dev/sdb1 /mnt/my\\040disk vfat rw 0 0\n";
        let mounts = parse_mounts(content);
        assert_eq!(mounts.len(), 3);
        assert_eq!(mounts[0].device, "/dev/sda1");
        assert_eq!(mounts[0].fs_type, "ext4");
        assert_eq!(mounts[2].mount_point, "/mnt/my disk");
    }

    #[test]
    fn test_parse_uptime() {
        assert!((parse_uptime("12345.67 98765.43\n").unwrap() - 12345.67).abs() < 1e-9);
        assert!(parse_uptime("").is_err());
    }
}
