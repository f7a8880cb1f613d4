//! Process collector for gathering per-process metrics from `/proc/[pid]/`.

use std::io;
use std::path::Path;

use tracing::debug;

use crate::collector::probe::RawProcess;
use crate::collector::procfs::parser::{parse_cmdline, parse_proc_stat, parse_proc_status};
use crate::collector::traits::FileSystem;
use crate::error::CollectError;

/// Collects process information from `/proc/[pid]/` files.
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
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

    fn read(&self, pid: u32, name: &str) -> Result<String, CollectError> {
        let path = format!("{}/{}/{}", self.proc_path, pid, name);
        self.fs
            .read_to_string(Path::new(&path))
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => CollectError::ProcessGone(pid),
                _ => CollectError::io(&path, e),
            })
    }

    /// Collects information about a single process.
    pub fn collect_process(&self, pid: u32) -> Result<RawProcess, CollectError> {
        let stat = parse_proc_stat(&self.read(pid, "stat")?)?;
        let status = parse_proc_status(&self.read(pid, "status")?)?;

        // Empty for kernel threads and zombies.
        let cmdline = parse_cmdline(&self.read(pid, "cmdline")?);

        Ok(RawProcess {
            stat,
            status,
            cmdline,
        })
    }

    /// Collects information about all processes.
    ///
    /// Processes that disappear or cannot be read are skipped. If there were
    /// processes to read and none succeeded, the first failure is returned.
    pub fn collect_all_processes(&self) -> Result<Vec<RawProcess>, CollectError> {
        let proc_path = Path::new(&self.proc_path);
        let entries = self
            .fs
            .read_dir(proc_path)
            .map_err(|e| CollectError::io(proc_path, e))?;

        let mut processes = Vec::new();
        let mut first_error = None;

        for entry in entries {
            // Only numeric directory names are PIDs
            let Some(pid) = entry
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };

            match self.collect_process(pid) {
                Ok(info) => processes.push(info),
                Err(e) => {
                    if e.is_transient() {
                        debug!("process {} vanished during collection", pid);
                    } else {
                        debug!("skipping process {}: {}", pid, e);
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(err) if processes.is_empty() => Err(err),
            _ => Ok(processes),
        }
    }
}
