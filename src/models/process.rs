//! Per-process records and state tallies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::duration_secs;

/// Lifecycle state of a process.
///
/// `Unknown` is a valid state, not an error: it covers states the kernel
/// reports that do not map onto the other four (e.g. `X` dead).
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Running,
    Sleeping,
    Stopped,
    Zombie,
    #[default]
    Unknown,
}

impl ProcessState {
    /// Maps the state letter of `/proc/[pid]/stat`.
    pub fn from_stat_char(c: char) -> Self {
        match c {
            'R' => ProcessState::Running,
            // Interruptible, uninterruptible disk, idle kernel thread, paging.
            'S' | 'D' | 'I' | 'W' => ProcessState::Sleeping,
            'T' | 't' => ProcessState::Stopped,
            'Z' => ProcessState::Zombie,
            _ => ProcessState::Unknown,
        }
    }
}

/// One process, similar to a line of `ps(1)`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ProcessRecord {
    /// Command name.
    pub process_name: String,
    /// Full command line; process-controlled, empty for kernel threads.
    pub proctitle: String,
    pub pid: u32,
    pub parent: u32,
    /// Process group id.
    pub pgid: i32,
    pub uid: u32,
    pub euid: u32,
    pub gid: u32,
    pub egid: u32,
    /// Virtual size in bytes.
    pub proc_size: u64,
    /// Resident size in bytes.
    pub proc_resident: u64,
    /// CPU time consumed (user + system).
    #[serde(with = "duration_secs")]
    pub time_spent: Duration,
    /// Average CPU utilization over the process lifetime.
    pub cpu_percent: f32,
    pub nice: i32,
    pub state: ProcessState,
}

/// Number of processes in each state.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct ProcessCount {
    pub total: u32,
    pub running: u32,
    pub sleeping: u32,
    pub stopped: u32,
    pub zombie: u32,
    pub unknown: u32,
}

impl ProcessCount {
    /// Tallies states; `total` is always the sum of the per-state counts.
    pub fn from_states(states: impl IntoIterator<Item = ProcessState>) -> Self {
        let mut count = ProcessCount::default();
        for state in states {
            match state {
                ProcessState::Running => count.running += 1,
                ProcessState::Sleeping => count.sleeping += 1,
                ProcessState::Stopped => count.stopped += 1,
                ProcessState::Zombie => count.zombie += 1,
                ProcessState::Unknown => count.unknown += 1,
            }
            count.total += 1;
        }
        count
    }
}
