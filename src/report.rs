//! One-shot JSON-lines report over every collection operation.
//!
//! Each operation runs once, in [`Metric::REPORT_ORDER`]. A success becomes
//! one line on the output sink:
//!
//! ```text
//! {"metric":"memory_stats","data":{"total":...,"free":...,"used":...,"cache":...}}
//! ```
//!
//! A failure becomes one line on the error sink:
//!
//! ```text
//! {"metric":"memory_stats","error":"permission denied reading ...","errno":13}
//! ```
//!
//! Failures never stop the remaining operations. Both sinks are flushed
//! before [`run_report`] returns.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;
use tracing::debug;

use crate::collector::{Collector, Probe};
use crate::error::CollectError;
use crate::models::{
    CpuPercents, DiskIoCounters, FilesystemStats, HostInfo, MemoryStats, ProcessCount,
    ProcessRecord, SwapStats,
};

/// Exit status when at least one operation succeeded.
pub const EXIT_OK: u8 = 0;
/// Exit status when every operation failed.
pub const EXIT_ALL_FAILED: u8 = 1;
/// Exit status when the collector could not be set up.
pub const EXIT_INIT_FAILED: u8 = 2;

/// Operations included in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CpuPercents,
    DiskIoStats,
    MemoryStats,
    SwapStats,
    FilesystemStats,
    HostInfo,
    ProcessStats,
    ProcessCount,
}

impl Metric {
    pub const REPORT_ORDER: [Metric; 8] = [
        Metric::CpuPercents,
        Metric::DiskIoStats,
        Metric::MemoryStats,
        Metric::SwapStats,
        Metric::FilesystemStats,
        Metric::HostInfo,
        Metric::ProcessStats,
        Metric::ProcessCount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::CpuPercents => "cpu_percents",
            Metric::DiskIoStats => "disk_io_stats",
            Metric::MemoryStats => "memory_stats",
            Metric::SwapStats => "swap_stats",
            Metric::FilesystemStats => "filesystem_stats",
            Metric::HostInfo => "host_info",
            Metric::ProcessStats => "process_stats",
            Metric::ProcessCount => "process_count",
        }
    }

    /// Runs the matching collector operation.
    pub fn collect<P: Probe>(self, collector: &Collector<P>) -> Result<Record, CollectError> {
        match self {
            Metric::CpuPercents => collector.cpu_percents().map(Record::CpuPercents),
            Metric::DiskIoStats => collector.disk_io_stats().map(Record::DiskIoStats),
            Metric::MemoryStats => collector.memory_stats().map(Record::MemoryStats),
            Metric::SwapStats => collector.swap_stats().map(Record::SwapStats),
            Metric::FilesystemStats => collector.filesystem_stats().map(Record::FilesystemStats),
            Metric::HostInfo => collector.host_info().map(Record::HostInfo),
            Metric::ProcessStats => collector.process_stats().map(Record::ProcessStats),
            Metric::ProcessCount => collector.process_count().map(Record::ProcessCount),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A successful result, tagged with the metric it answers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "metric", content = "data", rename_all = "snake_case")]
pub enum Record {
    CpuPercents(CpuPercents),
    DiskIoStats(Vec<DiskIoCounters>),
    MemoryStats(MemoryStats),
    SwapStats(SwapStats),
    FilesystemStats(Vec<FilesystemStats>),
    HostInfo(HostInfo),
    ProcessStats(Vec<ProcessRecord>),
    ProcessCount(ProcessCount),
}

/// A failed operation as written to the error sink.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorLine {
    pub metric: Metric,
    pub error: String,
    pub errno: Option<i32>,
}

impl ErrorLine {
    pub fn new(metric: Metric, err: &CollectError) -> Self {
        Self {
            metric,
            error: err.to_string(),
            errno: err.errno(),
        }
    }
}

/// Outcome counts of one report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl ReportSummary {
    /// Partial failure still exits 0; only total failure does not.
    pub fn exit_code(&self) -> u8 {
        if self.succeeded > 0 {
            EXIT_OK
        } else {
            EXIT_ALL_FAILED
        }
    }
}

/// Writes report lines to two independent sinks.
///
/// A write error on one sink does not stop writing to the other. The first
/// error is kept and returned by [`Reporter::finish`].
pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
    summary: ReportSummary,
    io_error: Option<io::Error>,
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            summary: ReportSummary::default(),
            io_error: None,
        }
    }

    /// Writes one line for `result` to the matching sink.
    pub fn record(&mut self, metric: Metric, result: Result<Record, CollectError>) {
        let written = match result {
            Ok(record) => {
                self.summary.succeeded += 1;
                write_line(&mut self.out, &record)
            }
            Err(e) => {
                debug!("{} failed: {}", metric, e);
                self.summary.failed += 1;
                write_line(&mut self.err, &ErrorLine::new(metric, &e))
            }
        };
        if let Err(e) = written {
            debug!("writing {} line failed: {}", metric, e);
            self.io_error.get_or_insert(e);
        }
    }

    /// Flushes both sinks, then returns the counts or the first write error.
    pub fn finish(mut self) -> io::Result<ReportSummary> {
        let out = self.out.flush();
        let err = self.err.flush();
        if let Some(e) = self.io_error {
            return Err(e);
        }
        out?;
        err?;
        Ok(self.summary)
    }
}

fn write_line<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *w, value)?;
    w.write_all(b"\n")
}

/// Runs every operation once and reports each result.
pub fn run_report<P: Probe, O: Write, E: Write>(
    collector: &Collector<P>,
    out: O,
    err: E,
) -> io::Result<ReportSummary> {
    let mut reporter = Reporter::new(out, err);
    for metric in Metric::REPORT_ORDER {
        reporter.record(metric, metric.collect(collector));
    }
    let summary = reporter.finish()?;
    debug!(
        "report done: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    Ok(summary)
}

#[derive(Serialize)]
struct FatalLine<'a> {
    stage: &'a str,
    error: String,
    errno: Option<i32>,
}

/// Reports a set-up failure; no operation has run.
pub fn write_fatal<E: Write>(mut err: E, error: &CollectError) -> io::Result<()> {
    let line = FatalLine {
        stage: "init",
        error: error.to_string(),
        errno: error.errno(),
    };
    write_line(&mut err, &line)?;
    err.flush()
}
