//! Host metrics collector.
//!
//! This module reads system and process metrics from the Linux `/proc`
//! filesystem and assembles them into the records of [`crate::models`],
//! with mock filesystems and stub probes for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Collector                           │
//! │   ScaleFactors (page size, ticks/s)     RateTracker         │
//! │                            │                                │
//! │                     ┌──────▼──────┐                         │
//! │                     │    Probe    │ (trait)                 │
//! │                     └──────┬──────┘                         │
//! └────────────────────────────┼────────────────────────────────┘
//!              ┌───────────────┴───────────────┐
//!       ┌──────▼──────┐                 ┌──────▼──────┐
//!       │ ProcfsProbe │                 │  StubProbe  │
//!       └──────┬──────┘                 │ (Testing)   │
//!              │                        └─────────────┘
//!  ┌───────────┴─────────────────────────────────┐
//!  │  ProcessCollector      SystemCollector      │
//!  │  - /proc/[pid]/*       - /proc/stat         │
//!  │                        - /proc/meminfo      │
//!  │                        - /proc/diskstats    │
//!  │                        - /proc/mounts       │
//!  └──────────────────────┬──────────────────────┘
//!                  ┌──────▼──────┐
//!                  │  FileSystem │ (trait)
//!                  └──────┬──────┘
//!              ┌──────────┼───────────────┐
//!       ┌──────▼──────┐ ┌─▼───────────┐ ┌─▼───────────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use hoststat::collector::LiveCollector;
//!
//! let collector = LiveCollector::live("/proc")?;
//! let memory = collector.memory_stats()?;
//! collector.shutdown()?;
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use hoststat::collector::{Collector, MockFs, ProcfsProbe, ScaleFactors};
//!
//! let probe = ProcfsProbe::new(MockFs::typical_system(), "/proc");
//! let collector = Collector::init(probe, ScaleFactors::LINUX_DEFAULT);
//! assert_eq!(collector.process_count().unwrap().total, 3);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod platform;
pub mod probe;
pub mod procfs;
pub mod traits;

pub use collector::{Collector, LiveCollector};
pub use mock::{MockFs, StubProbe};
pub use platform::ScaleFactors;
pub use probe::{Probe, ProcfsProbe};
pub use traits::{FileSystem, RealFs};
