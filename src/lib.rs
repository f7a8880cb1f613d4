//! hoststat - host telemetry collection library.
//!
//! Provides:
//! - `collector` - platform probe over `/proc`, scale factors and the
//!   `Collector` that assembles snapshot records
//! - `models` - serializable snapshot records
//! - `rates` - baseline tracking for CPU and disk counters
//! - `report` - one-shot JSON-lines report used by the `hoststat` binary
//! - `error` - `CollectError`, shared by every operation

pub mod collector;
pub mod error;
pub mod models;
pub mod rates;
pub mod report;

pub use collector::{Collector, LiveCollector};
pub use error::CollectError;
