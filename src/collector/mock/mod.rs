//! Mock implementations for testing.
//!
//! This module provides `MockFs` with pre-built `/proc` scenarios for
//! exercising the procfs probe, and `StubProbe` for driving the collector
//! and report layers without any filesystem at all.

mod filesystem;
mod probe;
mod scenarios;

pub use filesystem::MockFs;
pub use probe::{StubData, StubProbe, stub_epoch};
