//! Public data model: immutable snapshot records produced by the collector.

mod process;
mod system;

pub use process::{ProcessCount, ProcessRecord, ProcessState};
pub use system::{
    CpuPercents, CpuTicks, DiskIoCounters, DiskIoRates, FilesystemStats, HostInfo, MemoryStats,
    SwapStats,
};

/// Serializes a `Duration` as fractional seconds.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
