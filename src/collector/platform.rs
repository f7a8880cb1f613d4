//! Process-wide platform facts and privileges.
//!
//! Scale factors are resolved once at start-up and never change afterwards,
//! so they are passed around by value without synchronization.

use nix::unistd::{SysconfVar, getegid, geteuid, getgid, getuid, setegid, seteuid, sysconf};
use tracing::debug;

use crate::error::CollectError;

/// Unit conversions reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFactors {
    /// Bytes per memory page.
    pub page_size: u64,
    /// Clock ticks per second (`USER_HZ`).
    pub clock_ticks: u64,
}

impl ScaleFactors {
    /// Values of a typical x86_64 Linux host; used by tests.
    pub const LINUX_DEFAULT: ScaleFactors = ScaleFactors {
        page_size: 4096,
        clock_ticks: 100,
    };

    /// Queries the running system via `sysconf(3)`.
    pub fn detect() -> Result<Self, CollectError> {
        let scale = Self {
            page_size: sysconf_positive(SysconfVar::PAGE_SIZE, "_SC_PAGESIZE")?,
            clock_ticks: sysconf_positive(SysconfVar::CLK_TCK, "_SC_CLK_TCK")?,
        };
        debug!(
            "page size {} bytes, {} clock ticks/s",
            scale.page_size, scale.clock_ticks
        );
        Ok(scale)
    }

    /// Converts clock ticks to seconds.
    pub fn ticks_to_secs(&self, ticks: u64) -> f64 {
        ticks as f64 / self.clock_ticks as f64
    }
}

fn sysconf_positive(var: SysconfVar, name: &str) -> Result<u64, CollectError> {
    match sysconf(var) {
        Ok(Some(value)) if value > 0 => Ok(value as u64),
        Ok(_) => Err(CollectError::Init(format!("sysconf({}) is not available", name))),
        Err(e) => Err(CollectError::Init(format!("sysconf({}) failed: {}", name, e))),
    }
}

/// Drops elevated effective ids back to the real ids.
///
/// A set-id installation needs its privileges only while the probe is being
/// set up; everything after that runs as the invoking user.
pub fn drop_privileges() -> Result<(), CollectError> {
    let (gid, egid) = (getgid(), getegid());
    if gid != egid {
        setegid(gid).map_err(|source| CollectError::Sys {
            call: "setegid",
            source,
        })?;
        debug!("dropped effective gid {} to {}", egid, gid);
    }

    let (uid, euid) = (getuid(), geteuid());
    if uid != euid {
        seteuid(uid).map_err(|source| CollectError::Sys {
            call: "seteuid",
            source,
        })?;
        debug!("dropped effective uid {} to {}", euid, uid);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_scale_factors() {
        let scale = ScaleFactors::detect().unwrap();
        assert!(scale.page_size >= 4096);
        assert!(scale.page_size.is_power_of_two());
        assert!(scale.clock_ticks > 0);
    }

    #[test]
    fn test_ticks_to_secs() {
        assert!((ScaleFactors::LINUX_DEFAULT.ticks_to_secs(250) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_drop_privileges_without_setid_is_noop() {
        // Test binaries are not set-id: real and effective ids already match.
        assert!(drop_privileges().is_ok());
        assert_eq!(getuid(), geteuid());
        assert_eq!(getgid(), getegid());
    }
}
