//! Error taxonomy shared by every collection operation.
//!
//! Counter anomalies (resets, rollbacks) are not errors: the rate tracker
//! absorbs them and reports a zero delta instead.

use std::io;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use thiserror::Error;

use crate::collector::procfs::parser::ParseError;

/// Failure of a single collection operation.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The platform does not expose this metric.
    #[error("{metric} is not supported on this platform")]
    Unsupported { metric: &'static str },

    /// The caller lacks privilege to read the data.
    #[error("permission denied reading {}: {source}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Process disappeared between enumeration and detail read.
    #[error("process {0} disappeared")]
    ProcessGone(u32),

    /// Probe layer could not be set up; fatal for the whole process.
    #[error("initialization failed: {0}")]
    Init(String),

    /// A system call failed.
    #[error("{call} failed: {source}")]
    Sys {
        call: &'static str,
        #[source]
        source: Errno,
    },

    /// I/O error reading a probe source.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Probe source had unexpected content.
    #[error("parse error: {0}")]
    Parse(String),

    /// Raw values violate the record's invariants.
    #[error("malformed {what}: {reason}")]
    Malformed { what: String, reason: String },

    /// Operation attempted after `Collector::shutdown`.
    #[error("collector has been shut down")]
    Shutdown,
}

impl CollectError {
    /// Classifies an I/O error on `path`, separating permission failures.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::PermissionDenied {
            CollectError::PermissionDenied { path, source }
        } else {
            CollectError::Io { path, source }
        }
    }

    /// Underlying platform error code, where one exists.
    pub fn errno(&self) -> Option<i32> {
        match self {
            CollectError::PermissionDenied { source, .. } | CollectError::Io { source, .. } => {
                source.raw_os_error()
            }
            CollectError::Sys { source, .. } => Some(*source as i32),
            _ => None,
        }
    }

    /// True for failures that only concern one entity of an enumeration.
    pub fn is_transient(&self) -> bool {
        match self {
            CollectError::ProcessGone(_) => true,
            CollectError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<ParseError> for CollectError {
    fn from(e: ParseError) -> Self {
        CollectError::Parse(e.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_classified() {
        let err = CollectError::io(
            "/proc/1/status",
            io::Error::from_raw_os_error(Errno::EACCES as i32),
        );
        assert!(matches!(err, CollectError::PermissionDenied { .. }));
        assert_eq!(err.errno(), Some(Errno::EACCES as i32));
        assert!(err.to_string().contains("/proc/1/status"));
    }

    #[test]
    fn test_not_found_is_transient() {
        let err = CollectError::io("/proc/42/stat", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, CollectError::Io { .. }));
        assert!(err.is_transient());
        assert_eq!(err.errno(), None);
    }

    #[test]
    fn test_sys_errno() {
        let err = CollectError::Sys {
            call: "statvfs",
            source: Errno::ENOENT,
        };
        assert_eq!(err.errno(), Some(Errno::ENOENT as i32));
        assert_eq!(err.to_string(), format!("statvfs failed: {}", Errno::ENOENT));
    }

    #[test]
    fn test_parse_error_converts() {
        let err: CollectError = ParseError::new("missing cpu line").into();
        assert_eq!(err.to_string(), "parse error: missing cpu line");
        assert!(!err.is_transient());
    }
}
