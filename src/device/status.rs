use std::fmt;

use log::warn;

use crate::error::{Error, Result};

/// Status codes reported by the accelerator runtime.
///
/// The numbering follows the usual BLAS runtime convention so that codes seen
/// in error messages are familiar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    NotInitialized = 1,
    AllocFailed = 3,
    InvalidValue = 7,
    MappingError = 11,
    ExecutionFailed = 13,
}

impl Status {
    /// Numeric status code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Symbolic name of the status.
    pub fn name(self) -> &'static str {
        match self {
            Status::Success => "STATUS_SUCCESS",
            Status::NotInitialized => "STATUS_NOT_INITIALIZED",
            Status::AllocFailed => "STATUS_ALLOC_FAILED",
            Status::InvalidValue => "STATUS_INVALID_VALUE",
            Status::MappingError => "STATUS_MAPPING_ERROR",
            Status::ExecutionFailed => "STATUS_EXECUTION_FAILED",
        }
    }

    /// Turns a non-success status into the matching crate error.
    pub fn check(self, detail: &str) -> Result<()> {
        match self {
            Status::Success => Ok(()),
            other => Err(other.error(detail)),
        }
    }

    pub(crate) fn error(self, detail: impl fmt::Display) -> Error {
        warn!("device status {} ({}): {detail}", self.code(), self.name());

        let message = format!("{}: {detail}", self.name());
        match self {
            Status::AllocFailed => Error::Allocation {
                code: self.code(),
                message,
            },
            _ => Error::Device {
                code: self.code(),
                message,
            },
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_passes_check() {
        assert!(Status::Success.check("noop").is_ok());
    }

    #[test]
    fn alloc_failure_maps_to_allocation_error() {
        match Status::AllocFailed.check("out of memory") {
            Err(Error::Allocation { code, message }) => {
                assert_eq!(code, 3);
                assert!(message.contains("STATUS_ALLOC_FAILED"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn codes_and_names_are_stable() {
        let table = [
            (Status::Success, 0, "STATUS_SUCCESS"),
            (Status::NotInitialized, 1, "STATUS_NOT_INITIALIZED"),
            (Status::AllocFailed, 3, "STATUS_ALLOC_FAILED"),
            (Status::InvalidValue, 7, "STATUS_INVALID_VALUE"),
            (Status::MappingError, 11, "STATUS_MAPPING_ERROR"),
            (Status::ExecutionFailed, 13, "STATUS_EXECUTION_FAILED"),
        ];
        for (status, code, name) in table {
            assert_eq!(status.code(), code);
            assert_eq!(status.name(), name);
        }
    }

    #[test]
    fn other_failures_map_to_device_error() {
        match Status::InvalidValue.check("bad length") {
            Err(Error::Device { code, .. }) => assert_eq!(code, 7),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
