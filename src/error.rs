//! Error types for boostkern operations
//!
//! Two layers exist. [`ErrorCode`] is the closed, `#[repr(i32)]` code that crosses
//! the zone boundary inside [`ObjectiveWrapper`](crate::bridge::ObjectiveWrapper)
//! calls. [`BoostError`] is the Rust-facing error returned by the safe API.

use thiserror::Error;

use crate::Backend;

/// Result type for boostkern operations
pub type Result<T> = std::result::Result<T, BoostError>;

/// Status code returned by every zone factory and kernel entry point.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Success
    None = 0,
    /// Allocation failed while constructing a zone objective
    OutOfMemory = -1,
    /// Unexpected internal state (a broken invariant, not a caller mistake)
    UnexpectedInternal = -2,
    /// A parameter value is outside the accepted domain
    IllegalParamVal = -3,
    /// No objective is registered under the requested name
    UnknownIdentifier = -4,
}

impl ErrorCode {
    /// `true` for [`ErrorCode::None`]
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, ErrorCode::None)
    }

    /// Convert to a `Result`, mapping every failure code to [`BoostError`]
    pub fn into_result(self) -> Result<()> {
        match self {
            ErrorCode::None => Ok(()),
            ErrorCode::OutOfMemory => Err(BoostError::OutOfMemory),
            ErrorCode::UnexpectedInternal => Err(BoostError::UnexpectedInternal),
            ErrorCode::IllegalParamVal => Err(BoostError::IllegalParamVal),
            ErrorCode::UnknownIdentifier => Err(BoostError::UnknownIdentifier),
        }
    }
}

/// Errors that can occur during boostkern operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoostError {
    /// Allocation failure during objective construction
    #[error("Out of memory while constructing objective")]
    OutOfMemory,

    /// Internal invariant violated
    #[error("Unexpected internal error")]
    UnexpectedInternal,

    /// Objective rejected the configuration
    #[error("Illegal parameter value")]
    IllegalParamVal,

    /// Objective name not registered for the backend
    #[error("Unknown objective identifier")]
    UnknownIdentifier,

    /// Backend not compiled for, or not detected on, this machine
    #[error("Backend not supported on this platform: {0:?}")]
    UnsupportedBackend(Backend),
}

impl BoostError {
    /// Code to report across the zone boundary
    pub fn code(&self) -> ErrorCode {
        match self {
            BoostError::OutOfMemory => ErrorCode::OutOfMemory,
            BoostError::UnexpectedInternal => ErrorCode::UnexpectedInternal,
            BoostError::IllegalParamVal => ErrorCode::IllegalParamVal,
            BoostError::UnknownIdentifier | BoostError::UnsupportedBackend(_) => {
                ErrorCode::UnknownIdentifier
            }
        }
    }
}
