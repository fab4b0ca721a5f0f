//! Error types for wire decoding and calibration
//!
//! Errors here follow the same rules as the rest of the crate:
//!
//! 1. **Small and `Copy`**: errors are returned from the hot read path
//!    and may be stored inside samples, so every variant stays inline
//!    with no heap data.
//!
//! 2. **Actionable**: each variant maps to a distinct physical failure
//!    mode, so callers can decide between rescheduling, alerting on
//!    wiring, or ignoring a noisy packet without further queries.
//!
//! None of these failures are retried internally — every decode attempt
//! is a single pass over the wire. Retry policy belongs to the caller's
//! polling schedule.

use thiserror_no_std::Error;

/// Result type for wire read operations
pub type ReadResult<T> = Result<T, ReadError>;

/// Failures of a single read attempt against the sensor bus
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Attempt made before the minimum pause since the last attempt
    /// elapsed; the wire was not touched.
    #[error("Read attempted before minimum interval elapsed")]
    RateLimited,

    /// The line read low while idle - the sensor interface is miswired
    /// or the comparator circuit is malfunctioning.
    #[error("Interface fault: line low while idle")]
    InterfaceFault,

    /// The line indicated a short to ground while being driven.
    #[error("Sensor wiring short-circuits to ground")]
    ShortCircuit,

    /// The sensor never started transmitting within the first-bit
    /// deadline.
    #[error("No response from sensor")]
    NoResponse,

    /// The transmission started but stalled mid-packet.
    #[error("Timeout while reading sensor data")]
    Timeout,

    /// A full packet arrived but its arithmetic checksum failed.
    #[error("Checksum mismatch: expected {expected:#06x}, actual {actual:#06x}")]
    ChecksumMismatch {
        /// 12-bit checksum extracted from the packet header
        expected: u16,
        /// Sum of the ten payload bytes as received
        actual: u16,
    },

    /// A HAL pin read failed.
    #[error("Pin read failed")]
    PinRead,

    /// A HAL pin write failed.
    #[error("Pin write failed")]
    PinWrite,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReadError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::RateLimited => defmt::write!(fmt, "Rate limited"),
            Self::InterfaceFault => defmt::write!(fmt, "Interface fault: line low while idle"),
            Self::ShortCircuit => defmt::write!(fmt, "Wiring short-circuits to ground"),
            Self::NoResponse => defmt::write!(fmt, "No response"),
            Self::Timeout => defmt::write!(fmt, "Timeout mid-packet"),
            Self::ChecksumMismatch { expected, actual } => {
                defmt::write!(fmt, "Checksum mismatch: expected {=u16:04x}, actual {=u16:04x}", expected, actual)
            }
            Self::PinRead => defmt::write!(fmt, "Pin read failed"),
            Self::PinWrite => defmt::write!(fmt, "Pin write failed"),
        }
    }
}

/// Failures constructing a [`VolumeCurve`](crate::volume::VolumeCurve)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveError {
    /// Breakpoints must be monotonic non-decreasing in level and in
    /// volume.
    #[error("Calibration breakpoints must be monotonic in level and in volume")]
    NotMonotonic,

    /// A breakpoint carries a NaN or infinite coordinate.
    #[error("Calibration breakpoints must be finite")]
    NonFinite,

    /// More breakpoints supplied than the curve can store.
    #[error("Too many calibration breakpoints (max {max})")]
    TooManyPoints {
        /// Curve capacity
        max: usize,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for CurveError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NotMonotonic => defmt::write!(fmt, "Breakpoints not monotonic"),
            Self::NonFinite => defmt::write!(fmt, "Breakpoints not finite"),
            Self::TooManyPoints { max } => defmt::write!(fmt, "Too many breakpoints (max {})", max),
        }
    }
}
