//! Core decoding engine for TankSense
//!
//! Reads capacitive tank-level sensors that share a single half-duplex
//! wire and speak an undocumented, timing-based bit encoding. The crate
//! recovers 12-byte packets from the line, validates their checksum and
//! turns the ten raw segment readings into a continuous fill level and,
//! through a calibration curve, a volume.
//!
//! Key constraints:
//! - Runs on bare-metal targets (`no_std` by default without `std`)
//! - No heap allocation in the read path
//! - Busy-wait bit sampling with microsecond deadlines
//!
//! ```no_run
//! # fn demo<RX, TX, D>(rx: RX, tx: TX, mut delay: D)
//! # where
//! #     RX: embedded_hal::digital::InputPin,
//! #     TX: embedded_hal::digital::OutputPin,
//! #     D: embedded_hal::delay::DelayNs,
//! # {
//! use tanksense_core::{TankBus, TankAddress, SystemClock, estimate_level};
//!
//! let mut bus = TankBus::new(rx, tx, SystemClock::new());
//!
//! match bus.read_tank(&mut delay, TankAddress::new(1)) {
//!     Ok(reading) => {
//!         let level = estimate_level(&reading, 9);
//!         // publish level downstream
//!     }
//!     Err(e) => {} // no valid reading this cycle
//! }
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod errors;
pub mod level;
pub mod monitor;
pub mod reading;
pub mod time;
pub mod volume;
pub mod wire;

// Public API
pub use errors::{CurveError, ReadError, ReadResult};
pub use level::estimate_level;
pub use monitor::{NullSink, SampleSink, TankConfig, TankMonitor, TankSample};
pub use reading::SegmentReading;
pub use time::{Clock, FixedClock};
pub use volume::{gallons_to_liters, CurvePoint, VolumeCurve};
pub use wire::{TankAddress, TankBus, WireTiming};

#[cfg(feature = "std")]
pub use time::SystemClock;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
