//! Protocol timing and estimator constants
//!
//! Every value in this module was measured against real sensor
//! installations rather than taken from a datasheet — the protocol has
//! no published specification. Timing values are the defaults for
//! [`WireTiming`](crate::wire::WireTiming) and can be overridden per
//! deployment.

// ===== WIRE PROTOCOL =====

/// Number of bytes in a sensor response packet.
///
/// Two header bytes (4-bit opaque field + 12-bit checksum) followed by
/// ten payload bytes, one per sensor segment.
pub const PACKET_LEN: usize = 12;

/// Number of segment bytes carried in a packet.
pub const MAX_SEGMENTS: usize = 10;

/// Mask extracting the 12-bit checksum from the two header bytes.
pub const CHECKSUM_MASK: u16 = 0x0FFF;

/// Time the line is driven high to energize the sensor (µs).
///
/// The usable window is narrow:
/// - 1.5 ms: always get a response
/// - 2 ms: always get a response
/// - 3 ms: usually get a response, depends on environmental conditions
/// - 5 ms: sometimes get a response
/// - 10 ms: no response
pub const CHARGE_TIME_US: u32 = 1500;

/// Low phase of one address pulse (µs).
pub const ADDRESS_PULSE_LOW_US: u32 = 85;

/// High phase of one address pulse (µs).
pub const ADDRESS_PULSE_HIGH_US: u32 = 300;

/// Deadline for the first bit of the response (µs).
///
/// The time to first bit varies between installations for unknown
/// reasons; 7 500–13 000 µs has been observed in the field, so the
/// deadline is set above the worst case.
pub const FIRST_BIT_TIMEOUT_US: u32 = 14_000;

/// Deadline for every bit after the first (µs).
///
/// Bits typically arrive as 120 µs ON / 50 µs OFF.
pub const NEXT_BIT_TIMEOUT_US: u32 = 200;

/// High durations above this decode as bit value 1 (µs).
pub const BIT_ONE_THRESHOLD_US: u32 = 26;

/// Minimum pause between consecutive read attempts (ms).
///
/// The sensor fails to respond to back-to-back queries; at least
/// 800 ms of spacing is needed in practice.
pub const MIN_READ_INTERVAL_MS: u32 = 1000;

// ===== LEVEL ESTIMATOR =====

/// Initial wet/dry threshold for the boundary scan.
///
/// Raw segment values sit well above this when submerged and well
/// below it when dry, across the installations measured.
pub const BOUNDARY_THRESHOLD: u16 = 120;

/// Noise floor divisor: readings below `threshold / 3` contribute
/// nothing to the level.
pub const NOISE_FLOOR_DIVISOR: u16 = 3;

// ===== UNITS =====

/// One US gallon in liters.
pub const LITERS_PER_GALLON: f32 = 3.78541178;
