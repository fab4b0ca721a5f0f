//! Per-tank polling: decode, estimate, publish
//!
//! One [`TankMonitor`] exists per logical tank and borrows the shared
//! [`TankBus`] for each poll. A poll produces a [`TankSample`] that
//! downstream consumers can publish as-is: on success it carries the
//! raw reading plus the derived level and volume; on a protocol
//! failure everything is `None` and the error is attached, so the
//! consumer reports "no valid reading". Only a rate-limited attempt is
//! surfaced as `Err` — nothing was attempted, nothing to publish, and
//! the caller may reschedule sooner.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::constants::MAX_SEGMENTS;
use crate::errors::{ReadError, ReadResult};
use crate::level::estimate_level;
use crate::reading::{SegmentReading, SEGMENT_TEXT_CAPACITY};
use crate::time::Clock;
use crate::volume::VolumeCurve;
use crate::wire::{TankAddress, TankBus};

/// Configuration of one logical tank.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TankConfig {
    /// Bus address of the responding sensor unit.
    pub address: TankAddress,
    /// Number of segments to interpret, 1..=10. Short tanks only use
    /// the lower part of the sender strip.
    pub segments: u8,
    /// Optional level-to-volume calibration.
    pub curve: Option<VolumeCurve>,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            address: TankAddress::default(),
            segments: 9,
            curve: None,
        }
    }
}

impl TankConfig {
    /// Configuration for the given address with default segment count
    /// and no calibration.
    pub fn new(address: TankAddress) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Sets the interpreted segment count, clamped to 1..=10.
    pub fn with_segments(mut self, segments: u8) -> Self {
        self.segments = segments.clamp(1, MAX_SEGMENTS as u8);
        self
    }

    /// Sets the calibration curve.
    pub fn with_curve(mut self, curve: VolumeCurve) -> Self {
        self.curve = Some(curve);
        self
    }
}

/// Outcome of one poll cycle.
///
/// All three payload fields are `None` when the attempt failed; the
/// voiding error is attached for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct TankSample {
    /// Raw segment values, present only on a checksum-valid decode.
    pub reading: Option<SegmentReading>,
    /// Continuous fill level in segments from the tank bottom.
    pub level: Option<f32>,
    /// Interpolated volume in liters, when a curve is configured.
    pub volume: Option<f32>,
    /// The failure that voided this sample, if any.
    pub error: Option<ReadError>,
    segments: u8,
}

impl TankSample {
    /// Comma-joined raw segment values in bottom-to-top order, for
    /// text publication. `None` when there is no reading.
    pub fn segment_text(&self) -> Option<heapless::String<SEGMENT_TEXT_CAPACITY>> {
        self.reading
            .as_ref()
            .map(|r| r.to_text(usize::from(self.segments)))
    }
}

/// Downstream consumer of poll results.
///
/// Implementations publish whichever of the level, volume and segment
/// text their deployment configures; the sample carries all of them.
pub trait SampleSink {
    /// Accepts one sample. Called once per attempted poll, including
    /// failed attempts (which publish as "no reading").
    fn publish(&mut self, sample: &TankSample);
}

/// Sink that discards every sample, for callers that only want the
/// returned value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SampleSink for NullSink {
    fn publish(&mut self, _sample: &TankSample) {}
}

/// Polls one logical tank through a shared bus.
#[derive(Debug, Clone)]
pub struct TankMonitor {
    config: TankConfig,
}

impl TankMonitor {
    /// Creates a monitor for the configured tank.
    pub fn new(config: TankConfig) -> Self {
        Self { config }
    }

    /// The tank configuration.
    pub fn config(&self) -> &TankConfig {
        &self.config
    }

    /// Runs one poll cycle against the bus.
    ///
    /// `Err(RateLimited)` means the bus gate rejected the attempt and
    /// the wire was never touched. Every other outcome is `Ok`: either
    /// a populated sample or a voided one carrying the decode error.
    pub fn poll<RX, TX, C, D>(
        &self,
        bus: &mut TankBus<RX, TX, C>,
        delay: &mut D,
    ) -> ReadResult<TankSample>
    where
        RX: InputPin,
        TX: OutputPin,
        C: Clock,
        D: DelayNs,
    {
        match bus.read_tank(delay, self.config.address) {
            Ok(reading) => {
                let level = estimate_level(&reading, usize::from(self.config.segments));
                let volume = self
                    .config
                    .curve
                    .as_ref()
                    .and_then(|curve| curve.estimate(Some(level)));
                Ok(TankSample {
                    reading: Some(reading),
                    level: Some(level),
                    volume,
                    error: None,
                    segments: self.config.segments,
                })
            }
            Err(ReadError::RateLimited) => Err(ReadError::RateLimited),
            Err(e) => Ok(TankSample {
                reading: None,
                level: None,
                volume: None,
                error: Some(e),
                segments: self.config.segments,
            }),
        }
    }

    /// Polls and forwards the sample to a sink.
    ///
    /// Rate-limited attempts are returned without publishing; there
    /// was nothing to report.
    pub fn poll_publish<RX, TX, C, D, S>(
        &self,
        bus: &mut TankBus<RX, TX, C>,
        delay: &mut D,
        sink: &mut S,
    ) -> ReadResult<TankSample>
    where
        RX: InputPin,
        TX: OutputPin,
        C: Clock,
        D: DelayNs,
        S: SampleSink,
    {
        let sample = self.poll(bus, delay)?;
        sink.publish(&sample);
        Ok(sample)
    }
}
