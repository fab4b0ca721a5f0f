//! Bit-banged wire protocol for the shared sensor bus
//!
//! The sensor speaks over a single half-duplex line: the host drives
//! the line high to power the sensor, clocks out address pulses to
//! select a unit, then releases into listening and decodes the reply
//! from pulse-width timing alone. There are no framing markers beyond
//! the fixed 12-byte length and an arithmetic checksum, so robustness
//! rests entirely on the timeout policy: a generous deadline for the
//! first bit (installations vary wildly in response latency) and a
//! tight deadline for every bit after it (anything slower is noise).
//!
//! The electrical interface is a comparator pair: while the host
//! drives the line, the receive side normally reads low; the sensor's
//! reply pulses read high. One bus instance exclusively owns the RX/TX
//! pins and the read pacing state, so Rust's borrow rules serialize
//! access to the physical wire.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::constants::{
    ADDRESS_PULSE_HIGH_US, ADDRESS_PULSE_LOW_US, BIT_ONE_THRESHOLD_US, CHARGE_TIME_US,
    CHECKSUM_MASK, FIRST_BIT_TIMEOUT_US, MAX_SEGMENTS, MIN_READ_INTERVAL_MS,
    NEXT_BIT_TIMEOUT_US, PACKET_LEN,
};
use crate::errors::{ReadError, ReadResult};
use crate::reading::SegmentReading;
use crate::time::Clock;

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}
#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {{}};
}

#[cfg(feature = "log")]
macro_rules! log_trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}
#[cfg(not(feature = "log"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {{}};
}

/// Address of one sensor unit on the shared bus.
///
/// The address is the number of selection pulses emitted before
/// listening. Installed systems use 1 through 4; the decoder accepts
/// any small count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TankAddress(u8);

impl TankAddress {
    /// Wraps a raw bus address.
    pub const fn new(address: u8) -> Self {
        Self(address)
    }

    /// Number of address pulses sent for this unit.
    pub const fn pulses(self) -> u8 {
        self.0
    }
}

impl Default for TankAddress {
    fn default() -> Self {
        Self(1)
    }
}

/// Protocol timing parameters.
///
/// Defaults are the field-measured constants from
/// [`constants`](crate::constants); deployments with unusual wiring
/// can loosen or tighten them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireTiming {
    /// Charge interval before addressing (µs). Keep below 3000; the
    /// sensor stops responding somewhere past 5000.
    pub charge_us: u32,
    /// Low phase of one address pulse (µs).
    pub address_pulse_low_us: u32,
    /// High phase of one address pulse (µs).
    pub address_pulse_high_us: u32,
    /// Deadline for the start of the first response bit (µs).
    pub first_bit_timeout_us: u32,
    /// Deadline for every subsequent edge (µs).
    pub next_bit_timeout_us: u32,
    /// High durations above this decode as a 1 bit (µs).
    pub one_threshold_us: u32,
    /// Minimum pause between consecutive read attempts (ms).
    pub min_read_interval_ms: u32,
}

impl Default for WireTiming {
    fn default() -> Self {
        Self {
            charge_us: CHARGE_TIME_US,
            address_pulse_low_us: ADDRESS_PULSE_LOW_US,
            address_pulse_high_us: ADDRESS_PULSE_HIGH_US,
            first_bit_timeout_us: FIRST_BIT_TIMEOUT_US,
            next_bit_timeout_us: NEXT_BIT_TIMEOUT_US,
            one_threshold_us: BIT_ONE_THRESHOLD_US,
            min_read_interval_ms: MIN_READ_INTERVAL_MS,
        }
    }
}

/// One physical sensor bus: an RX/TX pin pair, a clock and the pacing
/// state for the tanks behind it.
///
/// `read_tank` takes `&mut self`, so multiple logical tanks sharing
/// one wire are serialized by ownership; the crate takes no locks.
pub struct TankBus<RX, TX, C> {
    rx: RX,
    tx: TX,
    clock: C,
    timing: WireTiming,
    last_read_ms: Option<u64>,
}

impl<RX, TX, C> TankBus<RX, TX, C>
where
    RX: InputPin,
    TX: OutputPin,
    C: Clock,
{
    /// Creates a bus with default timing.
    ///
    /// RX must idle high (externally pulled up through the sensor
    /// interface); TX must be push-pull and is left low between reads.
    pub fn new(rx: RX, tx: TX, clock: C) -> Self {
        Self::with_timing(rx, tx, clock, WireTiming::default())
    }

    /// Creates a bus with explicit timing parameters.
    pub fn with_timing(rx: RX, tx: TX, clock: C, timing: WireTiming) -> Self {
        Self {
            rx,
            tx,
            clock,
            timing,
            last_read_ms: None,
        }
    }

    /// Timing parameters in effect.
    pub fn timing(&self) -> &WireTiming {
        &self.timing
    }

    /// Performs one read attempt against the addressed tank.
    ///
    /// A single pass: no internal retries. Every outcome except
    /// [`ReadError::RateLimited`] touches the wire and restamps the
    /// pacing window, so the next attempt is measured from this one
    /// regardless of success.
    pub fn read_tank<D: DelayNs>(
        &mut self,
        delay: &mut D,
        address: TankAddress,
    ) -> ReadResult<SegmentReading> {
        // The sensor fails to respond to back-to-back queries.
        if let Some(last_ms) = self.last_read_ms {
            if self.clock.now_millis() - last_ms < u64::from(self.timing.min_read_interval_ms) {
                return Err(ReadError::RateLimited);
            }
        }

        // Idle sanity check: the line is pulled high when nobody
        // drives it. Low here means the interface is miswired.
        if !self.rx.is_high().map_err(|_| ReadError::PinRead)? {
            log_warn!("The sensor interface is malfunctioning: RX is low while TX is low");
            self.last_read_ms = Some(self.clock.now_millis());
            return Err(ReadError::InterfaceFault);
        }

        // Charge the sensor.
        self.tx.set_high().map_err(|_| ReadError::PinWrite)?;
        delay.delay_us(self.timing.charge_us);

        let result = self.read_with_tx_active(delay, address);

        let restored = self.tx.set_low();
        self.last_read_ms = Some(self.clock.now_millis());

        let reading = result?;
        restored.map_err(|_| ReadError::PinWrite)?;
        Ok(reading)
    }

    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    fn read_with_tx_active<D: DelayNs>(
        &mut self,
        delay: &mut D,
        address: TankAddress,
    ) -> ReadResult<SegmentReading> {
        // While the host drives the line, the receive comparator
        // normally reads low. High here means the wiring shorts the
        // line to ground.
        if self.rx.is_high().map_err(|_| ReadError::PinRead)? {
            log_warn!("The sensor wiring short-circuits to ground");
            return Err(ReadError::ShortCircuit);
        }

        // Select the responding unit.
        for _ in 0..address.pulses() {
            self.tx.set_low().map_err(|_| ReadError::PinWrite)?;
            delay.delay_us(self.timing.address_pulse_low_us);
            self.tx.set_high().map_err(|_| ReadError::PinWrite)?;
            delay.delay_us(self.timing.address_pulse_high_us);
        }

        let packet = self.sample_packet(address)?;

        log_trace!(
            "Tank {} sensor packet: {:02x},{:02x},{:02x},{:02x},{:02x},{:02x},{:02x},{:02x},{:02x},{:02x},{:02x},{:02x}",
            address.pulses(),
            packet[0], packet[1], packet[2], packet[3], packet[4], packet[5],
            packet[6], packet[7], packet[8], packet[9], packet[10], packet[11],
        );

        match validate_packet(&packet) {
            Ok(payload) => Ok(SegmentReading::new(payload)),
            Err(e) => {
                if let ReadError::ChecksumMismatch { expected, actual } = e {
                    log_warn!(
                        "Checksum mismatch while reading data from tank {}, expected {:04x}, actual {:04x}",
                        address.pulses(),
                        expected,
                        actual
                    );
                }
                Err(e)
            }
        }
    }

    /// Samples 12 bytes of pulse-width encoded data off the line.
    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    fn sample_packet(&mut self, address: TankAddress) -> ReadResult<[u8; PACKET_LEN]> {
        let mut packet = [0u8; PACKET_LEN];
        let mut timeout = u64::from(self.timing.first_bit_timeout_us);
        for i in 0..PACKET_LEN {
            let mut byte = 0u8;
            for j in 0..8 {
                // Wait for the start of the pulse.
                let start = self.clock.now_micros();
                let mut end = start;
                while !self.rx.is_high().map_err(|_| ReadError::PinRead)? {
                    end = self.clock.now_micros();
                    if end - start > timeout {
                        return if i == 0 && j == 0 {
                            log_warn!("No response from tank {}", address.pulses());
                            Err(ReadError::NoResponse)
                        } else {
                            log_warn!("Timeout while reading data from tank {}", address.pulses());
                            Err(ReadError::Timeout)
                        };
                    }
                }

                // Measure how long the line stays high; the pulse
                // width carries the bit value.
                let start = end;
                timeout = u64::from(self.timing.next_bit_timeout_us);
                while self.rx.is_high().map_err(|_| ReadError::PinRead)? {
                    end = self.clock.now_micros();
                    if end - start > timeout {
                        log_warn!("Timeout while reading data from tank {}", address.pulses());
                        return Err(ReadError::Timeout);
                    }
                }

                byte <<= 1;
                if end - start > u64::from(self.timing.one_threshold_us) {
                    byte |= 1;
                }
            }
            packet[i] = byte;
        }
        Ok(packet)
    }
}

/// Checks the packet header checksum and splits off the payload.
///
/// The first 4 bits of the packet carry opaque sender information
/// (observed values suggest an address/orientation code) and take no
/// part in validation. The next 12 bits are an arithmetic checksum of
/// the ten payload bytes.
pub(crate) fn validate_packet(packet: &[u8; PACKET_LEN]) -> ReadResult<[u8; MAX_SEGMENTS]> {
    let expected = ((u16::from(packet[0]) << 8) | u16::from(packet[1])) & CHECKSUM_MASK;

    let mut actual: u16 = 0;
    for &byte in &packet[2..] {
        actual = actual.wrapping_add(u16::from(byte));
    }

    if expected != actual & CHECKSUM_MASK {
        return Err(ReadError::ChecksumMismatch { expected, actual });
    }

    let mut payload = [0u8; MAX_SEGMENTS];
    payload.copy_from_slice(&packet[2..]);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;
    use embedded_hal::digital::ErrorType;
    use proptest::prelude::*;

    /// Pin stuck at one level; TX writes are accepted and discarded.
    struct StuckPin {
        high: bool,
    }

    impl ErrorType for StuckPin {
        type Error = core::convert::Infallible;
    }

    impl InputPin for StuckPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high)
        }
    }

    impl OutputPin for StuckPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn interface_fault_restamps_the_pacing_window() {
        let clock = FixedClock::new(0);
        let rx = StuckPin { high: false };
        let tx = StuckPin { high: false };
        let mut bus = TankBus::new(rx, tx, &clock);
        let mut delay = NoDelay;

        assert_eq!(
            bus.read_tank(&mut delay, TankAddress::new(1)),
            Err(ReadError::InterfaceFault)
        );

        // The fault stamped the window: too soon to try again.
        clock.advance_millis(500);
        assert_eq!(
            bus.read_tank(&mut delay, TankAddress::new(1)),
            Err(ReadError::RateLimited)
        );

        // Past the window the fault is observed again.
        clock.advance_millis(600);
        assert_eq!(
            bus.read_tank(&mut delay, TankAddress::new(1)),
            Err(ReadError::InterfaceFault)
        );
    }

    fn packet_for(payload: [u8; MAX_SEGMENTS], header_nibble: u8) -> [u8; PACKET_LEN] {
        let sum: u16 = payload.iter().map(|&b| u16::from(b)).sum();
        let mut packet = [0u8; PACKET_LEN];
        packet[0] = (header_nibble << 4) | ((sum >> 8) as u8 & 0x0F);
        packet[1] = sum as u8;
        packet[2..].copy_from_slice(&payload);
        packet
    }

    #[test]
    fn valid_packet_yields_payload() {
        let payload = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
        let packet = packet_for(payload, 0x9);
        assert_eq!(validate_packet(&packet).unwrap(), payload);
    }

    #[test]
    fn header_nibble_is_ignored() {
        let payload = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        for nibble in 0..16u8 {
            let packet = packet_for(payload, nibble);
            assert_eq!(validate_packet(&packet).unwrap(), payload);
        }
    }

    #[test]
    fn corrupt_payload_reports_both_sums() {
        let payload = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
        let mut packet = packet_for(payload, 0x9);
        packet[5] ^= 0xFF;

        let expected_sum: u16 = payload.iter().map(|&b| u16::from(b)).sum();
        match validate_packet(&packet) {
            Err(ReadError::ChecksumMismatch { expected, actual }) => {
                assert_eq!(expected, expected_sum);
                assert_ne!(actual & CHECKSUM_MASK, expected);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn any_consistent_packet_decodes(payload in proptest::array::uniform10(any::<u8>()), nibble in 0..16u8) {
            let packet = packet_for(payload, nibble);
            prop_assert_eq!(validate_packet(&packet).unwrap(), payload);
        }

        #[test]
        fn any_checksum_corruption_is_rejected(
            payload in proptest::array::uniform10(any::<u8>()),
            delta in 1u16..0x0FFF,
        ) {
            let mut packet = packet_for(payload, 0x9);
            let sum: u16 = payload.iter().map(|&b| u16::from(b)).sum();
            let bad = (sum + delta) & CHECKSUM_MASK;
            packet[0] = (packet[0] & 0xF0) | ((bad >> 8) as u8 & 0x0F);
            packet[1] = bad as u8;
            prop_assert!(
                matches!(
                    validate_packet(&packet),
                    Err(ReadError::ChecksumMismatch { .. })
                ),
                "expected ChecksumMismatch error"
            );
        }
    }
}
