//! Deterministic wire simulator for protocol-level tests
//!
//! Implements the pin, clock and delay traits over one shared timeline
//! so a whole decode runs without real hardware or real time. Reading
//! the clock advances it by one microsecond, which is what lets the
//! decoder's busy-wait loops make progress; pin reads and writes are
//! free but counted, so tests can assert on wire activity (or the
//! absence of it).
//!
//! A sensor response is scripted as a list of absolute high intervals
//! on the line. The schedule is computed from the protocol's fixed
//! delays (charge, address pulses), so it must be installed immediately
//! before the read it answers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use tanksense_core::constants::{
    ADDRESS_PULSE_HIGH_US, ADDRESS_PULSE_LOW_US, CHARGE_TIME_US, PACKET_LEN,
};
use tanksense_core::{Clock, TankAddress};

/// Typical response shape: 120 µs ON / 50 µs OFF for a 1 bit.
const ONE_BIT_HIGH_US: u64 = 120;
const ZERO_BIT_HIGH_US: u64 = 10;
const BIT_GAP_US: u64 = 50;

/// Delay between the host releasing into listening and the first
/// response bit. Installations vary from 7 500 to 13 000 µs.
pub const DEFAULT_FIRST_BIT_DELAY_US: u64 = 8500;

struct SimState {
    now_us: u64,
    tx_high: bool,
    idle_high: bool,
    short_to_ground: bool,
    /// Absolute [start, end) intervals during which the line is high
    /// while the host listens.
    pulses: Vec<(u64, u64)>,
    rx_reads: u64,
    tx_writes: u64,
    tx_low_writes: u64,
}

impl SimState {
    fn line_is_high(&self) -> bool {
        if !self.tx_high {
            return self.idle_high;
        }
        if self.short_to_ground {
            return true;
        }
        self.pulses
            .iter()
            .any(|&(start, end)| self.now_us >= start && self.now_us < end)
    }
}

/// Handle to one simulated wire. Clone freely; all clones share state.
#[derive(Clone)]
pub struct WireSim {
    state: Rc<RefCell<SimState>>,
}

impl WireSim {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                now_us: 0,
                tx_high: false,
                idle_high: true,
                short_to_ground: false,
                pulses: Vec::new(),
                rx_reads: 0,
                tx_writes: 0,
                tx_low_writes: 0,
            })),
        }
    }

    /// Simulates a miswired interface: the line reads low while idle.
    pub fn set_idle_low(&self) {
        self.state.borrow_mut().idle_high = false;
    }

    /// Simulates wiring that shorts the line to ground: the receive
    /// comparator reads high while the host drives.
    pub fn set_short_to_ground(&self) {
        self.state.borrow_mut().short_to_ground = true;
    }

    pub fn rx_pin(&self) -> SimPin {
        SimPin {
            state: self.state.clone(),
        }
    }

    pub fn tx_pin(&self) -> SimPin {
        SimPin {
            state: self.state.clone(),
        }
    }

    pub fn clock(&self) -> SimClock {
        SimClock {
            state: self.state.clone(),
        }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay {
            state: self.state.clone(),
        }
    }

    pub fn advance_millis(&self, ms: u64) {
        self.state.borrow_mut().now_us += ms * 1000;
    }

    pub fn rx_reads(&self) -> u64 {
        self.state.borrow().rx_reads
    }

    pub fn tx_writes(&self) -> u64 {
        self.state.borrow().tx_writes
    }

    /// Number of times TX was driven low: one per address pulse plus
    /// the final release.
    pub fn tx_low_writes(&self) -> u64 {
        self.state.borrow().tx_low_writes
    }

    pub fn tx_is_high(&self) -> bool {
        self.state.borrow().tx_high
    }

    /// Scripts a full 12-byte response to a read issued immediately
    /// after this call, addressed with `address` selection pulses.
    pub fn schedule_packet(&self, packet: &[u8; PACKET_LEN], address: TankAddress) {
        self.schedule_bytes(&packet[..], address, DEFAULT_FIRST_BIT_DELAY_US);
    }

    /// Scripts a response that stalls after `bytes.len()` bytes.
    pub fn schedule_bytes(&self, bytes: &[u8], address: TankAddress, first_bit_delay_us: u64) {
        let mut state = self.state.borrow_mut();
        let listen_start = state.now_us
            + u64::from(CHARGE_TIME_US)
            + u64::from(address.pulses())
                * u64::from(ADDRESS_PULSE_LOW_US + ADDRESS_PULSE_HIGH_US);

        let mut t = listen_start + first_bit_delay_us;
        state.pulses.clear();
        for &byte in bytes {
            for bit in (0..8).rev() {
                let width = if byte & (1 << bit) != 0 {
                    ONE_BIT_HIGH_US
                } else {
                    ZERO_BIT_HIGH_US
                };
                state.pulses.push((t, t + width));
                t += width + BIT_GAP_US;
            }
        }
    }
}

/// Simulated pin; the same type serves RX (reads) and TX (writes).
pub struct SimPin {
    state: Rc<RefCell<SimState>>,
}

impl ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.rx_reads += 1;
        Ok(state.line_is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.tx_writes += 1;
        state.tx_low_writes += 1;
        state.tx_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.tx_writes += 1;
        state.tx_high = true;
        Ok(())
    }
}

/// Simulated monotonic clock. Each read costs one microsecond, which
/// drives the decoder's busy-wait loops forward.
pub struct SimClock {
    state: Rc<RefCell<SimState>>,
}

impl Clock for SimClock {
    fn now_micros(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.now_us += 1;
        state.now_us
    }
}

/// Simulated blocking delay: advances the shared timeline.
pub struct SimDelay {
    state: Rc<RefCell<SimState>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let mut state = self.state.borrow_mut();
        state.now_us += u64::from(ns).div_ceil(1000);
    }
}

/// Builds a checksum-consistent packet around ten payload bytes. The
/// header nibble 0x9 matches what tank #1 senders report in the field.
pub fn packet_with_payload(payload: &[u8; 10]) -> [u8; PACKET_LEN] {
    let sum: u16 = payload.iter().map(|&b| u16::from(b)).sum();
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = 0x90 | ((sum >> 8) as u8 & 0x0F);
    packet[1] = sum as u8;
    packet[2..].copy_from_slice(payload);
    packet
}
