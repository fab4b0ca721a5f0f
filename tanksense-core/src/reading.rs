//! Raw segment readings returned by a successful decode

use core::fmt::Write;

use crate::constants::MAX_SEGMENTS;

/// Capacity of the comma-joined segment text. Ten three-digit values
/// plus nine separators fit with room to spare.
pub const SEGMENT_TEXT_CAPACITY: usize = 64;

/// One checksum-valid set of raw segment values.
///
/// Index 0 is the topmost physical segment, index 9 the bottommost
/// (closest to the tank floor). A reading only exists after the packet
/// checksum has been verified; partial or corrupt payloads are never
/// exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentReading {
    segments: [u8; MAX_SEGMENTS],
}

impl SegmentReading {
    /// Wraps ten validated segment bytes, top segment first.
    pub const fn new(segments: [u8; MAX_SEGMENTS]) -> Self {
        Self { segments }
    }

    /// Raw value of one segment. Index 0 is the top segment.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 10 or more; a packet never carries more
    /// than ten segment bytes.
    pub fn segment(&self, index: usize) -> u8 {
        self.segments[index]
    }

    /// All ten raw bytes, top segment first.
    pub fn as_bytes(&self) -> &[u8; MAX_SEGMENTS] {
        &self.segments
    }

    /// Iterates the `segments` interpreted values from the tank bottom
    /// upwards, the order in which the level estimator consumes them.
    pub fn bottom_to_top(&self, segments: usize) -> impl Iterator<Item = u8> + '_ {
        let segments = segments.min(MAX_SEGMENTS);
        self.segments[..segments].iter().rev().copied()
    }

    /// Comma-joined text of the `segments` interpreted values in
    /// bottom-to-top order, for diagnostic publication.
    pub fn to_text(&self, segments: usize) -> heapless::String<SEGMENT_TEXT_CAPACITY> {
        let mut out = heapless::String::new();
        for (i, value) in self.bottom_to_top(segments).enumerate() {
            if i != 0 {
                let _ = out.push(',');
            }
            let _ = write!(out, "{}", value);
        }
        out
    }
}
