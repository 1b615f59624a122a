//! Bit-level I/O between the link and its bit-serial transport.
//!
//! Both directions run MSB-first: the first bit on the wire is the most
//! significant bit of the byte it belongs to.
//!
//! - `BitAssembler` collects inbound bits and yields each completed byte.
//! - `BitReader` walks an outbound byte slice one bit at a time.
//!
//! # Example
//! ```
//! use paritylink_core::bitio::{BitAssembler, BitReader};
//!
//! let mut assembler = BitAssembler::new();
//! let mut out = Vec::new();
//! for bit in BitReader::new(b"{}") {
//!     if let Some(byte) = assembler.push(bit) {
//!         out.push(byte);
//!     }
//! }
//! assert_eq!(out, b"{}");
//! ```

/// Number of bits in one byte on the wire.
pub const BITS_PER_BYTE: u8 = 8;

/// Accumulates received bits into bytes, MSB-first.
///
/// # Invariants
/// - `bit_count` is always < 8 between calls
/// - only the low `bit_count` bits of `bit_buffer` are meaningful
#[derive(Debug, Clone, Default)]
pub struct BitAssembler {
    /// Bits received so far for the current byte, oldest in the highest position
    bit_buffer: u8,
    /// Number of bits in bit_buffer (0-7)
    bit_count: u8,
}

impl BitAssembler {
    /// Create an assembler with no pending bits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one bit; returns the byte it completes, if any.
    ///
    /// The first bit pushed after a completed byte becomes the MSB of the
    /// next one.
    pub fn push(&mut self, bit: bool) -> Option<u8> {
        self.bit_buffer = (self.bit_buffer << 1) | bit as u8;
        self.bit_count += 1;

        if self.bit_count == BITS_PER_BYTE {
            let byte = self.bit_buffer;
            self.bit_buffer = 0;
            self.bit_count = 0;
            Some(byte)
        } else {
            None
        }
    }

    /// Number of bits held toward the next byte.
    pub fn pending_bits(&self) -> u8 {
        self.bit_count
    }
}

/// Reads bits MSB-first from a byte buffer.
///
/// # Invariants
/// - `bit_position` never exceeds `data.len() * 8`
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Source data
    data: &'a [u8],
    /// Current bit position (0 = MSB of first byte)
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader for the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    /// Return the number of bits remaining in the buffer.
    pub fn bits_remaining(&self) -> usize {
        self.data.len() * BITS_PER_BYTE as usize - self.bit_position
    }
}

impl Iterator for BitReader<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let byte = *self.data.get(self.bit_position / BITS_PER_BYTE as usize)?;
        let shift = BITS_PER_BYTE as usize - 1 - self.bit_position % BITS_PER_BYTE as usize;
        self.bit_position += 1;
        Some((byte >> shift) & 1 == 1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bits_remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BitReader<'_> {}
