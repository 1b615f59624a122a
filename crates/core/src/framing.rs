//! Frame construction and extraction.
//!
//! A frame is delimited by tag bytes and byte-stuffed so the payload can carry
//! any value:
//!
//! # Frame Format
//!
//! ```text
//! +-------+-----+--------+---------------------+------+
//! | START | SEQ | PARITY | escaped payload ... | STOP |
//! |  '{'  |  1  |  0/1   |   0..=8 raw bytes   | '}'  |
//! +-------+-----+--------+---------------------+------+
//! ```
//!
//! - PARITY covers the unescaped payload only.
//! - Any payload byte equal to START, STOP, ESCAPE, RESPONSE or !RESPONSE is
//!   preceded by ESCAPE. SEQ is stuffed by the same rule.
//! - A response frame carries a single, unescaped RESPONSE (ACK) or
//!   !RESPONSE (NACK) byte. The decoder spots that tag inside an open frame
//!   and reports it as a signal instead of data.
//!
//! # Extraction
//!
//! `try_extract` scans the receive buffer without touching it, and only once a
//! STOP is seen drains the consumed prefix in one step. Bytes after the STOP
//! stay queued for the next frame.

use std::collections::VecDeque;

use crate::error::{FrameError, Result};
use crate::parity::parity;

/// Begins a frame.
pub const START: u8 = b'{';
/// Ends a frame.
pub const STOP: u8 = b'}';
/// Marks the following byte as literal data.
pub const ESCAPE: u8 = b'\\';
/// Positive acknowledgment when it forms a frame's whole payload.
pub const RESPONSE: u8 = b'~';
/// Negative acknowledgment: the bitwise complement of `RESPONSE`.
pub const NEGATIVE_RESPONSE: u8 = !RESPONSE;

/// Maximum raw payload bytes carried by one frame.
pub const MAX_FRAME_SIZE: usize = 8;

/// START, SEQ, PARITY and STOP.
const OVERHEAD: usize = 4;

/// True for byte values the decoder would interpret as structure.
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, START | STOP | ESCAPE | RESPONSE | NEGATIVE_RESPONSE)
}

/// In-band acknowledgment carried as a frame's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSignal {
    Ack,
    Nack,
}

impl ResponseSignal {
    /// Wire byte for this signal.
    pub fn tag(self) -> u8 {
        match self {
            ResponseSignal::Ack => RESPONSE,
            ResponseSignal::Nack => NEGATIVE_RESPONSE,
        }
    }

    fn from_tag(byte: u8) -> Option<Self> {
        match byte {
            RESPONSE => Some(ResponseSignal::Ack),
            NEGATIVE_RESPONSE => Some(ResponseSignal::Nack),
            _ => None,
        }
    }
}

/// A fully tagged and escaped frame, ready to be sent bit by bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wire bytes of the frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of wire bytes, escapes and tags included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: a frame has at least its four structural bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the decoder pulled out of one complete frame.
///
/// `payload` still starts with the sender's SEQ and PARITY bytes; splitting
/// them off is left to the ARQ layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFrame {
    /// De-escaped bytes between START and STOP, tags removed
    pub payload: Vec<u8>,
    /// ACK/NACK tag seen inside the frame, if any
    pub signal: Option<ResponseSignal>,
}

impl ExtractedFrame {
    /// Split into (seq, parity, data). `None` if the header bytes are missing.
    pub fn split_header(&self) -> Option<(u8, u8, &[u8])> {
        match self.payload.as_slice() {
            [seq, parity, data @ ..] => Some((*seq, *parity, data)),
            _ => None,
        }
    }
}

/// Build a data frame around `payload`.
///
/// # Errors
/// `FrameError::PayloadTooLarge` if the payload exceeds `MAX_FRAME_SIZE`.
pub fn encode(payload: &[u8], seq: u8) -> Result<Frame> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_FRAME_SIZE,
        }
        .into());
    }

    let mut bytes = Vec::with_capacity(OVERHEAD + 2 * (payload.len() + 1));
    bytes.push(START);
    push_stuffed(&mut bytes, seq);
    bytes.push(parity(payload));
    for &byte in payload {
        push_stuffed(&mut bytes, byte);
    }
    bytes.push(STOP);

    Ok(Frame { bytes })
}

/// Build a response-only frame carrying `signal`.
///
/// The signal byte is deliberately left unescaped so the decoder recognizes it.
pub fn encode_response(signal: ResponseSignal, seq: u8) -> Frame {
    let tag = signal.tag();

    let mut bytes = Vec::with_capacity(OVERHEAD + 2);
    bytes.push(START);
    push_stuffed(&mut bytes, seq);
    bytes.push(parity(&[tag]));
    bytes.push(tag);
    bytes.push(STOP);

    Frame { bytes }
}

fn push_stuffed(out: &mut Vec<u8>, byte: u8) {
    if is_reserved(byte) {
        out.push(ESCAPE);
    }
    out.push(byte);
}

/// Result of scanning a read-only view of the receive buffer.
#[derive(Debug, PartialEq, Eq)]
enum ScanOutcome {
    /// No STOP yet, or an ESCAPE is waiting for its literal
    Incomplete,
    /// A frame ended after `consumed` bytes
    Complete {
        consumed: usize,
        frame: ExtractedFrame,
    },
}

fn scan<'a>(bytes: impl IntoIterator<Item = &'a u8>) -> ScanOutcome {
    let mut in_frame = false;
    let mut payload = Vec::new();
    let mut signal = None;

    let mut iter = bytes.into_iter().copied().enumerate();
    while let Some((index, byte)) = iter.next() {
        if byte == ESCAPE {
            match iter.next() {
                Some((_, literal)) => payload.push(literal),
                None => return ScanOutcome::Incomplete,
            }
        } else if let (true, Some(tag)) = (in_frame, ResponseSignal::from_tag(byte)) {
            signal = Some(tag);
        } else if byte == STOP {
            return ScanOutcome::Complete {
                consumed: index + 1,
                frame: ExtractedFrame { payload, signal },
            };
        } else if byte == START {
            in_frame = true;
        } else {
            payload.push(byte);
        }
    }

    ScanOutcome::Incomplete
}

/// Pull the first complete frame out of `buffer`.
///
/// Returns `None` and leaves the buffer untouched when no STOP has arrived yet.
/// On success every byte up to and including the STOP is removed.
pub fn try_extract(buffer: &mut VecDeque<u8>) -> Option<ExtractedFrame> {
    match scan(buffer.iter()) {
        ScanOutcome::Incomplete => None,
        ScanOutcome::Complete { consumed, frame } => {
            buffer.drain(..consumed);
            Some(frame)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn buffer_of(bytes: &[u8]) -> VecDeque<u8> {
        bytes.iter().copied().collect()
    }

    #[test]
    fn test_tags_are_distinct() {
        let tags = [START, STOP, ESCAPE, RESPONSE, NEGATIVE_RESPONSE];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_ne!(RESPONSE, !RESPONSE);
    }

    #[test]
    fn test_encode_escapes_start_in_payload() {
        let frame = encode(&[0x41, 0x7B], 0).unwrap();
        let p = parity(&[0x41, 0x7B]);
        assert_eq!(frame.as_bytes(), &[START, 0x00, p, 0x41, ESCAPE, 0x7B, STOP]);

        let mut buffer = buffer_of(frame.as_bytes());
        let extracted = try_extract(&mut buffer).unwrap();
        assert_eq!(extracted.signal, None);
        let (seq, tag, data) = extracted.split_header().unwrap();
        assert_eq!(seq, 0);
        assert_eq!(tag, p);
        assert_eq!(data, &[0x41, 0x7B]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_round_trip_random_payloads() {
        let alphabet = [START, STOP, ESCAPE, RESPONSE, NEGATIVE_RESPONSE, 0x00, 0x41, 0xFF];
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for seq in 0..=255u8 {
            let len = rng.gen_range(0..=MAX_FRAME_SIZE);
            let payload: Vec<u8> = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();

            let frame = encode(&payload, seq).unwrap();
            let mut buffer = buffer_of(frame.as_bytes());
            let extracted = try_extract(&mut buffer).unwrap();

            assert_eq!(extracted.signal, None, "seq {seq} payload {payload:?}");
            let (got_seq, tag, data) = extracted.split_header().unwrap();
            assert_eq!(got_seq, seq);
            assert_eq!(tag, parity(&payload));
            assert_eq!(data, payload.as_slice());
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn test_escape_byte_survives_without_extra_escapes() {
        let payload = [ESCAPE, ESCAPE, ESCAPE];
        let frame = encode(&payload, 1).unwrap();
        assert_eq!(frame.len(), 4 + 6);

        let extracted = try_extract(&mut buffer_of(frame.as_bytes())).unwrap();
        assert_eq!(extracted.split_header().unwrap().2, &payload);
    }

    #[test]
    fn test_payload_too_large() {
        let result = encode(&[0u8; MAX_FRAME_SIZE + 1], 0);
        assert!(matches!(
            result,
            Err(crate::error::Error::Frame(FrameError::PayloadTooLarge { len: 9, max: 8 }))
        ));
    }

    #[test]
    fn test_empty_payload() {
        let frame = encode(&[], 3).unwrap();
        assert_eq!(frame.as_bytes(), &[START, 3, 0, STOP]);
    }

    #[test]
    fn test_response_frames() {
        for signal in [ResponseSignal::Ack, ResponseSignal::Nack] {
            let frame = encode_response(signal, 5);
            assert_eq!(frame.as_bytes(), &[START, 5, 0, signal.tag(), STOP]);

            let extracted = try_extract(&mut buffer_of(frame.as_bytes())).unwrap();
            assert_eq!(extracted.signal, Some(signal));
            assert_eq!(extracted.payload, vec![5, 0]);
        }
    }

    #[test]
    fn test_escaped_response_tag_is_data() {
        let frame = encode(&[RESPONSE], 0).unwrap();
        let extracted = try_extract(&mut buffer_of(frame.as_bytes())).unwrap();
        assert_eq!(extracted.signal, None);
        assert_eq!(extracted.split_header().unwrap().2, &[RESPONSE]);
    }

    #[test]
    fn test_split_across_appends() {
        let frame = encode(b"split!", 2).unwrap();
        let (first, second) = frame.as_bytes().split_at(4);

        let mut buffer = buffer_of(first);
        assert_eq!(try_extract(&mut buffer), None);
        assert_eq!(buffer.len(), 4);

        buffer.extend(second);
        let extracted = try_extract(&mut buffer).unwrap();
        assert_eq!(extracted.split_header().unwrap().2, b"split!");
    }

    #[test]
    fn test_trailing_escape_is_incomplete() {
        let mut buffer = buffer_of(&[START, 0, 0, ESCAPE]);
        assert_eq!(try_extract(&mut buffer), None);

        buffer.extend([STOP, STOP]);
        let extracted = try_extract(&mut buffer).unwrap();
        assert_eq!(extracted.payload, vec![0, 0, STOP]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_following_frame_stays_buffered() {
        let first = encode(b"one", 0).unwrap();
        let second = encode(b"two", 1).unwrap();
        let mut buffer = buffer_of(first.as_bytes());
        buffer.extend(&second.as_bytes()[..3]);

        let extracted = try_extract(&mut buffer).unwrap();
        assert_eq!(extracted.split_header().unwrap().2, b"one");
        assert_eq!(buffer.len(), 3);
        assert_eq!(try_extract(&mut buffer), None);

        buffer.extend(&second.as_bytes()[3..]);
        let extracted = try_extract(&mut buffer).unwrap();
        assert_eq!(extracted.split_header().unwrap(), (1, parity(b"two"), &b"two"[..]));
    }

    #[test]
    fn test_repeated_start_does_not_nest() {
        let mut buffer = buffer_of(&[START, START, 9, 0, STOP]);
        let extracted = try_extract(&mut buffer).unwrap();
        assert_eq!(extracted.payload, vec![9, 0]);
    }

    #[test]
    fn test_response_tag_outside_frame_is_data() {
        let mut buffer = buffer_of(&[RESPONSE, START, 0, 0, STOP]);
        let extracted = try_extract(&mut buffer).unwrap();
        assert_eq!(extracted.signal, None);
        assert_eq!(extracted.payload, vec![RESPONSE, 0, 0]);
    }

    #[test]
    fn test_no_stop_leaves_buffer() {
        let mut buffer = buffer_of(&[START, 1, 2, 3]);
        assert_eq!(try_extract(&mut buffer), None);
        assert_eq!(buffer, buffer_of(&[START, 1, 2, 3]));
    }
}
