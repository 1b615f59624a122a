//! Stop-and-wait ARQ over parity-checked frames.
//!
//! All protocol state lives in one `ArqState` value owned by the link and
//! borrowed into the functions here. Frames leave through a `FrameSink`.
//!
//! # Send side
//!
//! ```text
//! on_send_requested ──► Awaiting ──(ACK seen)──► Acked
//!        │                  │
//!        └── on_finish_send: up to 9 resends while not Acked,
//!            then send_seq += 1 whatever happened
//! ```
//!
//! # Receive side
//!
//! Checked in this order, first match wins:
//! 1. parity mismatch → NACK
//! 2. ACK signal → mark Acked
//! 3. NACK signal → resend last response, only if nothing was ever sent
//! 4. data with the expected seq → deliver, ACK; any other seq → NACK
//!
//! The retry loop never waits: in a synchronous host it simply sends the
//! frame ten times. A reply can only change `ack_status` between loops.

use tracing::{debug, warn};

use crate::error::Result;
use crate::framing::{encode, encode_response, ExtractedFrame, Frame, ResponseSignal};
use crate::parity;

/// Total transmissions of one data frame, first send included.
pub const MAX_SEND_ATTEMPTS: u8 = 10;

/// Anything that can put a finished frame on the wire.
pub trait FrameSink {
    /// Transmit one frame.
    fn transmit(&mut self, frame: &Frame);
}

impl FrameSink for Vec<Frame> {
    fn transmit(&mut self, frame: &Frame) {
        self.push(frame.clone());
    }
}

/// Acknowledgment state of the most recent data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckStatus {
    /// Nothing sent yet
    #[default]
    Idle,
    /// Sent, no ACK observed
    Awaiting,
    /// Peer acknowledged it
    Acked,
}

/// Protocol state for one link, both directions.
#[derive(Debug, Clone, Default)]
pub struct ArqState {
    send_seq: u8,
    recv_seq: u8,
    ack_status: AckStatus,
    pending_signal: Option<ResponseSignal>,
    last_frame_sent: Option<Frame>,
    last_response_frame: Option<Frame>,
}

impl ArqState {
    /// Fresh state: both counters at zero, nothing outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next data frame will carry.
    pub fn send_seq(&self) -> u8 {
        self.send_seq
    }

    /// Sequence number expected on the next new inbound data frame.
    pub fn recv_seq(&self) -> u8 {
        self.recv_seq
    }

    pub fn ack_status(&self) -> AckStatus {
        self.ack_status
    }

    pub fn last_frame_sent(&self) -> Option<&Frame> {
        self.last_frame_sent.as_ref()
    }

    pub fn last_response_frame(&self) -> Option<&Frame> {
        self.last_response_frame.as_ref()
    }

    /// Stash the signal of a just-extracted frame for `on_frame_received`.
    pub fn record_signal(&mut self, signal: Option<ResponseSignal>) {
        self.pending_signal = signal;
    }

    fn send_response(&mut self, signal: ResponseSignal, sink: &mut impl FrameSink) {
        let frame = encode_response(signal, self.send_seq);
        sink.transmit(&frame);
        self.last_response_frame = Some(frame);
    }
}

/// How a send cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    /// Transmissions made, first send included
    pub attempts: u8,
    /// Whether an ACK had been observed when the loop stopped
    pub acked: bool,
}

/// What `on_frame_received` did with an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Parity check failed; NACK sent
    Corrupted,
    /// Peer acknowledged our outstanding frame
    Acknowledged,
    /// Peer rejected a frame; `resent` tells whether a response was replayed
    Rejected { resent: bool },
    /// New in-sequence data for the client; ACK sent
    Delivered(Vec<u8>),
    /// Sequence number other than the expected one; NACK sent
    OutOfSequence { seq: u8, expected: u8 },
}

/// Frame `payload` with the current send sequence number and transmit it.
pub fn on_send_requested(
    state: &mut ArqState,
    payload: &[u8],
    sink: &mut impl FrameSink,
) -> Result<()> {
    let frame = encode(payload, state.send_seq)?;
    sink.transmit(&frame);
    state.last_frame_sent = Some(frame);
    state.ack_status = AckStatus::Awaiting;
    Ok(())
}

/// Resend the outstanding frame until ACKed or out of attempts, then advance.
///
/// `send_seq` moves on even when no ACK ever arrived; the frame is abandoned.
pub fn on_finish_send(state: &mut ArqState, sink: &mut impl FrameSink) -> SendOutcome {
    let mut attempts = 1;

    if let Some(frame) = &state.last_frame_sent {
        while attempts < MAX_SEND_ATTEMPTS && state.ack_status != AckStatus::Acked {
            sink.transmit(frame);
            attempts += 1;
        }
    }

    let acked = state.ack_status == AckStatus::Acked;
    if !acked {
        warn!(
            seq = state.send_seq,
            attempts, "retry budget spent without ACK; abandoning frame"
        );
    }
    state.send_seq = state.send_seq.wrapping_add(1);

    SendOutcome { attempts, acked }
}

/// Run the receive-side decision for one complete inbound frame.
///
/// The signal must have been stored with `ArqState::record_signal` first; it is
/// consumed here whatever the outcome. At most one response frame is sent.
pub fn on_frame_received(
    state: &mut ArqState,
    frame: &ExtractedFrame,
    sink: &mut impl FrameSink,
) -> Disposition {
    let signal = state.pending_signal.take();

    let Some((seq, sender_parity, data)) = frame
        .split_header()
        .filter(|(_, tag, data)| parity::verify(data, *tag))
    else {
        debug!(payload_len = frame.payload.len(), "parity mismatch; sending NACK");
        state.send_response(ResponseSignal::Nack, sink);
        return Disposition::Corrupted;
    };

    match signal {
        Some(ResponseSignal::Ack) => {
            debug!(seq, "ACK received");
            state.ack_status = AckStatus::Acked;
            Disposition::Acknowledged
        }
        Some(ResponseSignal::Nack) => {
            // Only a side that has never sent data replays its last response.
            let resent = match (&state.last_frame_sent, &state.last_response_frame) {
                (None, Some(response)) => {
                    sink.transmit(response);
                    true
                }
                _ => false,
            };
            debug!(seq, resent, "NACK received");
            Disposition::Rejected { resent }
        }
        None if seq == state.recv_seq => {
            debug!(seq, parity = sender_parity, len = data.len(), "delivering frame");
            let data = data.to_vec();
            state.recv_seq = state.recv_seq.wrapping_add(1);
            state.send_response(ResponseSignal::Ack, sink);
            Disposition::Delivered(data)
        }
        None => {
            debug!(seq, expected = state.recv_seq, "unexpected sequence; sending NACK");
            let expected = state.recv_seq;
            state.send_response(ResponseSignal::Nack, sink);
            Disposition::OutOfSequence { seq, expected }
        }
    }
}
