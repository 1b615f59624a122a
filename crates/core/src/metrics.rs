//! Per-link counters.
//!
//! `LinkStats` is updated by the link after every send cycle and every
//! completed inbound frame. It is a plain value: the link hands out copies.
//!
//! Because the retry loop never yields to the receive path, a synchronous
//! host will see every send cycle end unacknowledged; `acks_received` counts
//! the ACKs that arrive afterwards.

use std::time::{Duration, Instant};

use crate::arq::{Disposition, SendOutcome};

/// Counters for one end of a link.
#[derive(Debug, Clone)]
pub struct LinkStats {
    /// When the link was created
    pub start_time: Instant,

    // === Client side ===
    /// Bytes handed to `send`
    pub bytes_queued: u64,

    /// Bytes handed to the client
    pub bytes_delivered: u64,

    // === Send side ===
    /// Data frames framed (one per chunk)
    pub frames_sent: u64,

    /// Extra transmissions of data frames
    pub retransmissions: u64,

    /// Send cycles that ended without an ACK having been seen
    pub frames_unacked: u64,

    /// Every frame put on the wire, responses included
    pub frames_transmitted: u64,

    /// Bits put on the wire
    pub bits_sent: u64,

    // === Receive side ===
    /// Bits received from the transport
    pub bits_received: u64,

    /// Complete frames extracted
    pub frames_received: u64,

    /// Frames that failed the parity check
    pub frames_corrupted: u64,

    /// Data frames with an unexpected sequence number
    pub frames_out_of_sequence: u64,

    /// Data frames delivered to the client
    pub frames_delivered: u64,

    // === Responses ===
    pub acks_sent: u64,
    pub nacks_sent: u64,
    pub acks_received: u64,
    pub nacks_received: u64,

    /// Response frames replayed after a NACK
    pub responses_replayed: u64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            bytes_queued: 0,
            bytes_delivered: 0,
            frames_sent: 0,
            retransmissions: 0,
            frames_unacked: 0,
            frames_transmitted: 0,
            bits_sent: 0,
            bits_received: 0,
            frames_received: 0,
            frames_corrupted: 0,
            frames_out_of_sequence: 0,
            frames_delivered: 0,
            acks_sent: 0,
            nacks_sent: 0,
            acks_received: 0,
            nacks_received: 0,
            responses_replayed: 0,
        }
    }

    /// Account for one finished send cycle.
    pub fn record_send(&mut self, outcome: SendOutcome) {
        self.frames_sent += 1;
        self.retransmissions += u64::from(outcome.attempts.saturating_sub(1));
        if !outcome.acked {
            self.frames_unacked += 1;
        }
    }

    /// Account for one completed inbound frame.
    pub fn record_disposition(&mut self, disposition: &Disposition) {
        self.frames_received += 1;

        match disposition {
            Disposition::Corrupted => {
                self.frames_corrupted += 1;
                self.nacks_sent += 1;
            }
            Disposition::Acknowledged => self.acks_received += 1,
            Disposition::Rejected { resent } => {
                self.nacks_received += 1;
                if *resent {
                    self.responses_replayed += 1;
                }
            }
            Disposition::Delivered(data) => {
                self.frames_delivered += 1;
                self.bytes_delivered += data.len() as u64;
                self.acks_sent += 1;
            }
            Disposition::OutOfSequence { .. } => {
                self.frames_out_of_sequence += 1;
                self.nacks_sent += 1;
            }
        }
    }

    pub fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fraction of received frames that failed parity.
    pub fn corruption_rate(&self) -> f64 {
        if self.frames_received == 0 {
            0.0
        } else {
            self.frames_corrupted as f64 / self.frames_received as f64
        }
    }

    /// Payload bytes delivered per wire bit received.
    pub fn efficiency(&self) -> f64 {
        if self.bits_received == 0 {
            0.0
        } else {
            (self.bytes_delivered * 8) as f64 / self.bits_received as f64
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self, name: &str) {
        println!("=== Link {} ===", name);
        println!("Queued:    {} bytes", self.bytes_queued);
        println!("Delivered: {} bytes in {} frames", self.bytes_delivered, self.frames_delivered);
        println!();
        println!("Frames sent: {} (+{} retransmissions, {} unacked)",
            self.frames_sent, self.retransmissions, self.frames_unacked);
        println!("Frames on wire: {} ({} bits)", self.frames_transmitted, self.bits_sent);
        println!();
        println!("Frames received: {} ({} bits)", self.frames_received, self.bits_received);
        println!("Corrupted: {} ({:.2}%)", self.frames_corrupted, self.corruption_rate() * 100.0);
        println!("Out of sequence: {}", self.frames_out_of_sequence);
        println!();
        println!("ACK sent/received:  {}/{}", self.acks_sent, self.acks_received);
        println!("NACK sent/received: {}/{}", self.nacks_sent, self.nacks_received);
        println!("Responses replayed: {}", self.responses_replayed);
        println!();
    }

    /// Export counters as `key=value` lines.
    pub fn export_text(&self) -> String {
        format!(
            "bytes_queued={}\n\
             bytes_delivered={}\n\
             frames_sent={}\n\
             retransmissions={}\n\
             frames_unacked={}\n\
             frames_received={}\n\
             frames_corrupted={}\n\
             frames_out_of_sequence={}\n\
             frames_delivered={}\n\
             acks_sent={}\n\
             nacks_sent={}\n\
             acks_received={}\n\
             nacks_received={}\n",
            self.bytes_queued,
            self.bytes_delivered,
            self.frames_sent,
            self.retransmissions,
            self.frames_unacked,
            self.frames_received,
            self.frames_corrupted,
            self.frames_out_of_sequence,
            self.frames_delivered,
            self.acks_sent,
            self.nacks_sent,
            self.acks_received,
            self.nacks_received,
        )
    }
}

impl Default for LinkStats {
    fn default() -> Self {
        Self::new()
    }
}
