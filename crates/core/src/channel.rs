//! Simulated bit-serial wire with random bit flips.
//!
//! A `BitChannel` carries bits in one direction. Its `WireEnd` is handed to
//! the sending link as its physical layer; whoever drives the simulation pulls
//! bits off the channel and feeds them to the receiving link.
//!
//! # Simulated Effects
//!
//! - **Corruption**: each bit is flipped independently with `flip_rate`
//!   (Bernoulli distribution)
//!
//! Bits are never lost, duplicated or reordered; frame-level loss shows up
//! only as corruption the link layer has to notice.
//!
//! # Determinism
//!
//! All randomness comes from a seeded ChaCha8 RNG. Given the same seed
//! and inputs, outputs are bit-identical.
//!
//! # Thread Safety
//!
//! Single-threaded: the channel and its wire end share state through
//! `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::link::PhysicalLayer;

/// Configuration for one direction of the wire.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Probability that any single bit is inverted [0.0, 1.0]
    pub flip_rate: f64,

    /// Random seed for determinism
    pub seed: u64,
}

impl ChannelConfig {
    /// A wire that never corrupts anything.
    pub fn perfect(seed: u64) -> Self {
        Self {
            flip_rate: 0.0,
            seed,
        }
    }

    /// A wire flipping roughly one bit in ten thousand.
    pub fn noisy(seed: u64) -> Self {
        Self {
            flip_rate: 0.0001,
            seed,
        }
    }

    /// Same impairments, different random stream; used for the return path.
    pub fn reversed(self) -> Self {
        Self {
            seed: self.seed ^ 0x9E37_79B9_7F4A_7C15,
            ..self
        }
    }
}

/// Statistics about channel behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Bits put on the wire by the sender
    pub bits_sent: u64,

    /// Bits inverted in transit
    pub bits_flipped: u64,

    /// Bits handed to the receiver
    pub bits_delivered: u64,

    /// Bits still on the wire
    pub bits_in_flight: usize,
}

impl ChannelStats {
    /// Observed flip rate (flipped / sent).
    pub fn flip_rate(&self) -> f64 {
        if self.bits_sent == 0 {
            0.0
        } else {
            self.bits_flipped as f64 / self.bits_sent as f64
        }
    }
}

#[derive(Debug)]
struct Lane {
    flip_rate: f64,
    rng: ChaCha8Rng,
    queue: VecDeque<bool>,
    bits_sent: u64,
    bits_flipped: u64,
    bits_delivered: u64,
}

impl Lane {
    fn push(&mut self, bit: bool) {
        self.bits_sent += 1;

        let mut bit = bit;
        if self.flip_rate > 0.0 {
            let roll: f64 = self.rng.gen();
            if roll < self.flip_rate {
                self.bits_flipped += 1;
                trace!(index = self.bits_sent - 1, "bit flipped in transit");
                bit = !bit;
            }
        }

        self.queue.push_back(bit);
    }
}

/// One direction of a simulated wire.
#[derive(Debug, Clone)]
pub struct BitChannel {
    lane: Rc<RefCell<Lane>>,
}

impl BitChannel {
    /// Create a new channel with the given configuration.
    pub fn new(config: ChannelConfig) -> Self {
        let lane = Lane {
            flip_rate: config.flip_rate,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            queue: VecDeque::new(),
            bits_sent: 0,
            bits_flipped: 0,
            bits_delivered: 0,
        };
        Self {
            lane: Rc::new(RefCell::new(lane)),
        }
    }

    /// The sending end, to be installed as a link's physical layer.
    pub fn sender(&self) -> WireEnd {
        WireEnd {
            lane: Rc::clone(&self.lane),
        }
    }

    /// Take the oldest bit off the wire.
    pub fn recv(&self) -> Option<bool> {
        let mut lane = self.lane.borrow_mut();
        let bit = lane.queue.pop_front()?;
        lane.bits_delivered += 1;
        Some(bit)
    }

    /// Check if any bits are still on the wire.
    pub fn has_pending(&self) -> bool {
        !self.lane.borrow().queue.is_empty()
    }

    /// Take every bit currently on the wire.
    pub fn drain(&self) -> Vec<bool> {
        let mut lane = self.lane.borrow_mut();
        let bits: Vec<bool> = lane.queue.drain(..).collect();
        lane.bits_delivered += bits.len() as u64;
        bits
    }

    pub fn stats(&self) -> ChannelStats {
        let lane = self.lane.borrow();
        ChannelStats {
            bits_sent: lane.bits_sent,
            bits_flipped: lane.bits_flipped,
            bits_delivered: lane.bits_delivered,
            bits_in_flight: lane.queue.len(),
        }
    }
}

/// Sending end of a `BitChannel`.
#[derive(Debug)]
pub struct WireEnd {
    lane: Rc<RefCell<Lane>>,
}

impl PhysicalLayer for WireEnd {
    fn send(&mut self, bit: bool) {
        self.lane.borrow_mut().push(bit);
    }
}
