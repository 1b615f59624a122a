//! Two links joined by a pair of simulated channels.
//!
//! ```text
//!   inbox A ◄── link A ──WireEnd──► channel a→b ──pump──► link B ──► inbox B
//!                  ▲                                          │
//!                  └──pump── channel b→a ◄──WireEnd───────────┘
//! ```
//!
//! Everything runs on the caller's thread. `send` returns after the
//! sending link's retry loops finish; the bits then sit on the wire until
//! `pump` moves them, which is when the peer answers.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::channel::{BitChannel, ChannelConfig, ChannelStats};
use crate::error::Result;
use crate::link::{Host, LinkLayer, LinkVariant};

/// Upper bound on pump rounds, in case corrupted responses keep bouncing.
const MAX_PUMP_ROUNDS: usize = 1_000;

/// A `Host` that records every payload it is given.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    received: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads in delivery order.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.received.borrow().clone()
    }

    /// All delivered bytes joined together.
    pub fn concatenated(&self) -> Vec<u8> {
        self.received.borrow().concat()
    }

    pub fn len(&self) -> usize {
        self.received.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.borrow().is_empty()
    }
}

impl Host for Inbox {
    fn receive(&mut self, data: &[u8]) {
        self.received.borrow_mut().push(data.to_vec());
    }
}

/// Which end of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// Two links talking over simulated channels.
pub struct Simulation {
    link_a: LinkLayer,
    link_b: LinkLayer,
    a_to_b: BitChannel,
    b_to_a: BitChannel,
    inbox_a: Inbox,
    inbox_b: Inbox,
}

impl Simulation {
    /// Wire up two links of `variant`; the return path uses `config.reversed()`.
    pub fn new(variant: LinkVariant, config: ChannelConfig) -> Result<Self> {
        let a_to_b = BitChannel::new(config);
        let b_to_a = BitChannel::new(config.reversed());
        let inbox_a = Inbox::new();
        let inbox_b = Inbox::new();

        let link_a = LinkLayer::builder()
            .variant(variant)
            .physical(Box::new(a_to_b.sender()))
            .client(Box::new(inbox_a.clone()))
            .build()?;
        let link_b = LinkLayer::builder()
            .variant(variant)
            .physical(Box::new(b_to_a.sender()))
            .client(Box::new(inbox_b.clone()))
            .build()?;

        Ok(Self {
            link_a,
            link_b,
            a_to_b,
            b_to_a,
            inbox_a,
            inbox_b,
        })
    }

    /// Have one side send `data`; nothing is delivered until `pump`.
    pub fn send(&mut self, from: Side, data: &[u8]) -> Result<()> {
        match from {
            Side::A => self.link_a.send(data),
            Side::B => self.link_b.send(data),
        }
    }

    /// Send from one side and pump until the wire is quiet.
    pub fn transfer(&mut self, from: Side, data: &[u8]) -> Result<()> {
        self.send(from, data)?;
        self.pump();
        Ok(())
    }

    /// Move bits across both channels until neither has anything left.
    ///
    /// Returns the number of bits moved.
    pub fn pump(&mut self) -> u64 {
        let mut moved = 0;

        for round in 0..MAX_PUMP_ROUNDS {
            let before = moved;
            while let Some(bit) = self.a_to_b.recv() {
                self.link_b.receive(bit);
                moved += 1;
            }
            while let Some(bit) = self.b_to_a.recv() {
                self.link_a.receive(bit);
                moved += 1;
            }
            if moved == before {
                debug!(rounds = round, bits = moved, "wire quiet");
                return moved;
            }
        }

        warn!(rounds = MAX_PUMP_ROUNDS, "wire still busy; giving up");
        moved
    }

    pub fn link(&self, side: Side) -> &LinkLayer {
        match side {
            Side::A => &self.link_a,
            Side::B => &self.link_b,
        }
    }

    /// Payloads delivered to the client on `side`.
    pub fn inbox(&self, side: Side) -> &Inbox {
        match side {
            Side::A => &self.inbox_a,
            Side::B => &self.inbox_b,
        }
    }

    /// Stats of the channel carrying bits away from `side`.
    pub fn channel_stats(&self, from: Side) -> ChannelStats {
        match from {
            Side::A => self.a_to_b.stats(),
            Side::B => self.b_to_a.stats(),
        }
    }
}
