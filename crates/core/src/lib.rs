//! paritylink-core: a parity-checked, stop-and-wait data link layer
//!
//! This library turns a client's byte stream into self-delimiting frames sent
//! one bit at a time, and rebuilds, checks and acknowledges frames arriving
//! from a bit-serial transport:
//! - Byte-stuffed framing with in-band ACK/NACK signals
//! - One parity bit per frame for corruption detection
//! - Stop-and-wait retransmission with a fixed attempt budget
//! - A seeded noisy wire for simulating two links end to end
//!
//! # Architecture
//!
//! - `bitio`: bits ↔ bytes, MSB-first
//! - `parity`: the per-frame parity bit
//! - `framing`: frame encoding and incremental extraction
//! - `arq`: the acknowledgment state machine
//! - `link`: the layer the client and transport talk to
//! - `channel`: simulated bit channel with random flips
//! - `sim`: two links joined by a pair of channels
//! - `metrics`: per-link counters
//!
//! # Example
//!
//! ```
//! use paritylink_core::channel::ChannelConfig;
//! use paritylink_core::link::LinkVariant;
//! use paritylink_core::sim::{Side, Simulation};
//!
//! let mut sim = Simulation::new(LinkVariant::Parity, ChannelConfig::perfect(7)).unwrap();
//! sim.transfer(Side::A, b"{escaped} \\ ~payload~").unwrap();
//! assert_eq!(sim.inbox(Side::B).concatenated(), b"{escaped} \\ ~payload~");
//! ```

pub mod arq;
pub mod bitio;
pub mod channel;
pub mod error;
pub mod framing;
pub mod link;
pub mod metrics;
pub mod parity;
pub mod sim;

// Re-export commonly used types
pub use error::{Error, Result};
pub use link::{Host, LinkLayer, LinkVariant, PhysicalLayer};
