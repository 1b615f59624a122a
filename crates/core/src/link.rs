//! The data link layer: the only thing the transport and the client talk to.
//!
//! `LinkLayer` owns every buffer (inbound bits, inbound bytes, outbound bytes)
//! plus the `ArqState`, and drives the codec and the ARQ functions from its two
//! entry points:
//!
//! - `send(bytes)`: called by the client; chunks, frames and transmits,
//!   returning once every chunk's retry loop has run.
//! - `receive(bit)`: called by the transport for each inbound bit.
//!
//! Neither may be called concurrently on one instance.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace, warn};

use crate::arq::{self, ArqState, Disposition, FrameSink};
use crate::bitio::{BitAssembler, BitReader};
use crate::error::{Result, SetupError};
use crate::framing::{self, ExtractedFrame, Frame, MAX_FRAME_SIZE};
use crate::metrics::LinkStats;

/// Bit-serial transport underneath the link.
pub trait PhysicalLayer {
    /// Put one bit on the wire.
    fn send(&mut self, bit: bool);
}

impl<F: FnMut(bool)> PhysicalLayer for F {
    fn send(&mut self, bit: bool) {
        self(bit)
    }
}

/// Client above the link that consumes decoded payloads.
pub trait Host {
    /// Called once per valid, in-sequence data frame.
    fn receive(&mut self, data: &[u8]);
}

impl<F: FnMut(&[u8])> Host for F {
    fn receive(&mut self, data: &[u8]) {
        self(data)
    }
}

/// The closed set of framing/ARQ strategies a link can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkVariant {
    /// Escape-stuffed frames, one parity bit, stop-and-wait ACK/NACK
    #[default]
    Parity,
}

impl FromStr for LinkVariant {
    type Err = SetupError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "parity" => Ok(LinkVariant::Parity),
            _ => Err(SetupError::UnknownVariant(name.to_string())),
        }
    }
}

impl fmt::Display for LinkVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkVariant::Parity => f.write_str("parity"),
        }
    }
}

/// Serialises frames onto the physical layer, MSB of each byte first.
struct Transmitter {
    physical: Box<dyn PhysicalLayer>,
    frames: u64,
    bits: u64,
}

impl FrameSink for Transmitter {
    fn transmit(&mut self, frame: &Frame) {
        trace!(bytes = ?frame.as_bytes(), "transmitting frame");
        for bit in BitReader::new(frame.as_bytes()) {
            self.physical.send(bit);
            self.bits += 1;
        }
        self.frames += 1;
    }
}

/// Assembles a `LinkLayer`, rejecting incomplete wiring.
#[derive(Default)]
pub struct LinkBuilder {
    variant: LinkVariant,
    physical: Option<Box<dyn PhysicalLayer>>,
    client: Option<Box<dyn Host>>,
}

impl LinkBuilder {
    pub fn variant(mut self, variant: LinkVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn physical(mut self, physical: Box<dyn PhysicalLayer>) -> Self {
        self.physical = Some(physical);
        self
    }

    pub fn client(mut self, client: Box<dyn Host>) -> Self {
        self.client = Some(client);
        self
    }

    /// # Errors
    /// `SetupError::NoTransport` if no physical layer was given.
    pub fn build(self) -> Result<LinkLayer> {
        let physical = self.physical.ok_or(SetupError::NoTransport)?;

        Ok(LinkLayer {
            variant: self.variant,
            transmitter: Transmitter {
                physical,
                frames: 0,
                bits: 0,
            },
            client: self.client,
            assembler: BitAssembler::new(),
            receive_buffer: VecDeque::new(),
            send_buffer: VecDeque::new(),
            arq: ArqState::new(),
            stats: LinkStats::new(),
        })
    }
}

/// One end of a point-to-point link.
pub struct LinkLayer {
    variant: LinkVariant,
    transmitter: Transmitter,
    client: Option<Box<dyn Host>>,
    assembler: BitAssembler,
    receive_buffer: VecDeque<u8>,
    send_buffer: VecDeque<u8>,
    arq: ArqState,
    stats: LinkStats,
}

impl LinkLayer {
    pub fn builder() -> LinkBuilder {
        LinkBuilder::default()
    }

    /// Build a link from a variant name, as read from configuration.
    pub fn create(
        variant: &str,
        physical: Option<Box<dyn PhysicalLayer>>,
        client: Box<dyn Host>,
    ) -> Result<Self> {
        let mut builder = Self::builder().variant(variant.parse()?).client(client);
        if let Some(physical) = physical {
            builder = builder.physical(physical);
        }
        builder.build()
    }

    /// Attach the client that receives decoded payloads.
    ///
    /// # Errors
    /// `SetupError::DoubleRegistration` if a client is already attached.
    pub fn register(&mut self, client: Box<dyn Host>) -> Result<()> {
        if self.client.is_some() {
            return Err(SetupError::DoubleRegistration.into());
        }
        self.client = Some(client);
        Ok(())
    }

    /// Queue `data` and send all of it, one frame-sized chunk at a time.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.send_buffer.extend(data);
        self.stats.bytes_queued += data.len() as u64;

        while !self.send_buffer.is_empty() {
            self.send_next_frame()?;
        }
        Ok(())
    }

    fn send_next_frame(&mut self) -> Result<()> {
        let frame_size = self.send_buffer.len().min(MAX_FRAME_SIZE);
        let chunk: Vec<u8> = self.send_buffer.drain(..frame_size).collect();

        match self.variant {
            LinkVariant::Parity => {
                arq::on_send_requested(&mut self.arq, &chunk, &mut self.transmitter)?;
                let outcome = arq::on_finish_send(&mut self.arq, &mut self.transmitter);
                debug!(
                    len = chunk.len(),
                    attempts = outcome.attempts,
                    acked = outcome.acked,
                    "send cycle finished"
                );
                self.stats.record_send(outcome);
            }
        }
        Ok(())
    }

    /// Accept one bit from the transport.
    ///
    /// Each completed byte is appended to the receive buffer, which is then
    /// checked for a complete frame.
    pub fn receive(&mut self, bit: bool) {
        self.stats.bits_received += 1;

        let Some(byte) = self.assembler.push(bit) else {
            return;
        };
        trace!(byte = %byte.escape_ascii(), "received byte");
        self.receive_buffer.push_back(byte);

        if let Some(frame) = framing::try_extract(&mut self.receive_buffer) {
            self.finish_frame_receive(frame);
        }
    }

    fn finish_frame_receive(&mut self, frame: ExtractedFrame) {
        let disposition = match self.variant {
            LinkVariant::Parity => {
                self.arq.record_signal(frame.signal);
                arq::on_frame_received(&mut self.arq, &frame, &mut self.transmitter)
            }
        };
        self.stats.record_disposition(&disposition);

        if let Disposition::Delivered(data) = disposition {
            match self.client.as_mut() {
                Some(client) => client.receive(&data),
                None => warn!(len = data.len(), "no client registered; dropping payload"),
            }
        }
    }

    pub fn variant(&self) -> LinkVariant {
        self.variant
    }

    /// Current protocol state.
    pub fn arq_state(&self) -> &ArqState {
        &self.arq
    }

    /// Counters for this link, including transmitter totals.
    pub fn stats(&self) -> LinkStats {
        let mut stats = self.stats.clone();
        stats.frames_transmitted = self.transmitter.frames;
        stats.bits_sent = self.transmitter.bits;
        stats
    }

    /// Bytes received but not yet consumed by a complete frame.
    pub fn buffered_bytes(&self) -> usize {
        self.receive_buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::Error;
    use crate::framing::{encode, encode_response, ResponseSignal};

    type Shared<T> = Rc<RefCell<T>>;

    fn wire() -> (Shared<Vec<bool>>, Box<dyn PhysicalLayer>) {
        let bits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&bits);
        (bits, Box::new(move |bit| sink.borrow_mut().push(bit)))
    }

    fn inbox() -> (Shared<Vec<Vec<u8>>>, Box<dyn Host>) {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        (received, Box::new(move |data: &[u8]| sink.borrow_mut().push(data.to_vec())))
    }

    fn feed(link: &mut LinkLayer, bytes: &[u8]) {
        for bit in BitReader::new(bytes) {
            link.receive(bit);
        }
    }

    fn frames_on(bits: &[bool]) -> Vec<ExtractedFrame> {
        let mut assembler = BitAssembler::new();
        let mut buffer: VecDeque<u8> = bits.iter().filter_map(|&b| assembler.push(b)).collect();
        std::iter::from_fn(|| framing::try_extract(&mut buffer)).collect()
    }

    #[test]
    fn test_missing_transport_is_fatal() {
        let (_, client) = inbox();
        let result = LinkLayer::builder().client(client).build();
        assert!(matches!(result, Err(Error::Setup(SetupError::NoTransport))));
    }

    #[test]
    fn test_double_registration_is_fatal() {
        let (_, physical) = wire();
        let (_, first) = inbox();
        let (_, second) = inbox();
        let mut link = LinkLayer::builder().physical(physical).build().unwrap();

        link.register(first).unwrap();
        assert!(matches!(
            link.register(second),
            Err(Error::Setup(SetupError::DoubleRegistration))
        ));
    }

    #[test]
    fn test_create_by_name() {
        let (_, physical) = wire();
        let (_, client) = inbox();
        let link = LinkLayer::create("Parity", Some(physical), client).unwrap();
        assert_eq!(link.variant(), LinkVariant::Parity);

        let (_, physical) = wire();
        let (_, client) = inbox();
        assert!(matches!(
            LinkLayer::create("crc", Some(physical), client),
            Err(Error::Setup(SetupError::UnknownVariant(name))) if name == "crc"
        ));
    }

    #[test]
    fn test_send_chunks_and_retries() {
        let (bits, physical) = wire();
        let mut link = LinkLayer::builder().physical(physical).build().unwrap();

        link.send(b"0123456789").unwrap();

        let frames = frames_on(&bits.borrow());
        assert_eq!(frames.len(), 20);
        assert!(frames[..10].iter().all(|f| f.payload[0] == 0 && &f.payload[2..] == b"01234567"));
        assert!(frames[10..].iter().all(|f| f.payload[0] == 1 && &f.payload[2..] == b"89"));
        assert_eq!(link.arq_state().send_seq(), 2);

        let stats = link.stats();
        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.retransmissions, 18);
        assert_eq!(stats.frames_transmitted, 20);
    }

    #[test]
    fn test_send_empty_is_noop() {
        let (bits, physical) = wire();
        let mut link = LinkLayer::builder().physical(physical).build().unwrap();
        link.send(&[]).unwrap();
        assert!(bits.borrow().is_empty());
        assert_eq!(link.arq_state().send_seq(), 0);
    }

    #[test]
    fn test_receive_delivers_and_acks() {
        let (bits, physical) = wire();
        let (received, client) = inbox();
        let mut link = LinkLayer::builder().physical(physical).client(client).build().unwrap();

        let frame = encode(b"{hi}", 0).unwrap();
        feed(&mut link, frame.as_bytes());

        assert_eq!(*received.borrow(), vec![b"{hi}".to_vec()]);
        assert_eq!(link.buffered_bytes(), 0);
        let responses = frames_on(&bits.borrow());
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].signal, Some(ResponseSignal::Ack));
    }

    #[test]
    fn test_duplicate_frame_delivered_once() {
        let (bits, physical) = wire();
        let (received, client) = inbox();
        let mut link = LinkLayer::builder().physical(physical).client(client).build().unwrap();

        let frame = encode(b"dup", 0).unwrap();
        feed(&mut link, frame.as_bytes());
        feed(&mut link, frame.as_bytes());

        assert_eq!(received.borrow().len(), 1);
        let signals: Vec<_> = frames_on(&bits.borrow()).iter().map(|f| f.signal).collect();
        assert_eq!(signals, vec![Some(ResponseSignal::Ack), Some(ResponseSignal::Nack)]);
        assert_eq!(link.stats().frames_out_of_sequence, 1);
    }

    #[test]
    fn test_partial_bits_wait_for_more() {
        let (_, physical) = wire();
        let (received, client) = inbox();
        let mut link = LinkLayer::builder().physical(physical).client(client).build().unwrap();

        let frame = encode(b"abc", 0).unwrap();
        let bits: Vec<bool> = BitReader::new(frame.as_bytes()).collect();
        let (head, tail) = bits.split_at(bits.len() - 3);

        head.iter().for_each(|&b| link.receive(b));
        assert!(received.borrow().is_empty());
        tail.iter().for_each(|&b| link.receive(b));
        assert_eq!(received.borrow().len(), 1);
    }

    #[test]
    fn test_ack_updates_sender() {
        let (_, physical) = wire();
        let mut link = LinkLayer::builder().physical(physical).build().unwrap();
        link.send(b"x").unwrap();

        feed(&mut link, encode_response(ResponseSignal::Ack, 0).as_bytes());

        assert_eq!(link.arq_state().ack_status(), arq::AckStatus::Acked);
        assert_eq!(link.stats().acks_received, 1);
    }

    #[test]
    fn test_delivery_without_client_is_dropped() {
        let (bits, physical) = wire();
        let mut link = LinkLayer::builder().physical(physical).build().unwrap();

        feed(&mut link, encode(b"lost", 0).unwrap().as_bytes());

        assert_eq!(link.arq_state().recv_seq(), 1);
        assert_eq!(frames_on(&bits.borrow()).len(), 1);
    }

    #[test]
    fn test_variant_names() {
        assert_eq!("parity".parse::<LinkVariant>(), Ok(LinkVariant::Parity));
        assert_eq!(LinkVariant::Parity.to_string(), "parity");
        assert_eq!(
            "Dumb".parse::<LinkVariant>(),
            Err(SetupError::UnknownVariant("Dumb".to_string()))
        );
    }
}
