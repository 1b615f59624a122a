//! Error types for the parity link.
//!
//! Only setup-time misconfiguration and misuse of the codec surface as errors.
//! Corruption, duplicates and lost acknowledgments are handled inside the ARQ
//! state machine and never reach the client as an `Err`.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Setup: wiring a link to its transport and client
/// - Frame: building a frame from an oversized payload
/// - I/O: reading input files in the simulator
/// - Config: invalid command-line values
#[derive(Debug, Error)]
pub enum Error {
    /// The link could not be assembled or registered
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    /// Frame construction failed
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Fatal misconfiguration detected while building a link.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    /// No physical layer was supplied
    #[error("no physical layer attached")]
    NoTransport,

    /// A client is already registered with this link
    #[error("attempt to double-register a client")]
    DoubleRegistration,

    /// The requested link variant does not exist
    #[error("unknown data link variant {0:?}")]
    UnknownVariant(String),
}

/// Frame construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Raw payload does not fit in one frame
    #[error("payload of {len} bytes exceeds frame limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
