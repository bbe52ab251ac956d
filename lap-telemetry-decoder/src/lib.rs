//! Lap Telemetry Decoder Library
//!
//! Decodes the binary telemetry stream of a race-track lap-counting
//! controller and tracks refresh latency and lap progression per
//! transponder.
//!
//! # Architecture
//!
//! The decode path is split into three stages, all reachable through
//! [`Decoder::process_chunk`]:
//! - Frame assembly: a receive chunk is cut into 13-byte data records or
//!   recognized as a single control frame
//! - Record decoding: a data record yields the transponder id and lap counter
//! - State tracking: each reading updates the per-transponder state and
//!   reports latency, lap advances and anomalies
//!
//! [`Session`] drives a decoder from any `Read`/`Write` transport: it sends
//! the handshake, reads on a dedicated thread and writes acknowledgments
//! back when the controller asks for them.
//!
//! The library does NOT:
//! - Open or enumerate serial ports
//! - Render results to the console
//! - Persist anything beyond the latest state per transponder
//!
//! # Example Usage
//!
//! ```no_run
//! use lap_telemetry_decoder::{Decoder, DecoderConfig, Session, SessionConfig, SessionEvent};
//! use std::sync::Arc;
//!
//! # fn open_link() -> (std::io::Empty, std::io::Sink) { (std::io::empty(), std::io::sink()) }
//! let (rx, tx) = open_link();
//! let decoder = Arc::new(Decoder::with_config(DecoderConfig::new()).unwrap());
//! let session = Session::start(rx, tx, decoder, SessionConfig::default()).unwrap();
//!
//! let summary = session
//!     .run(|event| {
//!         if let SessionEvent::Decoded(decoded) = event {
//!             println!("{:?}", decoded);
//!         }
//!     })
//!     .unwrap();
//! println!("{} chunks", summary.stats.chunks);
//! ```

// Public modules
pub mod assembler;
pub mod config;
pub mod decoder;
pub mod protocol;
pub mod record_decoder;
pub mod session;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use assembler::{Assembly, FrameAssembler};
pub use config::DecoderConfig;
pub use decoder::{ChunkOutcome, Decoder, DecoderStats};
pub use protocol::{ProtocolVariant, ACKNOWLEDGEMENT, RECORD_LEN};
pub use record_decoder::RecordDecoder;
pub use session::{Session, SessionConfig, SessionEvent, SessionSummary, ShutdownHandle};
pub use tracker::TransponderTracker;
pub use types::{
    DecodedEvent, DecoderError, Frame, FrameKind, LapEvent, ObservationResult, Reading,
    Result, Timestamp, TransponderId, TransponderState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
