//! Transport session
//!
//! Drives a [`Decoder`] from a byte transport. The receive half is read on a
//! dedicated thread; every read result becomes one chunk, stamped with the
//! time it arrived, and is handed to the consumer loop over a channel so
//! chunk order is preserved end to end. The consumer decodes each chunk,
//! writes the acknowledgment back when a control frame arrives and forwards
//! events to a caller-supplied sink.
//!
//! The transport is any `Read` / `Write` pair. Both halves should carry a
//! short timeout: read timeouts are retried silently, and a write timeout
//! bounds how long an acknowledgment can hold up the consumer.

use crate::decoder::{Decoder, DecoderStats};
use crate::types::{DecodedEvent, DecoderError, Result, Timestamp};
use chrono::Utc;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Size of the receive buffer handed to each read (default: 64 KiB)
    pub read_buffer_size: usize,
    /// How often the consumer checks for shutdown while idle (default: 100ms)
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 65536,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Events passed to the session sink
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// An event decoded from a received chunk
    Decoded(DecodedEvent),
    /// The acknowledgment was written back after a control frame
    Acknowledged,
    /// A non-fatal transport error (receive error or failed acknowledgment)
    TransportError(String),
}

/// Totals reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub stats: DecoderStats,
    pub acknowledgements: u64,
    pub transport_errors: u64,
}

/// Cloneable handle that stops a running session
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Delivery {
    Chunk { bytes: Vec<u8>, received_at: Timestamp },
    Error(String),
}

/// A started session over a transport
pub struct Session<R, W> {
    reader: R,
    writer: W,
    decoder: Arc<Decoder>,
    config: SessionConfig,
    shutdown: ShutdownHandle,
}

impl<R, W> Session<R, W>
where
    R: Read + Send + 'static,
    W: Write,
{
    /// Write the protocol handshake and return a session ready to run
    pub fn start(reader: R, mut writer: W, decoder: Arc<Decoder>, config: SessionConfig) -> Result<Self> {
        let handshake = decoder.handshake();
        writer
            .write_all(handshake)
            .and_then(|()| writer.flush())
            .map_err(|e| DecoderError::Handshake(e.to_string()))?;

        log::info!(
            "Session started ({} protocol, {} byte handshake sent)",
            decoder.config().variant,
            handshake.len()
        );

        Ok(Self {
            reader,
            writer,
            decoder,
            config,
            shutdown: ShutdownHandle::default(),
        })
    }

    /// Handle that stops [`Session::run`] from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Receive until the transport closes or the session is shut down
    pub fn run<F>(self, mut sink: F) -> Result<SessionSummary>
    where
        F: FnMut(SessionEvent),
    {
        let Session {
            reader,
            mut writer,
            decoder,
            config,
            shutdown,
        } = self;

        let (tx, rx) = crossbeam_channel::unbounded();
        let reader_shutdown = shutdown.clone();
        let buffer_size = config.read_buffer_size.max(1);
        let reader_thread = thread::Builder::new()
            .name("telemetry-rx".to_string())
            .spawn(move || read_loop(reader, tx, reader_shutdown, buffer_size))?;

        let mut summary = SessionSummary::default();
        let mut reader_finished = false;

        while !shutdown.is_shutdown() {
            match rx.recv_timeout(config.poll_interval) {
                Ok(Delivery::Chunk { bytes, received_at }) => {
                    let outcome = decoder.process_chunk(&bytes, received_at);

                    let ack_result = if outcome.acknowledge {
                        Some(
                            writer
                                .write_all(decoder.acknowledgement())
                                .and_then(|()| writer.flush()),
                        )
                    } else {
                        None
                    };

                    for event in outcome.events {
                        sink(SessionEvent::Decoded(event));
                    }

                    match ack_result {
                        Some(Ok(())) => {
                            summary.acknowledgements += 1;
                            log::debug!("Acknowledgment written");
                            sink(SessionEvent::Acknowledged);
                        }
                        Some(Err(e)) => {
                            summary.transport_errors += 1;
                            log::warn!("Failed to write acknowledgment: {}", e);
                            sink(SessionEvent::TransportError(e.to_string()));
                        }
                        None => {}
                    }
                }
                Ok(Delivery::Error(message)) => {
                    summary.transport_errors += 1;
                    log::warn!("Transport error: {}", message);
                    sink(SessionEvent::TransportError(message));
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    reader_finished = true;
                    break;
                }
            }
        }

        drop(rx);
        if reader_finished {
            if reader_thread.join().is_err() {
                log::error!("Receive thread panicked");
            }
        } else {
            // Not joined: the reader exits on its own once its current read returns
            log::debug!("Session shut down, detaching receive thread");
        }

        summary.stats = decoder.stats();
        log::info!(
            "Session ended: {} chunks, {} data frames, {} control frames, {} transponders",
            summary.stats.chunks,
            summary.stats.data_frames,
            summary.stats.control_frames,
            summary.stats.transponders
        );
        Ok(summary)
    }
}

fn read_loop<R: Read>(mut reader: R, tx: Sender<Delivery>, shutdown: ShutdownHandle, buffer_size: usize) {
    let mut buffer = vec![0u8; buffer_size];

    while !shutdown.is_shutdown() {
        match reader.read(&mut buffer) {
            Ok(0) => {
                log::info!("Transport closed");
                break;
            }
            Ok(n) => {
                let delivery = Delivery::Chunk {
                    bytes: buffer[..n].to_vec(),
                    received_at: Utc::now(),
                };
                log::trace!("Received {} bytes", n);
                if tx.send(delivery).is_err() {
                    break;
                }
            }
            Err(e) if is_retryable(e.kind()) => continue,
            Err(e) => {
                let disconnected = is_disconnect(e.kind());
                if tx.send(Delivery::Error(e.to_string())).is_err() || disconnected {
                    break;
                }
            }
        }
    }
}

fn is_retryable(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock)
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof | ErrorKind::PermissionDenied
    )
}
