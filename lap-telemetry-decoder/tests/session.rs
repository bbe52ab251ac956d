// End-to-end session tests over an in-memory transport
use lap_telemetry_decoder::{
    DecodedEvent, Decoder, DecoderConfig, ProtocolVariant, Session, SessionConfig, SessionEvent,
    ACKNOWLEDGEMENT,
};
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Reader that hands out one scripted result per `read` call, then end of stream
struct ScriptedReader {
    script: VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedReader {
    fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.pop_front() {
            Some(Ok(chunk)) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        }
    }
}

/// Writer that records everything written, optionally failing after the first write
#[derive(Clone, Default)]
struct RecordingWriter {
    written: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<usize>>,
    fail_after_first: bool,
}

impl RecordingWriter {
    fn failing_after_handshake() -> Self {
        Self {
            fail_after_first: true,
            ..Default::default()
        }
    }

    fn bytes(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

impl Write for RecordingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut writes = self.writes.lock().unwrap();
        if self.fail_after_first && *writes > 0 {
            return Err(io::Error::new(ErrorKind::TimedOut, "write timed out"));
        }
        *writes += 1;
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn record(id: u8, lap: u16) -> Vec<u8> {
    let mut record = vec![0u8; 13];
    record[1] = id;
    record[5] = (lap & 0xFF) as u8;
    record[6] = (lap >> 8) as u8;
    record
}

fn run_script(
    config: DecoderConfig,
    script: Vec<io::Result<Vec<u8>>>,
    writer: RecordingWriter,
) -> (Vec<SessionEvent>, lap_telemetry_decoder::SessionSummary) {
    let _ = env_logger::builder().is_test(true).try_init();

    let decoder = Arc::new(Decoder::with_config(config).unwrap());
    let session = Session::start(
        ScriptedReader::new(script),
        writer,
        decoder,
        SessionConfig::default(),
    )
    .unwrap();

    let mut events = Vec::new();
    let summary = session.run(|event| events.push(event)).unwrap();
    (events, summary)
}

#[test]
fn handshake_then_acknowledgement() {
    let writer = RecordingWriter::default();
    let mut burst = record(2, 10);
    burst.extend(record(3, 11));

    let (events, summary) = run_script(
        DecoderConfig::new(),
        vec![Ok(vec![1, 2, 3, 4, 5]), Ok(record(7, 259)), Ok(vec![0; 20]), Ok(burst)],
        writer.clone(),
    );

    let mut expected = vec![6, 6, 6, 6, 0, 0, 0];
    expected.extend_from_slice(&ACKNOWLEDGEMENT);
    assert_eq!(writer.bytes(), expected);

    assert!(matches!(
        events[0],
        SessionEvent::Decoded(DecodedEvent::ControlFrame { len: 5, .. })
    ));
    assert_eq!(events[1], SessionEvent::Acknowledged);

    let readings: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Decoded(DecodedEvent::Observation { reading, .. }) => {
                Some((reading.id, reading.lap_counter))
            }
            _ => None,
        })
        .collect();
    assert_eq!(readings, vec![(7, 259), (2, 10), (3, 11)]);

    assert_eq!(summary.acknowledgements, 1);
    assert_eq!(summary.transport_errors, 0);
    assert_eq!(summary.stats.chunks, 4);
    assert_eq!(summary.stats.ignored_chunks, 1);
    assert_eq!(summary.stats.data_frames, 3);
    assert_eq!(summary.stats.transponders, 3);
}

#[test]
fn refresh_only_variant_handshake() {
    let writer = RecordingWriter::default();
    let (_, summary) = run_script(
        DecoderConfig::new().with_variant(ProtocolVariant::RefreshOnly),
        vec![Ok(record(1, 1))],
        writer.clone(),
    );

    assert_eq!(writer.bytes(), ACKNOWLEDGEMENT.to_vec());
    assert_eq!(summary.stats.data_frames, 1);
}

#[test]
fn transport_errors_are_not_fatal() {
    let (events, summary) = run_script(
        DecoderConfig::new(),
        vec![
            Err(io::Error::new(ErrorKind::InvalidData, "parity error")),
            Err(io::Error::new(ErrorKind::TimedOut, "read timed out")),
            Ok(record(4, 1)),
        ],
        RecordingWriter::default(),
    );

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], SessionEvent::TransportError(message) if message.contains("parity")));
    assert!(matches!(
        &events[1],
        SessionEvent::Decoded(DecodedEvent::Observation { reading, .. }) if reading.id == 4
    ));
    assert_eq!(summary.transport_errors, 1);
}

#[test]
fn disconnect_ends_session() {
    let (events, summary) = run_script(
        DecoderConfig::new(),
        vec![
            Ok(record(1, 1)),
            Err(io::Error::new(ErrorKind::BrokenPipe, "device unplugged")),
            Ok(record(1, 2)),
        ],
        RecordingWriter::default(),
    );

    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], SessionEvent::TransportError(_)));
    assert_eq!(summary.stats.chunks, 1);
}

#[test]
fn failed_acknowledgement_keeps_receiving() {
    let (events, summary) = run_script(
        DecoderConfig::new(),
        vec![Ok(vec![0; 18]), Ok(record(8, 3))],
        RecordingWriter::failing_after_handshake(),
    );

    assert!(events
        .iter()
        .any(|event| matches!(event, SessionEvent::TransportError(_))));
    assert!(!events.contains(&SessionEvent::Acknowledged));
    assert!(matches!(
        events.last(),
        Some(SessionEvent::Decoded(DecodedEvent::Observation { .. }))
    ));
    assert_eq!(summary.acknowledgements, 0);
    assert_eq!(summary.transport_errors, 1);
}

#[test]
fn shutdown_stops_idle_session() {
    /// Reader that never produces data, like an idle serial port
    struct IdleReader;

    impl Read for IdleReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            thread::sleep(Duration::from_millis(5));
            Err(io::Error::new(ErrorKind::TimedOut, "read timed out"))
        }
    }

    let decoder = Arc::new(Decoder::new());
    let config = SessionConfig {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let session = Session::start(IdleReader, io::sink(), decoder, config).unwrap();
    let handle = session.shutdown_handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.shutdown();
    });

    let summary = session.run(|_| {}).unwrap();
    stopper.join().unwrap();
    assert_eq!(summary.stats.chunks, 0);
}
