//! Console rendering of session events
//!
//! Text output follows the controller tool's classic format; JSON output
//! writes one object per line for piping into other tools.

use anyhow::Result;
use lap_telemetry_decoder::{DecodedEvent, ObservationResult, Reading, SessionEvent, SessionSummary, Timestamp};
use serde::Serialize;

const SKIPPED_LAP_BANNER: &str = "*******************************************************";
const BELL: char = '\u{7}';

/// Renders session events as console lines
pub struct Reporter {
    json: bool,
    tracks_laps: bool,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Observation {
        timestamp: Timestamp,
        id: u8,
        lap: u16,
        first_seen: bool,
        latency_ms: Option<u64>,
        latency_anomaly: bool,
        lap_advance: bool,
        skipped: bool,
    },
    Control {
        timestamp: Timestamp,
        len: usize,
    },
    Acknowledged,
    TransportError {
        message: &'a str,
    },
}

impl Reporter {
    pub fn new(json: bool, tracks_laps: bool) -> Self {
        Self { json, tracks_laps }
    }

    /// Render one event; None when the event produces no output
    pub fn render(&self, event: &SessionEvent) -> Result<Option<String>> {
        if self.json {
            return Ok(Some(serde_json::to_string(&Self::json_event(event))?));
        }

        Ok(match event {
            SessionEvent::Decoded(DecodedEvent::Observation { reading, result, .. }) => {
                Some(self.render_observation(reading, result))
            }
            SessionEvent::Decoded(DecodedEvent::ControlFrame { .. }) => None,
            SessionEvent::Acknowledged => None,
            SessionEvent::TransportError(message) => Some(message.clone()),
        })
    }

    fn render_observation(&self, reading: &Reading, result: &ObservationResult) -> String {
        let id = reading.id;
        let mut lines = Vec::new();

        match result.refresh_latency {
            Some(latency) => {
                let ms = (latency.as_secs_f64() * 1000.0).round() as u64;
                let suffix = if result.latency_anomaly { " (more than 300)" } else { "" };
                lines.push(format!("Id={}, Refresh rate={}ms{}", id, ms, suffix));
            }
            None => lines.push(format!("Id={}", id)),
        }

        if result.is_first_seen && self.tracks_laps {
            lines.push(format!("Id={} Lap={}", id, reading.lap_counter));
        }

        if let Some(lap) = result.lap_event {
            if lap.skipped {
                lines.push(SKIPPED_LAP_BANNER.to_string());
            }
            lines.push(format!("Id={} Lap={}{}", id, lap.new_lap, BELL));
        }

        lines.join("\n")
    }

    fn json_event(event: &SessionEvent) -> JsonEvent<'_> {
        match event {
            SessionEvent::Decoded(DecodedEvent::Observation {
                timestamp,
                reading,
                result,
            }) => JsonEvent::Observation {
                timestamp: *timestamp,
                id: reading.id,
                lap: reading.lap_counter,
                first_seen: result.is_first_seen,
                latency_ms: result.refresh_latency.map(|d| d.as_millis() as u64),
                latency_anomaly: result.latency_anomaly,
                lap_advance: result.lap_event.is_some(),
                skipped: result.lap_event.map_or(false, |lap| lap.skipped),
            },
            SessionEvent::Decoded(DecodedEvent::ControlFrame { timestamp, len }) => JsonEvent::Control {
                timestamp: *timestamp,
                len: *len,
            },
            SessionEvent::Acknowledged => JsonEvent::Acknowledged,
            SessionEvent::TransportError(message) => JsonEvent::TransportError { message },
        }
    }
}

/// One-line summary printed when the session ends
pub fn summary_line(summary: &SessionSummary) -> String {
    let stats = &summary.stats;
    format!(
        "{} chunks, {} data frames, {} control frames ({} acknowledged), {} ignored chunks, {} transponders, {} transport errors",
        stats.chunks,
        stats.data_frames,
        stats.control_frames,
        summary.acknowledgements,
        stats.ignored_chunks,
        stats.transponders,
        summary.transport_errors
    )
}
