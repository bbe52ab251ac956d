//! Controller wire protocol
//!
//! Constants for the fixed 13-byte data record and the two protocol
//! variants spoken by lap-counting controllers.
//!
//! ## Data record layout
//! | Offset | Field |
//! |---|---|
//! | 1 | Transponder identifier (u8) |
//! | 5 | Lap counter low byte |
//! | 6 | Lap counter high byte |
//!
//! Remaining bytes are not interpreted.

use crate::types::DecoderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a data record in bytes
pub const RECORD_LEN: usize = 13;

/// Offset of the transponder identifier within a record
pub const ID_OFFSET: usize = 1;

/// Offset of the little-endian lap counter within a record
pub const LAP_OFFSET: usize = 5;

/// Smallest record that still holds the identifier and the lap counter
pub const MIN_RECORD_LEN: usize = LAP_OFFSET + 2;

/// Acknowledgment written back after every control frame (both variants)
pub const ACKNOWLEDGEMENT: [u8; 14] = [15, 255, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

const LAP_COUNTER_HANDSHAKE: [u8; 7] = [6, 6, 6, 6, 0, 0, 0];

/// Protocol variant spoken by the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolVariant {
    /// Variant A: lap counter tracking, 5 or 18 byte control frames
    #[default]
    LapCounter,
    /// Variant B: refresh latency only, 5 byte control frames
    RefreshOnly,
}

impl ProtocolVariant {
    /// Bytes written to the controller when a session starts
    pub fn handshake(&self) -> &'static [u8] {
        match self {
            ProtocolVariant::LapCounter => &LAP_COUNTER_HANDSHAKE,
            ProtocolVariant::RefreshOnly => &ACKNOWLEDGEMENT,
        }
    }

    /// Chunk sizes recognized as a single control frame
    pub fn control_frame_sizes(&self) -> &'static [usize] {
        match self {
            ProtocolVariant::LapCounter => &[5, 18],
            ProtocolVariant::RefreshOnly => &[5],
        }
    }

    /// Whether lap counters are tracked by default
    pub fn tracks_laps(&self) -> bool {
        matches!(self, ProtocolVariant::LapCounter)
    }

    /// Acknowledgment written back after a control frame
    pub fn acknowledgement(&self) -> &'static [u8] {
        &ACKNOWLEDGEMENT
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVariant::LapCounter => write!(f, "lap-counter"),
            ProtocolVariant::RefreshOnly => write!(f, "refresh-only"),
        }
    }
}

impl FromStr for ProtocolVariant {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "lap-counter" | "lapcounter" => Ok(ProtocolVariant::LapCounter),
            "b" | "refresh-only" | "refreshonly" => Ok(ProtocolVariant::RefreshOnly),
            other => Err(DecoderError::UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_handshakes() {
        assert_eq!(ProtocolVariant::LapCounter.handshake(), &[6, 6, 6, 6, 0, 0, 0]);
        assert_eq!(
            ProtocolVariant::RefreshOnly.handshake(),
            &[15, 255, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_acknowledgement_is_shared() {
        assert_eq!(
            ProtocolVariant::LapCounter.acknowledgement(),
            ProtocolVariant::RefreshOnly.acknowledgement()
        );
        assert_eq!(ACKNOWLEDGEMENT.len(), 14);
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("a".parse::<ProtocolVariant>().unwrap(), ProtocolVariant::LapCounter);
        assert_eq!("Refresh-Only".parse::<ProtocolVariant>().unwrap(), ProtocolVariant::RefreshOnly);
        assert!(matches!(
            "c".parse::<ProtocolVariant>(),
            Err(DecoderError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_variant_display_round_trips() {
        for variant in [ProtocolVariant::LapCounter, ProtocolVariant::RefreshOnly] {
            assert_eq!(variant.to_string().parse::<ProtocolVariant>().unwrap(), variant);
        }
    }

    #[test]
    fn test_record_layout_fits() {
        assert!(MIN_RECORD_LEN <= RECORD_LEN);
        assert!(ID_OFFSET < MIN_RECORD_LEN);
    }
}
