//! Record decoding
//!
//! Extracts a transponder reading from a data frame. Control frames carry no
//! reading; they only tell the session that an acknowledgment is due.

use crate::protocol::{ID_OFFSET, LAP_OFFSET};
use crate::types::{Frame, FrameKind, Reading};
use byteorder::{ByteOrder, LittleEndian};

/// Record decoder - extracts readings from frames
pub struct RecordDecoder;

impl RecordDecoder {
    /// Decode a frame into a reading
    ///
    /// # Returns
    /// * `Some(Reading)` for a data frame
    /// * `None` for a control frame, or a data frame too short to hold the lap counter
    pub fn decode(frame: &Frame) -> Option<Reading> {
        match frame.kind {
            FrameKind::Data => Self::decode_record(&frame.bytes),
            FrameKind::Control => None,
        }
    }

    /// True if receiving this frame requires writing the acknowledgment back
    pub fn requires_acknowledgement(frame: &Frame) -> bool {
        frame.kind == FrameKind::Control
    }

    fn decode_record(record: &[u8]) -> Option<Reading> {
        if record.len() < LAP_OFFSET + 2 {
            log::warn!("Data record of {} bytes is too short to decode", record.len());
            return None;
        }

        Some(Reading {
            id: record[ID_OFFSET],
            lap_counter: LittleEndian::read_u16(&record[LAP_OFFSET..LAP_OFFSET + 2]),
        })
    }
}
