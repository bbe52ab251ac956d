//! Decoder configuration types
//!
//! This module defines the configuration needed by the decoder library.
//! There is no configuration file; the application builds a config from
//! command-line flags.

use crate::protocol::{ProtocolVariant, MIN_RECORD_LEN, RECORD_LEN};
use crate::types::{DecoderError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the decoder library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Protocol variant spoken by the controller
    #[serde(default)]
    pub variant: ProtocolVariant,

    /// Refresh latency above which an observation is flagged (default: 310ms)
    #[serde(default = "default_latency_threshold")]
    pub latency_threshold_ms: u64,

    /// Data record length in bytes (default: 13)
    #[serde(default = "default_record_len")]
    pub record_len: usize,

    /// Override lap tracking (None = follow the variant)
    #[serde(default)]
    pub lap_tracking: Option<bool>,
}

fn default_latency_threshold() -> u64 {
    310
}

fn default_record_len() -> usize {
    RECORD_LEN
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            variant: ProtocolVariant::default(),
            latency_threshold_ms: default_latency_threshold(),
            record_len: default_record_len(),
            lap_tracking: None,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the protocol variant
    pub fn with_variant(mut self, variant: ProtocolVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Builder method: set the refresh latency threshold
    pub fn with_latency_threshold(mut self, threshold_ms: u64) -> Self {
        self.latency_threshold_ms = threshold_ms;
        self
    }

    /// Builder method: set the data record length
    pub fn with_record_len(mut self, record_len: usize) -> Self {
        self.record_len = record_len;
        self
    }

    /// Builder method: force lap tracking on or off
    pub fn with_lap_tracking(mut self, enabled: bool) -> Self {
        self.lap_tracking = Some(enabled);
        self
    }

    /// Refresh latency threshold as a duration
    pub fn latency_threshold(&self) -> Duration {
        Duration::from_millis(self.latency_threshold_ms)
    }

    /// Whether lap counters are tracked
    pub fn tracks_laps(&self) -> bool {
        self.lap_tracking.unwrap_or_else(|| self.variant.tracks_laps())
    }

    /// Check the configuration for values the decoder cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.record_len < MIN_RECORD_LEN {
            return Err(DecoderError::InvalidConfig(format!(
                "record length {} is shorter than the minimum of {} bytes",
                self.record_len, MIN_RECORD_LEN
            )));
        }

        if let Some(size) = self
            .variant
            .control_frame_sizes()
            .iter()
            .find(|size| *size % self.record_len == 0)
        {
            return Err(DecoderError::InvalidConfig(format!(
                "control frame size {} is a multiple of the record length {}",
                size, self.record_len
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_variant(ProtocolVariant::RefreshOnly)
            .with_latency_threshold(500)
            .with_lap_tracking(true);

        assert_eq!(config.variant, ProtocolVariant::RefreshOnly);
        assert_eq!(config.latency_threshold(), Duration::from_millis(500));
        assert!(config.tracks_laps());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::new();
        assert_eq!(config.variant, ProtocolVariant::LapCounter);
        assert_eq!(config.latency_threshold_ms, 310);
        assert_eq!(config.record_len, 13);
        assert!(config.tracks_laps());
        assert!(!DecoderConfig::new()
            .with_variant(ProtocolVariant::RefreshOnly)
            .tracks_laps());
    }

    #[test]
    fn test_validation() {
        assert!(DecoderConfig::new().with_record_len(6).validate().is_err());
        // 18 is a multiple of 9, so control frames would be ambiguous
        assert!(DecoderConfig::new().with_record_len(9).validate().is_err());
        assert!(DecoderConfig::new().with_record_len(7).validate().is_ok());
    }
}
