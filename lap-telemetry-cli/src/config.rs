//! Serial link settings
//!
//! Defaults match the controller's fixed line setup: 9600 baud, 8N1,
//! XON/XOFF flow control, DTR asserted and RTS released.

use clap::ValueEnum;
use std::time::Duration;

/// Flow control selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlowControlMode {
    None,
    Software,
    Hardware,
}

/// Settings used to open the serial port
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub flow_control: FlowControlMode,
    /// Assert DTR after opening
    pub dtr: bool,
    /// Assert RTS after opening
    pub rts: bool,
    /// Read timeout, also bounding acknowledgment writes
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            flow_control: FlowControlMode::Software,
            dtr: true,
            rts: false,
            timeout_ms: 300,
        }
    }
}

impl SerialSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
