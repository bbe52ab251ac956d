//! Serial port access
//!
//! Port enumeration, the interactive port choice and opening the port as a
//! receive/transmit pair for the session.

use crate::config::{FlowControlMode, SerialSettings};
use anyhow::{Context, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

/// Names of the available serial ports, sorted
pub fn list_ports() -> Result<Vec<String>> {
    let mut names: Vec<String> = serialport::available_ports()
        .context("Failed to enumerate serial ports")?
        .into_iter()
        .map(|port| port.port_name)
        .collect();
    names.sort();
    Ok(names)
}

/// Parse a 1-based port choice typed by the user
///
/// Returns the 0-based index, or None for empty, non-numeric or out-of-range input.
pub fn parse_selection(input: &str, port_count: usize) -> Option<usize> {
    let choice: u8 = input.trim().parse().ok()?;
    let choice = choice as usize;
    (1..=port_count).contains(&choice).then(|| choice - 1)
}

/// Open a port and split it into receive and transmit halves
pub fn open(name: &str, settings: &SerialSettings) -> Result<(Box<dyn SerialPort>, Box<dyn SerialPort>)> {
    let flow_control = match settings.flow_control {
        FlowControlMode::None => FlowControl::None,
        FlowControlMode::Software => FlowControl::Software,
        FlowControlMode::Hardware => FlowControl::Hardware,
    };

    let mut port = serialport::new(name, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(flow_control)
        .timeout(settings.timeout())
        .open()
        .with_context(|| format!("Failed to open serial port {}", name))?;

    port.write_data_terminal_ready(settings.dtr)
        .with_context(|| format!("Failed to set DTR on {}", name))?;
    port.write_request_to_send(settings.rts)
        .with_context(|| format!("Failed to set RTS on {}", name))?;

    let writer = port
        .try_clone()
        .with_context(|| format!("Failed to clone serial port handle for {}", name))?;

    log::debug!(
        "Opened {} at {} baud ({:?} flow control, {}ms timeout)",
        name,
        settings.baud_rate,
        settings.flow_control,
        settings.timeout_ms
    );
    Ok((port, writer))
}
