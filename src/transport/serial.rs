//! Serial port transport for WinKeyer-class keyers.
//!
//! WinKeyer hardware (K1EL WK2/WK3 and compatibles) talks 1200 baud 8N1 over a
//! USB virtual COM port or a plain RS-232 line.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, trace, warn};

use super::Transport;
use crate::error::{Error, Result};

/// Baud rate used by every WinKeyer firmware revision in host mode.
pub const WINKEYER_BAUD_RATE: u32 = 1200;

/// Serial port configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Drive DTR/RTS low right after opening. Some interfaces wire these
    /// lines to key or PTT inputs.
    pub deassert_control_lines: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: WINKEYER_BAUD_RATE,
            deassert_control_lines: true,
        }
    }
}

/// Serial port transport.
pub struct SerialTransport {
    port: Option<SerialStream>,
    port_name: String,
}

impl SerialTransport {
    /// Open `port` at the WinKeyer baud rate.
    pub async fn open(port: &str) -> Result<Self> {
        Self::open_with_config(port, SerialConfig::default()).await
    }

    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        debug!(port = %port, baud_rate = config.baud_rate, "Opening serial port");

        let mut stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("Failed to open serial port {}: {}", port, e))
            })?;

        if config.deassert_control_lines {
            if let Err(e) = stream.write_data_terminal_ready(false) {
                warn!(port = %port, error = %e, "Failed to de-assert DTR");
            }
            if let Err(e) = stream.write_request_to_send(false) {
                warn!(port = %port, error = %e, "Failed to de-assert RTS");
            }
        }

        info!(port = %port, baud_rate = config.baud_rate, "Serial port opened");

        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => {
            Error::Transport(format!("serial link lost: {}", e))
        }
        _ => Error::Io(e),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        trace!(port = %self.port_name, bytes = data.len(), "Sending data");

        port.write_all(data).await.map_err(|e| {
            error!(port = %self.port_name, error = %e, "Failed to send data");
            map_io_error(e)
        })?;
        port.flush().await.map_err(|e| {
            error!(port = %self.port_name, error = %e, "Failed to flush serial port");
            map_io_error(e)
        })?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                trace!(port = %self.port_name, bytes = n, data = ?&buf[..n], "Received data");
                Ok(n)
            }
            Ok(Err(e)) => {
                error!(port = %self.port_name, error = %e, "Failed to receive data");
                Err(map_io_error(e))
            }
            Err(_) => {
                trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Timeout waiting for data"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn clear_input(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        port.clear(ClearBuffer::Input)
            .map_err(|e| Error::Transport(format!("Failed to clear input buffer: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                warn!(port = %self.port_name, error = %e, "Failed to flush before closing");
            }
            info!(port = %self.port_name, "Serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
