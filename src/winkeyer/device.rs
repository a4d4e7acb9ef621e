//! WinKeyer host-mode command layer
//!
//! Wraps a [`Transport`] and exposes one method per keyer primitive. Every
//! method writes a complete command in a single `send()` so concurrent
//! callers can never interleave half-written register updates.

use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::registers::{
    encode_keying_mode, encode_lead_tail, encode_pin_config, encode_timing_ms, encode_weighting,
    quantize_sidetone, DeviceConfig, KeyingMode,
};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// WinKeyer host-mode command bytes.
pub mod opcode {
    pub const ADMIN: u8 = 0x00;
    pub const ADMIN_HOST_OPEN: u8 = 0x02;
    pub const ADMIN_HOST_CLOSE: u8 = 0x03;
    pub const SIDETONE: u8 = 0x01;
    pub const SPEED: u8 = 0x02;
    pub const WEIGHTING: u8 = 0x03;
    pub const PTT_LEAD_TAIL: u8 = 0x04;
    pub const PIN_CONFIG: u8 = 0x09;
    pub const CLEAR_BUFFER: u8 = 0x0A;
    pub const MODE: u8 = 0x0E;
    pub const FIRST_EXTENSION: u8 = 0x10;
    pub const KEY_COMPENSATION: u8 = 0x11;
    pub const PTT_ON_OFF: u8 = 0x18;
    pub const KEY_IMMEDIATE: u8 = 0x19;
    /// In-buffer: merge the next two letters into one prosign.
    pub const MERGE_LETTERS: u8 = 0x1B;
    /// In-buffer: change speed from this point on.
    pub const BUFFERED_SPEED_CHANGE: u8 = 0x1C;
    /// In-buffer: return to the speed set before any buffered change.
    pub const CANCEL_BUFFERED_SPEED_CHANGE: u8 = 0x1E;
}

/// Firmware revisions answered to host-open that we know how to drive.
pub const SUPPORTED_VERSIONS: [u8; 3] = [23, 30, 31];

/// How long to wait for the version byte after host-open.
pub const HOST_OPEN_TIMEOUT: Duration = Duration::from_secs(1);

pub const MAX_SPEED_WPM: u8 = 99;
pub const MAX_TUNE_SECONDS: u8 = 99;

/// Format bytes as a hex string for trace logs.
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A WinKeyer driven over some [`Transport`].
pub struct WinKeyer<T: Transport> {
    transport: T,
    version: Option<u8>,
}

impl<T: Transport> WinKeyer<T> {
    /// Wrap a transport without talking to the keyer yet.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            version: None,
        }
    }

    /// Firmware version reported by the last successful host-open.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        trace!(bytes = %format_hex(bytes), "→ keyer");
        self.transport.send(bytes).await
    }

    /// Put the keyer into host mode and check its firmware version.
    ///
    /// A stale session is closed first and any pending input discarded.
    pub async fn host_open(&mut self) -> Result<u8> {
        self.host_close().await?;
        self.transport.clear_input().await?;
        self.write(&[opcode::ADMIN, opcode::ADMIN_HOST_OPEN]).await?;

        let mut buf = [0u8; 1];
        let n = self.transport.receive(&mut buf, HOST_OPEN_TIMEOUT).await?;
        if n == 0 {
            return Err(Error::Timeout);
        }
        let version = buf[0];
        debug!("host_open returned: {}", version);

        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        info!("WinKeyer firmware version {} in host mode", version);
        self.version = Some(version);
        Ok(version)
    }

    pub async fn host_close(&mut self) -> Result<()> {
        self.write(&[opcode::ADMIN, opcode::ADMIN_HOST_CLOSE]).await
    }

    pub async fn set_speed(&mut self, wpm: u8) -> Result<()> {
        if wpm > MAX_SPEED_WPM {
            return Err(Error::InvalidParameter(format!(
                "speed must be 0 to {} wpm, got {}",
                MAX_SPEED_WPM, wpm
            )));
        }
        self.write(&[opcode::SPEED, wpm]).await
    }

    /// Clear the keyer's character buffer, stopping any message in progress.
    pub async fn abort(&mut self) -> Result<()> {
        self.write(&[opcode::CLEAR_BUFFER]).await
    }

    /// Queue message bytes for keying, exactly as given.
    ///
    /// The keyer only knows upper-case letters; callers upper-case text
    /// before embedding raw parameter bytes such as buffered speeds.
    pub async fn send(&mut self, message: &[u8]) -> Result<()> {
        self.write(message).await
    }

    /// Key down for `seconds`. Anything buffered is aborted first.
    pub async fn tune(&mut self, seconds: u8) -> Result<()> {
        if seconds > MAX_TUNE_SECONDS {
            return Err(Error::InvalidParameter(format!(
                "tune must be 0 to {} seconds, got {}",
                MAX_TUNE_SECONDS, seconds
            )));
        }
        self.abort().await?;
        self.write(&[opcode::KEY_IMMEDIATE, seconds]).await
    }

    /// Manual PTT. Buffered; has no effect while automatic PTT is enabled.
    pub async fn assert_ptt(&mut self, on: bool) -> Result<()> {
        self.write(&[opcode::PTT_ON_OFF, on as u8]).await
    }

    /// Set the sidetone to the supported frequency nearest `freq_hz`.
    pub async fn set_sidetone_frequency(&mut self, freq_hz: u32) -> Result<()> {
        self.write(&[opcode::SIDETONE, quantize_sidetone(freq_hz)])
            .await
    }

    pub async fn set_weighting(&mut self, percent: i32) -> Result<()> {
        self.write(&[opcode::WEIGHTING, encode_weighting(percent)])
            .await
    }

    pub async fn set_pin_config(&mut self, config: &DeviceConfig) -> Result<()> {
        self.write(&[opcode::PIN_CONFIG, encode_pin_config(config)])
            .await
    }

    pub async fn set_keying_mode(&mut self, mode: &KeyingMode) -> Result<()> {
        self.write(&[opcode::MODE, encode_keying_mode(mode)]).await
    }

    pub async fn set_lead_tail(&mut self, lead_ms: u16, tail_ms: u16) -> Result<()> {
        let (lead, tail) = encode_lead_tail(lead_ms, tail_ms)?;
        self.write(&[opcode::PTT_LEAD_TAIL, lead, tail]).await
    }

    /// Extend the first element after key-up. Not implemented in WK3 v30.
    pub async fn set_first_extension(&mut self, ms: u16) -> Result<()> {
        let value = encode_timing_ms("first extension", ms)?;
        self.write(&[opcode::FIRST_EXTENSION, value]).await
    }

    /// Extend key-down time of every element.
    pub async fn set_key_compensation(&mut self, ms: u16) -> Result<()> {
        let value = encode_timing_ms("key compensation", ms)?;
        self.write(&[opcode::KEY_COMPENSATION, value]).await
    }

    /// Write every register described by `config`.
    ///
    /// The pin configuration goes last so it reflects the final state.
    pub async fn apply_config(&mut self, config: &DeviceConfig) -> Result<()> {
        if let Some(freq) = config.sidetone_frequency_hz {
            self.set_sidetone_frequency(freq as u32).await?;
        }
        self.set_keying_mode(&config.keying_mode).await?;
        self.set_weighting(config.weighting_percent).await?;
        if let Some(ms) = config.first_extension_ms {
            self.set_first_extension(ms).await?;
        }
        if let Some(ms) = config.key_compensation_ms {
            self.set_key_compensation(ms).await?;
        }
        self.set_lead_tail(config.lead_time_ms, config.tail_time_ms)
            .await?;
        if config.pin_config.ptt_auto_enabled {
            warn!("Automatic PTT enabled: manual PTT commands will have no effect");
        }
        self.set_pin_config(config).await
    }

    /// Leave host mode and close the transport.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            self.host_close().await?;
            self.transport.close().await?;
        }
        Ok(())
    }
}
