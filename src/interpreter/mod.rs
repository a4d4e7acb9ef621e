//! Command interpreter - cwdaemon frames in, WinKeyer commands out
//!
//! The interpreter owns everything a frame can read or change:
//! - the cwdaemon session (speed, manual PTT, PTT delay)
//! - the keyer register configuration
//! - the keyer itself
//!
//! Each frame is handled to completion before the next one is looked at, so
//! clients see their commands applied in the order they sent them.

mod commands;


use tracing::{debug, info, warn};

use crate::cwdaemon::{classify, truncate_at_nul, EscapeCommand, Frame};
use crate::error::Result;
use crate::message::prepare_message;
use crate::session::SessionState;
use crate::transport::Transport;
use crate::winkeyer::{DeviceConfig, WinKeyer};

/// Interprets cwdaemon frames against a single WinKeyer.
pub struct CommandInterpreter<T: Transport> {
    pub(crate) keyer: WinKeyer<T>,
    pub(crate) session: SessionState,
    pub(crate) device: DeviceConfig,
}

impl<T: Transport> CommandInterpreter<T> {
    /// Create an interpreter for a keyer already in host mode and configured
    /// with `device`.
    pub fn new(keyer: WinKeyer<T>, device: DeviceConfig) -> Self {
        Self {
            keyer,
            session: SessionState::new(),
            device,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    pub fn keyer(&self) -> &WinKeyer<T> {
        &self.keyer
    }

    pub fn keyer_mut(&mut self) -> &mut WinKeyer<T> {
        &mut self.keyer
    }

    /// Handle one received datagram.
    ///
    /// Malformed, unsupported and refused commands are logged and dropped
    /// with `Ok(())`. An `Err` means the keyer link failed and the daemon
    /// cannot continue.
    pub async fn handle_frame(&mut self, datagram: &[u8]) -> Result<()> {
        let (frame, truncated) = truncate_at_nul(datagram);
        if truncated {
            debug!("Warning: chr(0) in client message");
        }

        match classify(frame) {
            Frame::Empty => {
                debug!("Empty frame ignored");
                Ok(())
            }
            Frame::BareEscape => {
                warn!("Escape frame without a command code ignored");
                Ok(())
            }
            Frame::Escape { code, argument } => match EscapeCommand::from_code(code) {
                Some(command) => self.handle_escape(command, argument).await,
                None => {
                    warn!(
                        "Unknown escape command {:?} not implemented",
                        code as char
                    );
                    Ok(())
                }
            },
            Frame::Text(text) => self.handle_text(text).await,
        }
    }

    async fn handle_text(&mut self, text: &[u8]) -> Result<()> {
        let message = prepare_message(text, &self.session);
        if message.is_empty() {
            debug!("Nothing left to key after message transform");
            return Ok(());
        }
        debug!("keying: {:?}", String::from_utf8_lossy(&message));
        self.keyer.send(&message).await
    }

    /// Re-apply a new register configuration, e.g. after a config reload.
    ///
    /// The KEY1/KEY2 pin mapping is fixed at startup and is kept.
    pub async fn apply_device_config(&mut self, mut config: DeviceConfig) -> Result<()> {
        config.pin_mapping_corrected = self.device.pin_mapping_corrected;
        if config == self.device {
            debug!("Keyer configuration unchanged");
            return Ok(());
        }
        self.keyer.apply_config(&config).await?;
        self.device = config;
        info!("Keyer configuration re-applied");
        Ok(())
    }

    /// Release manual PTT if a client left it asserted, then leave host mode.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.session.ptt_asserted() {
            self.keyer.assert_ptt(false).await?;
            self.session.set_ptt_asserted(false);
        }
        self.keyer.shutdown().await
    }
}
