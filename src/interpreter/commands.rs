//! Escape command handlers
//!
//! One handler per implemented cwdaemon escape command. Argument problems are
//! logged and the command is dropped before anything reaches the keyer.

use tracing::{debug, info, warn};

use super::CommandInterpreter;
use crate::cwdaemon::{parse_int, EscapeCommand};
use crate::error::Result;
use crate::transport::Transport;
use crate::winkeyer::device::{MAX_SPEED_WPM, MAX_TUNE_SECONDS};
use crate::winkeyer::registers::{
    encode_weighting, map_cwdaemon_weighting, quantized_sidetone_hz, CWDAEMON_WEIGHTING_MAX,
    CWDAEMON_WEIGHTING_MIN,
};

/// Tone range cwdaemon documents for `ESC 3`.
const CWDAEMON_TONE_RANGE: std::ops::RangeInclusive<i64> = 300..=1000;

/// cwdaemon's own cap on `ESC c`.
const CWDAEMON_MAX_TUNE_SECONDS: i64 = 10;

impl<T: Transport> CommandInterpreter<T> {
    pub(super) async fn handle_escape(
        &mut self,
        command: EscapeCommand,
        argument: &[u8],
    ) -> Result<()> {
        match command {
            EscapeCommand::Speed => self.cmd_speed(argument).await,
            EscapeCommand::Tone => self.cmd_tone(argument).await,
            EscapeCommand::Abort => {
                debug!("abort message");
                self.keyer.abort().await
            }
            EscapeCommand::Weighting => self.cmd_weighting(argument).await,
            EscapeCommand::Ptt => self.cmd_ptt(argument).await,
            EscapeCommand::Tune => self.cmd_tune(argument).await,
            EscapeCommand::Delay => {
                self.cmd_delay(argument);
                Ok(())
            }
            other => {
                warn!("'{}' not implemented", other.description());
                Ok(())
            }
        }
    }

    /// Parse an integer argument, logging when it is not one.
    fn int_argument(command: EscapeCommand, argument: &[u8]) -> Option<i64> {
        let value = parse_int(argument);
        if value.is_none() {
            warn!(
                "{}: argument {:?} is not an integer, ignored",
                command,
                String::from_utf8_lossy(argument)
            );
        }
        value
    }

    async fn cmd_speed(&mut self, argument: &[u8]) -> Result<()> {
        let Some(speed) = Self::int_argument(EscapeCommand::Speed, argument) else {
            return Ok(());
        };
        if !(0..=MAX_SPEED_WPM as i64).contains(&speed) {
            warn!("speed {} out of range 0 to {} wpm, ignored", speed, MAX_SPEED_WPM);
            return Ok(());
        }
        debug!("set speed: {}", speed);
        let speed = speed as u8;
        self.session.set_speed(speed);
        self.keyer.set_speed(speed).await
    }

    async fn cmd_tone(&mut self, argument: &[u8]) -> Result<()> {
        let Some(tone) = Self::int_argument(EscapeCommand::Tone, argument) else {
            return Ok(());
        };
        if tone < 0 {
            warn!("tone {} Hz is negative, ignored", tone);
            return Ok(());
        }
        debug!("set tone: {}", tone);

        if tone == 0 {
            self.device.sidetone_enabled = false;
            return self.keyer.set_pin_config(&self.device).await;
        }

        if !CWDAEMON_TONE_RANGE.contains(&tone) {
            debug!("cwdaemon docs say 300 to 1000 Hz but unixcw defines actual range");
        }
        let freq = u32::try_from(tone).unwrap_or(u32::MAX);
        let quantized = quantized_sidetone_hz(freq);
        if quantized as i64 != tone {
            debug!("sidetone {} Hz quantized to {} Hz", tone, quantized);
        }
        self.keyer.set_sidetone_frequency(freq).await?;
        self.device.sidetone_frequency_hz = Some(quantized);
        self.device.sidetone_enabled = true;
        self.keyer.set_pin_config(&self.device).await
    }

    async fn cmd_weighting(&mut self, argument: &[u8]) -> Result<()> {
        let Some(weighting) = Self::int_argument(EscapeCommand::Weighting, argument) else {
            return Ok(());
        };
        debug!("cwdaemon weighting: {}", weighting);
        let range = CWDAEMON_WEIGHTING_MIN as i64..=CWDAEMON_WEIGHTING_MAX as i64;
        if !range.contains(&weighting) {
            warn!(
                "weighting out of range ({} to {})",
                CWDAEMON_WEIGHTING_MIN, CWDAEMON_WEIGHTING_MAX
            );
            return Ok(());
        }
        let percent = map_cwdaemon_weighting(weighting as i32);
        self.device.weighting_percent = encode_weighting(percent) as i32;
        self.keyer.set_weighting(percent).await
    }

    async fn cmd_ptt(&mut self, argument: &[u8]) -> Result<()> {
        let requested = match argument {
            b"0" => false,
            b"1" => true,
            _ => {
                warn!("Warning: unsupported value for 'ptt keying off or on'");
                return Ok(());
            }
        };
        if !self.session.manual_ptt_allowed() {
            warn!("Cannot set PTT. ptt keying disabled by delay != 0.");
            return Ok(());
        }
        if requested == self.session.ptt_asserted() {
            debug!("PTT already {}", if requested { "on" } else { "off" });
            return Ok(());
        }
        self.keyer.assert_ptt(requested).await?;
        self.session.set_ptt_asserted(requested);
        Ok(())
    }

    async fn cmd_tune(&mut self, argument: &[u8]) -> Result<()> {
        let Some(seconds) = Self::int_argument(EscapeCommand::Tune, argument) else {
            return Ok(());
        };
        if !(0..=MAX_TUNE_SECONDS as i64).contains(&seconds) {
            warn!(
                "tune for {} seconds out of range 0 to {} seconds",
                seconds, MAX_TUNE_SECONDS
            );
            return Ok(());
        }
        if seconds == 0 {
            debug!("tune for 0 seconds ignored");
            return Ok(());
        }
        info!("tune for {} seconds", seconds);
        if seconds > CWDAEMON_MAX_TUNE_SECONDS {
            debug!("allowing longer tune than cwdaemon's 10 second max");
        }
        self.keyer.tune(seconds as u8).await
    }

    fn cmd_delay(&mut self, argument: &[u8]) {
        let Some(delay) = Self::int_argument(EscapeCommand::Delay, argument) else {
            return;
        };
        let Ok(delay) = u32::try_from(delay) else {
            warn!("delay {} must not be negative, ignored", delay);
            return;
        };
        debug!("set delay: {}", delay);
        self.session.set_delay_ms(delay);
        if delay == 0 {
            debug!("manual PTT commands enabled");
        } else {
            debug!("manual PTT commands disabled while delay != 0");
        }
    }
}
