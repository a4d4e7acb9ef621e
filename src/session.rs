//! Per-process cwdaemon session state
//!
//! The values cwdaemon clients change with escape commands and that later
//! frames depend on. Owned by the command interpreter; the message pipeline
//! only ever reads it.

use crate::winkeyer::device::MAX_SPEED_WPM;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Keying speed in wpm; 0 until a client sets one.
    speed: u8,
    /// Last manual PTT state commanded by a client.
    ptt_asserted: bool,
    /// cwdaemon PTT delay. Nonzero hands PTT to the keyer's automatic PTT and
    /// disables manual PTT commands.
    delay_ms: u32,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Values above 99 wpm are clamped.
    pub fn set_speed(&mut self, wpm: u8) {
        self.speed = wpm.min(MAX_SPEED_WPM);
    }

    /// Whether a client has set a speed yet.
    pub fn speed_known(&self) -> bool {
        self.speed != 0
    }

    pub fn ptt_asserted(&self) -> bool {
        self.ptt_asserted
    }

    pub fn set_ptt_asserted(&mut self, asserted: bool) {
        self.ptt_asserted = asserted;
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    pub fn set_delay_ms(&mut self, delay: u32) {
        self.delay_ms = delay;
    }

    /// Manual PTT commands are honoured only while the delay is zero.
    pub fn manual_ptt_allowed(&self) -> bool {
        self.delay_ms == 0
    }
}
