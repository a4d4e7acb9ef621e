//! WinKeyer register encoding
//!
//! Pure functions that turn high-level keyer settings into the exact byte
//! values the WinKeyer host-mode command set expects.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Sidetone frequencies the keyer can produce, ascending, with their register
/// codes.
pub const SIDETONE_TABLE: [(u16, u8); 10] = [
    (400, 0x0A),
    (444, 0x09),
    (500, 0x08),
    (571, 0x07),
    (666, 0x06),
    (800, 0x05),
    (1000, 0x04),
    (1333, 0x03),
    (2000, 0x02),
    (4000, 0x01),
];

pub const WEIGHTING_MIN: i32 = 10;
pub const WEIGHTING_MAX: i32 = 90;
pub const WEIGHTING_DEFAULT: i32 = 50;

/// cwdaemon's weighting range (`ESC 7`).
pub const CWDAEMON_WEIGHTING_MIN: i32 = -50;
pub const CWDAEMON_WEIGHTING_MAX: i32 = 50;

/// Upper bound for every millisecond-valued timing register.
pub const MAX_TIMING_MS: u16 = 250;

/// Entry of [`SIDETONE_TABLE`] nearest to `freq_hz`.
///
/// At an exact midpoint the lower frequency wins.
fn nearest_sidetone(freq_hz: u32) -> (u16, u8) {
    let first = SIDETONE_TABLE[0];
    let last = SIDETONE_TABLE[SIDETONE_TABLE.len() - 1];
    if freq_hz <= first.0 as u32 {
        return first;
    }
    if freq_hz >= last.0 as u32 {
        return last;
    }
    for pair in SIDETONE_TABLE.windows(2) {
        let (lower, higher) = (pair[0], pair[1]);
        if freq_hz < higher.0 as u32 {
            let below = freq_hz - lower.0 as u32;
            let above = higher.0 as u32 - freq_hz;
            return if below <= above { lower } else { higher };
        }
    }
    last
}

/// Register code for the supported sidetone nearest to `freq_hz`.
pub fn quantize_sidetone(freq_hz: u32) -> u8 {
    nearest_sidetone(freq_hz).1
}

/// The supported sidetone frequency that `freq_hz` quantizes to.
pub fn quantized_sidetone_hz(freq_hz: u32) -> u16 {
    nearest_sidetone(freq_hz).0
}

/// Clamp a weighting percentage into the keyer's [10, 90] range.
///
/// Out-of-range input is logged and clamped, never rejected.
pub fn encode_weighting(percent: i32) -> u8 {
    if !(WEIGHTING_MIN..=WEIGHTING_MAX).contains(&percent) {
        warn!(
            "weighting value given ({}) out of {} to {} % range, clamping",
            percent, WEIGHTING_MIN, WEIGHTING_MAX
        );
    }
    percent.clamp(WEIGHTING_MIN, WEIGHTING_MAX) as u8
}

/// Rescale cwdaemon weighting (-50..=50) onto the keyer's percentage scale.
///
/// The result still has to go through [`encode_weighting`].
pub fn map_cwdaemon_weighting(value: i32) -> i32 {
    let span_device = (WEIGHTING_MAX - WEIGHTING_MIN) as f64;
    let span_cwdaemon = (CWDAEMON_WEIGHTING_MAX - CWDAEMON_WEIGHTING_MIN) as f64;
    (value as f64 * span_device / span_cwdaemon).round() as i32 + WEIGHTING_DEFAULT
}

/// Paddle priority in ultimatic mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UltimaticPriority {
    #[default]
    Normal,
    Dahs,
    Dits,
}

impl UltimaticPriority {
    pub fn code(self) -> u8 {
        match self {
            UltimaticPriority::Normal => 0b00,
            UltimaticPriority::Dahs => 0b01,
            UltimaticPriority::Dits => 0b10,
        }
    }
}

/// PTT hang time for hand-sent code, in dits (plus one word space).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HangTime {
    #[default]
    One,
    Two,
    Four,
    Eight,
}

impl HangTime {
    pub fn code(self) -> u8 {
        match self {
            HangTime::One => 0b00,
            HangTime::Two => 0b01,
            HangTime::Four => 0b10,
            HangTime::Eight => 0b11,
        }
    }

    pub fn dits(self) -> u8 {
        match self {
            HangTime::One => 1,
            HangTime::Two => 2,
            HangTime::Four => 4,
            HangTime::Eight => 8,
        }
    }
}

impl TryFrom<u8> for HangTime {
    type Error = String;

    fn try_from(dits: u8) -> std::result::Result<Self, Self::Error> {
        match dits {
            1 => Ok(HangTime::One),
            2 => Ok(HangTime::Two),
            4 => Ok(HangTime::Four),
            8 => Ok(HangTime::Eight),
            other => Err(format!("hang time must be 1, 2, 4 or 8 dits, got {}", other)),
        }
    }
}

impl From<HangTime> for u8 {
    fn from(hang: HangTime) -> u8 {
        hang.dits()
    }
}

/// Settings packed into the pin configuration register (0x09), apart from
/// the sidetone enable which lives in [`DeviceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub key1_enabled: bool,
    pub key2_enabled: bool,
    pub ptt_auto_enabled: bool,
    pub ultimatic_priority: UltimaticPriority,
    pub hang_time: HangTime,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            key1_enabled: true,
            key2_enabled: false,
            ptt_auto_enabled: false,
            ultimatic_priority: UltimaticPriority::Normal,
            hang_time: HangTime::One,
        }
    }
}

/// Paddle keying mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddleMode {
    A,
    #[default]
    B,
    Ultimatic,
    Bug,
}

impl PaddleMode {
    pub fn code(self) -> u8 {
        match self {
            PaddleMode::B => 0b00,
            PaddleMode::A => 0b01,
            PaddleMode::Ultimatic => 0b10,
            PaddleMode::Bug => 0b11,
        }
    }
}

/// Settings packed into the WinKeyer mode register (0x0E).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyingMode {
    pub swap_paddles: bool,
    pub mode: PaddleMode,
    pub contest_spacing: bool,
    pub autospace: bool,
}

/// Complete register-level configuration of the keyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub sidetone_enabled: bool,
    /// Always one of the [`SIDETONE_TABLE`] frequencies; `None` leaves the
    /// keyer's own setting untouched.
    pub sidetone_frequency_hz: Option<u16>,
    pub weighting_percent: i32,
    pub pin_config: PinConfig,
    pub keying_mode: KeyingMode,
    pub lead_time_ms: u16,
    pub tail_time_ms: u16,
    pub first_extension_ms: Option<u16>,
    pub key_compensation_ms: Option<u16>,
    /// Selects which pin-config bit drives KEY1 and which drives KEY2.
    /// Fixed for the life of the process.
    pub pin_mapping_corrected: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sidetone_enabled: false,
            sidetone_frequency_hz: None,
            weighting_percent: WEIGHTING_DEFAULT,
            pin_config: PinConfig::default(),
            keying_mode: KeyingMode::default(),
            lead_time_ms: 0,
            tail_time_ms: 0,
            first_extension_ms: None,
            key_compensation_ms: None,
            pin_mapping_corrected: false,
        }
    }
}

/// Bit positions of the (key1, key2) enables in the pin-config register.
fn key_enable_bits(corrected: bool) -> (u8, u8) {
    if corrected {
        (2, 3)
    } else {
        (3, 2)
    }
}

/// Pack the pin configuration register.
///
/// Layout, MSB first: ultimatic priority (7-6), hang time (5-4), the two key
/// enables (3-2, order chosen by `pin_mapping_corrected`), sidetone (1),
/// automatic PTT (0).
pub fn encode_pin_config(config: &DeviceConfig) -> u8 {
    let pins = &config.pin_config;
    let (key1_bit, key2_bit) = key_enable_bits(config.pin_mapping_corrected);

    ((pins.ultimatic_priority.code() & 0b11) << 6)
        | ((pins.hang_time.code() & 0b11) << 4)
        | ((pins.key2_enabled as u8) << key2_bit)
        | ((pins.key1_enabled as u8) << key1_bit)
        | ((config.sidetone_enabled as u8) << 1)
        | (pins.ptt_auto_enabled as u8)
}

/// Recover (key1, key2) enables from a pin-config byte.
pub fn decode_key_enables(register: u8, corrected: bool) -> (bool, bool) {
    let (key1_bit, key2_bit) = key_enable_bits(corrected);
    (
        register & (1 << key1_bit) != 0,
        register & (1 << key2_bit) != 0,
    )
}

/// Pack the mode register: paddle mode (5-4), swap (3), autospace (1),
/// contest spacing (0).
pub fn encode_keying_mode(mode: &KeyingMode) -> u8 {
    ((mode.mode.code() & 0b11) << 4)
        | ((mode.swap_paddles as u8) << 3)
        | ((mode.autospace as u8) << 1)
        | (mode.contest_spacing as u8)
}

fn check_lead_tail(name: &str, ms: u16) -> Result<u8> {
    if ms > MAX_TIMING_MS || ms % 10 != 0 {
        return Err(Error::InvalidParameter(format!(
            "{} must be 0 to {} ms in 10 ms steps, got {}",
            name, MAX_TIMING_MS, ms
        )));
    }
    Ok((ms / 10) as u8)
}

/// PTT lead and tail register values (10 ms units).
pub fn encode_lead_tail(lead_ms: u16, tail_ms: u16) -> Result<(u8, u8)> {
    Ok((
        check_lead_tail("PTT lead time", lead_ms)?,
        check_lead_tail("PTT tail time", tail_ms)?,
    ))
}

/// First-element extension and key compensation are plain milliseconds.
pub fn encode_timing_ms(name: &str, ms: u16) -> Result<u8> {
    if ms > MAX_TIMING_MS {
        return Err(Error::InvalidParameter(format!(
            "{} must be 0 to {} ms, got {}",
            name, MAX_TIMING_MS, ms
        )));
    }
    Ok(ms as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quantize_sidetone_nearest() {
        assert_eq!(quantize_sidetone(450), quantize_sidetone(444));
        assert_eq!(quantize_sidetone(450), 0x09);
        assert_eq!(quantize_sidetone(600), 0x07);
        assert_eq!(quantize_sidetone(700), 0x06);
        assert_eq!(quantize_sidetone(1200), 0x03);
    }

    #[test]
    fn test_quantize_sidetone_clamps_to_extremes() {
        assert_eq!(quantize_sidetone(0), 0x0A);
        assert_eq!(quantize_sidetone(399), 0x0A);
        assert_eq!(quantize_sidetone(400), 0x0A);
        assert_eq!(quantize_sidetone(4000), 0x01);
        assert_eq!(quantize_sidetone(10000), 0x01);
    }

    #[test]
    fn test_quantize_sidetone_midpoint_goes_low() {
        // 422 is exactly between 400 and 444
        assert_eq!(quantize_sidetone(422), 0x0A);
        assert_eq!(quantized_sidetone_hz(422), 400);
        // 472 is exactly between 444 and 500
        assert_eq!(quantized_sidetone_hz(472), 444);
        assert_eq!(quantized_sidetone_hz(473), 500);
        // 3000 is exactly between 2000 and 4000
        assert_eq!(quantized_sidetone_hz(3000), 2000);
    }

    #[test]
    fn test_map_cwdaemon_weighting() {
        assert_eq!(map_cwdaemon_weighting(-50), 10);
        assert_eq!(map_cwdaemon_weighting(0), 50);
        assert_eq!(map_cwdaemon_weighting(50), 90);
        assert_eq!(map_cwdaemon_weighting(10), 58);
        assert_eq!(map_cwdaemon_weighting(-10), 42);
    }

    #[test]
    fn test_encode_weighting_clamps() {
        assert_eq!(encode_weighting(5), encode_weighting(10));
        assert_eq!(encode_weighting(5), 10);
        assert_eq!(encode_weighting(95), 90);
        assert_eq!(encode_weighting(33), 33);
    }

    #[test]
    fn test_pin_config_defaults() {
        let config = DeviceConfig::default();
        // key1 enabled at bit 3, everything else zero
        assert_eq!(encode_pin_config(&config), 0b0000_1000);

        let corrected = DeviceConfig {
            pin_mapping_corrected: true,
            ..DeviceConfig::default()
        };
        assert_eq!(encode_pin_config(&corrected), 0b0000_0100);
    }

    #[test]
    fn test_pin_config_key_bit_positions() {
        let key2_only = PinConfig {
            key1_enabled: false,
            key2_enabled: true,
            ..PinConfig::default()
        };
        let cases = [
            (false, PinConfig::default(), 0b0000_1000),
            (false, key2_only, 0b0000_0100),
            (true, PinConfig::default(), 0b0000_0100),
            (true, key2_only, 0b0000_1000),
        ];
        for (corrected, pin_config, expected) in cases {
            let config = DeviceConfig {
                pin_config,
                pin_mapping_corrected: corrected,
                ..DeviceConfig::default()
            };
            assert_eq!(
                encode_pin_config(&config),
                expected,
                "corrected={} key1={} key2={}",
                corrected,
                pin_config.key1_enabled,
                pin_config.key2_enabled
            );
        }
    }

    #[test]
    fn test_pin_config_key_enables_round_trip() {
        for corrected in [false, true] {
            let config = DeviceConfig {
                pin_mapping_corrected: corrected,
                ..DeviceConfig::default()
            };
            let byte = encode_pin_config(&config);
            assert_eq!(decode_key_enables(byte, corrected), (true, false));

            let swapped = DeviceConfig {
                pin_config: PinConfig {
                    key1_enabled: false,
                    key2_enabled: true,
                    ..PinConfig::default()
                },
                ..config
            };
            let byte = encode_pin_config(&swapped);
            assert_eq!(decode_key_enables(byte, corrected), (false, true));
        }
    }

    #[test]
    fn test_pin_config_full_layout() {
        let config = DeviceConfig {
            sidetone_enabled: true,
            pin_config: PinConfig {
                key1_enabled: true,
                key2_enabled: true,
                ptt_auto_enabled: true,
                ultimatic_priority: UltimaticPriority::Dits,
                hang_time: HangTime::Eight,
            },
            ..DeviceConfig::default()
        };
        assert_eq!(encode_pin_config(&config), 0b1011_1111);

        let dahs = DeviceConfig {
            pin_config: PinConfig {
                ultimatic_priority: UltimaticPriority::Dahs,
                hang_time: HangTime::Two,
                ..PinConfig::default()
            },
            ..DeviceConfig::default()
        };
        assert_eq!(encode_pin_config(&dahs), 0b0101_1000);
    }

    #[test]
    fn test_encode_keying_mode() {
        assert_eq!(encode_keying_mode(&KeyingMode::default()), 0x00);

        let mode = KeyingMode {
            swap_paddles: true,
            mode: PaddleMode::A,
            contest_spacing: true,
            autospace: true,
        };
        assert_eq!(encode_keying_mode(&mode), 0b0001_1011);

        let bug = KeyingMode {
            mode: PaddleMode::Bug,
            ..KeyingMode::default()
        };
        assert_eq!(encode_keying_mode(&bug), 0b0011_0000);

        let ultimatic = KeyingMode {
            mode: PaddleMode::Ultimatic,
            ..KeyingMode::default()
        };
        assert_eq!(encode_keying_mode(&ultimatic), 0b0010_0000);
    }

    #[test]
    fn test_encode_lead_tail() {
        assert_eq!(encode_lead_tail(0, 0).unwrap(), (0, 0));
        assert_eq!(encode_lead_tail(50, 250).unwrap(), (5, 25));
        assert!(encode_lead_tail(55, 0).is_err());
        assert!(encode_lead_tail(0, 260).is_err());
    }

    #[test]
    fn test_encode_timing_ms() {
        assert_eq!(encode_timing_ms("first extension", 250).unwrap(), 250);
        assert!(encode_timing_ms("key compensation", 251).is_err());
    }

    #[test]
    fn test_hang_time_conversion() {
        assert_eq!(HangTime::try_from(4).unwrap(), HangTime::Four);
        assert!(HangTime::try_from(3).is_err());
        assert_eq!(u8::from(HangTime::Eight), 8);
    }

    proptest! {
        #[test]
        fn prop_quantized_code_is_supported(freq in 0u32..20_000) {
            let code = quantize_sidetone(freq);
            prop_assert!(SIDETONE_TABLE.iter().any(|&(_, c)| c == code));
        }

        #[test]
        fn prop_quantized_frequency_is_nearest(freq in 400u32..=4000) {
            let chosen = quantized_sidetone_hz(freq) as i64;
            let distance = (chosen - freq as i64).abs();
            for &(hz, _) in SIDETONE_TABLE.iter() {
                prop_assert!(distance <= (hz as i64 - freq as i64).abs());
            }
        }

        #[test]
        fn prop_weighting_always_in_range(value in -1000i32..1000) {
            let byte = encode_weighting(value) as i32;
            prop_assert!((WEIGHTING_MIN..=WEIGHTING_MAX).contains(&byte));
        }

        #[test]
        fn prop_cwdaemon_weighting_maps_into_device_range(value in -50i32..=50) {
            let percent = map_cwdaemon_weighting(value);
            prop_assert!((WEIGHTING_MIN..=WEIGHTING_MAX).contains(&percent));
        }
    }
}
