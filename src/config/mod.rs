//! Configuration management for the WinKeyer gateway
//!
//! Handles loading, validating and hot-reloading the optional YAML config
//! file, and merging command-line overrides on top of it.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::cli::Args;
use crate::cwdaemon::DEFAULT_PORT;
use crate::winkeyer::registers::{
    quantized_sidetone_hz, HangTime, KeyingMode, PaddleMode, PinConfig, UltimaticPriority,
    MAX_TIMING_MS, WEIGHTING_DEFAULT, WEIGHTING_MAX, WEIGHTING_MIN,
};
use crate::winkeyer::DeviceConfig;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Serial device the keyer is attached to
    #[serde(default)]
    pub device: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub accept_remote_hosts: bool,
    #[serde(default)]
    pub keyer: KeyerConfig,
}

/// Keyer registers applied at startup and on every reload
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyerConfig {
    pub sidetone: SidetoneConfig,
    pub keys: KeyOutputs,
    pub swap_paddles: bool,
    pub keying_mode: PaddleMode,
    pub contest_spacing: bool,
    pub autospace: bool,
    pub ultimatic_priority: UltimaticPriority,
    /// Dits of PTT hang time: 1, 2, 4 or 8
    pub hang_time: HangTime,
    pub ptt: PttConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_extension_ms: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_compensation_ms: Option<u16>,
    pub weighting: i32,
    pub pin_mapping_corrected: bool,
}

/// Sidetone output
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SidetoneConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Snapped to the nearest supported frequency; unset keeps the keyer's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<u32>,
}

/// Which keying outputs are driven
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOutputs {
    #[default]
    Key1,
    Key2,
    Key12,
}

/// Automatic PTT timing
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PttConfig {
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub lead_ms: u16,
    #[serde(default)]
    pub tail_ms: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            port: default_port(),
            accept_remote_hosts: false,
            keyer: KeyerConfig::default(),
        }
    }
}

impl Default for KeyerConfig {
    fn default() -> Self {
        Self {
            sidetone: SidetoneConfig::default(),
            keys: KeyOutputs::default(),
            swap_paddles: false,
            keying_mode: PaddleMode::default(),
            contest_spacing: false,
            autospace: false,
            ultimatic_priority: UltimaticPriority::default(),
            hang_time: HangTime::default(),
            ptt: PttConfig::default(),
            first_extension_ms: None,
            key_compensation_ms: None,
            weighting: WEIGHTING_DEFAULT,
            pin_mapping_corrected: false,
        }
    }
}

impl AppConfig {
    /// Load and parse a configuration file.
    ///
    /// Validation is left to [`AppConfig::validate`] so that command-line
    /// overrides can fill in what the file leaves out.
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        Ok(config)
    }

    /// Build the effective configuration: file (if any), then CLI overrides.
    pub async fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path).await?,
            None => Self::default(),
        };
        config.apply_cli(args);
        config.validate()?;
        Ok(config)
    }

    /// Overlay command-line flags. Switch flags can only turn things on.
    pub fn apply_cli(&mut self, args: &Args) {
        if let Some(device) = &args.device {
            self.device = device.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if args.accept_remote_hosts {
            self.accept_remote_hosts = true;
        }

        let keyer = &mut self.keyer;
        if args.sidetone_on {
            keyer.sidetone.enabled = true;
        }
        if let Some(hz) = args.sidetone {
            keyer.sidetone.enabled = true;
            keyer.sidetone.frequency_hz = Some(hz);
        }
        if args.key2 {
            keyer.keys = KeyOutputs::Key2;
        }
        if args.key12 {
            keyer.keys = KeyOutputs::Key12;
        }
        if args.swap {
            keyer.swap_paddles = true;
        }
        if args.contest_spacing {
            keyer.contest_spacing = true;
        }
        if args.autospace {
            keyer.autospace = true;
        }
        if let Some(ms) = args.first_extension {
            keyer.first_extension_ms = Some(ms);
        }
        if let Some(ms) = args.key_compensation {
            keyer.key_compensation_ms = Some(ms);
        }
        if args.ptt_enable {
            keyer.ptt.auto = true;
        }
        if let Some(ms) = args.ptt_lead {
            keyer.ptt.lead_ms = ms;
        }
        if let Some(ms) = args.ptt_tail {
            keyer.ptt.tail_ms = ms;
        }
        if let Some(hang) = args.hang {
            keyer.hang_time = hang;
        }
        if args.corrected {
            keyer.pin_mapping_corrected = true;
        }
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            anyhow::bail!("No serial device given (use --device or 'device' in the config file)");
        }
        if self.port == 0 {
            anyhow::bail!("UDP port cannot be 0");
        }
        self.keyer.validate().context("Invalid keyer configuration")
    }

    /// Register-level view of the keyer section.
    pub fn device_config(&self) -> DeviceConfig {
        self.keyer.device_config()
    }
}

impl KeyerConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, ms) in [("ptt.lead_ms", self.ptt.lead_ms), ("ptt.tail_ms", self.ptt.tail_ms)] {
            if ms > MAX_TIMING_MS || ms % 10 != 0 {
                anyhow::bail!(
                    "{} is {} (must be 0-{} in steps of 10)",
                    name,
                    ms,
                    MAX_TIMING_MS
                );
            }
        }

        for (name, ms) in [
            ("first_extension_ms", self.first_extension_ms),
            ("key_compensation_ms", self.key_compensation_ms),
        ] {
            if let Some(ms) = ms {
                if ms > MAX_TIMING_MS {
                    anyhow::bail!("{} is {} (must be 0-{})", name, ms, MAX_TIMING_MS);
                }
            }
        }

        if !(WEIGHTING_MIN..=WEIGHTING_MAX).contains(&self.weighting) {
            anyhow::bail!(
                "weighting is {} (must be {}-{})",
                self.weighting,
                WEIGHTING_MIN,
                WEIGHTING_MAX
            );
        }

        Ok(())
    }

    pub fn device_config(&self) -> DeviceConfig {
        let (key1_enabled, key2_enabled) = match self.keys {
            KeyOutputs::Key1 => (true, false),
            KeyOutputs::Key2 => (false, true),
            KeyOutputs::Key12 => (true, true),
        };

        DeviceConfig {
            sidetone_enabled: self.sidetone.enabled,
            sidetone_frequency_hz: self.sidetone.frequency_hz.map(quantized_sidetone_hz),
            weighting_percent: self.weighting,
            pin_config: PinConfig {
                key1_enabled,
                key2_enabled,
                ptt_auto_enabled: self.ptt.auto,
                ultimatic_priority: self.ultimatic_priority,
                hang_time: self.hang_time,
            },
            keying_mode: KeyingMode {
                swap_paddles: self.swap_paddles,
                mode: self.keying_mode,
                contest_spacing: self.contest_spacing,
                autospace: self.autospace,
            },
            lead_time_ms: self.ptt.lead_ms,
            tail_time_ms: self.ptt.tail_ms,
            first_extension_ms: self.first_extension_ms,
            key_compensation_ms: self.key_compensation_ms,
            pin_mapping_corrected: self.pin_mapping_corrected,
        }
    }
}

// Default value functions
fn default_port() -> u16 { DEFAULT_PORT }
