//! Command-line interface
//!
//! Flags mirror the legacy winkeyer daemon so existing launch scripts keep
//! working. Every keyer flag overrides the matching config file value.

use clap::{ArgGroup, Parser};

use crate::winkeyer::registers::HangTime;

/// cwdaemon-compatible UDP gateway for WinKeyer keyers
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("sidetone_group").args(["sidetone_on", "sidetone"])))]
#[command(group(ArgGroup::new("key_group").args(["key2", "key12"])))]
pub struct Args {
    /// Path to an optional YAML configuration file
    #[arg(short, long, env = "WINKEYER_GW_CONFIG")]
    pub config: Option<String>,

    /// Serial device, e.g. /dev/ttyUSB0 on unix or COM1 on Windows
    #[arg(short, long, env = "WINKEYER_GW_DEVICE")]
    pub device: Option<String>,

    /// UDP port to listen on (default 6789)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Respond to requests from hosts other than localhost
    #[arg(long)]
    pub accept_remote_hosts: bool,

    /// Start with sidetone on using the keyer's current frequency
    #[arg(long)]
    pub sidetone_on: bool,

    /// Start with sidetone on at the given frequency in Hz
    #[arg(long, value_name = "HZ")]
    pub sidetone: Option<u32>,

    /// Swap paddles (swap dit and dah)
    #[arg(long)]
    pub swap: bool,

    /// Use the KEY2 output instead of KEY1
    #[arg(long)]
    pub key2: bool,

    /// Use both KEY1 and KEY2 outputs
    #[arg(long)]
    pub key12: bool,

    /// Use contest spacing (6 dit word space instead of 7)
    #[arg(long, alias = "contest_spacing")]
    pub contest_spacing: bool,

    /// Use autospace paddle sending
    #[arg(long)]
    pub autospace: bool,

    /// Extend the first element by 0 to 250 ms
    #[arg(long, alias = "first_extension", value_name = "MS")]
    pub first_extension: Option<u16>,

    /// Extend key-down of every element by 0 to 250 ms
    #[arg(long, alias = "key_compensation", value_name = "MS")]
    pub key_compensation: Option<u16>,

    /// Enable automatic PTT
    #[arg(long, alias = "ptt_enable")]
    pub ptt_enable: bool,

    /// PTT assert to key down lead time, 0 to 250 in 10 ms steps
    #[arg(long, alias = "ptt_lead", value_name = "MS")]
    pub ptt_lead: Option<u16>,

    /// Key up to PTT release tail time, 0 to 250 in 10 ms steps (machine sent code only)
    #[arg(long, alias = "ptt_tail", value_name = "MS")]
    pub ptt_tail: Option<u16>,

    /// PTT hang time of 1, 2, 4 or 8 dits plus one word space (hand sent code only)
    #[arg(long, value_parser = parse_hang_time)]
    pub hang: Option<HangTime>,

    /// Use the corrected KEY1/KEY2 pin-config bit mapping
    #[arg(long)]
    pub corrected: bool,

    /// Print debug statements (same as --log-level debug)
    #[arg(long)]
    pub debug: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

fn parse_hang_time(s: &str) -> Result<HangTime, String> {
    let dits: u8 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number of dits", s))?;
    HangTime::try_from(dits)
}

impl Args {
    /// Effective log filter, honouring `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug && self.log_level == "info" {
            "debug"
        } else {
            &self.log_level
        }
    }
}
