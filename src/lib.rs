//! WinKeyer GW - cwdaemon-compatible UDP gateway for WinKeyer keyers
//!
//! Receives cwdaemon datagrams on UDP and drives a K1EL WinKeyer (WK2/WK3)
//! in host mode over a serial link.

pub mod cli;
pub mod config;
pub mod cwdaemon;
pub mod error;
pub mod interpreter;
pub mod message;
pub mod ports;
pub mod server;
pub mod session;
pub mod transport;
pub mod winkeyer;

pub use error::{Error, Result};
