//! WinKeyer device support: register encoding and the host-mode command set.

pub mod device;
pub mod registers;

pub use device::{format_hex, opcode, WinKeyer, SUPPORTED_VERSIONS};
pub use registers::{
    DeviceConfig, HangTime, KeyingMode, PaddleMode, PinConfig, UltimaticPriority,
};
