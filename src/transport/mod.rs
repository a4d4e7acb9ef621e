//! Byte-level link to the keyer.
//!
//! The [`Transport`] trait abstracts over the serial line so that the WinKeyer
//! command layer can be driven by real hardware ([`SerialTransport`]) or by a
//! recording [`MockTransport`] in tests.

pub mod mock;
pub mod serial;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub use mock::MockTransport;
pub use serial::{SerialConfig, SerialTransport};

/// Asynchronous byte-level transport to a keyer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write all bytes to the keyer.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read bytes into `buf`, waiting at most `timeout`.
    ///
    /// Returns [`Error::Timeout`](crate::error::Error::Timeout) when nothing
    /// arrives before the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Discard anything already buffered on the receive side.
    async fn clear_input(&mut self) -> Result<()>;

    /// Close the link. Later sends fail with `NotConnected`.
    async fn close(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;
}
