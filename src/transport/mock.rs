//! Recording transport for deterministic tests.
//!
//! [`MockTransport`] records every `send()` call and serves `receive()` from a
//! queue of pre-loaded bytes, so the WinKeyer command layer and the
//! interpreter can be checked byte-for-byte without hardware.
//!
//! # Example
//!
//! ```
//! use winkeyer_gw::transport::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // The keyer answers host-open with firmware version 31.
//! mock.queue_response(&[31]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use super::Transport;
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct MockTransport {
    /// Bytes returned by subsequent `receive()` calls.
    inbound: VecDeque<u8>,
    connected: bool,
    /// When set, every `send()` fails with a transport error.
    fail_sends: bool,
    input_clears: usize,
    /// One entry per `send()` call.
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            inbound: VecDeque::new(),
            connected: true,
            fail_sends: false,
            input_clears: 0,
            sent_log: Vec::new(),
        }
    }

    /// Queue bytes the keyer will "send back".
    pub fn queue_response(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// All writes so far, one element per `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// All written bytes concatenated in order.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent_log.concat()
    }

    pub fn clear_sent(&mut self) {
        self.sent_log.clear();
    }

    /// How many times `clear_input()` was called.
    pub fn input_clears(&self) -> usize {
        self.input_clears
    }

    /// Make every following `send()` fail, simulating an unplugged keyer.
    pub fn set_fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.fail_sends {
            return Err(Error::Transport("simulated write failure".into()));
        }
        self.sent_log.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.inbound.is_empty() {
            return Err(Error::Timeout);
        }
        let n = self.inbound.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            // n <= inbound.len(), so pop_front always yields a byte here
            *slot = self.inbound.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    async fn clear_input(&mut self) -> Result<()> {
        self.input_clears += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.inbound.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sends() {
        let mut mock = MockTransport::new();
        mock.send(&[0x02, 20]).await.unwrap();
        mock.send(b"CQ").await.unwrap();

        assert_eq!(mock.sent_data().len(), 2);
        assert_eq!(mock.sent_bytes(), vec![0x02, 20, b'C', b'Q']);
    }

    #[tokio::test]
    async fn test_receive_serves_queue_then_times_out() {
        let mut mock = MockTransport::new();
        mock.queue_response(&[30]);

        let mut buf = [0u8; 1];
        let n = mock.receive(&mut buf, Duration::from_millis(10)).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(buf[0], 30);

        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_send() {
        let mut mock = MockTransport::new();
        mock.close().await.unwrap();
        assert!(!mock.is_connected());
        assert!(matches!(mock.send(&[0x0A]).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_failing_sends() {
        let mut mock = MockTransport::new();
        mock.set_fail_sends(true);
        assert!(matches!(mock.send(&[0x0A]).await, Err(Error::Transport(_))));
        assert!(mock.sent_data().is_empty());
    }
}
