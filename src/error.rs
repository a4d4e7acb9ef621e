//! Error types for the keyer link.
//!
//! Only failures of the hardware link surface as errors. Protocol-level
//! problems in cwdaemon frames are logged and skipped by the interpreter and
//! never reach this type.

/// The error type for device and transport operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open, write or read failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for a byte from the keyer.
    #[error("timeout waiting for keyer response")]
    Timeout,

    /// The transport has been closed.
    #[error("not connected")]
    NotConnected,

    /// The keyer answered the host-open handshake with a firmware version we
    /// do not drive.
    #[error("unsupported WinKeyer firmware version {0}")]
    UnsupportedVersion(u8),

    /// A parameter outside the range the keyer register accepts.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::UnsupportedVersion(12).to_string(),
            "unsupported WinKeyer firmware version 12"
        );
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for keyer response");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
