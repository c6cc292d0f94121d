//! Error types for zephyr-mt.

use crate::setup::SetupState;
use std::io;
use thiserror::Error;

/// Result type for zephyr-mt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for zephyr-mt operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (firmware files, host transports).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The underlying exchange failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response did not start with the 0xAA preamble.
    #[error("Sync error: expected preamble 0xAA, got {got:#04x}")]
    Sync {
        /// First byte actually received.
        got: u8,
    },

    /// Computed and received checksums differ.
    #[error("Checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u16,
        /// Checksum carried in the trailer.
        actual: u16,
    },

    /// Device asked for a transfer larger than the negotiated packet size.
    #[error("Device requested a {len} byte transfer, max packet size is {max}")]
    Overflow {
        /// Requested length.
        len: usize,
        /// Negotiated maximum packet size.
        max: usize,
    },

    /// Frame data read too short to hold preamble and checksum.
    #[error("Frame of {len} bytes is too short to carry a checksum")]
    ShortFrame {
        /// Length of the read.
        len: usize,
    },

    /// Upload verification query returned an unexpected reply.
    #[error(
        "Upload verification failed: expected checksum {expected:#06x}, got {:02x} {:02x} {:02x} {:02x}",
        reply[0], reply[1], reply[2], reply[3]
    )]
    UploadVerification {
        /// Checksum the device should have reported.
        expected: u16,
        /// Raw verification reply.
        reply: [u8; 4],
    },

    /// Device reported a nonzero error code for a report.
    #[error("Report {id:#04x} rejected with error code {code}")]
    ReportRejected {
        /// Report id.
        id: u8,
        /// Error code (high nibble of the info reply).
        code: u8,
    },

    /// Report payload shorter than its decoder needs.
    #[error("Report {id:#04x} is {len} bytes, need at least {need}")]
    ShortReport {
        /// Report id.
        id: u8,
        /// Received length.
        len: usize,
        /// Required length.
        need: usize,
    },

    /// A geometry field maps outside the `i32` touch-unit range.
    #[error("Sensor dimension field {raw:#x} is out of range")]
    InvalidDimension {
        /// Raw field value.
        raw: u32,
    },

    /// Setup finished its report queries without this report.
    #[error("Report {id:#04x} was never received")]
    MissingReport {
        /// Report id.
        id: u8,
    },

    /// A bounded retry loop gave up.
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Operation name.
        operation: &'static str,
        /// Number of attempts made.
        attempts: usize,
        /// Error of the last attempt.
        #[source]
        source: Box<Error>,
    },

    /// Device initialization aborted.
    #[error("Setup failed while {stage}: {source}")]
    Setup {
        /// Stage that failed.
        stage: SetupState,
        /// Cause.
        #[source]
        source: Box<Error>,
    },

    /// Pressure threshold outside [0, 254].
    #[error("Invalid pressure threshold {0}, must be below 255")]
    InvalidThreshold(u32),

    /// Firmware image could not be obtained.
    #[error("Firmware unavailable: {0}")]
    FirmwareUnavailable(String),

    /// The embedding application requested an interruption.
    #[error("Interrupted")]
    Interrupted,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a bounded retry loop should try again after this error.
    ///
    /// Transport failures propagate immediately; framing and verification
    /// failures are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Sync { .. }
                | Self::ChecksumMismatch { .. }
                | Self::Overflow { .. }
                | Self::ShortFrame { .. }
                | Self::UploadVerification { .. }
        )
    }

    /// Stage that failed, when this is a setup error.
    pub fn setup_stage(&self) -> Option<SetupState> {
        match self {
            Self::Setup { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Wrap this error as the failure of a setup stage.
    pub(crate) fn in_stage(self, stage: SetupState) -> Self {
        Self::Setup {
            stage,
            source: Box::new(self),
        }
    }
}
