//! Engine configuration.
//!
//! Every field defaults to the controller's documented behaviour. Delays
//! may be set to zero, which is what simulated transports in tests use.
//!
//! With the `serde` feature a configuration can be loaded from TOML:
//!
//! ```toml
//! min_pressure = 80
//! geometry_byte_order = "big"
//!
//! [retries]
//! frame = 6
//! ```

use crate::drain::DrainPolicy;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Base address of the first bootloader chunk.
pub const DEFAULT_BOOTLOADER_BASE: u32 = 0x4000_0000;

/// Initial pressure threshold.
pub const DEFAULT_MIN_PRESSURE: u8 = 100;

/// Byte order of a multi-byte field whose order the device does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ByteOrder {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

impl ByteOrder {
    /// Read a `u16` from the first two bytes of `buf`.
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Self::Little => LittleEndian::read_u16(buf),
            Self::Big => BigEndian::read_u16(buf),
        }
    }

    /// Read an `i16` from the first two bytes of `buf`.
    pub fn read_i16(self, buf: &[u8]) -> i16 {
        match self {
            Self::Little => LittleEndian::read_i16(buf),
            Self::Big => BigEndian::read_i16(buf),
        }
    }

    /// Read a `u32` from the first four bytes of `buf`.
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(buf),
            Self::Big => BigEndian::read_u32(buf),
        }
    }
}

/// Fixed delays used by the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timing {
    /// Pause between report/frame channel retries.
    pub retry_delay: Duration,
    /// Pause between interface negotiation attempts.
    pub negotiate_retry_delay: Duration,
    /// Pause between writing a bootloader chunk and verifying it.
    pub chunk_settle: Duration,
    /// Pause between setup stages.
    pub stage_settle: Duration,
    /// Time the controller is held unpowered.
    pub power_off_hold: Duration,
    /// Time the controller needs after power-on.
    pub power_on_settle: Duration,
    /// Pause between firmware supply requests.
    pub firmware_retry_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(1),
            negotiate_retry_delay: Duration::from_millis(3),
            chunk_settle: Duration::from_micros(300),
            stage_settle: Duration::from_millis(1),
            power_off_hold: Duration::from_millis(200),
            power_on_settle: Duration::from_millis(15),
            firmware_retry_delay: Duration::from_secs(1),
        }
    }
}

impl Timing {
    /// No delays at all.
    pub fn none() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            negotiate_retry_delay: Duration::ZERO,
            chunk_settle: Duration::ZERO,
            stage_settle: Duration::ZERO,
            power_off_hold: Duration::ZERO,
            power_on_settle: Duration::ZERO,
            firmware_retry_delay: Duration::ZERO,
        }
    }
}

/// Attempt limits per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryLimits {
    /// Interface negotiation queries.
    pub negotiate: usize,
    /// Attempts per bootloader chunk.
    pub chunk: usize,
    /// Attempts for the main firmware image.
    pub main_image: usize,
    /// Report info and report data queries.
    pub report: usize,
    /// Frame length polls, frame data reads and whole frame cycles.
    pub frame: usize,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            negotiate: 4,
            chunk: 5,
            main_image: 5,
            report: 4,
            frame: 4,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Protocol delays.
    pub timing: Timing,
    /// Attempt limits.
    pub retries: RetryLimits,
    /// Destination address of the first bootloader chunk.
    pub bootloader_base: u32,
    /// Initial pressure threshold, 0..=254.
    pub min_pressure: u8,
    /// Byte order of the two 32-bit fields of the dimensions report.
    pub geometry_byte_order: ByteOrder,
    /// Byte order of multi-byte fields inside touch frame payloads.
    pub payload_byte_order: ByteOrder,
    /// How triggers received during a drain pass are accounted.
    pub drain_policy: DrainPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            retries: RetryLimits::default(),
            bootloader_base: DEFAULT_BOOTLOADER_BASE,
            min_pressure: DEFAULT_MIN_PRESSURE,
            geometry_byte_order: ByteOrder::default(),
            payload_byte_order: ByteOrder::default(),
            drain_policy: DrainPolicy::default(),
        }
    }
}

impl Config {
    /// Set the protocol delays.
    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Set the initial pressure threshold.
    #[must_use]
    pub fn with_min_pressure(mut self, min_pressure: u8) -> Self {
        self.min_pressure = min_pressure;
        self
    }

    /// Set the drain policy.
    #[must_use]
    pub fn with_drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.drain_policy = policy;
        self
    }

    /// Check that the configuration can drive a device.
    pub fn validate(&self) -> Result<()> {
        if self.min_pressure == u8::MAX {
            return Err(Error::Config(
                "min_pressure must be in 0..=254".to_string(),
            ));
        }

        let r = &self.retries;
        for (name, value) in [
            ("negotiate", r.negotiate),
            ("chunk", r.chunk),
            ("main_image", r.main_image),
            ("report", r.report),
            ("frame", r.frame),
        ] {
            if value == 0 {
                return Err(Error::Config(format!(
                    "retries.{name} must allow at least one attempt"
                )));
            }
        }

        Ok(())
    }

    /// Parse and validate a TOML configuration. Missing keys keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_controller() {
        let config = Config::default();
        assert_eq!(config.bootloader_base, 0x4000_0000);
        assert_eq!(config.min_pressure, 100);
        assert_eq!(config.retries.chunk, 5);
        assert_eq!(config.retries.frame, 4);
        assert_eq!(config.timing.negotiate_retry_delay, Duration::from_millis(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retries.report = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_pressure_255() {
        let config = Config::default().with_min_pressure(255);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_byte_order_reads() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(ByteOrder::Little.read_u32(&bytes), 0x0403_0201);
        assert_eq!(ByteOrder::Big.read_u32(&bytes), 0x0102_0304);
        assert_eq!(ByteOrder::Little.read_u16(&bytes), 0x0201);
        assert_eq!(ByteOrder::Big.read_i16(&[0xFF, 0xFE]), -2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_toml_overrides_and_defaults() {
        let config = Config::from_toml_str(
            "min_pressure = 80\ngeometry_byte_order = \"big\"\n[retries]\nframe = 6\n",
        )
        .unwrap();
        assert_eq!(config.min_pressure, 80);
        assert_eq!(config.geometry_byte_order, ByteOrder::Big);
        assert_eq!(config.retries.frame, 6);
        assert_eq!(config.retries.chunk, 5);
    }
}
