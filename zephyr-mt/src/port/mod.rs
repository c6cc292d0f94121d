//! Transport abstraction for the controller link.
//!
//! The controller is reached over a synchronous, half-duplex, byte-oriented
//! channel (SPI on real hardware). Everything above this module is I/O
//! agnostic and only needs a single exchange operation.
//!
//! ```text
//! +---------------------------+
//! |  setup / drain loop       |
//! +-------------+-------------+
//!               |
//!               v
//! +-------------+-------------+
//! |  controller::Link         |
//! |  (framing, retries)       |
//! +-------------+-------------+
//!               |
//!               v
//! +-------------+-------------+
//! |  Transport trait          |
//! +-------------+-------------+
//!               |
//!               v
//! +-------------+-------------+
//! |  SpiTransport / simulator |
//! +---------------------------+
//! ```
//!
//! ## Example
//!
//! ```rust
//! use zephyr_mt::port::{Transport, TransportSetting};
//!
//! fn query<T: Transport>(link: &mut T) -> zephyr_mt::Result<[u8; 4]> {
//!     let mut rx = [0u8; 4];
//!     link.exchange(&[0xD0; 4], &mut rx, TransportSetting::NORMAL)?;
//!     Ok(rx)
//! }
//! ```

#[cfg(feature = "embedded-hal")]
pub mod spi;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use crate::error::Result;

/// Clock rate and inter-phase delays for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSetting {
    /// Bus clock in Hz.
    pub clock_hz: u32,
    /// Delay before the bytes are clocked.
    pub pre_delay: Duration,
    /// Delay after the bytes are clocked.
    pub post_delay: Duration,
}

impl TransportSetting {
    /// Setting for every command, report and frame exchange.
    pub const NORMAL: Self = Self {
        clock_hz: 83_000,
        pre_delay: Duration::from_millis(5),
        post_delay: Duration::from_millis(10),
    };

    /// Setting for the bulk main firmware transfer.
    pub const FAST: Self = Self {
        clock_hz: 4_500_000,
        pre_delay: Duration::ZERO,
        post_delay: Duration::from_millis(10),
    };
}

/// Exclusive, synchronous exchange channel to the controller.
///
/// At most one exchange is outstanding at a time; `&mut self` enforces that.
pub trait Transport {
    /// Clock `tx` out while clocking `rx.len()` bytes in.
    ///
    /// A full-duplex exchange clocks `max(tx.len(), rx.len())` bytes. An
    /// empty `rx` makes this a write-only transfer.
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], setting: TransportSetting) -> Result<()>;

    /// Write-only transfer.
    fn write(&mut self, tx: &[u8], setting: TransportSetting) -> Result<()> {
        self.exchange(tx, &mut [], setting)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], setting: TransportSetting) -> Result<()> {
        (**self).exchange(tx, rx, setting)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], setting: TransportSetting) -> Result<()> {
        (**self).exchange(tx, rx, setting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(TransportSetting::NORMAL.clock_hz, 83_000);
        assert_eq!(TransportSetting::NORMAL.pre_delay, Duration::from_millis(5));
        assert_eq!(TransportSetting::FAST.clock_hz, 4_500_000);
        assert_eq!(TransportSetting::FAST.pre_delay, Duration::ZERO);
        assert_eq!(TransportSetting::FAST.post_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_write_uses_empty_rx() {
        struct Recorder(Vec<(usize, usize)>);
        impl Transport for Recorder {
            fn exchange(&mut self, tx: &[u8], rx: &mut [u8], _: TransportSetting) -> Result<()> {
                self.0.push((tx.len(), rx.len()));
                Ok(())
            }
        }

        let mut rec = Recorder(Vec::new());
        rec.write(&[1, 2, 3], TransportSetting::FAST).unwrap();
        assert_eq!(rec.0, vec![(3, 0)]);
    }
}
