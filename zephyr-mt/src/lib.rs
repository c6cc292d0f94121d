//! # zephyr-mt
//!
//! Host-side engine for the Zephyr multitouch controller.
//!
//! The controller boots from RAM: on every power-up the host uploads a
//! bootloader and a main firmware image over a half-duplex byte link,
//! negotiates the interface, reads a handful of configuration reports and
//! then polls touch frames whenever the controller raises its interrupt.
//! This crate implements that protocol on top of a small [`Transport`]
//! trait and turns frames into multitouch events for an [`EventSink`].
//!
//! ## Layers
//!
//! - [`protocol`]: checksums, packet layouts, bounded retries
//! - [`controller`]: the [`Link`] and its command channels
//! - [`touch`]: frame decoding and the pressure threshold
//! - [`setup`]: bring-up state machine producing a [`Touchscreen`]
//! - [`drain`]: single-flight polling driven by interrupt triggers
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for the configuration and
//!   [`Config::from_toml_str`]
//! - `embedded-hal`: SPI transport and GPIO power switch for
//!   `embedded-hal` 1.0 devices
//!
//! ## Example
//!
//! ```rust,no_run
//! use zephyr_mt::{
//!     Config, DirectorySource, FirmwareImages, Poller, PowerControl, Result, Transport,
//!     TransportSetting, TouchEvent, bring_up,
//! };
//!
//! struct Bus;
//! impl Transport for Bus {
//!     fn exchange(&mut self, tx: &[u8], rx: &mut [u8], _: TransportSetting) -> Result<()> {
//!         let _ = (tx, rx);
//!         Ok(())
//!     }
//! }
//!
//! struct Rail;
//! impl PowerControl for Rail {
//!     fn set_power(&mut self, _on: bool) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let config = Config::default();
//!     let mut source = DirectorySource::new("/lib/firmware");
//!     let firmware = FirmwareImages::acquire(&mut source, &config.timing)?;
//!
//!     let device = bring_up(Bus, &mut Rail, Vec::<TouchEvent>::new(), firmware, config)?;
//!     let poller = Poller::new(device);
//!
//!     // Call from the interrupt handler thread on every edge.
//!     poller.trigger();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod config;
pub mod controller;
pub mod drain;
pub mod error;
pub mod firmware;
pub mod port;
pub mod power;
pub mod profile;
pub mod protocol;
pub mod setup;
pub mod touch;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker consulted by loops that would
/// otherwise wait forever, such as firmware acquisition.
///
/// Only the first registration takes effect.
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupted_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

#[cfg(feature = "embedded-hal")]
pub use {port::spi::SpiTransport, power::PinPower};
pub use {
    config::{ByteOrder, Config, RetryLimits, Timing},
    controller::{Link, ProtocolState},
    drain::{Coalescer, DrainPolicy, Poller},
    error::{Error, Result},
    firmware::{DirectorySource, FirmwareImages, FirmwareSource},
    port::{Transport, TransportSetting},
    power::{PowerControl, power_cycle},
    profile::{DeviceProfile, ReportId},
    setup::{FrameStatus, SetupState, Touchscreen, bring_up},
    touch::{
        ContactEvent, EventSink, FrameDecoder, FrameSummary, PressureThreshold, SingleTouch,
        SinkBounds, TouchEvent,
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_interrupt_checker_toggle() {
        static FLAG: AtomicBool = AtomicBool::new(false);
        set_interrupt_checker(|| FLAG.load(Ordering::Relaxed));

        assert!(!is_interrupted_requested());
        FLAG.store(true, Ordering::Relaxed);
        assert!(is_interrupted_requested());
        FLAG.store(false, Ordering::Relaxed);
        assert!(!is_interrupted_requested());
    }
}
