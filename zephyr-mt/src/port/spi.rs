//! Transport over an embedded-hal 1.0 [`SpiDevice`].
//!
//! Each exchange runs as one SPI transaction so chip select stays asserted
//! for the whole packet, with the setting's delays expressed as
//! `Operation::DelayNs` around the transfer.
//!
//! embedded-hal has no per-transaction clock rate. Callers whose bus can
//! switch rates register a clock hook; it is invoked before any exchange
//! whose requested rate differs from the previous one.

use crate::error::{Error, Result};
use crate::port::{Transport, TransportSetting};
use embedded_hal::spi::{Error as _, Operation, SpiDevice};
use log::{trace, warn};
use std::time::Duration;

type ClockHook = Box<dyn FnMut(u32) -> Result<()> + Send>;

/// [`Transport`] backed by an SPI device.
pub struct SpiTransport<S> {
    spi: S,
    clock_hook: Option<ClockHook>,
    current_clock: Option<u32>,
}

impl<S: SpiDevice<u8>> SpiTransport<S> {
    /// Wrap an SPI device. The bus clock is left as configured.
    pub fn new(spi: S) -> Self {
        Self {
            spi,
            clock_hook: None,
            current_clock: None,
        }
    }

    /// Register a callback that reprograms the bus clock.
    #[must_use]
    pub fn with_clock_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(u32) -> Result<()> + Send + 'static,
    {
        self.clock_hook = Some(Box::new(hook));
        self
    }

    /// Consume the transport and return the SPI device.
    pub fn into_inner(self) -> S {
        self.spi
    }

    fn apply_clock(&mut self, clock_hz: u32) -> Result<()> {
        if self.current_clock == Some(clock_hz) {
            return Ok(());
        }

        match self.clock_hook.as_mut() {
            Some(hook) => {
                trace!("Switching SPI clock to {clock_hz} Hz");
                hook(clock_hz)?;
            },
            None if self.current_clock.is_some() => {
                warn!("No clock hook registered, ignoring requested {clock_hz} Hz");
            },
            None => {},
        }

        self.current_clock = Some(clock_hz);
        Ok(())
    }
}

fn delay_ns(delay: Duration) -> u32 {
    u32::try_from(delay.as_nanos()).unwrap_or(u32::MAX)
}

impl<S: SpiDevice<u8>> Transport for SpiTransport<S> {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], setting: TransportSetting) -> Result<()> {
        self.apply_clock(setting.clock_hz)?;

        let pre = delay_ns(setting.pre_delay);
        let post = delay_ns(setting.post_delay);

        let mut ops: Vec<Operation<'_, u8>> = Vec::with_capacity(3);
        if pre > 0 {
            ops.push(Operation::DelayNs(pre));
        }
        if rx.is_empty() {
            ops.push(Operation::Write(tx));
        } else {
            ops.push(Operation::Transfer(rx, tx));
        }
        if post > 0 {
            ops.push(Operation::DelayNs(post));
        }

        self.spi.transaction(&mut ops).map_err(|e| {
            warn!("SPI transaction failed: {:?}", e.kind());
            Error::Transport(format!("SPI {:?}", e.kind()))
        })
    }
}
