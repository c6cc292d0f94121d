//! Controller power switching.

use crate::config::Timing;
use crate::error::Result;
use crate::protocol::retry::pause;
use log::debug;

/// Two-state power switch for the controller.
pub trait PowerControl {
    /// Switch the controller on or off.
    fn set_power(&mut self, on: bool) -> Result<()>;
}

impl<P: PowerControl + ?Sized> PowerControl for &mut P {
    fn set_power(&mut self, on: bool) -> Result<()> {
        (**self).set_power(on)
    }
}

/// Hold the controller off, then power it on and let it settle.
pub fn power_cycle<P: PowerControl + ?Sized>(power: &mut P, timing: &Timing) -> Result<()> {
    debug!("Power cycling controller");
    power.set_power(false)?;
    pause(timing.power_off_hold);
    power.set_power(true)?;
    pause(timing.power_on_settle);
    Ok(())
}

/// Power switch driven by an active-high GPIO.
#[cfg(feature = "embedded-hal")]
pub struct PinPower<P> {
    pin: P,
}

#[cfg(feature = "embedded-hal")]
impl<P: embedded_hal::digital::OutputPin> PinPower<P> {
    /// Drive power through `pin`.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Release the pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

#[cfg(feature = "embedded-hal")]
impl<P: embedded_hal::digital::OutputPin> PowerControl for PinPower<P> {
    fn set_power(&mut self, on: bool) -> Result<()> {
        use embedded_hal::digital::Error as _;

        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| crate::Error::Transport(format!("power pin {:?}", e.kind())))
    }
}
