//! Runtime-tunable pressure threshold.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Largest accepted threshold.
pub const MAX_THRESHOLD: u8 = 254;

/// Shared handle to the pressure threshold subtracted from every finger force.
///
/// Clones share the same value, so a handle given to a configuration
/// surface tunes the decoder of a running device.
#[derive(Debug, Clone)]
pub struct PressureThreshold(Arc<AtomicU8>);

impl PressureThreshold {
    /// Create a threshold. Values above [`MAX_THRESHOLD`] are clamped.
    pub fn new(value: u8) -> Self {
        Self(Arc::new(AtomicU8::new(value.min(MAX_THRESHOLD))))
    }

    /// Current value.
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    /// Set a new value. Values of 255 and above are rejected and leave the
    /// threshold unchanged.
    pub fn set(&self, value: u32) -> Result<()> {
        match u8::try_from(value) {
            Ok(v) if v <= MAX_THRESHOLD => {
                self.0.store(v, Ordering::Relaxed);
                Ok(())
            },
            _ => Err(Error::InvalidThreshold(value)),
        }
    }

    /// Parse and set a decimal value, as written to a text attribute.
    pub fn store(&self, text: &str) -> Result<()> {
        let value = text
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::Config(format!("invalid pressure threshold {text:?}: {e}")))?;
        self.set(value)
    }
}

impl Default for PressureThreshold {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MIN_PRESSURE)
    }
}

impl fmt::Display for PressureThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// `max(0, force - threshold)`.
pub fn adjust(force: u16, threshold: u8) -> u16 {
    force.saturating_sub(u16::from(threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_100() {
        assert_eq!(PressureThreshold::default().get(), 100);
    }

    #[test]
    fn test_set_accepts_0_to_254() {
        let t = PressureThreshold::default();
        t.set(0).unwrap();
        assert_eq!(t.get(), 0);
        t.set(254).unwrap();
        assert_eq!(t.get(), 254);
    }

    #[test]
    fn test_set_rejects_255_and_above_without_mutation() {
        let t = PressureThreshold::new(42);
        assert!(matches!(t.set(255), Err(Error::InvalidThreshold(255))));
        assert!(matches!(t.set(70_000), Err(Error::InvalidThreshold(70_000))));
        assert_eq!(t.get(), 42);
    }

    #[test]
    fn test_clones_share_value() {
        let t = PressureThreshold::default();
        let handle = t.clone();
        handle.set(7).unwrap();
        assert_eq!(t.get(), 7);
    }

    #[test]
    fn test_store_parses_text() {
        let t = PressureThreshold::default();
        t.store("80\n").unwrap();
        assert_eq!(t.get(), 80);
        assert!(t.store("abc").is_err());
        assert!(t.store("300").is_err());
        assert_eq!(t.get(), 80);
        assert_eq!(t.to_string(), "80");
    }

    #[test]
    fn test_adjust_saturates() {
        assert_eq!(adjust(150, 100), 50);
        assert_eq!(adjust(80, 100), 0);
        assert_eq!(adjust(100, 100), 0);
        assert_eq!(adjust(u16::MAX, 0), u16::MAX);
    }

    #[test]
    fn test_adjust_is_monotonic_in_threshold() {
        for force in [0u16, 1, 99, 100, 101, 254, 255, 1000, u16::MAX] {
            let mut previous = adjust(force, 0);
            for threshold in 1..=MAX_THRESHOLD {
                let current = adjust(force, threshold);
                assert!(current <= previous);
                assert_eq!(
                    u32::from(current),
                    u32::from(force).saturating_sub(u32::from(threshold))
                );
                previous = current;
            }
        }
    }
}
