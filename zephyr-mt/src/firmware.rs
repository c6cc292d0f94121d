//! Firmware images uploaded during setup.
//!
//! The controller runs from RAM and needs two images on every power-up:
//! a small bootloader and the main firmware. [`FirmwareImages`] owns both
//! for the duration of setup; they are dropped once setup returns.

use crate::config::Timing;
use crate::error::{Error, Result};
use crate::protocol::retry::pause;
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the bootloader image.
pub const BOOTLOADER_FIRMWARE: &str = "zephyr_aspeed.bin";

/// File name of the main firmware image.
pub const MAIN_FIRMWARE: &str = "zephyr_main.bin";

/// Supplier of firmware blobs by file name.
pub trait FirmwareSource {
    /// Fetch the named image. Errors are treated as transient.
    fn fetch(&mut self, name: &str) -> Result<Vec<u8>>;
}

impl<F> FirmwareSource for F
where
    F: FnMut(&str) -> Result<Vec<u8>>,
{
    fn fetch(&mut self, name: &str) -> Result<Vec<u8>> {
        self(name)
    }
}

/// Reads images from a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Serve images from `dir`.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the images are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FirmwareSource for DirectorySource {
    fn fetch(&mut self, name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        debug!("Loading firmware from: {}", path.display());

        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                Error::FirmwareUnavailable(format!("{} not found", path.display()))
            },
            _ => Error::Io(e),
        })
    }
}

/// Both firmware images, owned by the setup context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImages {
    /// Bootloader image, uploaded in chunks.
    pub bootloader: Vec<u8>,
    /// Main firmware image, uploaded in one transfer.
    pub main: Vec<u8>,
}

impl FirmwareImages {
    /// Wrap images that are already in memory.
    pub fn new(bootloader: Vec<u8>, main: Vec<u8>) -> Self {
        Self { bootloader, main }
    }

    /// Fetch the bootloader image, then the main image, retrying each
    /// until it is available.
    ///
    /// Stops with [`Error::Interrupted`] once the checker registered with
    /// [`set_interrupt_checker`](crate::set_interrupt_checker) requests it.
    pub fn acquire<S: FirmwareSource + ?Sized>(source: &mut S, timing: &Timing) -> Result<Self> {
        Self::acquire_until(source, timing, crate::is_interrupted_requested)
    }

    /// Like [`acquire`](Self::acquire), with an explicit stop condition.
    pub fn acquire_until<S, F>(source: &mut S, timing: &Timing, should_stop: F) -> Result<Self>
    where
        S: FirmwareSource + ?Sized,
        F: Fn() -> bool,
    {
        let bootloader = fetch_until_available(source, BOOTLOADER_FIRMWARE, timing, &should_stop)?;
        let main = fetch_until_available(source, MAIN_FIRMWARE, timing, &should_stop)?;
        Ok(Self { bootloader, main })
    }
}

fn fetch_until_available<S, F>(
    source: &mut S,
    name: &str,
    timing: &Timing,
    should_stop: &F,
) -> Result<Vec<u8>>
where
    S: FirmwareSource + ?Sized,
    F: Fn() -> bool,
{
    let mut attempt = 1u64;
    loop {
        if should_stop() {
            return Err(Error::Interrupted);
        }

        match source.fetch(name) {
            Ok(data) if !data.is_empty() => {
                info!("Loaded firmware {name}: {} bytes", data.len());
                return Ok(data);
            },
            Ok(_) => warn!("Firmware {name} is empty (attempt {attempt}), retrying"),
            Err(e) => warn!("Firmware {name} unavailable (attempt {attempt}): {e}"),
        }

        pause(timing.firmware_retry_delay);
        attempt += 1;
    }
}
