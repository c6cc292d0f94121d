//! Device bring-up.
//!
//! [`bring_up`] walks the controller from power-off to a ready
//! [`Touchscreen`]:
//!
//! ```text
//! Idle -> PoweringOn -> BootloaderUpload -> MainUpload -> Negotiating
//!      -> QueryingReports -> RegisteringSink -> Ready
//! ```
//!
//! Any failing stage ends in `Failed` and the error is returned as
//! [`Error::Setup`] naming that stage. Everything acquired by earlier
//! stages (firmware images, report payloads, the transport) is owned by
//! the call and dropped on the way out.

use crate::config::Config;
use crate::controller::Link;
use crate::error::Result;
use crate::firmware::FirmwareImages;
use crate::port::Transport;
use crate::power::{PowerControl, power_cycle};
use crate::profile::{DeviceProfile, ProfileBuilder, ReportId};
use crate::protocol::retry::pause;
use crate::touch::{EventSink, FrameDecoder, FrameSummary, PressureThreshold, SinkBounds};
use log::{error, info, warn};
use std::fmt;

/// Bring-up stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupState {
    /// Nothing done yet.
    Idle,
    /// Power cycling the controller.
    PoweringOn,
    /// Uploading and starting the bootloader.
    BootloaderUpload,
    /// Uploading and starting the main firmware.
    MainUpload,
    /// Discovering interface version and max packet size.
    Negotiating,
    /// Reading the configuration reports.
    QueryingReports,
    /// Announcing bounds to the event sink.
    RegisteringSink,
    /// Polling may start.
    Ready,
    /// A stage failed.
    Failed,
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::PoweringOn => "powering on",
            Self::BootloaderUpload => "uploading bootloader",
            Self::MainUpload => "uploading main firmware",
            Self::Negotiating => "negotiating",
            Self::QueryingReports => "querying reports",
            Self::RegisteringSink => "registering event sink",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

struct Progress {
    state: SetupState,
}

impl Progress {
    fn run<R>(&mut self, stage: SetupState, f: impl FnOnce() -> Result<R>) -> Result<R> {
        info!("Setup: {} -> {stage}", self.state);
        self.state = stage;

        f().map_err(|e| {
            error!("Setup failed while {stage}: {e}");
            self.state = SetupState::Failed;
            e.in_stage(stage)
        })
    }
}

/// Outcome of one [`Touchscreen::read_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The controller had no frame pending.
    NoFrame,
    /// A frame was read and decoded into the sink.
    FrameRead(FrameSummary),
}

/// Controller that completed setup.
pub struct Touchscreen<T: Transport, S: EventSink> {
    link: Link<T>,
    profile: DeviceProfile,
    decoder: FrameDecoder,
    sink: S,
}

impl<T: Transport, S: EventSink> Touchscreen<T, S> {
    pub(crate) fn new(link: Link<T>, profile: DeviceProfile, sink: S) -> Self {
        let decoder = FrameDecoder::new(
            profile.sensor_height,
            link.config().payload_byte_order,
            link.state().threshold.clone(),
        );
        Self {
            link,
            profile,
            decoder,
            sink,
        }
    }

    /// Read and decode the pending frame, if any.
    ///
    /// The whole read cycle is retried; an error means every attempt failed.
    /// Callers polling in steady state log it and wait for the next trigger.
    pub fn read_frame(&mut self) -> Result<FrameStatus> {
        match self.link.next_frame()? {
            None => Ok(FrameStatus::NoFrame),
            Some(payload) => Ok(FrameStatus::FrameRead(
                self.decoder.decode(&payload, &mut self.sink),
            )),
        }
    }

    /// Device profile read during setup.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Handle to the pressure threshold.
    pub fn threshold(&self) -> PressureThreshold {
        self.decoder.threshold().clone()
    }

    /// Controller link.
    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    /// Event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the event sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Release the transport and the sink.
    pub fn into_parts(self) -> (T, S) {
        (self.link.into_transport(), self.sink)
    }
}

/// Power up the controller, load its firmware, read its profile and
/// register `sink`.
///
/// `firmware` is consumed; the images are dropped once uploaded.
pub fn bring_up<T, P, S>(
    transport: T,
    power: &mut P,
    mut sink: S,
    firmware: FirmwareImages,
    config: Config,
) -> Result<Touchscreen<T, S>>
where
    T: Transport,
    P: PowerControl + ?Sized,
    S: EventSink,
{
    config.validate()?;

    let timing = config.timing.clone();
    let geometry = config.geometry_byte_order;
    let mut link = Link::new(transport, config);
    let mut progress = Progress {
        state: SetupState::Idle,
    };

    progress.run(SetupState::PoweringOn, || power_cycle(power, &timing))?;

    progress.run(SetupState::BootloaderUpload, || {
        link.upload_bootloader(&firmware.bootloader)
    })?;
    pause(timing.stage_settle);

    progress.run(SetupState::MainUpload, || link.upload_main(&firmware.main))?;
    pause(timing.stage_settle);
    drop(firmware);

    progress.run(SetupState::Negotiating, || link.negotiate())?;

    let profile = progress.run(SetupState::QueryingReports, || {
        let mut builder = ProfileBuilder::new();
        for id in ReportId::SETUP_ORDER {
            let data = link.report(id)?;
            builder.accept(id, &data, geometry)?;
        }
        builder.build()
    })?;

    info!("Device profile:");
    for line in profile.to_string().lines() {
        info!("  {line}");
    }

    progress.run(SetupState::RegisteringSink, || {
        sink.register(&SinkBounds::for_profile(&profile))
    })?;

    link.mark_ready();
    info!("Setup: {} -> {}", progress.state, SetupState::Ready);

    let mut device = Touchscreen::new(link, profile, sink);
    if let Err(e) = device.read_frame() {
        warn!("Initial frame read failed: {e}");
    }

    Ok(device)
}
