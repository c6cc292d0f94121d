//! Normalized touch events and the sink that receives them.

use crate::error::Result;
use crate::profile::DeviceProfile;

/// Orientation value of an upright contact; reported orientations span
/// `[-MAX_FINGER_ORIENTATION, MAX_FINGER_ORIENTATION]`.
pub const MAX_FINGER_ORIENTATION: i32 = 16384;

/// Largest tracking id announced to the sink.
pub const MAX_TRACKING_ID: u8 = 32;

/// One active contact within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// Finger id assigned by the controller.
    pub tracking_id: u8,
    /// Horizontal position.
    pub x: i32,
    /// Vertical position, flipped so the origin is at the bottom edge.
    pub y: i32,
    /// Contact size along the major axis.
    pub width: u16,
    /// Contact size along the minor axis.
    pub height: u16,
    /// Orientation, inverted around the upright axis.
    pub orientation: i32,
    /// Major force after the pressure threshold.
    pub pressure_major: u16,
    /// Minor force after the pressure threshold.
    pub pressure_minor: u16,
}

/// Legacy single-touch summary of a frame, taken from its first finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleTouch {
    /// Position of the first finger, absent on release.
    pub position: Option<(i32, i32)>,
    /// Touch button state.
    pub pressed: bool,
}

/// Event emitted by the frame decoder, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    /// A pressed contact.
    Contact(ContactEvent),
    /// End of one finger record, emitted for every record.
    ContactSync,
    /// Legacy single-touch state.
    SingleTouch(SingleTouch),
    /// End of frame.
    FrameSync,
}

/// Value ranges the sink must accept, announced once when setup completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkBounds {
    /// Device name.
    pub name: &'static str,
    /// Physical path.
    pub phys: &'static str,
    /// Position x range is `[0, x_max]`.
    pub x_max: i32,
    /// Position y range is `[0, y_max]`.
    pub y_max: i32,
    /// Touch and width axes range over `[0, touch_max]`.
    pub touch_max: i32,
    /// Orientation range is `[-orientation_max, orientation_max]`.
    pub orientation_max: i32,
    /// Tracking id range is `[0, tracking_id_max]`.
    pub tracking_id_max: u8,
}

impl SinkBounds {
    /// Bounds for a controller.
    pub fn for_profile(profile: &DeviceProfile) -> Self {
        Self {
            name: "Zephyr Multitouch Screen",
            phys: "multitouch0",
            x_max: profile.sensor_width,
            y_max: profile.sensor_height,
            touch_max: profile.sensor_width.max(profile.sensor_height),
            orientation_max: MAX_FINGER_ORIENTATION,
            tracking_id_max: MAX_TRACKING_ID,
        }
    }
}

/// Consumer of decoded touch events.
pub trait EventSink {
    /// Announce the value ranges. A failure aborts setup.
    fn register(&mut self, bounds: &SinkBounds) -> Result<()>;

    /// Deliver one event.
    fn emit(&mut self, event: TouchEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn register(&mut self, bounds: &SinkBounds) -> Result<()> {
        (**self).register(bounds)
    }

    fn emit(&mut self, event: TouchEvent) {
        (**self).emit(event);
    }
}

/// Collects every event; registration always succeeds.
impl EventSink for Vec<TouchEvent> {
    fn register(&mut self, _bounds: &SinkBounds) -> Result<()> {
        Ok(())
    }

    fn emit(&mut self, event: TouchEvent) {
        self.push(event);
    }
}
