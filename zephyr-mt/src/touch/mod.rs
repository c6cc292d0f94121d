//! Touch frame decoding.
//!
//! A frame payload starts with a fixed header followed by one record per
//! finger, placed at the offset and stride the header reports. The decoder
//! turns it into [`TouchEvent`]s: a [`TouchEvent::Contact`] for every
//! pressed finger, a [`TouchEvent::ContactSync`] after every record, one
//! [`TouchEvent::SingleTouch`] summary taken from the first finger, and a
//! closing [`TouchEvent::FrameSync`].
//!
//! Finger records start at the header length the controller reports and
//! are spaced by its reported record length. Field offsets within the
//! header and each record are fixed; the byte order of multi-byte fields
//! is configured by [`Config::payload_byte_order`].
//!
//! [`Config::payload_byte_order`]: crate::config::Config::payload_byte_order

mod event;
mod threshold;

pub use event::{
    ContactEvent, EventSink, MAX_FINGER_ORIENTATION, MAX_TRACKING_ID, SingleTouch, SinkBounds,
    TouchEvent,
};
pub use threshold::{MAX_THRESHOLD, PressureThreshold, adjust};

use crate::config::ByteOrder;
use log::{trace, warn};

/// Frame type of a regular touch frame.
pub const FRAME_TYPE_TOUCH: u8 = 0x44;
/// The other accepted touch frame type.
pub const FRAME_TYPE_TOUCH_ALT: u8 = 0x43;

/// Header lengths below this carry no finger data.
pub const MIN_HEADER_LEN: u8 = 12;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame type, normally 0x43 or 0x44.
    pub frame_type: u8,
    /// Rolling frame counter.
    pub frame_number: u8,
    /// Header length as reported by the controller.
    pub header_len: u8,
    /// Controller timestamp.
    pub timestamp: u32,
    /// Nonzero for raw image frames.
    pub is_image: u16,
    /// Number of finger records following the header.
    pub num_fingers: u8,
    /// Length of each finger record as reported by the controller.
    pub finger_data_len: u8,
}

impl FrameHeader {
    /// Bytes occupied by the header.
    pub const LEN: usize = 24;

    /// Parse the header. Fields past the end of `payload` read as zero.
    pub fn parse(payload: &[u8], order: ByteOrder) -> Self {
        let mut raw = [0u8; Self::LEN];
        let n = payload.len().min(Self::LEN);
        raw[..n].copy_from_slice(&payload[..n]);

        Self {
            frame_type: raw[0],
            frame_number: raw[1],
            header_len: raw[2],
            timestamp: order.read_u32(&raw[4..8]),
            is_image: order.read_u16(&raw[14..16]),
            num_fingers: raw[16],
            finger_data_len: raw[17],
        }
    }
}

/// One finger record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FingerRecord {
    /// Finger id.
    pub id: u8,
    /// Event code.
    pub event: u8,
    /// Absolute x.
    pub x: i16,
    /// Absolute y, origin at the top edge.
    pub y: i16,
    /// Relative x motion.
    pub rel_x: i16,
    /// Relative y motion.
    pub rel_y: i16,
    /// Contact size along the major axis.
    pub size_major: u16,
    /// Contact size along the minor axis.
    pub size_minor: u16,
    /// Raw orientation.
    pub orientation: u16,
    /// Raw major force.
    pub force_major: u16,
    /// Raw minor force.
    pub force_minor: u16,
}

impl FingerRecord {
    /// Size of a full record as currently sent by the controller.
    pub const LEN: usize = 28;
    /// Bytes the decoder reads from each record.
    pub const MIN_LEN: usize = 22;

    /// Parse a record, or `None` when `bytes` is shorter than [`Self::MIN_LEN`].
    pub fn parse(bytes: &[u8], order: ByteOrder) -> Option<Self> {
        if bytes.len() < Self::MIN_LEN {
            return None;
        }

        Some(Self {
            id: bytes[0],
            event: bytes[1],
            x: order.read_i16(&bytes[4..6]),
            y: order.read_i16(&bytes[6..8]),
            rel_x: order.read_i16(&bytes[8..10]),
            rel_y: order.read_i16(&bytes[10..12]),
            size_major: order.read_u16(&bytes[12..14]),
            size_minor: order.read_u16(&bytes[14..16]),
            orientation: order.read_u16(&bytes[16..18]),
            force_major: order.read_u16(&bytes[18..20]),
            force_minor: order.read_u16(&bytes[20..22]),
        })
    }
}

/// What a decoded frame contained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// Parsed header.
    pub header: FrameHeader,
    /// Finger records decoded.
    pub fingers: usize,
    /// Contact events emitted.
    pub contacts: usize,
}

/// Turns frame payloads into events for an [`EventSink`].
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    sensor_height: i32,
    order: ByteOrder,
    threshold: PressureThreshold,
}

impl FrameDecoder {
    /// Create a decoder for a surface of the given height.
    pub fn new(sensor_height: i32, order: ByteOrder, threshold: PressureThreshold) -> Self {
        Self {
            sensor_height,
            order,
            threshold,
        }
    }

    /// Threshold handle shared with the decoder.
    pub fn threshold(&self) -> &PressureThreshold {
        &self.threshold
    }

    /// Decode `payload` and emit its events into `sink`.
    ///
    /// The threshold is sampled once, so a concurrent update applies from
    /// the next frame on.
    pub fn decode<S: EventSink + ?Sized>(&self, payload: &[u8], sink: &mut S) -> FrameSummary {
        let header = FrameHeader::parse(payload, self.order);
        let threshold = self.threshold.get();
        let mut summary = FrameSummary {
            header,
            ..Default::default()
        };

        match header.frame_type {
            FRAME_TYPE_TOUCH | FRAME_TYPE_TOUCH_ALT => {},
            other => warn!("Unknown frame type {other:#04x}, frame {}", header.frame_number),
        }

        if header.header_len < MIN_HEADER_LEN {
            warn!("Frame {} has no finger data", header.frame_number);
        }

        trace!(
            "Frame {} type {:#04x}: {} fingers at {}",
            header.frame_number, header.frame_type, header.num_fingers, header.timestamp
        );

        let start = usize::from(header.header_len);
        let stride = usize::from(header.finger_data_len);

        let mut first = None;
        for i in 0..usize::from(header.num_fingers) {
            let offset = start + i * stride;
            let Some(record) = payload
                .get(offset..)
                .and_then(|rest| FingerRecord::parse(rest, self.order))
            else {
                warn!(
                    "Frame {} truncated at finger {i} of {}",
                    header.frame_number, header.num_fingers
                );
                break;
            };

            let major = adjust(record.force_major, threshold);
            let minor = adjust(record.force_minor, threshold);

            if major > 0 || minor > 0 {
                sink.emit(TouchEvent::Contact(ContactEvent {
                    tracking_id: record.id,
                    x: i32::from(record.x),
                    y: self.flip_y(record.y),
                    width: record.size_major,
                    height: record.size_minor,
                    orientation: MAX_FINGER_ORIENTATION - i32::from(record.orientation),
                    pressure_major: major,
                    pressure_minor: minor,
                }));
                summary.contacts += 1;
            }
            sink.emit(TouchEvent::ContactSync);

            if first.is_none() {
                first = Some(record);
            }
            summary.fingers += 1;
        }

        if header.num_fingers > 0 {
            // An unreadable first record reports a release.
            let single = match first {
                Some(record) if adjust(record.force_minor, threshold) > 0 => SingleTouch {
                    position: Some((i32::from(record.x), self.flip_y(record.y))),
                    pressed: record.size_minor > 0,
                },
                _ => SingleTouch {
                    position: None,
                    pressed: false,
                },
            };
            sink.emit(TouchEvent::SingleTouch(single));
        }

        sink.emit(TouchEvent::FrameSync);
        summary
    }

    fn flip_y(&self, y: i16) -> i32 {
        self.sensor_height - i32::from(y)
    }
}
