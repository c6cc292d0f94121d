//! Frame channel: length poll and frame data read.

use super::Link;
use crate::error::{Error, Result};
use crate::port::{Transport, TransportSetting};
use crate::protocol::packet::{self, INFO_LEN};
use crate::protocol::retry::{retry, retry_if};
use log::{trace, warn};

impl<T: Transport> Link<T> {
    /// Ask the controller how many bytes the pending frame has. Zero means
    /// no frame is pending.
    pub fn poll_frame_length(&mut self) -> Result<usize> {
        let max = self.state.max_packet_size;
        let tx = packet::frame_length_request(self.state.token);

        retry("frame length poll", self.frame_policy(), |_| {
            let mut rx = [0u8; INFO_LEN];
            self.transport
                .exchange(&tx, &mut rx, TransportSetting::NORMAL)?;
            let len = usize::from(packet::parse_frame_length(&rx)?);

            if len > max {
                warn!("Device unexpectedly requested to transfer a {len} byte packet. Max size = {max}");
                return Err(Error::Overflow { len, max });
            }
            Ok(len)
        })
    }

    /// Read `len` bytes of frame data and return the checked payload.
    pub fn read_frame_data(&mut self, len: usize) -> Result<Vec<u8>> {
        let tx = packet::frame_data_request(len);

        retry("frame data read", self.frame_policy(), |_| {
            let mut rx = vec![0u8; len];
            self.transport
                .exchange(&tx, &mut rx, TransportSetting::NORMAL)?;
            packet::parse_frame_data(&rx).map(<[u8]>::to_vec)
        })
    }

    /// One frame cycle: poll the length, read the frame if one is pending,
    /// and flip the token.
    ///
    /// Returns `None` when no frame was pending. The whole cycle is retried
    /// on any failure, transport errors included.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        retry_if("frame read", self.frame_policy(), |_| true, |_| {
            let len = self.poll_frame_length()?;
            if len == 0 {
                return Ok(None);
            }

            let payload = self.read_frame_data(len + 1)?;

            self.state.token = self.state.token.flipped();
            trace!(
                "Frame of {} bytes, next token {:?}",
                payload.len(),
                self.state.token
            );
            Ok(Some(payload))
        })
    }
}
