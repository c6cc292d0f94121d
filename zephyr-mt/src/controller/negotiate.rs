//! Interface version and max packet size discovery.

use super::{DEFAULT_MAX_PACKET_SIZE, Link};
use crate::error::Result;
use crate::port::{Transport, TransportSetting};
use crate::protocol::packet::{self, NEGOTIATE_QUERY, SHORT_LEN};
use crate::protocol::retry::{RetryPolicy, retry};
use log::{error, info};

impl<T: Transport> Link<T> {
    /// Query the interface version and max packet size.
    ///
    /// Every failed attempt records the provisional defaults (version 0,
    /// 1000 bytes) before the next query.
    pub fn negotiate(&mut self) -> Result<(u8, usize)> {
        let policy = RetryPolicy::new(
            self.config.retries.negotiate,
            self.config.timing.negotiate_retry_delay,
        );

        let result = retry("interface negotiation", policy, |_| {
            let mut rx = [0u8; SHORT_LEN];
            let reply = self
                .transport
                .exchange(&NEGOTIATE_QUERY, &mut rx, TransportSetting::NORMAL)
                .and_then(|()| packet::parse_negotiate_reply(&rx));

            match reply {
                Ok((version, max_packet_size)) => {
                    self.state.interface_version = version;
                    self.state.max_packet_size = usize::from(max_packet_size);
                    Ok((version, usize::from(max_packet_size)))
                },
                Err(e) => {
                    self.state.interface_version = 0;
                    self.state.max_packet_size = DEFAULT_MAX_PACKET_SIZE;
                    Err(e)
                },
            }
        });

        match &result {
            Ok((version, max)) => {
                info!("Interface version {version}, max packet size: {max}");
            },
            Err(e) => error!("Failed getting interface version: {e}"),
        }

        result
    }
}
