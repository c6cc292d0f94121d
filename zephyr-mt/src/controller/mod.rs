//! Link to the controller: protocol state plus every command channel.
//!
//! [`Link`] owns the transport exclusively. Each channel lives in its own
//! submodule as an `impl Link` block:
//!
//! - [`negotiate`]: interface version and max packet size discovery
//! - [`upload`]: bootloader chunks and main firmware image
//! - [`report`]: typed configuration report queries
//! - [`frame`]: frame length poll and frame data read

pub mod frame;
pub mod negotiate;
pub mod report;
pub mod upload;

use crate::config::Config;
use crate::port::Transport;
use crate::protocol::packet::Token;
use crate::protocol::retry::RetryPolicy;
use crate::touch::PressureThreshold;

/// Max packet size assumed until negotiation succeeds.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1000;

/// Protocol parameters negotiated with, or tracked for, the controller.
#[derive(Debug, Clone)]
pub struct ProtocolState {
    /// Interface version reported by the controller.
    pub interface_version: u8,
    /// Largest report or frame the controller may announce.
    pub max_packet_size: usize,
    /// Token sent with the next frame length poll.
    pub token: Token,
    /// Pressure threshold applied by the frame decoder.
    pub threshold: PressureThreshold,
    /// Set once setup has completed.
    pub ready: bool,
}

impl ProtocolState {
    fn new(min_pressure: u8) -> Self {
        Self {
            interface_version: 0,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            token: Token::default(),
            threshold: PressureThreshold::new(min_pressure),
            ready: false,
        }
    }
}

/// Exclusive link to one controller.
pub struct Link<T: Transport> {
    transport: T,
    config: Config,
    state: ProtocolState,
}

impl<T: Transport> Link<T> {
    /// Create a link over an opened transport.
    pub fn new(transport: T, config: Config) -> Self {
        let state = ProtocolState::new(config.min_pressure);
        Self {
            transport,
            config,
            state,
        }
    }

    /// Protocol state.
    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Configuration the link was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the link and return the underlying transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Reset the token and mark the link ready for steady-state polling.
    pub(crate) fn mark_ready(&mut self) {
        self.state.token = Token::default();
        self.state.ready = true;
    }

    fn report_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.retries.report, self.config.timing.retry_delay)
    }

    fn frame_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.retries.frame, self.config.timing.retry_delay)
    }
}
