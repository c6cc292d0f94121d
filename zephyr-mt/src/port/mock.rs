//! Scripted transport for unit tests.

use super::{Transport, TransportSetting};
use crate::error::{Error, Result};
use std::collections::VecDeque;

/// One recorded exchange.
#[derive(Debug, Clone)]
pub(crate) struct Exchange {
    pub tx: Vec<u8>,
    pub rx_len: usize,
    pub setting: TransportSetting,
}

/// Scripted reply for the next full-duplex exchange.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Bytes(Vec<u8>),
    Fail,
}

/// Transport that answers duplex exchanges from a script.
///
/// Write-only transfers never consume a reply. When the script runs out,
/// duplex exchanges read all zeros.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    replies: VecDeque<Reply>,
    pub log: Vec<Exchange>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&mut self, bytes: &[u8]) -> &mut Self {
        self.replies.push_back(Reply::Bytes(bytes.to_vec()));
        self
    }

    pub fn fail(&mut self) -> &mut Self {
        self.replies.push_back(Reply::Fail);
        self
    }

    pub fn writes(&self) -> impl Iterator<Item = &Exchange> {
        self.log.iter().filter(|e| e.rx_len == 0)
    }

    pub fn duplex(&self) -> impl Iterator<Item = &Exchange> {
        self.log.iter().filter(|e| e.rx_len > 0)
    }
}

impl Transport for MockTransport {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], setting: TransportSetting) -> Result<()> {
        self.log.push(Exchange {
            tx: tx.to_vec(),
            rx_len: rx.len(),
            setting,
        });

        if rx.is_empty() {
            return Ok(());
        }

        rx.fill(0);
        match self.replies.pop_front() {
            Some(Reply::Bytes(bytes)) => {
                let n = bytes.len().min(rx.len());
                rx[..n].copy_from_slice(&bytes[..n]);
                Ok(())
            },
            Some(Reply::Fail) => Err(Error::Transport("scripted failure".into())),
            None => Ok(()),
        }
    }
}
