//! Packet layouts for every exchange with the controller.
//!
//! All multi-byte wire integers are big-endian. Every inbound response
//! except the upload verification reply starts with [`PREAMBLE`].
//!
//! ## Bootloader data packet (1024 bytes, write-only)
//!
//! ```text
//! +------+-------------+------+--------------------------+----------+
//! | 0xC2 | address BE  | 0x00 | chunk, zero padded       | checksum |
//! +------+-------------+------+--------------------------+----------+
//! | 0    | 1..5        | 5    | 6..1022                  | 1022..   |
//! +------+-------------+------+--------------------------+----------+
//! ```
//!
//! ## Short exchanges (4 bytes)
//!
//! | request | reply |
//! |---|---|
//! | negotiate `D0 D0 D0 D0` | `AA ver size_hi size_lo` |
//! | verify `05 00 00 06` | `D0 00 sum_hi sum_lo` |
//! | execute `C4 00 00 C4` | ignored |
//! | blank data `C2 00 00 00` | ignored |
//!
//! ## Info exchanges (8 bytes)
//!
//! | request | reply |
//! |---|---|
//! | report info `8F id 8F 8F 8F 8F 8F 8F` | `AA x x x err/len_hi len_lo sum_hi sum_lo` |
//! | frame length `tok * 8` | `AA x x x len_hi len_lo sum_hi sum_lo` |
//!
//! ## Data exchanges
//!
//! | request | reply |
//! |---|---|
//! | report data: `len + 6` bytes of `0x82`, byte 1 = id | `AA x x x data[len] sum_hi sum_lo` |
//! | frame data: `len + 1` bytes of `0x68` | `AA payload[len - 2] sum_hi sum_lo` |

use crate::error::{Error, Result};
use crate::protocol::checksum::{self, Checksum16, sum16};
use byteorder::{BigEndian, ByteOrder};

/// First byte of every valid response.
pub const PREAMBLE: u8 = 0xAA;

/// Interface negotiation query.
pub const NEGOTIATE_QUERY: [u8; 4] = [0xD0; 4];

/// Upload verification query.
pub const VERIFY_QUERY: [u8; 4] = [0x05, 0x00, 0x00, 0x06];

/// First byte of a verification reply.
pub const VERIFY_ACK: u8 = 0xD0;

/// Starts the uploaded image.
pub const EXECUTE: [u8; 4] = [0xC4, 0x00, 0x00, 0xC4];

/// Marker sent before the main firmware image.
pub const BLANK_DATA: [u8; 4] = [0xC2, 0x00, 0x00, 0x00];

/// Length of the 4-byte command exchanges.
pub const SHORT_LEN: usize = 4;

/// Length of report info and frame length exchanges.
pub const INFO_LEN: usize = 8;

/// Filler of report info requests.
pub const REPORT_INFO_FILL: u8 = 0x8F;

/// Filler of report data requests.
pub const REPORT_DATA_FILL: u8 = 0x82;

/// Filler of frame data requests.
pub const FRAME_DATA_FILL: u8 = 0x68;

/// Offset of the data region in a report data reply.
pub const REPORT_DATA_OFFSET: usize = 4;

/// Bytes a report data exchange adds around the report itself.
pub const REPORT_OVERHEAD: usize = 6;

/// Smallest frame data read holding preamble, one payload byte and trailer.
pub const FRAME_MIN_LEN: usize = 3;

/// Bootloader data command byte.
pub const BOOTLOADER_DATA_CMD: u8 = 0xC2;

/// Size of every bootloader data packet.
pub const BOOTLOADER_PACKET_LEN: usize = 1024;

/// Command byte, address and pad byte.
pub const BOOTLOADER_HEADER_LEN: usize = 6;

/// Maximum chunk carried by one bootloader packet.
pub const BOOTLOADER_CHUNK_MAX: usize = 1016;

/// Offset of the checksum trailer in a bootloader packet.
pub const BOOTLOADER_TRAILER_OFFSET: usize = BOOTLOADER_HEADER_LEN + BOOTLOADER_CHUNK_MAX;

/// Alternating frame-length token.
///
/// Flipped after every successful frame data read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Token {
    /// 0x64, the value after setup.
    #[default]
    Low = 0x64,
    /// 0x65.
    High = 0x65,
}

impl Token {
    /// The other token value.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }

    /// Wire byte.
    pub fn byte(self) -> u8 {
        self as u8
    }
}

fn check_preamble(rx: &[u8]) -> Result<()> {
    match rx.first() {
        Some(&PREAMBLE) => Ok(()),
        Some(&got) => Err(Error::Sync { got }),
        None => Err(Error::Sync { got: 0 }),
    }
}

/// One chunk of the bootloader image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootloaderPacket<'a> {
    /// Destination address.
    pub address: u32,
    /// Chunk payload, at most [`BOOTLOADER_CHUNK_MAX`] bytes.
    pub chunk: &'a [u8],
}

impl<'a> BootloaderPacket<'a> {
    /// Create a packet, truncating `chunk` to [`BOOTLOADER_CHUNK_MAX`].
    pub fn new(address: u32, chunk: &'a [u8]) -> Self {
        let len = chunk.len().min(BOOTLOADER_CHUNK_MAX);
        Self {
            address,
            chunk: &chunk[..len],
        }
    }

    fn header(&self) -> [u8; BOOTLOADER_HEADER_LEN] {
        let mut header = [0u8; BOOTLOADER_HEADER_LEN];
        header[0] = BOOTLOADER_DATA_CMD;
        BigEndian::write_u32(&mut header[1..5], self.address);
        header
    }

    /// Checksum over header and chunk, as reported by the verify query.
    pub fn checksum(&self) -> u16 {
        Checksum16::default()
            .update(self.chunk)
            .update(&self.header())
            .value()
    }

    /// Encode the full 1024-byte packet.
    pub fn encode(&self) -> [u8; BOOTLOADER_PACKET_LEN] {
        let mut packet = [0u8; BOOTLOADER_PACKET_LEN];
        packet[..BOOTLOADER_HEADER_LEN].copy_from_slice(&self.header());
        packet[BOOTLOADER_HEADER_LEN..BOOTLOADER_HEADER_LEN + self.chunk.len()]
            .copy_from_slice(self.chunk);
        BigEndian::write_u16(&mut packet[BOOTLOADER_TRAILER_OFFSET..], self.checksum());
        packet
    }

    /// Decode a packet carrying a chunk of `chunk_len` bytes.
    ///
    /// The chunk length is not on the wire; padding is indistinguishable
    /// from payload zeros.
    pub fn decode(packet: &'a [u8], chunk_len: usize) -> Result<Self> {
        if packet.len() != BOOTLOADER_PACKET_LEN || chunk_len > BOOTLOADER_CHUNK_MAX {
            return Err(Error::ShortFrame { len: packet.len() });
        }
        if packet[0] != BOOTLOADER_DATA_CMD {
            return Err(Error::Sync { got: packet[0] });
        }

        let decoded = Self {
            address: BigEndian::read_u32(&packet[1..5]),
            chunk: &packet[BOOTLOADER_HEADER_LEN..BOOTLOADER_HEADER_LEN + chunk_len],
        };
        checksum::verify(decoded.checksum(), &packet[BOOTLOADER_TRAILER_OFFSET..])?;
        Ok(decoded)
    }
}

/// Parse the negotiation reply into `(version, max_packet_size)`.
pub fn parse_negotiate_reply(rx: &[u8; SHORT_LEN]) -> Result<(u8, u16)> {
    check_preamble(rx)?;
    Ok((rx[1], BigEndian::read_u16(&rx[2..4])))
}

/// Check a verification reply against the expected 16-bit checksum.
pub fn check_verify_reply(rx: &[u8; SHORT_LEN], expected: u16) -> Result<()> {
    let [hi, lo] = expected.to_be_bytes();
    if rx[0] != VERIFY_ACK || rx[1] != 0 || rx[2] != hi || rx[3] != lo {
        return Err(Error::UploadVerification {
            expected,
            reply: *rx,
        });
    }
    Ok(())
}

/// Report info request for `id`.
pub fn report_info_request(id: u8) -> [u8; INFO_LEN] {
    let mut tx = [REPORT_INFO_FILL; INFO_LEN];
    tx[1] = id;
    tx
}

/// Decoded report info reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportInfo {
    /// Error code, zero when the report is available.
    pub error_code: u8,
    /// Report length in bytes.
    pub len: u16,
}

/// Parse a report info reply for `id`.
pub fn parse_report_info(id: u8, rx: &[u8; INFO_LEN]) -> Result<ReportInfo> {
    check_preamble(rx)?;
    let expected = Checksum16::seeded(u16::from(id)).update(&rx[4..6]).value();
    checksum::verify(expected, &rx[6..8])?;

    Ok(ReportInfo {
        error_code: rx[4] >> 4,
        len: (u16::from(rx[4] & 0x0F) << 8) | u16::from(rx[5]),
    })
}

/// Report data request for a report of `len` bytes.
pub fn report_data_request(id: u8, len: usize) -> Vec<u8> {
    let mut tx = vec![REPORT_DATA_FILL; len + REPORT_OVERHEAD];
    tx[1] = id;
    tx
}

/// Validate a report data reply and return the report bytes.
pub fn parse_report_data(id: u8, rx: &[u8], len: usize) -> Result<&[u8]> {
    if rx.len() < len + REPORT_OVERHEAD {
        return Err(Error::ShortFrame { len: rx.len() });
    }
    check_preamble(rx)?;

    let data = &rx[REPORT_DATA_OFFSET..REPORT_DATA_OFFSET + len];
    let expected = Checksum16::seeded(u16::from(id)).update(data).value();
    checksum::verify(expected, &rx[REPORT_DATA_OFFSET + len..])?;
    Ok(data)
}

/// Frame length request filled with the current token.
pub fn frame_length_request(token: Token) -> [u8; INFO_LEN] {
    [token.byte(); INFO_LEN]
}

/// Parse a frame length reply.
pub fn parse_frame_length(rx: &[u8; INFO_LEN]) -> Result<u16> {
    check_preamble(rx)?;
    checksum::verify(sum16(&rx[4..6]), &rx[6..8])?;
    Ok(BigEndian::read_u16(&rx[4..6]))
}

/// Frame data request of `len` bytes.
pub fn frame_data_request(len: usize) -> Vec<u8> {
    vec![FRAME_DATA_FILL; len]
}

/// Validate a frame data reply and return the payload between preamble and trailer.
pub fn parse_frame_data(rx: &[u8]) -> Result<&[u8]> {
    let len = rx.len();
    if len < FRAME_MIN_LEN {
        return Err(Error::ShortFrame { len });
    }
    check_preamble(rx)?;

    let payload = &rx[1..len - 2];
    checksum::verify(sum16(payload), &rx[len - 2..])?;
    Ok(payload)
}
