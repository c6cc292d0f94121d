//! Firmware upload: chunked bootloader image and single-blob main image.

use super::Link;
use crate::error::Result;
use crate::port::{Transport, TransportSetting};
use crate::protocol::checksum::{low16, sum32};
use crate::protocol::packet::{
    self, BLANK_DATA, BOOTLOADER_CHUNK_MAX, BootloaderPacket, EXECUTE, SHORT_LEN, VERIFY_QUERY,
};
use crate::protocol::retry::{RetryPolicy, pause, retry};
use log::{debug, info, trace};
use std::time::Duration;

impl<T: Transport> Link<T> {
    /// Upload the bootloader image in 1016-byte chunks, verifying each one,
    /// then start it.
    pub fn upload_bootloader(&mut self, image: &[u8]) -> Result<()> {
        let policy = RetryPolicy::new(self.config.retries.chunk, Duration::ZERO);
        let settle = self.config.timing.chunk_settle;
        let mut address = self.config.bootloader_base;
        let total = image.len();

        info!(
            "Uploading bootloader ({total} bytes) to 0x{address:08X}"
        );

        for (index, chunk) in image.chunks(BOOTLOADER_CHUNK_MAX).enumerate() {
            let packet = BootloaderPacket::new(address, chunk);
            let bytes = packet.encode();
            let checksum = packet.checksum();

            retry("bootloader chunk upload", policy, |attempt| {
                trace!(
                    "Uploading chunk {index} ({} bytes) to 0x{address:08X}, attempt {attempt}",
                    chunk.len()
                );
                self.transport.write(&bytes, TransportSetting::NORMAL)?;
                pause(settle);
                self.verify_upload(checksum)
            })?;

            // Chunks are at most BOOTLOADER_CHUNK_MAX bytes.
            let step = u32::try_from(chunk.len()).unwrap_or(u32::MAX);
            address = address.wrapping_add(step);
        }

        self.send_execute()?;
        info!("Bootloader uploaded");
        Ok(())
    }

    /// Upload the main firmware image in one transfer at the fast clock rate,
    /// verify the whole-image checksum, then start it.
    pub fn upload_main(&mut self, image: &[u8]) -> Result<()> {
        let policy = RetryPolicy::new(self.config.retries.main_image, Duration::ZERO);
        let checksum = low16(sum32(image));

        info!("Uploading main firmware ({} bytes)", image.len());

        retry("main firmware upload", policy, |_| {
            self.send_blank_data()?;
            self.transport.write(image, TransportSetting::FAST)?;
            self.verify_upload(checksum)
        })?;

        self.send_execute()?;
        info!("Main firmware uploaded");
        Ok(())
    }

    /// Ask the controller for the checksum of the data it just received.
    fn verify_upload(&mut self, checksum: u16) -> Result<()> {
        let mut rx = [0u8; SHORT_LEN];
        self.transport
            .exchange(&VERIFY_QUERY, &mut rx, TransportSetting::NORMAL)?;
        packet::check_verify_reply(&rx, checksum)?;
        debug!("Data verification successful ({checksum:#06x})");
        Ok(())
    }

    /// The reply is logged, not validated.
    fn send_execute(&mut self) -> Result<()> {
        let mut rx = [0u8; SHORT_LEN];
        self.transport
            .exchange(&EXECUTE, &mut rx, TransportSetting::NORMAL)?;
        debug!("Execute packet sent, reply {rx:02x?}");
        Ok(())
    }

    fn send_blank_data(&mut self) -> Result<()> {
        let mut rx = [0u8; SHORT_LEN];
        self.transport
            .exchange(&BLANK_DATA, &mut rx, TransportSetting::NORMAL)?;
        debug!("Blank data packet sent, reply {rx:02x?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::test_util::link;
    use crate::error::Error;
    use crate::port::TransportSetting;
    use crate::port::mock::MockTransport;
    use crate::protocol::packet::BootloaderPacket;

    fn ack(checksum: u16) -> [u8; 4] {
        let [hi, lo] = checksum.to_be_bytes();
        [0xD0, 0x00, hi, lo]
    }

    #[test]
    fn test_bootloader_single_chunk() {
        let mut mock = MockTransport::new();
        mock.reply(&ack(0x105)).reply(&[0; 4]);
        let mut link = link(mock);

        link.upload_bootloader(&[0x01, 0x02]).unwrap();

        let log = &link.transport().log;
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].tx.len(), 1024);
        assert_eq!(log[0].rx_len, 0);
        assert_eq!(&log[0].tx[..6], &[0xC2, 0x40, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&log[0].tx[1022..], &[0x01, 0x05]);
        assert_eq!(log[1].tx, vec![5, 0, 0, 6]);
        assert_eq!(log[2].tx, vec![0xC4, 0, 0, 0xC4]);
    }

    #[test]
    fn test_bootloader_chunks_advance_address() {
        let image: Vec<u8> = (0..2100u32).map(|i| u8::try_from(i % 200).unwrap()).collect();
        let chunks: Vec<&[u8]> = image.chunks(1016).collect();
        assert_eq!(chunks.len(), 3);

        let addresses = [0x4000_0000u32, 0x4000_03F8, 0x4000_07F0];
        let mut mock = MockTransport::new();
        for (address, chunk) in addresses.iter().zip(&chunks) {
            mock.reply(&ack(BootloaderPacket::new(*address, chunk).checksum()));
        }
        let mut link = link(mock);

        link.upload_bootloader(&image).unwrap();

        let writes: Vec<_> = link.transport().writes().collect();
        assert_eq!(writes.len(), 3);
        for (write, address) in writes.iter().zip(addresses) {
            assert_eq!(&write.tx[1..5], &address.to_be_bytes());
        }
        // last chunk is 68 bytes, zero padded
        assert_eq!(writes[2].tx[6 + 67], image[2099]);
        assert!(writes[2].tx[6 + 68..1022].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bootloader_chunk_retried_on_mismatch() {
        let mut mock = MockTransport::new();
        mock.reply(&ack(0x999)).reply(&ack(0x105));
        let mut link = link(mock);

        link.upload_bootloader(&[0x01, 0x02]).unwrap();
        assert_eq!(link.transport().writes().count(), 2);
    }

    #[test]
    fn test_bootloader_fails_after_five_attempts() {
        let mut link = link(MockTransport::new());

        let err = link.upload_bootloader(&[0x01, 0x02]).unwrap_err();
        match err {
            Error::RetriesExhausted {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 5);
                assert!(matches!(*source, Error::UploadVerification { .. }));
            },
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(link.transport().writes().count(), 5);
        // no execute packet after a failed upload
        assert!(
            link.transport()
                .duplex()
                .all(|e| e.tx == vec![5, 0, 0, 6])
        );
    }

    #[test]
    fn test_bootloader_transport_failure_is_fatal() {
        let mut mock = MockTransport::new();
        mock.fail();
        let mut link = link(mock);

        assert!(matches!(
            link.upload_bootloader(&[0x01]),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn test_main_firmware_upload() {
        let image = vec![0xFFu8; 300]; // sum 0x12AD4, truncated 0x2AD4
        let mut mock = MockTransport::new();
        mock.reply(&[0; 4]) // blank
            .reply(&ack(0x2AD4))
            .reply(&[0; 4]); // execute
        let mut link = link(mock);

        link.upload_main(&image).unwrap();

        let log = &link.transport().log;
        assert_eq!(log.len(), 4);
        assert_eq!(log[0].tx, vec![0xC2, 0, 0, 0]);
        assert_eq!(log[0].setting, TransportSetting::NORMAL);
        assert_eq!(log[1].tx, image);
        assert_eq!(log[1].rx_len, 0);
        assert_eq!(log[1].setting, TransportSetting::FAST);
        assert_eq!(log[2].tx, vec![5, 0, 0, 6]);
        assert_eq!(log[3].tx, vec![0xC4, 0, 0, 0xC4]);
    }

    #[test]
    fn test_main_firmware_resends_blank_marker_on_retry() {
        let image = [0x10u8, 0x20];
        let mut mock = MockTransport::new();
        mock.reply(&[0; 4])
            .reply(&ack(0x0031))
            .reply(&[0; 4])
            .reply(&ack(0x0030));
        let mut link = link(mock);

        link.upload_main(&image).unwrap();
        let blanks = link
            .transport()
            .log
            .iter()
            .filter(|e| e.tx == vec![0xC2, 0, 0, 0])
            .count();
        assert_eq!(blanks, 2);
    }

    #[test]
    fn test_main_firmware_fails_after_five_attempts() {
        let mut link = link(MockTransport::new());
        let err = link.upload_main(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 5, .. }));
        assert_eq!(link.transport().writes().count(), 5);
    }
}
