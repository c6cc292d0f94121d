//! Typed configuration report queries.
//!
//! A report is fetched in two steps: an 8-byte info exchange announcing
//! its length (or an error code), then a data exchange of `length + 6`
//! bytes.

use super::Link;
use crate::error::{Error, Result};
use crate::port::{Transport, TransportSetting};
use crate::profile::ReportId;
use crate::protocol::packet::{self, INFO_LEN, REPORT_OVERHEAD, ReportInfo};
use crate::protocol::retry::retry;
use log::debug;

impl<T: Transport> Link<T> {
    /// Query the error code and length of report `id`.
    pub fn report_info(&mut self, id: u8) -> Result<ReportInfo> {
        let max = self.state.max_packet_size;
        let tx = packet::report_info_request(id);

        retry("report info", self.report_policy(), |_| {
            let mut rx = [0u8; INFO_LEN];
            self.transport
                .exchange(&tx, &mut rx, TransportSetting::NORMAL)?;
            let info = packet::parse_report_info(id, &rx)?;

            if info.error_code == 0 && usize::from(info.len) > max {
                return Err(Error::Overflow {
                    len: usize::from(info.len),
                    max,
                });
            }
            Ok(info)
        })
    }

    /// Fetch the payload of report `id` announced by `info`.
    ///
    /// A nonzero error code fails without any further exchange.
    pub fn report_data(&mut self, id: u8, info: ReportInfo) -> Result<Vec<u8>> {
        if info.error_code != 0 {
            return Err(Error::ReportRejected {
                id,
                code: info.error_code,
            });
        }

        let len = usize::from(info.len);
        let tx = packet::report_data_request(id, len);

        retry("report data", self.report_policy(), |_| {
            let mut rx = vec![0u8; len + REPORT_OVERHEAD];
            self.transport
                .exchange(&tx, &mut rx, TransportSetting::NORMAL)?;
            packet::parse_report_data(id, &rx, len).map(<[u8]>::to_vec)
        })
    }

    /// Fetch a configuration report.
    pub fn report(&mut self, id: ReportId) -> Result<Vec<u8>> {
        let info = self.report_info(id.id())?;
        let data = self.report_data(id.id(), info)?;
        debug!("Report {id}: {} bytes", data.len());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::test_util::link;
    use crate::error::Error;
    use crate::port::mock::MockTransport;
    use crate::profile::ReportId;
    use crate::protocol::packet::ReportInfo;

    fn info_reply(id: u8, b4: u8, b5: u8) -> [u8; 8] {
        let [hi, lo] = (u16::from(id) + u16::from(b4) + u16::from(b5)).to_be_bytes();
        [0xAA, 0, 0, 0, b4, b5, hi, lo]
    }

    fn data_reply(id: u8, data: &[u8]) -> Vec<u8> {
        let mut rx = vec![0xAA, 0, 0, 0];
        rx.extend_from_slice(data);
        let sum = data
            .iter()
            .fold(u16::from(id), |acc, &b| acc.wrapping_add(u16::from(b)));
        rx.extend_from_slice(&sum.to_be_bytes());
        rx
    }

    #[test]
    fn test_report_round_trip() {
        let mut mock = MockTransport::new();
        mock.reply(&info_reply(0xD3, 0x00, 0x05))
            .reply(&data_reply(0xD3, &[1, 2, 3, 4, 5]));
        let mut link = link(mock);

        let data = link.report(ReportId::SensorInfo).unwrap();
        assert_eq!(data, vec![1, 2, 3, 4, 5]);

        let log = &link.transport().log;
        assert_eq!(log[0].tx, vec![0x8F, 0xD3, 0x8F, 0x8F, 0x8F, 0x8F, 0x8F, 0x8F]);
        assert_eq!(log[1].tx.len(), 11);
        assert_eq!(log[1].rx_len, 11);
        assert_eq!(log[1].tx[1], 0xD3);
        assert_eq!(log[1].tx[0], 0x82);
    }

    #[test]
    fn test_report_info_retries_checksum_mismatch() {
        let mut bad = info_reply(0xD1, 0x00, 0x01);
        bad[7] ^= 1;
        let mut mock = MockTransport::new();
        mock.reply(&bad).reply(&info_reply(0xD1, 0x00, 0x01));
        let mut link = link(mock);

        let info = link.report_info(0xD1).unwrap();
        assert_eq!(info, ReportInfo { error_code: 0, len: 1 });
        assert_eq!(link.transport().log.len(), 2);
    }

    #[test]
    fn test_report_error_code_stops_query() {
        let mut mock = MockTransport::new();
        mock.reply(&info_reply(0xD9, 0x20, 0x08));
        let mut link = link(mock);

        let err = link.report(ReportId::SensorDimensions).unwrap_err();
        assert!(matches!(err, Error::ReportRejected { id: 0xD9, code: 2 }));
        assert_eq!(link.transport().log.len(), 1);
    }

    #[test]
    fn test_report_length_above_max_packet_is_retried() {
        // 0x7FF bytes announced, max packet size is 1000
        let mut mock = MockTransport::new();
        for _ in 0..4 {
            mock.reply(&info_reply(0xD0, 0x07, 0xFF));
        }
        let mut link = link(mock);

        let err = link.report_info(0xD0).unwrap_err();
        match err {
            Error::RetriesExhausted { source, .. } => {
                assert!(matches!(*source, Error::Overflow { len: 0x7FF, max: 1000 }));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_report_data_gives_up_after_four_attempts() {
        let mut mock = MockTransport::new();
        mock.reply(&info_reply(0xA1, 0x00, 0x02));
        let mut link = link(mock);

        let err = link.report(ReportId::SensorRegionParam).unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(link.transport().log.len(), 5);
    }

    #[test]
    fn test_empty_report() {
        let mut mock = MockTransport::new();
        mock.reply(&info_reply(0xA1, 0x00, 0x00))
            .reply(&data_reply(0xA1, &[]));
        let mut link = link(mock);

        assert!(link.report(ReportId::SensorRegionParam).unwrap().is_empty());
    }
}
