//! Device configuration reports and the device profile built from them.

use crate::config::ByteOrder;
use crate::error::{Error, Result};
use std::fmt;

/// Configuration reports queried during setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReportId {
    /// Controller family id (1 byte).
    FamilyId = 0xD1,
    /// Endianness, rows, columns, BCD version (5 bytes).
    SensorInfo = 0xD3,
    /// Opaque sensor region descriptor.
    SensorRegionDescriptor = 0xD0,
    /// Opaque sensor region parameter.
    SensorRegionParam = 0xA1,
    /// Two 32-bit surface geometry fields (8 bytes).
    SensorDimensions = 0xD9,
}

impl ReportId {
    /// Query order used by setup.
    pub const SETUP_ORDER: [Self; 5] = [
        Self::FamilyId,
        Self::SensorInfo,
        Self::SensorRegionDescriptor,
        Self::SensorRegionParam,
        Self::SensorDimensions,
    ];

    /// Wire id.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Bytes the decoder needs from this report.
    pub fn min_len(self) -> usize {
        match self {
            Self::FamilyId => 1,
            Self::SensorInfo => 5,
            Self::SensorDimensions => 8,
            Self::SensorRegionDescriptor | Self::SensorRegionParam => 0,
        }
    }

    fn require(self, data: &[u8]) -> Result<()> {
        if data.len() < self.min_len() {
            return Err(Error::ShortReport {
                id: self.id(),
                len: data.len(),
                need: self.min_len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FamilyId => "family id",
            Self::SensorInfo => "sensor info",
            Self::SensorRegionDescriptor => "sensor region descriptor",
            Self::SensorRegionParam => "sensor region param",
            Self::SensorDimensions => "sensor surface dimensions",
        };
        write!(f, "{name} ({:#04x})", self.id())
    }
}

/// Sensor width in touch units from the first geometry field.
///
/// Returns `None` when the result does not fit an `i32`; such a field is
/// rejected rather than wrapped.
pub fn sensor_width(dim0: u32) -> Option<i32> {
    i32::try_from((9000 - i64::from(dim0)) * 84 / 73).ok()
}

/// Sensor height in touch units from the second geometry field.
///
/// Returns `None` when the result does not fit an `i32`.
pub fn sensor_height(dim1: u32) -> Option<i32> {
    i32::try_from((13850 - i64::from(dim1)) * 84 / 73).ok()
}

/// Controller description assembled from the setup reports. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Controller family.
    pub family_id: u8,
    /// Sensor rows.
    pub sensor_rows: u8,
    /// Sensor columns.
    pub sensor_columns: u8,
    /// Firmware version, BCD.
    pub bcd_version: u16,
    /// Endianness flag reported by the controller.
    pub endianness: u8,
    /// Surface width in touch units.
    pub sensor_width: i32,
    /// Surface height in touch units.
    pub sensor_height: i32,
    /// Raw sensor region descriptor.
    pub region_descriptor: Vec<u8>,
    /// Raw sensor region parameter.
    pub region_param: Vec<u8>,
}

/// Accumulates report payloads in setup order.
///
/// Dropping a partially filled builder releases everything copied so far.
#[derive(Debug, Default)]
pub struct ProfileBuilder {
    family_id: Option<u8>,
    sensor_info: Option<(u8, u8, u8, u16)>,
    region_descriptor: Option<Vec<u8>>,
    region_param: Option<Vec<u8>>,
    dimensions: Option<(i32, i32)>,
}

impl ProfileBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the payload of `id`.
    pub fn accept(&mut self, id: ReportId, data: &[u8], geometry: ByteOrder) -> Result<()> {
        id.require(data)?;

        match id {
            ReportId::FamilyId => self.family_id = Some(data[0]),
            ReportId::SensorInfo => {
                let bcd = u16::from_be_bytes([data[3], data[4]]);
                self.sensor_info = Some((data[0], data[1], data[2], bcd));
            },
            ReportId::SensorRegionDescriptor => self.region_descriptor = Some(data.to_vec()),
            ReportId::SensorRegionParam => self.region_param = Some(data.to_vec()),
            ReportId::SensorDimensions => {
                let dim0 = geometry.read_u32(&data[0..4]);
                let dim1 = geometry.read_u32(&data[4..8]);
                let width = sensor_width(dim0).ok_or(Error::InvalidDimension { raw: dim0 })?;
                let height = sensor_height(dim1).ok_or(Error::InvalidDimension { raw: dim1 })?;
                self.dimensions = Some((width, height));
            },
        }

        Ok(())
    }

    /// Finish the profile. Fails while a report is missing.
    pub fn build(self) -> Result<DeviceProfile> {
        let missing = |id: ReportId| Error::MissingReport { id: id.id() };

        let (endianness, sensor_rows, sensor_columns, bcd_version) =
            self.sensor_info.ok_or(missing(ReportId::SensorInfo))?;
        let (sensor_width, sensor_height) =
            self.dimensions.ok_or(missing(ReportId::SensorDimensions))?;

        Ok(DeviceProfile {
            family_id: self.family_id.ok_or(missing(ReportId::FamilyId))?,
            sensor_rows,
            sensor_columns,
            bcd_version,
            endianness,
            sensor_width,
            sensor_height,
            region_descriptor: self
                .region_descriptor
                .ok_or(missing(ReportId::SensorRegionDescriptor))?,
            region_param: self
                .region_param
                .ok_or(missing(ReportId::SensorRegionParam))?,
        })
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Family ID                : {:#x}", self.family_id)?;
        writeln!(f, "Sensor rows              : {:#x}", self.sensor_rows)?;
        writeln!(f, "Sensor columns           : {:#x}", self.sensor_columns)?;
        writeln!(f, "Sensor width             : {:#x}", self.sensor_width)?;
        writeln!(f, "Sensor height            : {:#x}", self.sensor_height)?;
        writeln!(f, "BCD Version              : {:#x}", self.bcd_version)?;
        writeln!(f, "Endianness               : {:#x}", self.endianness)?;
        writeln!(f, "Sensor region descriptor : {}", hex(&self.region_descriptor))?;
        write!(f, "Sensor region param      : {}", hex(&self.region_param))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_builder(geometry: ByteOrder, dims: [u8; 8]) -> ProfileBuilder {
        let mut builder = ProfileBuilder::new();
        builder.accept(ReportId::FamilyId, &[0x48], geometry).unwrap();
        builder
            .accept(ReportId::SensorInfo, &[0x01, 0x0F, 0x0A, 0x02, 0x15], geometry)
            .unwrap();
        builder
            .accept(ReportId::SensorRegionDescriptor, &[0x10, 0x20], geometry)
            .unwrap();
        builder
            .accept(ReportId::SensorRegionParam, &[0x30], geometry)
            .unwrap();
        builder
            .accept(ReportId::SensorDimensions, &dims, geometry)
            .unwrap();
        builder
    }

    #[test]
    fn test_geometry_formulas() {
        assert_eq!(sensor_width(0), Some(9000 * 84 / 73));
        assert_eq!(sensor_width(1700), Some(8400));
        assert_eq!(sensor_height(5090), Some(10080));
        assert_eq!(sensor_width(u32::MAX), None);
        assert_eq!(sensor_height(u32::MAX), None);
    }

    #[test]
    fn test_out_of_range_dimension_rejected() {
        let mut builder = ProfileBuilder::new();
        let dims = [0xFF, 0xFF, 0xFF, 0xFF, 0xE2, 0x13, 0x00, 0x00];
        let err = builder
            .accept(ReportId::SensorDimensions, &dims, ByteOrder::Little)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { raw: u32::MAX }));
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_profile_from_reports() {
        // 1700 = 0x6A4, 5090 = 0x13E2
        let dims = [0xA4, 0x06, 0x00, 0x00, 0xE2, 0x13, 0x00, 0x00];
        let profile = full_builder(ByteOrder::Little, dims).build().unwrap();

        assert_eq!(profile.family_id, 0x48);
        assert_eq!(profile.endianness, 0x01);
        assert_eq!(profile.sensor_rows, 0x0F);
        assert_eq!(profile.sensor_columns, 0x0A);
        assert_eq!(profile.bcd_version, 0x0215);
        assert_eq!(profile.sensor_width, 8400);
        assert_eq!(profile.sensor_height, 10080);
        assert_eq!(profile.region_descriptor, vec![0x10, 0x20]);
        assert_eq!(profile.region_param, vec![0x30]);
    }

    #[test]
    fn test_geometry_byte_order_is_explicit() {
        let dims = [0x00, 0x00, 0x06, 0xA4, 0x00, 0x00, 0x13, 0xE2];
        let profile = full_builder(ByteOrder::Big, dims).build().unwrap();
        assert_eq!(profile.sensor_width, 8400);
        assert_eq!(profile.sensor_height, 10080);
    }

    #[test]
    fn test_short_report_rejected() {
        let mut builder = ProfileBuilder::new();
        let err = builder
            .accept(ReportId::SensorInfo, &[1, 2, 3], ByteOrder::Little)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ShortReport {
                id: 0xD3,
                len: 3,
                need: 5
            }
        ));
    }

    #[test]
    fn test_incomplete_builder() {
        let mut builder = ProfileBuilder::new();
        builder
            .accept(ReportId::FamilyId, &[1], ByteOrder::Little)
            .unwrap();
        assert!(matches!(
            builder.build(),
            Err(Error::MissingReport { id: 0xD3 })
        ));
    }

    #[test]
    fn test_empty_region_reports_allowed() {
        let mut builder = ProfileBuilder::new();
        assert!(
            builder
                .accept(ReportId::SensorRegionParam, &[], ByteOrder::Little)
                .is_ok()
        );
    }

    #[test]
    fn test_display_dumps_regions() {
        let dims = [0; 8];
        let profile = full_builder(ByteOrder::Little, dims).build().unwrap();
        let text = profile.to_string();
        assert!(text.contains("Sensor region descriptor : 10 20"));
        assert!(text.contains("Family ID                : 0x48"));
    }
}
