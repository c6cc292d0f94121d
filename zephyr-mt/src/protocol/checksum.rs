//! Rolling-sum checksums.
//!
//! Every checksum on this link is a plain byte sum truncated to 16 bits and
//! carried big-endian in a two-byte trailer.

/// Sum of `data` truncated to 16 bits.
pub fn sum16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Sum of `data` in 32 bits, for whole-image checksums truncated at comparison time.
pub fn sum32(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

/// Low 16 bits of a 32-bit sum, the width compared on the wire.
pub fn low16(sum: u32) -> u16 {
    let [_, _, hi, lo] = sum.to_be_bytes();
    u16::from_be_bytes([hi, lo])
}

/// Value of a big-endian trailer.
pub fn read_trailer(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Compare a computed checksum against a big-endian trailer.
///
/// Only the first two bytes of `trailer` are read. Fewer than two is a
/// [`crate::Error::ShortFrame`].
pub fn verify(expected: u16, trailer: &[u8]) -> crate::Result<()> {
    let Some(&bytes) = trailer.first_chunk::<2>() else {
        return Err(crate::Error::ShortFrame { len: trailer.len() });
    };
    let actual = read_trailer(bytes);
    if expected == actual {
        Ok(())
    } else {
        Err(crate::Error::ChecksumMismatch { expected, actual })
    }
}

/// Incremental 16-bit rolling sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum16(u16);

impl Checksum16 {
    /// Start from a seed value (report checksums are seeded with the report id).
    pub fn seeded(seed: u16) -> Self {
        Self(seed)
    }

    /// Add bytes to the sum.
    #[must_use]
    pub fn update(self, data: &[u8]) -> Self {
        Self(self.0.wrapping_add(sum16(data)))
    }

    /// Current value.
    pub fn value(self) -> u16 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum16_truncates() {
        assert_eq!(sum16(&[]), 0);
        assert_eq!(sum16(&[0x01, 0x02]), 3);
        // 0x101 * 0xFF = 0xFFFF, one more byte wraps
        let data = vec![0xFF; 0x101];
        assert_eq!(sum16(&data), 0xFFFF);
        let data = vec![0xFF; 0x102];
        assert_eq!(sum16(&data), 0x00FE);
    }

    #[test]
    fn test_sum16_matches_truncated_sum32() {
        let data: Vec<u8> = (0..5000u32)
            .map(|i| u8::try_from(i * 37 % 251).unwrap())
            .collect();
        assert_eq!(sum16(&data), low16(sum32(&data)));
        assert_eq!(u32::from(sum16(&data)), sum32(&data) & 0xFFFF);
    }

    #[test]
    fn test_low16_keeps_low_half() {
        assert_eq!(low16(0x0001_2345), 0x2345);
        assert_eq!(low16(0xFFFF), 0xFFFF);
        assert_eq!(low16(0x1_0000), 0);
    }

    #[test]
    fn test_sum16_is_order_independent() {
        let a = [9u8, 200, 17, 3, 255];
        let mut b = a;
        b.reverse();
        assert_eq!(sum16(&a), sum16(&b));
    }

    #[test]
    fn test_verify_against_trailer() {
        let data = [0x10u8, 0x20, 0x30];
        let trailer = sum16(&data).to_be_bytes();
        assert!(verify(sum16(&data), &trailer).is_ok());

        let err = verify(sum16(&data), &[0x00, 0x61]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ChecksumMismatch {
                expected: 0x60,
                actual: 0x61
            }
        ));
    }

    #[test]
    fn test_verify_short_trailer_is_an_error() {
        assert!(matches!(
            verify(0, &[0x01]),
            Err(crate::Error::ShortFrame { len: 1 })
        ));
        assert!(matches!(
            verify(0, &[]),
            Err(crate::Error::ShortFrame { len: 0 })
        ));
    }

    #[test]
    fn test_seeded_checksum() {
        let sum = Checksum16::seeded(0xD1).update(&[0x01, 0x02]);
        assert_eq!(sum.value(), 0xD4);
    }
}
