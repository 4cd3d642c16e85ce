//! Little-endian codec for the VID/PID fields.
//!
//! The same functions are used to encode what is written and to decode what
//! is read back, so a verification can never disagree with the write because
//! of byte order.

use crate::constants::IDENTITY_LEN;
use crate::types::Identity;

/// Encode a 16-bit value as `[low, high]`.
#[inline]
pub fn encode_u16_le(value: u16) -> [u8; 2] {
    [(value & 0xFF) as u8, (value >> 8) as u8]
}

/// Decode `[low, high]` into a 16-bit value.
#[inline]
pub fn decode_u16_le(bytes: [u8; 2]) -> u16 {
    (bytes[0] as u16) | ((bytes[1] as u16) << 8)
}

/// Encode an identity as the 4 bytes stored at the VID offset (VID then PID).
pub fn encode_identity(identity: Identity) -> [u8; IDENTITY_LEN as usize] {
    let [v0, v1] = encode_u16_le(identity.vid);
    let [p0, p1] = encode_u16_le(identity.pid);
    [v0, v1, p0, p1]
}

/// Decode the 4 bytes stored at the VID offset.
pub fn decode_identity(bytes: [u8; IDENTITY_LEN as usize]) -> Identity {
    Identity {
        vid: decode_u16_le([bytes[0], bytes[1]]),
        pid: decode_u16_le([bytes[2], bytes[3]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_byte_first() {
        assert_eq!(encode_u16_le(0x2001), [0x01, 0x20]);
        assert_eq!(decode_u16_le([0x05, 0x3C]), 0x3C05);
    }

    #[test]
    fn extremes() {
        for v in [0x0000u16, 0x00FF, 0xFF00, 0xFFFF] {
            assert_eq!(decode_u16_le(encode_u16_le(v)), v);
        }
    }

    #[test]
    fn identity_layout() {
        let bytes = encode_identity(Identity::new(0x0B95, 0x772A));
        assert_eq!(bytes, [0x95, 0x0B, 0x2A, 0x77]);
        assert_eq!(decode_identity(bytes), Identity::new(0x0B95, 0x772A));
    }
}
