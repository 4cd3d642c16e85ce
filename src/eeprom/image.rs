//! The fixed-size EEPROM image.

use std::fmt;

use sha2::{Digest, Sha256};

use super::codec::{decode_identity, encode_identity};
use crate::constants::{EEPROM_SIZE, VID_OFFSET};
use crate::error::{Error, Result};
use crate::types::Identity;

/// A complete 256-byte EEPROM image.
///
/// Produced by [`EepromEngine::dump`](crate::EepromEngine::dump). Serializes
/// as `{"data": <hex>, "sha256": <digest>}`; deserializing fails with
/// [`Error::IntegrityMismatch`] when the two disagree, so a stored pre-image
/// that was altered can never be handed to a restore.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "StoredImage", into = "StoredImage")]
pub struct EepromImage {
    buf: [u8; EEPROM_SIZE],
}

impl EepromImage {
    /// Build an image from exactly [`EEPROM_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let buf: [u8; EEPROM_SIZE] = bytes.try_into().map_err(|_| {
            Error::Validation(format!(
                "EEPROM image must be {EEPROM_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { buf })
    }

    /// Parse an image from its hex form.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| Error::Validation(format!("invalid EEPROM hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Parse an image from its hex form and check it against a digest
    /// previously taken with [`digest`](Self::digest).
    pub fn from_hex_checked(s: &str, expected_digest: &str) -> Result<Self> {
        let image = Self::from_hex(s)?;
        let actual = image.digest();
        if !actual.eq_ignore_ascii_case(expected_digest.trim()) {
            return Err(Error::IntegrityMismatch {
                expected: expected_digest.trim().to_string(),
                actual,
            });
        }
        Ok(image)
    }

    /// Lowercase hex encoding of the whole image.
    pub fn to_hex(&self) -> String {
        hex::encode(self.buf)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; EEPROM_SIZE] {
        &self.buf
    }

    /// The VID/PID stored in this image.
    pub fn identity(&self) -> Identity {
        let at = VID_OFFSET as usize;
        decode_identity([self.buf[at], self.buf[at + 1], self.buf[at + 2], self.buf[at + 3]])
    }

    /// Stored vendor ID.
    pub fn vid(&self) -> u16 {
        self.identity().vid
    }

    /// Stored product ID.
    pub fn pid(&self) -> u16 {
        self.identity().pid
    }

    /// A copy of this image with the identity fields replaced.
    pub fn with_identity(&self, identity: Identity) -> Self {
        let mut buf = self.buf;
        let at = VID_OFFSET as usize;
        buf[at..at + 4].copy_from_slice(&encode_identity(identity));
        Self { buf }
    }

    /// Offsets at which `self` and `other` differ.
    pub fn diff(&self, other: &EepromImage) -> Vec<usize> {
        self.buf
            .iter()
            .zip(other.buf.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect()
    }

    /// SHA-256 of the image, as lowercase hex.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.buf))
    }
}

impl fmt::Debug for EepromImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EepromImage")
            .field("identity", &self.identity().to_string())
            .field("digest", &self.digest())
            .finish()
    }
}

/// Serialized form of an [`EepromImage`].
#[derive(serde::Serialize, serde::Deserialize)]
struct StoredImage {
    data: String,
    sha256: String,
}

impl TryFrom<StoredImage> for EepromImage {
    type Error = Error;

    fn try_from(stored: StoredImage) -> Result<Self> {
        Self::from_hex_checked(&stored.data, &stored.sha256)
    }
}

impl From<EepromImage> for StoredImage {
    fn from(image: EepromImage) -> Self {
        Self {
            sha256: image.digest(),
            data: image.to_hex(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EepromImage {
        let mut bytes = [0u8; EEPROM_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        bytes[0x88..0x8C].copy_from_slice(&[0x95, 0x0B, 0x2A, 0x77]);
        EepromImage::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn reads_identity_at_fixed_offsets() {
        let img = sample();
        assert_eq!(img.vid(), 0x0B95);
        assert_eq!(img.pid(), 0x772A);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = EepromImage::from_bytes(&[0u8; 128]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn with_identity_touches_only_four_bytes() {
        let img = sample();
        let spoofed = img.with_identity(Identity::DUB_E100);
        assert_eq!(spoofed.identity(), Identity::DUB_E100);
        assert_eq!(img.diff(&spoofed), vec![0x88, 0x89, 0x8A, 0x8B]);
    }

    #[test]
    fn hex_form_and_serde() {
        let img = sample();
        assert_eq!(EepromImage::from_hex(&img.to_hex()).unwrap(), img);
        let json = serde_json::to_string(&img).unwrap();
        let back: EepromImage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, img);
        assert!(EepromImage::from_hex("zz").is_err());
    }

    #[test]
    fn digest_changes_with_content() {
        let img = sample();
        assert_eq!(img.digest().len(), 64);
        assert_ne!(img.digest(), img.with_identity(Identity::DUB_E100).digest());
    }

    #[test]
    fn altered_pre_image_is_refused() {
        let img = sample();
        let mut hex = img.to_hex();
        hex.replace_range(0..2, "ff");

        let err = EepromImage::from_hex_checked(&hex, &img.digest()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::IntegrityMismatch);
        assert!(EepromImage::from_hex_checked(&img.to_hex(), &img.digest()).is_ok());

        let json = serde_json::to_string(&img).unwrap().replace(&img.to_hex(), &hex);
        assert!(serde_json::from_str::<EepromImage>(&json).is_err());
    }
}
