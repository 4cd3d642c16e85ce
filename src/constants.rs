//! Protocol constants for ASIX EEPROM access and head unit file layout.
//!
//! These define the EEPROM geometry, the USB vendor request codes, the
//! well-known USB identities, and the remote paths used by the backup
//! manager. Most users only need [`WRITE_AUTHORIZATION`] and the
//! default target identity.

// ---- EEPROM geometry ----

/// Size of the EEPROM image in bytes.
pub const EEPROM_SIZE: usize = 256;

/// Offset of the VID low byte (high byte follows at 0x89).
pub const VID_OFFSET: u16 = 0x88;

/// Offset of the PID low byte (high byte follows at 0x8B).
pub const PID_OFFSET: u16 = 0x8A;

/// Number of bytes covered by the VID and PID fields together.
pub const IDENTITY_LEN: u16 = 4;

/// Authorization value the ASIX write path requires on every EEPROM write.
///
/// A documented protocol constant of the chipset family, not a secret.
pub const WRITE_AUTHORIZATION: u32 = 0xDEAD_BEEF;

// ---- USB vendor IDs and known product IDs ----

/// ASIX Electronics vendor ID.
pub const ASIX_VID: u16 = 0x0B95;

/// Realtek vendor ID.
pub const REALTEK_VID: u16 = 0x0BDA;

/// D-Link vendor ID.
pub const DLINK_VID: u16 = 0x2001;

/// Sitecom vendor ID.
pub const SITECOM_VID: u16 = 0x0DF6;

/// Known product IDs.
pub mod pid {
    /// ASIX AX88178.
    pub const AX88178: u16 = 0x1780;
    /// ASIX AX88179.
    pub const AX88179: u16 = 0x178A;
    /// ASIX AX88772.
    pub const AX88772: u16 = 0x7720;
    /// ASIX AX88772A.
    pub const AX88772A: u16 = 0x772A;
    /// ASIX AX88772B.
    pub const AX88772B: u16 = 0x772B;
    /// D-Link DUB-E100 rev C1, the identity the head unit accepts.
    pub const DUB_E100: u16 = 0x3C05;
}

// ---- ASIX vendor request codes ----

/// Read one EEPROM location (value = offset).
pub(crate) const ASIX_CMD_READ_EEPROM: u8 = 0x04;
/// Write one EEPROM location (value = offset, index = byte).
pub(crate) const ASIX_CMD_WRITE_EEPROM: u8 = 0x05;

// ---- Head unit filesystem ----

/// Persistent directory on the head unit where file backups are kept.
pub const DEFAULT_BACKUP_DIR: &str = "/net/rcc/mnt/efs-persist/backups";

/// The system binary patched to unlock the head unit.
pub const CRITICAL_BINARY_PATH: &str = "/net/rcc/dev/sbin/tsd.mibstd2.system.swap";

/// Suffix of backup copies.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Suffix appended to a backup path for its metadata sidecar.
pub const META_SUFFIX: &str = ".meta";

// ---- Output sentinels ----

pub(crate) const SENTINEL_NOT_FOUND: &str = "NOT_FOUND";
pub(crate) const SENTINEL_NO_CHECKSUM: &str = "NO_CHECKSUM";
pub(crate) const SENTINEL_NO_BACKUPS: &str = "NO_BACKUPS";
pub(crate) const SENTINEL_NO_META: &str = "NO_META";
pub(crate) const SENTINEL_COPY_OK: &str = "COPY_OK";
pub(crate) const SENTINEL_META_OK: &str = "META_OK";
