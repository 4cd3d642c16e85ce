//! Request and result types for identity spoofing.

use std::fmt;

use crate::constants::{pid, DLINK_VID, WRITE_AUTHORIZATION};
use crate::eeprom::EepromImage;
use crate::error::Error;
use crate::lifecycle::MutationState;

/// A USB vendor/product identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Identity {
    /// USB vendor ID.
    pub vid: u16,
    /// USB product ID.
    pub pid: u16,
}

impl Identity {
    /// Create an identity from a VID/PID pair.
    pub const fn new(vid: u16, pid: u16) -> Self {
        Self { vid, pid }
    }

    /// D-Link DUB-E100 (rev C1), the identity the head unit recognises.
    pub const DUB_E100: Identity = Identity::new(DLINK_VID, pid::DUB_E100);
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vid, self.pid)
    }
}

/// Operator input for [`EepromEngine::spoof`](crate::EepromEngine::spoof).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpoofRequest {
    /// Identity to write.
    pub target: Identity,
    /// Authorization value sent with the write.
    pub authorization: u32,
}

impl SpoofRequest {
    /// Request a spoof to `target` with the protocol authorization value.
    pub fn new(target: Identity) -> Self {
        Self {
            target,
            authorization: WRITE_AUTHORIZATION,
        }
    }

    /// Override the authorization value.
    pub fn authorization(mut self, authorization: u32) -> Self {
        self.authorization = authorization;
        self
    }
}

impl Default for SpoofRequest {
    fn default() -> Self {
        Self::new(Identity::DUB_E100)
    }
}

/// Outcome of a spoof attempt that got as far as capturing a backup.
///
/// `backup` is always the complete pre-write image, so the caller can roll
/// back with [`EepromEngine::restore_image`](crate::EepromEngine::restore_image)
/// whatever happened afterwards.
#[derive(Debug, Clone)]
pub struct SpoofResult {
    /// Write acknowledged and read-back matched.
    pub success: bool,
    /// Full EEPROM image captured before any write.
    pub backup: EepromImage,
    /// Identity decoded from `backup`.
    pub old: Identity,
    /// Identity the caller asked for.
    pub requested: Identity,
    /// Identity read back after the write, if the read-back happened.
    pub new: Option<Identity>,
    /// Whether `new == requested`.
    pub verified: bool,
    /// The failure, if any step after the backup failed.
    pub error: Option<Error>,
    /// Terminal lifecycle state of the attempt.
    pub state: MutationState,
}
