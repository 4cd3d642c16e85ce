//! EEPROM read/write/spoof over an [`EepromTransport`].

use parking_lot::RwLock;

use super::codec::{decode_identity, encode_identity};
use super::image::EepromImage;
use super::transport::{EepromTransport, WriteAck};
use crate::compat::{can_mutate, classify, CompatibilityTier};
use crate::constants::{EEPROM_SIZE, IDENTITY_LEN, VID_OFFSET};
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, MutationState};
use crate::types::{Identity, SpoofRequest, SpoofResult};

/// What a single [`EepromEngine::write`] did.
#[derive(Debug, Clone)]
pub struct WriteReceipt {
    /// Full image captured immediately before the write.
    pub backup: EepromImage,
    /// The transport's acknowledgement.
    pub ack: WriteAck,
}

/// An open handle to one device's EEPROM.
///
/// The handle is owned by the caller for the lifetime of the connection and
/// passed wherever EEPROM access is needed; [`close`](Self::close) hands the
/// transport back.
///
/// Diagnostic reads share a read lock. Every mutating operation holds the
/// write lock from its backup until its verification, so a read never
/// interleaves with an in-flight write on the same device.
///
/// ```no_run
/// # fn demo<T: asix_eeprom::EepromTransport>(transport: T) -> asix_eeprom::Result<()> {
/// use asix_eeprom::{EepromEngine, SpoofRequest};
///
/// let engine = EepromEngine::open(transport, "ASIX AX88772B");
/// let result = engine.spoof(&SpoofRequest::default())?;
/// if !result.success {
///     // result.backup holds the untouched pre-image
/// }
/// # Ok(())
/// # }
/// ```
pub struct EepromEngine<T> {
    transport: T,
    chipset: String,
    lock: RwLock<()>,
}

impl<T> std::fmt::Debug for EepromEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EepromEngine")
            .field("chipset", &self.chipset)
            .finish_non_exhaustive()
    }
}

// ---- Open / close ----

impl<T: EepromTransport> EepromEngine<T> {
    /// Open a handle over `transport` for a device reporting `chipset`.
    pub fn open(transport: T, chipset: impl Into<String>) -> Self {
        let chipset = chipset.into();
        log::info!(
            "opened EEPROM handle for {chipset:?} (tier {:?})",
            classify(&chipset)
        );
        Self {
            transport,
            chipset,
            lock: RwLock::new(()),
        }
    }

    /// Close the handle and return the transport.
    pub fn close(self) -> T {
        log::info!("closed EEPROM handle for {:?}", self.chipset);
        self.transport
    }

    /// The chipset identifier this handle was opened with.
    pub fn chipset(&self) -> &str {
        &self.chipset
    }

    /// Compatibility tier of the chipset.
    pub fn tier(&self) -> CompatibilityTier {
        classify(&self.chipset)
    }
}

// ---- Diagnostic reads ----

impl<T: EepromTransport> EepromEngine<T> {
    /// Read `length` bytes at `offset`.
    pub fn read(&self, offset: u16, length: u16) -> Result<Vec<u8>> {
        check_range(offset, length)?;
        let _guard = self.lock.read();
        self.read_unlocked(offset, length)
    }

    /// Read the whole image in one pass.
    ///
    /// This is the only way the engine produces a snapshot; partial backups
    /// are never taken.
    pub fn dump(&self) -> Result<EepromImage> {
        let _guard = self.lock.read();
        self.dump_unlocked()
    }

    /// Read the identity currently stored on the device.
    pub fn current_identity(&self) -> Result<Identity> {
        let _guard = self.lock.read();
        self.read_identity_unlocked()
    }
}

// ---- Mutations ----

impl<T: EepromTransport> EepromEngine<T> {
    /// Write `bytes` at `offset`.
    ///
    /// A full backup is dumped first under the same lock and returned in the
    /// receipt. The write is only reported as successful if the transport
    /// acknowledges every byte.
    pub fn write(&self, offset: u16, bytes: &[u8], authorization: u32) -> Result<WriteReceipt> {
        let length = u16::try_from(bytes.len())
            .map_err(|_| Error::Validation(format!("write of {} bytes", bytes.len())))?;
        check_range(offset, length)?;
        self.check_gate()?;

        let _guard = self.lock.write();
        let backup = self.dump_unlocked()?;
        let ack = self.write_unlocked(offset, bytes, authorization)?;
        Ok(WriteReceipt { backup, ack })
    }

    /// Rewrite the VID/PID to `request.target`.
    ///
    /// Returns `Err` only when nothing was written: the compatibility gate
    /// refused, or the backup dump failed. Once the backup exists every
    /// outcome is an `Ok(SpoofResult)` carrying that backup; failed steps are
    /// reported in `error` and `state`. Nothing is restored automatically.
    pub fn spoof(&self, request: &SpoofRequest) -> Result<SpoofResult> {
        self.check_gate()?;

        let _guard = self.lock.write();
        let mut lifecycle = Lifecycle::new(self.chipset.as_str());
        lifecycle.advance(MutationState::BackingUp)?;

        let backup = match self.dump_unlocked() {
            Ok(image) => image,
            Err(e) => {
                lifecycle.fail();
                log::warn!("spoof aborted, backup failed: {e}");
                return Err(e);
            }
        };
        lifecycle.advance(MutationState::BackedUp)?;

        let old = backup.identity();
        let requested = request.target;
        log::info!("spoofing {old} -> {requested} (backup {})", backup.digest());

        let mut result = SpoofResult {
            success: false,
            backup,
            old,
            requested,
            new: None,
            verified: false,
            error: None,
            state: lifecycle.state(),
        };

        lifecycle.advance(MutationState::Mutating)?;
        let payload = encode_identity(requested);
        if let Err(e) = self.write_unlocked(VID_OFFSET, &payload, request.authorization) {
            log::warn!("spoof write failed: {e}");
            lifecycle.fail();
            result.error = Some(e);
            result.state = lifecycle.state();
            return Ok(result);
        }
        lifecycle.advance(MutationState::Verifying)?;

        match self.read_identity_unlocked() {
            Ok(readback) => {
                result.new = Some(readback);
                result.verified = readback == requested;
                if result.verified {
                    lifecycle.advance(MutationState::Committed)?;
                    result.success = true;
                    log::info!("spoof verified: device now reports {readback}");
                } else {
                    lifecycle.advance(MutationState::RolledBack)?;
                    log::warn!("spoof read-back {readback} does not match {requested}");
                    result.error = Some(Error::VerificationMismatch(format!(
                        "wrote {requested}, read back {readback}"
                    )));
                }
            }
            Err(e) => {
                log::warn!("spoof read-back failed: {e}");
                lifecycle.fail();
                result.error = Some(e);
            }
        }

        result.state = lifecycle.state();
        Ok(result)
    }

    /// Write a complete image back to the device and verify it.
    ///
    /// Used by the caller to roll back after a failed spoof. The image being
    /// replaced is dumped first and returned.
    pub fn restore_image(&self, image: &EepromImage, authorization: u32) -> Result<EepromImage> {
        self.check_gate()?;

        let _guard = self.lock.write();
        let replaced = self.dump_unlocked()?;
        log::info!(
            "restoring image {} over {}",
            image.digest(),
            replaced.digest()
        );

        self.write_unlocked(0, image.as_bytes(), authorization)?;

        let readback = self.dump_unlocked()?;
        let diff = image.diff(&readback);
        if !diff.is_empty() {
            return Err(Error::VerificationMismatch(format!(
                "{} byte(s) differ after restore, first at 0x{:02X}",
                diff.len(),
                diff[0]
            )));
        }
        Ok(replaced)
    }
}

// ---- Internal helpers (caller holds the lock) ----

impl<T: EepromTransport> EepromEngine<T> {
    fn check_gate(&self) -> Result<()> {
        let tier = classify(&self.chipset);
        if can_mutate(tier) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "mutation not permitted on {:?} (tier {tier:?})",
                self.chipset
            )))
        }
    }

    fn read_unlocked(&self, offset: u16, length: u16) -> Result<Vec<u8>> {
        let data = self.transport.read(offset, length)?;
        if data.len() != length as usize {
            return Err(Error::Unknown(format!(
                "short EEPROM read at 0x{offset:02X}: wanted {length}, got {}",
                data.len()
            )));
        }
        Ok(data)
    }

    fn dump_unlocked(&self) -> Result<EepromImage> {
        let data = self.read_unlocked(0, EEPROM_SIZE as u16)?;
        EepromImage::from_bytes(&data)
    }

    fn read_identity_unlocked(&self) -> Result<Identity> {
        let data = self.read_unlocked(VID_OFFSET, IDENTITY_LEN)?;
        Ok(decode_identity([data[0], data[1], data[2], data[3]]))
    }

    fn write_unlocked(&self, offset: u16, bytes: &[u8], authorization: u32) -> Result<WriteAck> {
        let ack = self.transport.write(offset, bytes, authorization)?;
        if ack.bytes_written != bytes.len() {
            return Err(Error::Unknown(format!(
                "partial EEPROM write at 0x{offset:02X}: {} of {} bytes acknowledged",
                ack.bytes_written,
                bytes.len()
            )));
        }
        log::debug!("wrote {} byte(s) at 0x{offset:02X}", bytes.len());
        Ok(ack)
    }
}

fn check_range(offset: u16, length: u16) -> Result<()> {
    if length == 0 || offset as usize + length as usize > EEPROM_SIZE {
        return Err(Error::Validation(format!(
            "range 0x{offset:02X}+{length} outside the {EEPROM_SIZE}-byte EEPROM"
        )));
    }
    Ok(())
}
