//! Safety-gated mutation engine for MIB2 head unit adapters.
//!
//! Making an ASIX USB-Ethernet adapter present itself as a D-Link DUB-E100,
//! or patching a binary on the head unit, can brick the hardware when done
//! carelessly. This crate provides the primitives that make both operations
//! recoverable: every destructive step is preceded by a complete, verifiable
//! backup and followed by a read-back check.
//!
//! # Quick Start
//!
//! ```no_run
//! use asix_eeprom::{EepromEngine, SpoofRequest, UsbTransport};
//! use asix_eeprom::constants::{pid, ASIX_VID};
//!
//! let usb = UsbTransport::open(ASIX_VID, pid::AX88772B)?;
//! let chipset = usb.chipset();
//! let engine = EepromEngine::open(usb, chipset);
//!
//! let result = engine.spoof(&SpoofRequest::default())?;
//! println!("{} -> {:?} verified={}", result.old, result.new, result.verified);
//! # Ok::<(), asix_eeprom::Error>(())
//! ```
//!
//! # Features
//!
//! - **Compatibility gate**: [`compat::classify`] and [`compat::can_mutate`]
//!   decide whether a chipset may be touched at all.
//! - **EEPROM**: Dump, write, spoof, and restore with backup-first
//!   discipline ([`EepromEngine`]).
//! - **File backups**: Checksum-verified snapshot and restore of remote
//!   files through any command channel ([`FileBackupManager`]).
//! - **Lifecycle**: The shared backup/mutate/verify state machine
//!   ([`lifecycle`]).
//! - **USB**: A `nusb` transport for real adapters (feature `usb`).

pub mod backup;
pub mod compat;
pub mod constants;
pub mod eeprom;
pub mod error;
pub mod lifecycle;
pub mod types;

// ---- Convenience re-exports ----

pub use backup::{BackupConfig, BackupRecord, CommandExecutor, CommandOutput, FileBackupManager};
pub use compat::{can_mutate, classify, CompatibilityTier, MessageKey};
pub use constants::WRITE_AUTHORIZATION;
pub use eeprom::{EepromEngine, EepromImage, EepromTransport, WriteAck};
#[cfg(feature = "usb")]
pub use eeprom::UsbTransport;
pub use error::{Error, ErrorKind, Result, TransportFault};
pub use lifecycle::MutationState;
pub use types::*;
