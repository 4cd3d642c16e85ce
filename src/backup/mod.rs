//! Checksum-verified backup and restore of files on the head unit.
//!
//! Binary patches on the head unit are only safe with a verified copy of the
//! original to fall back on. This module provides:
//!
//! - [`FileBackupManager`] - Backup, restore, list, verify, and delete.
//! - [`BackupRecord`] - One backup, with the original path kept verbatim.
//! - [`CommandExecutor`] - The remote shell contract.
//! - [`command`] - The only place command lines are built, and the pure
//!   interpreters for their output.

pub mod command;
mod config;
mod executor;
mod manager;
mod record;

pub use command::{classify_probe, copy_confirmed, meta_confirmed, ProbeOutcome, SafePath};
pub use config::{BackupConfig, ChecksumTool};
pub use executor::{CommandExecutor, CommandOutput};
pub use manager::{FileBackupManager, ProtectedOutcome};
pub use record::{backup_file_name, split_backup_name, BackupRecord};
