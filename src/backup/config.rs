//! Backup manager configuration.

use crate::constants::DEFAULT_BACKUP_DIR;

/// Remote program used to checksum files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumTool {
    /// `md5sum`, available on the head unit's busybox.
    #[default]
    Md5,
    /// `sha256sum`.
    Sha256,
}

impl ChecksumTool {
    /// Name of the remote program.
    pub fn program(self) -> &'static str {
        match self {
            Self::Md5 => "md5sum",
            Self::Sha256 => "sha256sum",
        }
    }

    /// Length of the hex digest the program prints.
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }
}

/// Configuration for a [`FileBackupManager`](super::FileBackupManager).
///
/// Deserializable so callers can load it from their own config file; any
/// missing field takes its default.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Remote directory holding backup copies and their sidecars.
    pub backup_dir: String,
    /// Checksum program run on the remote host.
    pub checksum_tool: ChecksumTool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: DEFAULT_BACKUP_DIR.to_string(),
            checksum_tool: ChecksumTool::default(),
        }
    }
}

impl BackupConfig {
    /// Default configuration for the head unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different backup directory.
    pub fn backup_dir(mut self, dir: impl Into<String>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    /// Use a different checksum program.
    pub fn checksum_tool(mut self, tool: ChecksumTool) -> Self {
        self.checksum_tool = tool;
        self
    }
}
