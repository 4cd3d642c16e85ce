//! Backup records, file naming, and the metadata sidecar format.
//!
//! A backup of `/dir/name` taken at 2026-10-19 07:12:03.456 UTC is stored as
//! `<backup_dir>/name.2026-10-19T07-12-03-456Z.bak`, next to a sidecar
//! `...bak.meta` of `key=value` lines:
//!
//! ```text
//! backup=/net/rcc/mnt/efs-persist/backups/name.2026-10-19T07-12-03-456Z.bak
//! original=/dir/name
//! filename=name
//! timestamp=1792393923456
//! size=1024
//! checksum=0123456789abcdef0123456789abcdef
//! ```
//!
//! The sidecar keeps the original path verbatim; it is never inferred from
//! the file name.

use chrono::{DateTime, TimeZone, Utc};

use super::command::MetaField;
use crate::constants::BACKUP_SUFFIX;
use crate::error::{Error, Result};

/// Timestamp layout embedded in backup file names.
const STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

/// Length of a formatted stamp.
const STAMP_LEN: usize = 24;

/// One backup copy of a remote file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BackupRecord {
    /// Path of the file that was backed up, exactly as given.
    pub original_path: String,
    /// Path of the backup copy.
    pub backup_path: String,
    /// Last component of `original_path`.
    pub filename: String,
    /// When the backup was taken.
    pub timestamp: DateTime<Utc>,
    /// Size of the original, 0 if it could not be determined.
    pub size_bytes: u64,
    /// Content checksum of the backup copy, if one could be computed.
    pub checksum: Option<String>,
}

impl BackupRecord {
    /// Sidecar fields for this record.
    pub(crate) fn meta_fields(&self) -> Result<Vec<MetaField>> {
        let mut fields = vec![
            MetaField::new("backup", self.backup_path.as_str())?,
            MetaField::new("original", self.original_path.as_str())?,
            MetaField::new("filename", self.filename.as_str())?,
            MetaField::new("timestamp", self.timestamp.timestamp_millis().to_string())?,
            MetaField::new("size", self.size_bytes.to_string())?,
        ];
        if let Some(sum) = &self.checksum {
            fields.push(MetaField::new("checksum", sum.as_str())?);
        }
        Ok(fields)
    }
}

/// Format the timestamp part of a backup name.
pub fn format_stamp(at: DateTime<Utc>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// Backup file name for `filename` taken at `at`.
pub fn backup_file_name(filename: &str, at: DateTime<Utc>) -> String {
    format!("{filename}.{}{BACKUP_SUFFIX}", format_stamp(at))
}

/// Split a backup file name into the original file name and its stamp.
///
/// Returns `None` for anything not following the naming convention.
pub fn split_backup_name(name: &str) -> Option<(&str, &str)> {
    let stem = name.strip_suffix(BACKUP_SUFFIX)?;
    let (filename, stamp) = stem.rsplit_once('.')?;
    if filename.is_empty() || !is_stamp(stamp) {
        return None;
    }
    Some((filename, stamp))
}

/// `YYYY-MM-DDTHH-MM-SS-mmmZ`
fn is_stamp(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == STAMP_LEN
        && b.iter().enumerate().all(|(i, &c)| match i {
            4 | 7 | 13 | 16 | 19 => c == b'-',
            10 => c == b'T',
            23 => c == b'Z',
            _ => c.is_ascii_digit(),
        })
}

/// Parse concatenated sidecars. Each record starts at a `backup=` line.
///
/// Incomplete records are dropped.
pub fn parse_meta(text: &str) -> Vec<BackupRecord> {
    let mut records = Vec::new();
    let mut current: Option<Partial> = None;

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        if key == "backup" {
            if let Some(done) = current.take().and_then(Partial::finish) {
                records.push(done);
            }
            current = Some(Partial {
                backup_path: value.to_string(),
                ..Partial::default()
            });
            continue;
        }
        let Some(rec) = current.as_mut() else {
            continue;
        };
        match key {
            "original" => rec.original_path = Some(value.to_string()),
            "filename" => rec.filename = Some(value.to_string()),
            "timestamp" => {
                rec.timestamp = value
                    .parse::<i64>()
                    .ok()
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            }
            "size" => rec.size_bytes = value.parse().ok(),
            "checksum" => rec.checksum = Some(value.to_string()),
            _ => {}
        }
    }
    if let Some(done) = current.and_then(Partial::finish) {
        records.push(done);
    }
    records
}

#[derive(Default)]
struct Partial {
    backup_path: String,
    original_path: Option<String>,
    filename: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    size_bytes: Option<u64>,
    checksum: Option<String>,
}

impl Partial {
    fn finish(self) -> Option<BackupRecord> {
        Some(BackupRecord {
            original_path: self.original_path?,
            filename: self.filename?,
            timestamp: self.timestamp?,
            size_bytes: self.size_bytes.unwrap_or(0),
            checksum: self.checksum,
            backup_path: self.backup_path,
        })
    }
}
