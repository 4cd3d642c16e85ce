//! Remote command construction and output interpretation.
//!
//! Every shell command the backup manager sends is built here from
//! [`SafePath`] values, which can only be created through validation. No
//! other code formats command strings, and nothing relies on the remote
//! shell for quoting.

use std::fmt;

use super::config::ChecksumTool;
use crate::constants::{
    SENTINEL_COPY_OK, SENTINEL_META_OK, SENTINEL_NOT_FOUND, SENTINEL_NO_BACKUPS,
    SENTINEL_NO_CHECKSUM, SENTINEL_NO_META,
};
use crate::error::{Error, Result};

/// Longest path accepted.
const MAX_PATH_LEN: usize = 1024;

/// Characters allowed in paths and sidecar values.
fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+')
}

/// An absolute remote path that is safe to splice into a command line.
///
/// Only ASCII letters, digits and `/ . _ - +` are accepted, so quotes,
/// whitespace, separators and every shell metacharacter are rejected
/// before a command string exists. `..` components are rejected too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(String);

impl SafePath {
    /// Validate `path`.
    pub fn new(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::Validation("empty path".into()));
        }
        if path.len() > MAX_PATH_LEN {
            return Err(Error::Validation(format!("path longer than {MAX_PATH_LEN} bytes")));
        }
        if !path.starts_with('/') {
            return Err(Error::Validation(format!("path {path:?} is not absolute")));
        }
        if let Some(bad) = path.chars().find(|&c| !is_safe_char(c)) {
            return Err(Error::Validation(format!(
                "path {path:?} contains forbidden character {bad:?}"
            )));
        }
        if path.split('/').any(|component| component == "..") {
            return Err(Error::Validation(format!("path {path:?} contains '..'")));
        }
        Ok(Self(path.to_string()))
    }

    /// The validated path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path component, or `unknown` for `/`.
    pub fn file_name(&self) -> &str {
        match self.0.trim_end_matches('/').rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ => "unknown",
        }
    }

    /// Append a single file name component.
    pub fn join(&self, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(Error::Validation(format!("bad file name {name:?}")));
        }
        Self::new(&format!("{}/{name}", self.0.trim_end_matches('/')))
    }

    /// Whether this path lies directly inside `dir`.
    pub fn is_child_of(&self, dir: &SafePath) -> bool {
        let prefix = format!("{}/", dir.0.trim_end_matches('/'));
        self.0
            .strip_prefix(&prefix)
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
    }

    /// This path with `suffix` appended to its last component.
    pub fn with_suffix(&self, suffix: &str) -> Result<Self> {
        Self::new(&format!("{}{suffix}", self.0))
    }
}

impl fmt::Display for SafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value written into a metadata sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaField {
    pub(crate) key: &'static str,
    pub(crate) value: String,
}

impl MetaField {
    /// Validate a `key=value` pair for the sidecar.
    pub fn new(key: &'static str, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() || !value.chars().all(is_safe_char) {
            return Err(Error::Validation(format!(
                "metadata value {value:?} for {key} contains forbidden characters"
            )));
        }
        Ok(Self { key, value })
    }
}

/// A command the backup manager can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Does the path exist?
    Probe(SafePath),
    /// File size in bytes.
    Size(SafePath),
    /// Create a directory and its parents.
    EnsureDir(SafePath),
    /// Copy preserving mode, ownership and timestamps.
    Copy { from: SafePath, to: SafePath },
    /// Content checksum.
    Checksum { tool: ChecksumTool, path: SafePath },
    /// Write a metadata sidecar.
    WriteMeta { path: SafePath, fields: Vec<MetaField> },
    /// One entry name per line.
    ListDir(SafePath),
    /// Concatenate every metadata sidecar in a directory.
    ReadAllMeta(SafePath),
    /// Remove files.
    Remove(Vec<SafePath>),
}

impl RemoteCommand {
    /// Render the command line.
    pub fn render(&self) -> String {
        match self {
            Self::Probe(p) => format!("ls -la {p} 2>/dev/null || echo {SENTINEL_NOT_FOUND}"),
            Self::Size(p) => format!("stat -c %s {p} 2>/dev/null || echo 0"),
            Self::EnsureDir(p) => format!("mkdir -p {p} 2>&1"),
            Self::Copy { from, to } => {
                format!("cp -p {from} {to} 2>&1 && echo {SENTINEL_COPY_OK}")
            }
            Self::Checksum { tool, path } => format!(
                "{} {path} 2>/dev/null | awk '{{print $1}}' || echo {SENTINEL_NO_CHECKSUM}",
                tool.program()
            ),
            Self::WriteMeta { path, fields } => {
                let args: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}={}", f.key, f.value))
                    .collect();
                format!(
                    "printf '%s\\n' {} > {path} && echo {SENTINEL_META_OK}",
                    args.join(" ")
                )
            }
            Self::ListDir(p) => format!("ls -1 {p} 2>/dev/null || echo {SENTINEL_NO_BACKUPS}"),
            Self::ReadAllMeta(p) => format!(
                "cat {}/*{}{} 2>/dev/null || echo {SENTINEL_NO_META}",
                p.as_str().trim_end_matches('/'),
                crate::constants::BACKUP_SUFFIX,
                crate::constants::META_SUFFIX
            ),
            Self::Remove(paths) => {
                let args: Vec<&str> = paths.iter().map(SafePath::as_str).collect();
                format!("rm -f {} 2>&1", args.join(" "))
            }
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// What an existence probe established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The path exists.
    Found,
    /// The command ran and printed the not-found sentinel.
    NotFound,
    /// The channel failed or the output says nothing useful.
    AmbiguousError,
}

/// Interpret the result of a [`RemoteCommand::Probe`].
///
/// `channel_success` only says the command ran; the sentinel in the output
/// decides whether the path is there.
pub fn classify_probe(channel_success: bool, output: &str) -> ProbeOutcome {
    if !channel_success {
        return ProbeOutcome::AmbiguousError;
    }
    if output.lines().any(|l| l.trim() == SENTINEL_NOT_FOUND) {
        return ProbeOutcome::NotFound;
    }
    if output.trim().is_empty() {
        return ProbeOutcome::AmbiguousError;
    }
    ProbeOutcome::Found
}

/// Whether a [`RemoteCommand::Copy`] reported completion.
///
/// `cp` prints its errors on a channel that still counts as success, so
/// only the sentinel confirms the copy.
pub fn copy_confirmed(channel_success: bool, output: &str) -> bool {
    channel_success && has_sentinel(output, SENTINEL_COPY_OK)
}

/// Whether a [`RemoteCommand::WriteMeta`] reported completion.
pub fn meta_confirmed(channel_success: bool, output: &str) -> bool {
    channel_success && has_sentinel(output, SENTINEL_META_OK)
}

fn has_sentinel(output: &str, sentinel: &str) -> bool {
    output.lines().any(|l| l.trim() == sentinel)
}

/// Parse [`RemoteCommand::Size`] output; 0 when unusable.
pub fn parse_size(output: &str) -> u64 {
    output
        .lines()
        .find_map(|l| l.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Parse [`RemoteCommand::Checksum`] output into a lowercase hex digest.
///
/// Returns `None` for the sentinel, empty output, or anything that is not a
/// digest of the tool's length.
pub fn parse_checksum(tool: ChecksumTool, output: &str) -> Option<String> {
    let candidate = output.lines().next()?.trim();
    if candidate.len() == tool.hex_len() && candidate.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(candidate.to_ascii_lowercase())
    } else {
        None
    }
}
