//! Snapshot and restore of remote files.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use parking_lot::{Mutex, RawMutex};

use super::command::{
    classify_probe, copy_confirmed, meta_confirmed, parse_checksum, parse_size, ProbeOutcome,
    RemoteCommand, SafePath,
};
use super::config::BackupConfig;
use super::executor::{CommandExecutor, CommandOutput};
use super::record::{backup_file_name, parse_meta, split_backup_name, BackupRecord};
use crate::constants::{CRITICAL_BINARY_PATH, META_SUFFIX, SENTINEL_NO_BACKUPS};
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, MutationState};

type PathGuard = parking_lot::lock_api::ArcMutexGuard<RawMutex, ()>;

/// One exclusive lock per remote path.
#[derive(Debug, Default)]
struct PathLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PathLocks {
    fn acquire(&self, path: &SafePath) -> PathGuard {
        let lock = {
            let mut map = self.locks.lock();
            // Drop entries nobody holds.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(map.entry(path.as_str().to_string()).or_default())
        };
        lock.lock_arc()
    }

    /// Lock several paths in a fixed (sorted) order, once each.
    fn acquire_all(&self, paths: &[&SafePath]) -> Vec<PathGuard> {
        let mut sorted: Vec<&SafePath> = paths.to_vec();
        sorted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        sorted.dedup_by(|a, b| a.as_str() == b.as_str());
        sorted.into_iter().map(|p| self.acquire(p)).collect()
    }
}

/// Outcome of [`FileBackupManager::protect`].
#[derive(Debug, Clone)]
pub struct ProtectedOutcome {
    /// Terminal lifecycle state.
    pub state: MutationState,
    /// The backup taken before the mutation. Restore from it explicitly if
    /// `state` is not [`MutationState::Committed`].
    pub record: BackupRecord,
    /// Why the attempt did not commit.
    pub error: Option<Error>,
}

/// Backup, restore, and listing of files on a remote host.
///
/// All commands go through the configured [`CommandExecutor`]. Operations
/// on the same path are serialized; the manager keeps no records in memory
/// and [`list`](Self::list) reads them back from the remote sidecars.
pub struct FileBackupManager<E> {
    executor: E,
    config: BackupConfig,
    backup_dir: SafePath,
    locks: PathLocks,
}

impl<E> std::fmt::Debug for FileBackupManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackupManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: CommandExecutor> FileBackupManager<E> {
    /// Create a manager. Fails if the configured backup directory is unsafe.
    pub fn new(executor: E, config: BackupConfig) -> Result<Self> {
        let backup_dir = SafePath::new(&config.backup_dir)?;
        Ok(Self {
            executor,
            config,
            backup_dir,
            locks: PathLocks::default(),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Release the executor.
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Copy `path` into the backup directory.
    pub fn backup(&self, path: &str) -> Result<BackupRecord> {
        let path = SafePath::new(path)?;
        let _guard = self.locks.acquire(&path);
        self.backup_unlocked(&path)
    }

    /// Back up the head unit binary that unlock patches modify.
    pub fn backup_critical_binary(&self) -> Result<BackupRecord> {
        self.backup(CRITICAL_BINARY_PATH)
    }

    /// Copy a backup back over its original path.
    ///
    /// If the record carries a checksum, the backup is re-hashed first and
    /// the copy only happens on an exact match; afterwards the restored file
    /// must hash to the same value. Both the original and the backup stay
    /// locked throughout, so a concurrent [`delete`](Self::delete) waits.
    pub fn restore(&self, record: &BackupRecord) -> Result<BackupRecord> {
        let original = SafePath::new(&record.original_path)?;
        let backup = SafePath::new(&record.backup_path)?;
        let _guards = self.locks.acquire_all(&[&original, &backup]);

        match self.probe(&backup)? {
            ProbeOutcome::Found => {}
            _ => return Err(Error::NotFound(format!("backup {backup} is missing"))),
        }

        if let Some(expected) = &record.checksum {
            let actual = self.checksum(&backup)?;
            match actual {
                Some(actual) if actual.eq_ignore_ascii_case(expected) => {
                    log::debug!("checksum of {backup} verified");
                }
                other => {
                    log::warn!("refusing restore of {original}: checksum mismatch");
                    return Err(Error::IntegrityMismatch {
                        expected: expected.clone(),
                        actual: other.unwrap_or_else(|| "unavailable".into()),
                    });
                }
            }
        } else {
            log::warn!("restoring {original} from {backup} without checksum verification");
        }

        let out = self.run(&RemoteCommand::Copy {
            from: backup.clone(),
            to: original.clone(),
        })?;
        if !copy_confirmed(out.success, &out.output) {
            log::warn!("restore copy onto {original} failed: {}", out.output.trim());
            return Err(Error::Unknown(format!("restore copy failed: {}", out.output.trim())));
        }

        if let Some(expected) = &record.checksum {
            let actual = self.checksum(&original)?;
            if !actual.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(expected)) {
                return Err(Error::VerificationMismatch(format!(
                    "{original} hashes to {} after restore, expected {expected}",
                    actual.as_deref().unwrap_or("nothing")
                )));
            }
        } else if self.probe(&original)? != ProbeOutcome::Found {
            return Err(Error::VerificationMismatch(format!(
                "{original} not present after restore"
            )));
        }

        log::info!("restored {original} from {backup}");
        Ok(record.clone())
    }

    /// Backups in the backup directory, newest first.
    ///
    /// A missing or empty directory yields an empty list. Entries without a
    /// sidecar are skipped because their original path is unknown.
    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        let out = self.run(&RemoteCommand::ListDir(self.backup_dir.clone()))?;
        if !out.success {
            return Err(Error::Unknown(format!("listing failed: {}", out.output.trim())));
        }
        if out.output.lines().any(|l| l.trim() == SENTINEL_NO_BACKUPS) {
            return Ok(Vec::new());
        }

        let names: Vec<&str> = out
            .output
            .lines()
            .map(str::trim)
            .filter(|name| split_backup_name(name).is_some())
            .collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let meta = self.run(&RemoteCommand::ReadAllMeta(self.backup_dir.clone()))?;
        let known: HashMap<String, BackupRecord> = parse_meta(&meta.output)
            .into_iter()
            .map(|r| (r.backup_path.clone(), r))
            .collect();

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let path = self.backup_dir.join(name)?;
            match known.get(path.as_str()) {
                Some(record) => records.push(record.clone()),
                None => log::warn!("skipping {path}: no metadata sidecar"),
            }
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Whether `path` currently hashes to the checksum in `record`.
    ///
    /// `false` when the record has no checksum or `path` cannot be hashed.
    pub fn verify_integrity(&self, path: &str, record: &BackupRecord) -> Result<bool> {
        let path = SafePath::new(path)?;
        let backup = SafePath::new(&record.backup_path)?;
        let Some(expected) = &record.checksum else {
            return Ok(false);
        };
        let _guards = self.locks.acquire_all(&[&path, &backup]);
        Ok(self
            .checksum(&path)?
            .is_some_and(|actual| actual.eq_ignore_ascii_case(expected)))
    }

    /// Remove a backup copy and its sidecar.
    pub fn delete(&self, backup_path: &str) -> Result<()> {
        let path = SafePath::new(backup_path)?;
        if !path.is_child_of(&self.backup_dir) || split_backup_name(path.file_name()).is_none() {
            return Err(Error::Validation(format!(
                "{path} is not a backup in {}",
                self.backup_dir
            )));
        }
        let _guard = self.locks.acquire(&path);

        let meta = path.with_suffix(META_SUFFIX)?;
        let out = self.run(&RemoteCommand::Remove(vec![path.clone(), meta]))?;
        if !out.success {
            return Err(Error::Unknown(format!("delete failed: {}", out.output.trim())));
        }
        match self.probe(&path)? {
            ProbeOutcome::NotFound => {
                log::info!("deleted backup {path}");
                Ok(())
            }
            _ => Err(Error::Unknown(format!("{path} still present after delete"))),
        }
    }

    /// Run a file mutation under the backup lifecycle.
    ///
    /// Backs up `path`, calls `mutate`, then `verify`. The path stays locked
    /// throughout. `Err` is returned only if the backup itself failed, in
    /// which case `mutate` was never called. Nothing is restored
    /// automatically: on `RolledBack` or `Failed` the caller decides whether
    /// to [`restore`](Self::restore) from `record`.
    pub fn protect<M, V>(&self, path: &str, mutate: M, verify: V) -> Result<ProtectedOutcome>
    where
        M: FnOnce(&E, &BackupRecord) -> Result<()>,
        V: FnOnce(&E, &BackupRecord) -> Result<bool>,
    {
        let path = SafePath::new(path)?;
        let _guard = self.locks.acquire(&path);
        let mut lifecycle = Lifecycle::new(path.as_str());

        lifecycle.advance(MutationState::BackingUp)?;
        let record = match self.backup_unlocked(&path) {
            Ok(record) => record,
            Err(e) => {
                lifecycle.fail();
                return Err(e);
            }
        };
        lifecycle.advance(MutationState::BackedUp)?;

        lifecycle.advance(MutationState::Mutating)?;
        if let Err(e) = mutate(&self.executor, &record) {
            log::warn!("mutation of {path} failed: {e}");
            lifecycle.fail();
            return Ok(ProtectedOutcome {
                state: lifecycle.state(),
                record,
                error: Some(e),
            });
        }
        lifecycle.advance(MutationState::Verifying)?;

        let error = match verify(&self.executor, &record) {
            Ok(true) => {
                lifecycle.advance(MutationState::Committed)?;
                None
            }
            Ok(false) => {
                lifecycle.advance(MutationState::RolledBack)?;
                log::warn!("verification of {path} failed; restore from {}", record.backup_path);
                Some(Error::VerificationMismatch(format!(
                    "{path} did not verify after mutation"
                )))
            }
            Err(e) => {
                lifecycle.fail();
                Some(e)
            }
        };

        Ok(ProtectedOutcome {
            state: lifecycle.state(),
            record,
            error,
        })
    }
}

// ---- Internal helpers ----

impl<E: CommandExecutor> FileBackupManager<E> {
    fn backup_unlocked(&self, path: &SafePath) -> Result<BackupRecord> {
        if self.probe(path)? == ProbeOutcome::NotFound {
            return Err(Error::NotFound(format!("{path} does not exist")));
        }

        let size_bytes = match self.run(&RemoteCommand::Size(path.clone())) {
            Ok(out) => parse_size(&out.output),
            Err(e) => {
                log::debug!("size of {path} unavailable: {e}");
                0
            }
        };

        // Sidecars store milliseconds.
        let timestamp = Utc::now().trunc_subsecs(3);
        let filename = path.file_name().to_string();
        let backup = self
            .backup_dir
            .join(&backup_file_name(&filename, timestamp))?;

        let out = self.run(&RemoteCommand::EnsureDir(self.backup_dir.clone()))?;
        if !out.success {
            return Err(Error::Unknown(format!(
                "cannot create {}: {}",
                self.backup_dir,
                out.output.trim()
            )));
        }

        let out = self.run(&RemoteCommand::Copy {
            from: path.clone(),
            to: backup.clone(),
        })?;
        if !copy_confirmed(out.success, &out.output) {
            return Err(Error::Unknown(format!("backup copy failed: {}", out.output.trim())));
        }

        if self.probe(&backup)? != ProbeOutcome::Found {
            return Err(Error::VerificationMismatch(format!(
                "backup {backup} not present after copy"
            )));
        }

        let checksum = self.checksum(&backup).unwrap_or_else(|e| {
            log::debug!("checksum of {backup} unavailable: {e}");
            None
        });
        if checksum.is_none() {
            log::warn!("backup {backup} has no checksum; restores will be unverified");
        }

        let record = BackupRecord {
            original_path: path.as_str().to_string(),
            backup_path: backup.as_str().to_string(),
            filename,
            timestamp,
            size_bytes,
            checksum,
        };

        // list() only sees backups that have a sidecar.
        let meta = backup.with_suffix(META_SUFFIX)?;
        let sidecar = RemoteCommand::WriteMeta {
            path: meta.clone(),
            fields: record.meta_fields()?,
        };
        let out = self.run(&sidecar)?;
        if !meta_confirmed(out.success, &out.output) {
            log::warn!("sidecar for {backup} not written: {}", out.output.trim());
            if let Err(e) = self.run(&RemoteCommand::Remove(vec![backup.clone(), meta])) {
                log::warn!("orphaned backup {backup} left behind: {e}");
            }
            return Err(Error::Unknown(format!(
                "metadata for {backup} not written: {}",
                out.output.trim()
            )));
        }

        log::info!("backed up {path} to {backup} ({size_bytes} bytes)");
        Ok(record)
    }

    /// Existence probe. Ambiguous output is an error.
    fn probe(&self, path: &SafePath) -> Result<ProbeOutcome> {
        let out = self.run(&RemoteCommand::Probe(path.clone()))?;
        match classify_probe(out.success, &out.output) {
            ProbeOutcome::AmbiguousError => Err(Error::Unknown(format!(
                "cannot tell whether {path} exists: {:?}",
                out.output.trim()
            ))),
            outcome => Ok(outcome),
        }
    }

    fn checksum(&self, path: &SafePath) -> Result<Option<String>> {
        let tool = self.config.checksum_tool;
        let out = self.run(&RemoteCommand::Checksum {
            tool,
            path: path.clone(),
        })?;
        if !out.success {
            return Ok(None);
        }
        Ok(parse_checksum(tool, &out.output))
    }

    fn run(&self, command: &RemoteCommand) -> Result<CommandOutput> {
        let line = command.render();
        log::debug!("exec: {line}");
        Ok(self.executor.exec(&line)?)
    }
}
