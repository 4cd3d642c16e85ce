//! In-memory fakes of the USB transport and the head unit shell.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::Sender;
use std::time::Duration;

use asix_eeprom::constants::{EEPROM_SIZE, WRITE_AUTHORIZATION};
use asix_eeprom::{CommandExecutor, CommandOutput, EepromTransport, TransportFault, WriteAck};
use md5::Md5;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

// ---- EEPROM ----

/// How the fake device treats writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Store and acknowledge.
    Store,
    /// Acknowledge without storing.
    Drop,
    /// Acknowledge fewer bytes than sent, storing nothing.
    Partial,
}

/// A 256-byte EEPROM behind a fake USB link.
pub struct FakeEeprom {
    mem: Mutex<[u8; EEPROM_SIZE]>,
    pub write_mode: Mutex<WriteMode>,
    /// Fail every read once this many writes happened.
    pub unplug_after_writes: Mutex<Option<usize>>,
    pub reads: Mutex<usize>,
    pub writes: Mutex<usize>,
    /// Pause between stored bytes, to widen race windows.
    pub byte_delay: Duration,
}

impl FakeEeprom {
    pub fn new(image: [u8; EEPROM_SIZE]) -> Self {
        Self {
            mem: Mutex::new(image),
            write_mode: Mutex::new(WriteMode::Store),
            unplug_after_writes: Mutex::new(None),
            reads: Mutex::new(0),
            writes: Mutex::new(0),
            byte_delay: Duration::ZERO,
        }
    }

    pub fn with_byte_delay(mut self, delay: Duration) -> Self {
        self.byte_delay = delay;
        self
    }

    pub fn contents(&self) -> [u8; EEPROM_SIZE] {
        *self.mem.lock()
    }

    pub fn set_write_mode(&self, mode: WriteMode) {
        *self.write_mode.lock() = mode;
    }
}

/// An AX88772A image: pattern bytes with identity 0B95:772A.
pub fn asix_image() -> [u8; EEPROM_SIZE] {
    let mut buf = [0u8; EEPROM_SIZE];
    for (i, b) in buf.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(7).wrapping_add(3);
    }
    buf[0x88..0x8C].copy_from_slice(&[0x95, 0x0B, 0x2A, 0x77]);
    buf
}

impl EepromTransport for FakeEeprom {
    fn read(&self, offset: u16, length: u16) -> Result<Vec<u8>, TransportFault> {
        *self.reads.lock() += 1;
        if let Some(limit) = *self.unplug_after_writes.lock() {
            if *self.writes.lock() >= limit {
                return Err(TransportFault::Disconnected("adapter unplugged".into()));
            }
        }
        let mem = self.mem.lock();
        let start = offset as usize;
        let end = start + length as usize;
        if end > EEPROM_SIZE {
            return Err(TransportFault::Other("read past end".into()));
        }
        Ok(mem[start..end].to_vec())
    }

    fn write(&self, offset: u16, bytes: &[u8], authorization: u32) -> Result<WriteAck, TransportFault> {
        *self.writes.lock() += 1;
        if authorization != WRITE_AUTHORIZATION {
            return Err(TransportFault::AuthorizationRejected(format!(
                "0x{authorization:08X}"
            )));
        }
        match *self.write_mode.lock() {
            WriteMode::Drop => {
                return Ok(WriteAck {
                    bytes_written: bytes.len(),
                })
            }
            WriteMode::Partial => {
                return Ok(WriteAck {
                    bytes_written: bytes.len().saturating_sub(1),
                })
            }
            WriteMode::Store => {}
        }
        for (i, &b) in bytes.iter().enumerate() {
            if !self.byte_delay.is_zero() {
                std::thread::sleep(self.byte_delay);
            }
            self.mem.lock()[offset as usize + i] = b;
        }
        Ok(WriteAck {
            bytes_written: bytes.len(),
        })
    }
}

// ---- Head unit shell ----

#[derive(Default)]
struct Fs {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl Fs {
    fn add_dir_all(&mut self, path: &str) {
        let mut cur = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            cur.push('/');
            cur.push_str(part);
            self.dirs.insert(cur.clone());
        }
    }

    fn children(&self, dir: &str) -> Vec<(&String, &Vec<u8>)> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.files
            .iter()
            .filter(|(p, _)| p.strip_prefix(&prefix).is_some_and(|rest| !rest.contains('/')))
            .collect()
    }
}

fn parent(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => "",
    }
}

/// Holds one matching command for a while after it answered.
pub struct Pause {
    /// Command line prefix to stop at.
    pub prefix: String,
    /// Signalled once the command has run.
    pub reached: Sender<()>,
    pub hold: Duration,
}

/// A head unit filesystem driven by the command lines the manager renders.
///
/// Answers like busybox would for `ls`, `stat`, `mkdir`, `cp`, `md5sum`,
/// `sha256sum`, `printf`, `cat` and `rm`, including `&& echo` chains. Every
/// command line is logged.
#[derive(Default)]
pub struct FakeHeadUnit {
    fs: Mutex<Fs>,
    pub log: Mutex<Vec<String>>,
    /// Checksum programs print nothing.
    pub checksum_broken: Mutex<bool>,
    /// Every exec fails at the channel level.
    pub offline: Mutex<bool>,
    /// Writes to paths containing any of these fail.
    pub unwritable: Mutex<Vec<String>>,
    pub pause: Mutex<Option<Pause>>,
}

impl FakeHeadUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, content: &[u8]) {
        let mut fs = self.fs.lock();
        fs.add_dir_all(parent(path));
        fs.files.insert(path.to_string(), content.to_vec());
    }

    pub fn mkdir(&self, path: &str) {
        self.fs.lock().add_dir_all(path);
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.fs.lock().files.get(path).cloned()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.fs.lock().files.contains_key(path)
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Position of the first logged command starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.log.lock().iter().position(|c| c.starts_with(prefix))
    }

    pub fn deny_writes(&self, pattern: &str) {
        self.unwritable.lock().push(pattern.to_string());
    }

    fn writable(&self, path: &str) -> bool {
        !self.unwritable.lock().iter().any(|p| path.contains(p.as_str()))
    }

    fn answer(&self, line: &str) -> String {
        let t: Vec<&str> = line.split_whitespace().collect();
        let mut fs = self.fs.lock();
        match t.as_slice() {
            ["ls", "-la", path, ..] => match fs.files.get(*path) {
                Some(data) => format!("-rw-r--r-- 1 root root {} Jan 1 00:00 {path}\n", data.len()),
                None if fs.dirs.contains(*path) => format!("drwxr-xr-x 2 root root 0 Jan 1 00:00 {path}\n"),
                None => "NOT_FOUND\n".into(),
            },
            ["stat", "-c", "%s", path, ..] => match fs.files.get(*path) {
                Some(data) => format!("{}\n", data.len()),
                None => "0\n".into(),
            },
            ["mkdir", "-p", path, ..] => {
                fs.add_dir_all(path);
                String::new()
            }
            ["cp", "-p", from, to, ..] => {
                let Some(data) = fs.files.get(*from).cloned() else {
                    return format!("cp: cannot stat '{from}': No such file or directory\n");
                };
                if !fs.dirs.contains(parent(to)) {
                    return format!("cp: cannot create '{to}': No such file or directory\n");
                }
                if !self.writable(to) {
                    return format!("cp: can't create '{to}': Read-only file system\n");
                }
                fs.files.insert(to.to_string(), data);
                echo_tail(&t)
            }
            [tool @ ("md5sum" | "sha256sum"), path, ..] => {
                if *self.checksum_broken.lock() {
                    return String::new();
                }
                match fs.files.get(*path) {
                    Some(data) if *tool == "md5sum" => format!("{}\n", hex::encode(Md5::digest(data))),
                    Some(data) => format!("{}\n", hex::encode(Sha256::digest(data))),
                    None => String::new(),
                }
            }
            ["printf", _fmt, rest @ ..] => {
                let gt = rest.iter().position(|s| *s == ">").expect("redirect");
                let body: String = rest[..gt].iter().map(|s| format!("{s}\n")).collect();
                let path = rest[gt + 1];
                if !fs.dirs.contains(parent(path)) {
                    return format!("sh: can't create {path}: nonexistent directory\n");
                }
                if !self.writable(path) {
                    return format!("sh: can't create {path}: No space left on device\n");
                }
                fs.files.insert(path.to_string(), body.into_bytes());
                echo_tail(&t)
            }
            ["ls", "-1", dir, ..] => {
                if !fs.dirs.contains(*dir) {
                    return "NO_BACKUPS\n".into();
                }
                fs.children(dir)
                    .iter()
                    .map(|(p, _)| format!("{}\n", p.rsplit('/').next().unwrap_or_default()))
                    .collect()
            }
            ["cat", pattern, ..] => {
                let (dir, suffix) = pattern.split_once("/*").expect("glob");
                let out: String = fs
                    .children(dir)
                    .iter()
                    .filter(|(p, _)| p.ends_with(suffix))
                    .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
                    .collect();
                if out.is_empty() {
                    "NO_META\n".into()
                } else {
                    out
                }
            }
            ["rm", "-f", rest @ ..] => {
                for path in rest.iter().filter(|s| s.starts_with('/')) {
                    fs.files.remove(*path);
                }
                String::new()
            }
            _ => panic!("fake head unit does not understand {line:?}"),
        }
    }
}

/// Output of a trailing `&& echo WORD`, run after a successful command.
fn echo_tail(tokens: &[&str]) -> String {
    match tokens {
        [.., "&&", "echo", word] => format!("{word}\n"),
        _ => String::new(),
    }
}

impl CommandExecutor for FakeHeadUnit {
    fn exec(&self, command_line: &str) -> Result<CommandOutput, TransportFault> {
        self.log.lock().push(command_line.to_string());
        if *self.offline.lock() {
            return Err(TransportFault::Disconnected("telnet session closed".into()));
        }
        let output = self.answer(command_line);

        let pause = {
            let mut slot = self.pause.lock();
            match slot.as_ref() {
                Some(p) if command_line.starts_with(&p.prefix) => slot.take(),
                _ => None,
            }
        };
        if let Some(p) = pause {
            let _ = p.reached.send(());
            std::thread::sleep(p.hold);
        }
        Ok(CommandOutput::ran(output))
    }
}
