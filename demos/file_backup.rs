//! File backup example.
//!
//! Backs up a local file through `sh`, lists the backup directory, damages
//! the file, and restores it from the verified copy. A real integration
//! plugs its telnet or ssh session in as the [`CommandExecutor`].
//!
//! Usage: cargo run --example file_backup [backup_dir]

use std::process::Command;

use asix_eeprom::backup::ChecksumTool;
use asix_eeprom::{BackupConfig, CommandExecutor, CommandOutput, FileBackupManager, TransportFault};

/// Runs command lines with `sh -c` on this machine.
struct Sh;

impl CommandExecutor for Sh {
    fn exec(&self, command_line: &str) -> Result<CommandOutput, TransportFault> {
        let out = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .output()
            .map_err(|e| TransportFault::Disconnected(format!("cannot spawn sh: {e}")))?;
        let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(CommandOutput::ran(text))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/tmp/asix-eeprom-demo/backups".to_string());
    let target = "/tmp/asix-eeprom-demo/settings.cfg";
    std::fs::create_dir_all("/tmp/asix-eeprom-demo")?;
    std::fs::write(target, "usb_ethernet=1\n")?;

    let config = BackupConfig::new()
        .backup_dir(dir)
        .checksum_tool(ChecksumTool::Sha256);
    let manager = FileBackupManager::new(Sh, config)?;

    let record = manager.backup(target)?;
    println!("Backed up {} -> {}", record.original_path, record.backup_path);
    if let Some(sum) = &record.checksum {
        println!("Checksum: {sum}");
    }

    println!("\nBackups:");
    for r in manager.list()? {
        println!(
            "  {}  {:>6} bytes  {}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.size_bytes,
            r.original_path
        );
    }

    std::fs::write(target, "garbage")?;
    println!("\nIntact after damage: {}", manager.verify_integrity(target, &record)?);

    manager.restore(&record)?;
    println!("Intact after restore: {}", manager.verify_integrity(target, &record)?);

    Ok(())
}
