//! Identity spoof example.
//!
//! Opens the first ASIX AX88772B adapter, prints its EEPROM, rewrites the
//! identity to D-Link DUB-E100 and reports the verified result. On failure
//! the pre-image is written back.
//!
//! Usage: cargo run --example spoof [--dry-run]

use asix_eeprom::compat::message_key;
use asix_eeprom::constants::{pid, ASIX_VID};
use asix_eeprom::{can_mutate, EepromEngine, SpoofRequest, UsbTransport, WRITE_AUTHORIZATION};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let dry_run = std::env::args().any(|a| a == "--dry-run");

    println!("Opening ASIX adapter...");
    let usb = UsbTransport::open(ASIX_VID, pid::AX88772B)?;
    let chipset = usb.chipset();
    let engine = EepromEngine::open(usb, chipset);

    let tier = engine.tier();
    println!("Chipset: {chipset} ({})", message_key(tier).as_str());
    if !can_mutate(tier) {
        println!("Refusing to modify this adapter.");
        return Ok(());
    }

    let image = engine.dump()?;
    println!("Current identity: {}", image.identity());
    println!("Image digest:     {}", image.digest());

    if dry_run {
        return Ok(());
    }

    let result = engine.spoof(&SpoofRequest::default())?;
    println!("\nState:    {:?}", result.state);
    println!("Old:      {}", result.old);
    println!("Request:  {}", result.requested);
    match result.new {
        Some(id) => println!("Read back: {id}"),
        None => println!("Read back: (none)"),
    }

    if !result.success {
        if let Some(e) = &result.error {
            println!("Spoof failed: {e}");
        }
        println!("Writing the backup image back...");
        engine.restore_image(&result.backup, WRITE_AUTHORIZATION)?;
        println!("Restored {}", result.backup.identity());
    } else {
        println!("Replug the adapter to enumerate with the new identity.");
    }

    Ok(())
}
