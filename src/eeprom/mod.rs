//! EEPROM identity mutation: dump, write, spoof, verify.
//!
//! The EEPROM of an ASIX AX88772-family adapter holds the USB identity the
//! host sees. This module provides:
//!
//! - [`EepromImage`] - A complete 256-byte snapshot.
//! - [`codec`] - The little-endian VID/PID codec, pure and device-free.
//! - [`EepromTransport`] - The byte-transfer collaborator contract.
//! - [`EepromEngine`] - Backup, write, and verify over a transport.
//! - `UsbTransport` - A `nusb` transport (feature `usb`).

pub mod codec;
mod engine;
mod image;
mod transport;
#[cfg(feature = "usb")]
mod usb;

pub use engine::{EepromEngine, WriteReceipt};
pub use image::EepromImage;
pub use transport::{EepromTransport, WriteAck};
#[cfg(feature = "usb")]
pub use usb::UsbTransport;
