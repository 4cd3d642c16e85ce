//! [`EepromTransport`] over USB vendor control transfers, using `nusb`.
//!
//! ASIX adapters expose their EEPROM through two vendor requests: read one
//! location (`value` = offset, the byte comes back first in a 2-byte reply)
//! and write one location (`value` = offset, `index` = byte).

use std::time::Duration;

use nusb::transfer::{ControlIn, ControlOut, ControlType, Recipient, TransferError};
use nusb::MaybeFuture;

use super::transport::{EepromTransport, WriteAck};
use crate::compat::identify_chipset;
use crate::constants::{ASIX_CMD_READ_EEPROM, ASIX_CMD_WRITE_EEPROM, WRITE_AUTHORIZATION};
use crate::error::{Error, Result, TransportFault};

/// Default control transfer timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settling delay between consecutive EEPROM byte writes.
const WRITE_DELAY: Duration = Duration::from_millis(10);

/// An opened ASIX adapter.
pub struct UsbTransport {
    #[allow(dead_code)] // Kept to ensure the USB device stays open
    device: nusb::Device,
    interface: nusb::Interface,
    vendor_id: u16,
    product_id: u16,
    timeout: Duration,
}

impl std::fmt::Debug for UsbTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbTransport")
            .field("vendor_id", &format_args!("0x{:04X}", self.vendor_id))
            .field("product_id", &format_args!("0x{:04X}", self.product_id))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl UsbTransport {
    /// Open the first adapter matching the given vendor and product IDs.
    pub fn open(vendor: u16, product: u16) -> Result<Self> {
        let dev_info = nusb::list_devices()
            .wait()
            .map_err(|e| Error::DeviceUnavailable(format!("USB enumeration failed: {e}")))?
            .find(|d| d.vendor_id() == vendor && d.product_id() == product)
            .ok_or_else(|| {
                Error::NotFound(format!("no USB device {vendor:04X}:{product:04X}"))
            })?;

        Self::from_device_info(dev_info)
    }

    /// Open an already-discovered [`nusb::DeviceInfo`].
    pub fn from_device_info(dev_info: nusb::DeviceInfo) -> Result<Self> {
        let vendor_id = dev_info.vendor_id();
        let product_id = dev_info.product_id();

        let device = dev_info
            .open()
            .wait()
            .map_err(|e| Error::DeviceUnavailable(format!("open failed: {e}")))?;

        // The kernel's asix driver holds interface 0 while the link is up.
        let interface = device
            .detach_and_claim_interface(0)
            .wait()
            .map_err(|e| Error::DeviceUnavailable(format!("claim failed: {e}")))?;

        log::info!("opened USB adapter {vendor_id:04X}:{product_id:04X}");

        Ok(Self {
            device,
            interface,
            vendor_id,
            product_id,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Chipset identifier derived from the USB identity.
    pub fn chipset(&self) -> &'static str {
        identify_chipset(self.vendor_id, self.product_id)
    }

    /// Set the per-transfer timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The per-transfer timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn read_location(&self, offset: u16) -> std::result::Result<u8, TransportFault> {
        let data = self
            .interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request: ASIX_CMD_READ_EEPROM,
                    value: offset,
                    index: 0,
                    length: 2,
                },
                self.timeout,
            )
            .wait()
            .map_err(|e| transfer_fault(e, offset))?;
        data.first().copied().ok_or_else(|| {
            TransportFault::Other(format!("empty EEPROM reply at 0x{offset:02X}"))
        })
    }

    fn write_location(&self, offset: u16, byte: u8) -> std::result::Result<(), TransportFault> {
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request: ASIX_CMD_WRITE_EEPROM,
                    value: offset,
                    index: byte as u16,
                    data: &[],
                },
                self.timeout,
            )
            .wait()
            .map_err(|e| transfer_fault(e, offset))
    }
}

impl EepromTransport for UsbTransport {
    fn read(&self, offset: u16, length: u16) -> std::result::Result<Vec<u8>, TransportFault> {
        let end = offset
            .checked_add(length)
            .ok_or_else(|| TransportFault::Other(format!("read past 0x{offset:04X}")))?;
        (offset..end).map(|at| self.read_location(at)).collect()
    }

    fn write(
        &self,
        offset: u16,
        bytes: &[u8],
        authorization: u32,
    ) -> std::result::Result<WriteAck, TransportFault> {
        if authorization != WRITE_AUTHORIZATION {
            return Err(TransportFault::AuthorizationRejected(format!(
                "authorization 0x{authorization:08X} refused"
            )));
        }

        for (i, &byte) in bytes.iter().enumerate() {
            if i > 0 {
                std::thread::sleep(WRITE_DELAY);
            }
            let at = u16::try_from(i)
                .ok()
                .and_then(|i| offset.checked_add(i))
                .ok_or_else(|| TransportFault::Other(format!("write past 0x{offset:04X}")))?;
            self.write_location(at, byte)?;
        }
        Ok(WriteAck {
            bytes_written: bytes.len(),
        })
    }
}

/// Translate a transfer error at `offset` into a transport fault.
fn transfer_fault(err: TransferError, offset: u16) -> TransportFault {
    match err {
        TransferError::Disconnected => {
            TransportFault::Disconnected(format!("device gone at 0x{offset:02X}"))
        }
        // nusb cancels a control transfer when its timeout elapses.
        TransferError::Cancelled => {
            TransportFault::TimedOut(format!("EEPROM transfer at 0x{offset:02X}"))
        }
        other => TransportFault::Other(format!("transfer at 0x{offset:02X}: {other}")),
    }
}
