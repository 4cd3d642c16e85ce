//! The byte-transfer collaborator contract.

use crate::error::TransportFault;

/// Acknowledgement of an EEPROM write by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    /// Number of bytes the device accepted.
    pub bytes_written: usize,
}

/// Byte-addressable access to a device EEPROM.
///
/// Implementations own cancellation and timeouts: a call that takes too long
/// must return [`TransportFault::TimedOut`] rather than block forever. The
/// engine adds no timeout of its own and never retries.
pub trait EepromTransport {
    /// Read `length` bytes starting at `offset`.
    fn read(&self, offset: u16, length: u16) -> Result<Vec<u8>, TransportFault>;

    /// Write `bytes` starting at `offset`, carrying the authorization value.
    fn write(&self, offset: u16, bytes: &[u8], authorization: u32)
        -> Result<WriteAck, TransportFault>;
}

impl<T: EepromTransport + ?Sized> EepromTransport for &T {
    fn read(&self, offset: u16, length: u16) -> Result<Vec<u8>, TransportFault> {
        (**self).read(offset, length)
    }

    fn write(
        &self,
        offset: u16,
        bytes: &[u8],
        authorization: u32,
    ) -> Result<WriteAck, TransportFault> {
        (**self).write(offset, bytes, authorization)
    }
}

impl<T: EepromTransport + ?Sized> EepromTransport for Box<T> {
    fn read(&self, offset: u16, length: u16) -> Result<Vec<u8>, TransportFault> {
        (**self).read(offset, length)
    }

    fn write(
        &self,
        offset: u16,
        bytes: &[u8],
        authorization: u32,
    ) -> Result<WriteAck, TransportFault> {
        (**self).write(offset, bytes, authorization)
    }
}
