//! In-memory register image standing in for a device on the bus.

use alloc::vec::Vec;

use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use hal::bus::RegAccess;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BusFault;

pub struct FakeBus {
    pub registers: [u8; 256],
    /// Read transactions issued, failed ones included
    pub reads: usize,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub fail: bool,
    /// Fail every n-th read transaction, 0 disables
    pub fail_every: usize,
}

impl FakeBus {
    pub fn new() -> Self {
        Self { registers: [0u8; 256], reads: 0, writes: Vec::new(), fail: false, fail_every: 0 }
    }

    pub fn with(mut self, address: u8, bytes: &[u8]) -> Self {
        self.set(address, bytes);
        self
    }

    pub fn set(&mut self, address: u8, bytes: &[u8]) {
        let start = address as usize;
        self.registers[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Bytes of the last write transaction starting at `address`
    pub fn written(&self, address: u8) -> Option<&[u8]> {
        self.writes.iter().rev().find(|(a, _)| *a == address).map(|(_, bytes)| &bytes[..])
    }
}

impl RegAccess for FakeBus {
    type Error = BusFault;

    fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), BusFault> {
        self.reads += 1;
        if self.fail || (self.fail_every > 0 && self.reads % self.fail_every == 0) {
            return Err(BusFault);
        }
        let start = address as usize;
        buffer.copy_from_slice(&self.registers[start..start + buffer.len()]);
        Ok(())
    }

    fn write_registers(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        self.set(address, bytes);
        self.writes.push((address, bytes.to_vec()));
        Ok(())
    }
}

pub struct NoDelay;

impl DelayMs<u8> for NoDelay {
    fn delay_ms(&mut self, _: u8) {}
}

impl DelayUs<u32> for NoDelay {
    fn delay_us(&mut self, _: u32) {}
}
