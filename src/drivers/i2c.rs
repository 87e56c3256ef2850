use alloc::sync::Arc;

use embedded_hal::blocking::i2c::{Write, WriteRead};
use hal::bus::RegAccess;
use spin::Mutex;

const MAX_WRITE: usize = 16;

/// An I2C peripheral shared by several devices, one transaction at a time.
pub struct SharedI2c<I2C>(Arc<Mutex<I2C>>);

impl<I2C> Clone for SharedI2c<I2C> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<I2C> SharedI2c<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self(Arc::new(Mutex::new(i2c)))
    }

    pub fn device(&self, address: u8) -> I2cDevice<I2C> {
        I2cDevice { bus: self.clone(), address }
    }
}

/// A device behind a `SharedI2c`, addressed by its 7-bit bus address
pub struct I2cDevice<I2C> {
    bus: SharedI2c<I2C>,
    address: u8,
}

impl<E, I2C: Write<Error = E> + WriteRead<Error = E>> RegAccess for I2cDevice<I2C> {
    type Error = E;

    fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), E> {
        let mut i2c = self.bus.0.lock();
        i2c.write_read(self.address, &[address], buffer)
    }

    fn write_registers(&mut self, address: u8, bytes: &[u8]) -> Result<(), E> {
        let mut buffer = [0u8; MAX_WRITE];
        let mut i2c = self.bus.0.lock();
        for (i, chunk) in bytes.chunks(MAX_WRITE - 1).enumerate() {
            buffer[0] = address.wrapping_add((i * (MAX_WRITE - 1)) as u8);
            buffer[1..1 + chunk.len()].copy_from_slice(chunk);
            i2c.write(self.address, &buffer[..1 + chunk.len()])?;
        }
        Ok(())
    }
}

mod test {
    #[cfg(test)]
    #[derive(Default)]
    struct FakeI2c {
        registers: std::collections::HashMap<(u8, u8), u8>,
        transactions: usize,
    }

    #[cfg(test)]
    impl embedded_hal::blocking::i2c::Write for FakeI2c {
        type Error = ();

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), ()> {
            self.transactions += 1;
            for (i, byte) in bytes[1..].iter().enumerate() {
                self.registers.insert((address, bytes[0] + i as u8), *byte);
            }
            Ok(())
        }
    }

    #[cfg(test)]
    impl embedded_hal::blocking::i2c::WriteRead for FakeI2c {
        type Error = ();

        fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), ()> {
            self.transactions += 1;
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = *self.registers.get(&(address, bytes[0] + i as u8)).ok_or(())?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_shared_devices() {
        use hal::bus::RegAccess;

        use super::SharedI2c;

        let shared = SharedI2c::new(FakeI2c::default());
        let (mut mpu, mut mag) = (shared.device(0x68), shared.device(0x0C));
        mpu.write_registers(0x13, &[1, 2, 3, 4, 5, 6]).unwrap();
        mag.write_register(0x0A, 0x16).unwrap();

        let mut buffer = [0u8; 6];
        mpu.read_registers(0x13, &mut buffer).unwrap();
        assert_eq!(buffer, [1, 2, 3, 4, 5, 6]);
        assert_eq!(mag.read_register(0x0A).unwrap(), 0x16);
        assert_eq!(mag.read_register(0x13), Err(()));
        assert_eq!(shared.0.lock().transactions, 5);
    }

    #[test]
    fn test_long_write() {
        use hal::bus::RegAccess;

        use super::SharedI2c;

        let shared = SharedI2c::new(FakeI2c::default());
        let mut device = shared.device(0x68);
        let bytes: Vec<u8> = (0..40).collect();
        device.write_registers(0x10, &bytes).unwrap();
        assert_eq!(shared.0.lock().transactions, 3);

        let mut buffer = [0u8; 40];
        device.read_registers(0x10, &mut buffer).unwrap();
        assert_eq!(&buffer[..], &bytes[..]);
    }
}
