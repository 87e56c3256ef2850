/// Register transactions against a single device on a bus.
///
/// A multi-byte transaction addresses consecutive registers starting at `address`.
pub trait RegAccess {
    type Error;

    fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

    fn write_registers(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    fn read_register(&mut self, address: u8) -> Result<u8, Self::Error> {
        let mut byte = [0u8; 1];
        self.read_registers(address, &mut byte)?;
        Ok(byte[0])
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<(), Self::Error> {
        self.write_registers(address, &[value])
    }
}

impl<T: RegAccess + ?Sized> RegAccess for &mut T {
    type Error = T::Error;

    fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read_registers(address, buffer)
    }

    fn write_registers(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write_registers(address, bytes)
    }

    fn read_register(&mut self, address: u8) -> Result<u8, Self::Error> {
        (**self).read_register(address)
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<(), Self::Error> {
        (**self).write_register(address, value)
    }
}
