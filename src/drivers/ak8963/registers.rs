pub const ADDRESS: u8 = 0x0C;
pub const WHO_AM_I: u8 = 0x48;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    WhoAmI = 0x00,
    Info = 0x01,
    /// Bit 0 is data ready
    Status1 = 0x02,
    XLow = 0x03,
    XHigh = 0x04,
    YLow = 0x05,
    YHigh = 0x06,
    ZLow = 0x07,
    ZHigh = 0x08,
    /// Bit 3 is magnetic overflow, reading it ends the measurement cycle
    Status2 = 0x09,
    Control1 = 0x0A,
    Control2 = 0x0B,
    SelfTest = 0x0C,
    I2cDisable = 0x0F,
    /// Fuse ROM sensitivity adjustment, only readable in fuse access mode
    SensitivityX = 0x10,
    SensitivityY = 0x11,
    SensitivityZ = 0x12,
}

impl Register {
    pub const ALL: [Register; 17] = [
        Self::WhoAmI,
        Self::Info,
        Self::Status1,
        Self::XLow,
        Self::XHigh,
        Self::YLow,
        Self::YHigh,
        Self::ZLow,
        Self::ZHigh,
        Self::Status2,
        Self::Control1,
        Self::Control2,
        Self::SelfTest,
        Self::I2cDisable,
        Self::SensitivityX,
        Self::SensitivityY,
        Self::SensitivityZ,
    ];

    #[inline]
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

mod test {
    #[test]
    fn test_unique_address() {
        use std::collections::HashSet;

        use super::Register;

        let addresses: HashSet<u8> = Register::ALL.iter().map(|r| r.addr()).collect();
        assert_eq!(addresses.len(), Register::ALL.len());
        assert_eq!(Register::XLow.addr() + 6, Register::Status2.addr());
    }
}
