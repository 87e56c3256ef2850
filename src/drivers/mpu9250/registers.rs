/// Bus address with AD0 pulled low
pub const ADDRESS: u8 = 0x68;
pub const ADDRESS_AD0_HIGH: u8 = 0x69;
pub const WHO_AM_I: u8 = 0x71;

/// Main register space of the MPU9250 accelerometer and gyroscope
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    SelfTestXGyro = 0x00,
    SelfTestYGyro = 0x01,
    SelfTestZGyro = 0x02,
    SelfTestXAccel = 0x0D,
    SelfTestYAccel = 0x0E,
    SelfTestZAccel = 0x0F,
    /// User trim of the gyroscope, high byte first, X/Y/Z consecutive
    GyroOffsetXHigh = 0x13,
    GyroOffsetXLow = 0x14,
    GyroOffsetYHigh = 0x15,
    GyroOffsetYLow = 0x16,
    GyroOffsetZHigh = 0x17,
    GyroOffsetZLow = 0x18,
    SampleRateDivider = 0x19,
    Config = 0x1A,
    GyroConfig = 0x1B,
    AccelerometerConfig = 0x1C,
    AccelerometerConfig2 = 0x1D,
    LowPowerAccelerometerODR = 0x1E,
    WakeOnMotionThreshold = 0x1F,
    FifoEnable = 0x23,
    I2cMasterControl = 0x24,
    I2cMasterStatus = 0x36,
    IntPinConfig = 0x37,
    IntEnable = 0x38,
    IntStatus = 0x3A,
    AccelerometerXHigh = 0x3B,
    AccelerometerXLow = 0x3C,
    AccelerometerYHigh = 0x3D,
    AccelerometerYLow = 0x3E,
    AccelerometerZHigh = 0x3F,
    AccelerometerZLow = 0x40,
    TemperatureHigh = 0x41,
    TemperatureLow = 0x42,
    GyroXHigh = 0x43,
    GyroXLow = 0x44,
    GyroYHigh = 0x45,
    GyroYLow = 0x46,
    GyroZHigh = 0x47,
    GyroZLow = 0x48,
    SignalPathReset = 0x68,
    MotionDetectControl = 0x69,
    UserControl = 0x6A,
    PowerManagement1 = 0x6B,
    PowerManagement2 = 0x6C,
    FifoCountHigh = 0x72,
    FifoCountLow = 0x73,
    FifoReadWrite = 0x74,
    WhoAmI = 0x75,
    AccelerometerOffsetXHigh = 0x77,
    AccelerometerOffsetXLow = 0x78,
    AccelerometerOffsetYHigh = 0x7A,
    AccelerometerOffsetYLow = 0x7B,
    AccelerometerOffsetZHigh = 0x7D,
    AccelerometerOffsetZLow = 0x7E,
}

impl Register {
    pub const ALL: [Register; 54] = [
        Self::SelfTestXGyro,
        Self::SelfTestYGyro,
        Self::SelfTestZGyro,
        Self::SelfTestXAccel,
        Self::SelfTestYAccel,
        Self::SelfTestZAccel,
        Self::GyroOffsetXHigh,
        Self::GyroOffsetXLow,
        Self::GyroOffsetYHigh,
        Self::GyroOffsetYLow,
        Self::GyroOffsetZHigh,
        Self::GyroOffsetZLow,
        Self::SampleRateDivider,
        Self::Config,
        Self::GyroConfig,
        Self::AccelerometerConfig,
        Self::AccelerometerConfig2,
        Self::LowPowerAccelerometerODR,
        Self::WakeOnMotionThreshold,
        Self::FifoEnable,
        Self::I2cMasterControl,
        Self::I2cMasterStatus,
        Self::IntPinConfig,
        Self::IntEnable,
        Self::IntStatus,
        Self::AccelerometerXHigh,
        Self::AccelerometerXLow,
        Self::AccelerometerYHigh,
        Self::AccelerometerYLow,
        Self::AccelerometerZHigh,
        Self::AccelerometerZLow,
        Self::TemperatureHigh,
        Self::TemperatureLow,
        Self::GyroXHigh,
        Self::GyroXLow,
        Self::GyroYHigh,
        Self::GyroYLow,
        Self::GyroZHigh,
        Self::GyroZLow,
        Self::SignalPathReset,
        Self::MotionDetectControl,
        Self::UserControl,
        Self::PowerManagement1,
        Self::PowerManagement2,
        Self::FifoCountHigh,
        Self::FifoCountLow,
        Self::FifoReadWrite,
        Self::WhoAmI,
        Self::AccelerometerOffsetXHigh,
        Self::AccelerometerOffsetXLow,
        Self::AccelerometerOffsetYHigh,
        Self::AccelerometerOffsetYLow,
        Self::AccelerometerOffsetZHigh,
        Self::AccelerometerOffsetZLow,
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

        let all: HashSet<Register> = Register::ALL.iter().copied().collect();
        let addresses: HashSet<u8> = all.iter().map(|r| r.addr()).collect();
        assert_eq!(all.len(), addresses.len());
        assert_eq!(Register::GyroXHigh.addr(), 0x43);
        assert_eq!(Register::AccelerometerXHigh.addr(), 0x3B);
        assert_eq!(Register::GyroOffsetXHigh.addr(), 0x13);
    }
}
