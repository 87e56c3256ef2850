pub mod registers;

use core::fmt::Debug;

use embedded_hal::blocking::delay::DelayMs;
use hal::bus::RegAccess;
use nalgebra::Vector3;

use crate::algorithm::calibration::{self, STEPS_PER_ROUND};
use crate::config::{Config, Trim};
use crate::error::{Error, InvalidConfiguration};
use crate::imu::Gyroscope;
use crate::scale::{AccelScale, AxisGroup, GyroScale};
use crate::types::sensor::{Axes, Bias};

pub use registers::Register;

pub const MAX_SAMPLE_RATE: u16 = 8000;

const CLOCK_AUTO_SELECT: u8 = 0x01;
const DLPF_41HZ: u8 = 0x03;
const SAMPLE_RATE_DIVIDER: u8 = 0x04;
const ACCELEROMETER_DLPF_MASK: u8 = 0x0F;
const ACCELEROMETER_DLPF_41HZ: u8 = 0x03;
/// Latched interrupt, cleared on any read, with I2C bypass to the magnetometer
const INT_PIN_LATCH_BYPASS: u8 = 0x22;
const INT_DATA_READY: u8 = 0x01;

pub struct MPU9250<BUS> {
    bus: BUS,
    gyroscope_scale: GyroScale,
    accelerometer_scale: AccelScale,
    trim: Trim,
    gyroscope_bias: Bias,
    accelerometer_bias: Bias,
    gyroscope: Axes,
    acceleration: Axes,
}

impl<E: Debug, BUS: RegAccess<Error = E>> MPU9250<BUS> {
    pub fn new(bus: BUS, config: &Config) -> Self {
        Self {
            bus,
            gyroscope_scale: config.gyroscope.range,
            accelerometer_scale: config.accelerometer.range,
            trim: config.gyroscope.trim,
            gyroscope_bias: Bias::default(),
            accelerometer_bias: Bias::default(),
            gyroscope: Axes::default(),
            acceleration: Axes::default(),
        }
    }

    fn read(&mut self, register: Register) -> Result<u8, Error<E>> {
        self.bus.read_register(register.addr()).map_err(Error::Bus)
    }

    fn write(&mut self, register: Register, value: u8) -> Result<(), Error<E>> {
        self.bus.write_register(register.addr(), value).map_err(Error::Bus)
    }

    fn read_axes(&mut self, register: Register) -> Result<Axes, Error<E>> {
        let mut bytes = [0u8; 6];
        self.bus.read_registers(register.addr(), &mut bytes).map_err(Error::Bus)?;
        Ok(Axes::from_be_bytes(&bytes))
    }

    pub fn verify(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read(Register::WhoAmI)? == registers::WHO_AM_I)
    }

    /// Returns false if no MPU9250 answers on the bus
    pub fn init<D: DelayMs<u8>>(&mut self, delay: &mut D) -> Result<bool, Error<E>> {
        if !self.verify()? {
            return Ok(false);
        }
        info!("MPU9250 detected");

        let power = self.read(Register::PowerManagement1)?;
        self.write(Register::PowerManagement1, power & 0x06)?; // wake, keep clock source
        delay.delay_ms(150);
        let power = self.read(Register::PowerManagement1)?;
        self.write(Register::PowerManagement1, power | CLOCK_AUTO_SELECT)?;
        delay.delay_ms(200);

        self.write_gyroscope_trim(Bias::default())?;
        self.write(Register::Config, DLPF_41HZ)?;
        self.write(Register::SampleRateDivider, SAMPLE_RATE_DIVIDER)?;
        self.write(Register::GyroConfig, self.gyroscope_scale.bits())?;
        self.write(Register::AccelerometerConfig, self.accelerometer_scale.bits())?;
        let config = self.read(Register::AccelerometerConfig2)?;
        let config = config & !ACCELEROMETER_DLPF_MASK | ACCELEROMETER_DLPF_41HZ;
        self.write(Register::AccelerometerConfig2, config)?;
        self.write(Register::IntPinConfig, INT_PIN_LATCH_BYPASS)?;
        self.write(Register::IntEnable, INT_DATA_READY)?;
        delay.delay_ms(100);

        let (dps, g) = (self.gyroscope_scale.full_scale(), self.accelerometer_scale.full_scale());
        info!("MPU9250 initialized with gyroscope +/-{}dps accelerometer +/-{}g", dps, g);
        Ok(true)
    }

    pub fn update_gyroscope(&mut self) -> Result<(), Error<E>> {
        self.gyroscope = self.read_axes(Register::GyroXHigh)? - self.gyroscope_bias;
        Ok(())
    }

    pub fn update_accelerometer(&mut self) -> Result<(), Error<E>> {
        let acceleration = self.read_axes(Register::AccelerometerXHigh)?;
        self.acceleration = acceleration - self.accelerometer_bias;
        Ok(())
    }

    /// Degree per second of the last update
    pub fn gyroscope(&self) -> Vector3<f32> {
        self.gyroscope.scale(self.gyroscope_scale.resolution())
    }

    /// Standard gravity of the last update
    pub fn acceleration(&self) -> Vector3<f32> {
        self.acceleration.scale(self.accelerometer_scale.resolution())
    }

    pub fn raw_gyroscope(&self) -> Axes {
        self.gyroscope
    }

    pub fn raw_acceleration(&self) -> Axes {
        self.acceleration
    }

    pub fn write_gyroscope_trim(&mut self, bias: Bias) -> Result<(), Error<E>> {
        let bytes = bias.to_trim_bytes();
        self.bus.write_registers(Register::GyroOffsetXHigh.addr(), &bytes).map_err(Error::Bus)
    }

    /// Estimates the zero point of a stationary axis group and applies it.
    ///
    /// Any failed sample fails the whole calibration, leaving the previous bias in place.
    /// With hardware trim the gyroscope offset goes to the device trim registers instead of
    /// the software bias, and the previous trim is written back on failure.
    pub fn calibrate(&mut self, group: AxisGroup, rounds: usize) -> Result<Bias, Error<E>> {
        let register = match group {
            AxisGroup::Gyroscope => Register::GyroXHigh,
            AxisGroup::Accelerometer => Register::AccelerometerXHigh,
            AxisGroup::Magnetometer => return Err(InvalidConfiguration::Calibration.into()),
        };
        let hardware = group == AxisGroup::Gyroscope && self.trim == Trim::Hardware;
        let mut trim = [0u8; 6];
        if hardware {
            let address = Register::GyroOffsetXHigh.addr();
            self.bus.read_registers(address, &mut trim).map_err(Error::Bus)?;
            self.write_gyroscope_trim(Bias::default())?;
        }

        let report = calibration::calibrate(group, rounds, || {
            self.read_axes(register).map_err(|e| {
                warn!("Skip {:?} calibration sample: {:?}", group, e);
                e
            })
        })?;
        if let Some(error) = report.last_error {
            let total = rounds * STEPS_PER_ROUND;
            warn!("{:?} calibration failed, {}/{} samples lost", group, report.skipped, total);
            if hardware {
                let address = Register::GyroOffsetXHigh.addr();
                self.bus.write_registers(address, &trim).map_err(Error::Bus)?;
            }
            return Err(error);
        }

        match group {
            AxisGroup::Gyroscope if hardware => self.write_gyroscope_trim(report.bias)?,
            AxisGroup::Gyroscope => self.gyroscope_bias = report.bias,
            _ => self.accelerometer_bias = report.bias,
        }
        info!("{:?} calibrated with bias {:?}", group, report.bias);
        Ok(report.bias)
    }

    pub fn bias(&self, group: AxisGroup) -> Bias {
        match group {
            AxisGroup::Gyroscope => self.gyroscope_bias,
            AxisGroup::Accelerometer => self.accelerometer_bias,
            AxisGroup::Magnetometer => Bias::default(),
        }
    }

    pub fn set_bias(&mut self, group: AxisGroup, bias: Bias) {
        match group {
            AxisGroup::Gyroscope => self.gyroscope_bias = bias,
            AxisGroup::Accelerometer => self.accelerometer_bias = bias,
            AxisGroup::Magnetometer => (),
        }
    }

    pub fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }

    pub fn free(self) -> BUS {
        self.bus
    }
}

impl<E: Debug, BUS: RegAccess<Error = E>> Gyroscope for MPU9250<BUS> {
    type Error = Error<E>;

    fn update_gyroscope(&mut self) -> Result<(), Error<E>> {
        MPU9250::update_gyroscope(self)
    }

    fn raw_gyroscope(&self) -> Axes {
        self.gyroscope
    }

    fn gyroscope_resolution(&self) -> f32 {
        self.gyroscope_scale.resolution()
    }
}

mod test {
    #[cfg(test)]
    fn mpu9250(config: &crate::config::Config) -> super::MPU9250<crate::drivers::fake::FakeBus> {
        use super::{registers::WHO_AM_I, Register, MPU9250};
        use crate::drivers::fake::FakeBus;

        MPU9250::new(FakeBus::new().with(Register::WhoAmI.addr(), &[WHO_AM_I]), config)
    }

    #[test]
    fn test_init() {
        use super::Register;
        use crate::config::Config;
        use crate::drivers::fake::NoDelay;
        use crate::scale::{AccelScale, GyroScale};

        let mut config = Config::default();
        config.gyroscope.range = GyroScale::DPS2000;
        config.accelerometer.range = AccelScale::G8;
        let mut mpu9250 = mpu9250(&config);
        assert_eq!(mpu9250.init(&mut NoDelay).unwrap(), true);
        let bus = mpu9250.free();
        let register = |r: Register| bus.registers[r.addr() as usize];
        assert_eq!(register(Register::PowerManagement1), 0x01);
        assert_eq!(register(Register::Config), 0x03);
        assert_eq!(register(Register::SampleRateDivider), 0x04);
        assert_eq!(register(Register::GyroConfig), 0x18);
        assert_eq!(register(Register::AccelerometerConfig), 0x10);
        assert_eq!(register(Register::AccelerometerConfig2), 0x03);
        assert_eq!(register(Register::IntPinConfig), 0x22);
        assert_eq!(register(Register::IntEnable), 0x01);
        assert_eq!(bus.written(Register::GyroOffsetXHigh.addr()), Some(&[0u8; 6][..]));
    }

    #[test]
    fn test_not_detected() {
        use super::MPU9250;
        use crate::config::Config;
        use crate::drivers::fake::{FakeBus, NoDelay};

        let mut mpu9250 = MPU9250::new(FakeBus::new(), &Config::default());
        assert_eq!(mpu9250.init(&mut NoDelay).unwrap(), false);
        assert!(mpu9250.free().writes.is_empty());
    }

    #[test]
    fn test_update_independent() {
        use hex_literal::hex;
        use nalgebra::Vector3;

        use super::Register;
        use crate::config::Config;
        use crate::types::sensor::Axes;

        let mut mpu9250 = mpu9250(&Config::default());
        mpu9250.bus_mut().set(Register::GyroXHigh.addr(), &hex!("0083 ff7d 0000"));
        mpu9250.bus_mut().set(Register::AccelerometerXHigh.addr(), &hex!("2000 0000 e000"));
        mpu9250.update_gyroscope().unwrap();
        assert_eq!(mpu9250.raw_gyroscope(), Axes::new(131, -131, 0));
        assert_eq!(mpu9250.raw_acceleration(), Axes::default());

        let gyroscope = mpu9250.gyroscope();
        assert!((gyroscope - Vector3::new(0.99945, -0.99945, 0.0)).norm() < 1e-4);

        mpu9250.update_accelerometer().unwrap();
        assert_eq!(mpu9250.acceleration(), Vector3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn test_software_bias() {
        use hex_literal::hex;

        use super::Register;
        use crate::config::Config;
        use crate::scale::AxisGroup;
        use crate::types::sensor::Axes;

        let mut mpu9250 = mpu9250(&Config::default());
        mpu9250.bus_mut().set(Register::GyroXHigh.addr(), &hex!("0064 ffce 0014"));
        let bias = mpu9250.calibrate(AxisGroup::Gyroscope, 5).unwrap();
        assert_eq!(bias, Axes::new(100, -50, 20));
        assert_eq!(mpu9250.bias(AxisGroup::Gyroscope), bias);

        mpu9250.update_gyroscope().unwrap();
        assert_eq!(mpu9250.raw_gyroscope(), Axes::default());
        assert_eq!(mpu9250.free().reads, 5 * 100 + 1);
    }

    #[test]
    fn test_hardware_trim() {
        use hex_literal::hex;

        use super::Register;
        use crate::config::{Config, Trim};
        use crate::scale::AxisGroup;
        use crate::types::sensor::Axes;

        let mut config = Config::default();
        config.gyroscope.trim = Trim::Hardware;
        let mut mpu9250 = mpu9250(&config);
        mpu9250.bus_mut().set(Register::GyroXHigh.addr(), &hex!("0064 ffce 0014"));
        let bias = mpu9250.calibrate(AxisGroup::Gyroscope, 5).unwrap();
        assert_eq!(bias, Axes::new(100, -50, 20));
        assert_eq!(mpu9250.bias(AxisGroup::Gyroscope), Axes::default());

        let bus = mpu9250.free();
        let address = Register::GyroOffsetXHigh.addr();
        let trims: Vec<_> = bus.writes.iter().filter(|(a, _)| *a == address).collect();
        assert_eq!(trims.len(), 2);
        assert_eq!(&trims[0].1[..], &[0u8; 6][..]);
        assert_eq!(&trims[1].1[..], &hex!("ffe7 000c fffb")[..]);
    }

    #[test]
    fn test_hardware_trim_kept_on_failure() {
        use hex_literal::hex;

        use super::Register;
        use crate::config::{Config, Trim};
        use crate::drivers::fake::{BusFault, FakeBus};
        use crate::error::Error;
        use crate::scale::AxisGroup;
        use crate::types::sensor::Axes;

        let mut config = Config::default();
        config.gyroscope.trim = Trim::Hardware;
        let mut mpu9250 = mpu9250(&config);
        mpu9250.bus_mut().set(Register::GyroXHigh.addr(), &hex!("0064 ffce 0014"));
        mpu9250.calibrate(AxisGroup::Gyroscope, 5).unwrap();
        let trim = |bus: &FakeBus| {
            let start = Register::GyroOffsetXHigh.addr() as usize;
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(&bus.registers[start..start + 6]);
            bytes
        };
        let before = trim(mpu9250.bus_mut());
        assert_eq!(before, hex!("ffe7 000c fffb"));

        mpu9250.bus_mut().reads = 0;
        mpu9250.bus_mut().fail_every = 7;
        let result = mpu9250.calibrate(AxisGroup::Gyroscope, 1);
        assert_eq!(result, Err(Error::Bus(BusFault)));
        assert_eq!(trim(mpu9250.bus_mut()), before);
        assert_eq!(mpu9250.bias(AxisGroup::Gyroscope), Axes::default());
    }

    #[test]
    fn test_zero_rounds() {
        use super::Register;
        use crate::config::Config;
        use crate::scale::AxisGroup;
        use crate::types::sensor::Axes;

        let mut mpu9250 = mpu9250(&Config::default());
        mpu9250.bus_mut().set(Register::AccelerometerXHigh.addr(), &[0x10; 6]);
        assert_eq!(mpu9250.calibrate(AxisGroup::Accelerometer, 0).unwrap(), Axes::default());
        assert_eq!(mpu9250.free().reads, 0);
    }

    #[test]
    fn test_calibration_bus_error() {
        use super::Register;
        use crate::config::Config;
        use crate::drivers::fake::BusFault;
        use crate::error::{Error, InvalidConfiguration};
        use crate::scale::AxisGroup;
        use crate::types::sensor::Axes;

        let mut mpu9250 = mpu9250(&Config::default());
        mpu9250.set_bias(AxisGroup::Gyroscope, Axes::new(1, 2, 3));
        mpu9250.bus_mut().set(Register::GyroXHigh.addr(), &[0x01; 6]);
        mpu9250.bus_mut().fail_every = 7;
        let result = mpu9250.calibrate(AxisGroup::Gyroscope, 1);
        assert_eq!(result, Err(Error::Bus(BusFault)));
        assert_eq!(mpu9250.bias(AxisGroup::Gyroscope), Axes::new(1, 2, 3));
        assert_eq!(mpu9250.bus_mut().reads, 100);

        let result = mpu9250.calibrate(AxisGroup::Magnetometer, 1);
        assert_eq!(result, Err(Error::InvalidConfiguration(InvalidConfiguration::Calibration)));
    }

    #[test]
    fn test_update_bus_error() {
        use super::Register;
        use crate::config::Config;
        use crate::drivers::fake::BusFault;
        use crate::error::Error;
        use crate::types::sensor::Axes;

        let mut mpu9250 = mpu9250(&Config::default());
        mpu9250.bus_mut().set(Register::GyroXHigh.addr(), &[0x00, 0x05, 0x00, 0x06, 0x00, 0x07]);
        mpu9250.update_gyroscope().unwrap();
        mpu9250.bus_mut().fail = true;
        assert_eq!(mpu9250.update_gyroscope(), Err(Error::Bus(BusFault)));
        assert_eq!(mpu9250.raw_gyroscope(), Axes::new(5, 6, 7));
    }
}
