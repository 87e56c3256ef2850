use core::fmt::Debug;

use embedded_hal::blocking::delay::DelayMs;
use hal::bus::RegAccess;
use nalgebra::Vector3;

use crate::config::Config;
use crate::error::Error;
use crate::imu::Gyroscope;
use crate::scale::AxisGroup;
use crate::types::sensor::{Axes, Bias};

use super::ak8963::{Freshness, AK8963};
use super::mpu9250::MPU9250;

/// MPU9250 with its AK8963 magnetometer, each on its own register space.
pub struct NineDOF<A, M> {
    mpu9250: MPU9250<A>,
    ak8963: AK8963<M>,
    config: Config,
}

impl<E, A, M> NineDOF<A, M>
where
    E: Debug,
    A: RegAccess<Error = E>,
    M: RegAccess<Error = E>,
{
    pub fn new(mpu9250: A, ak8963: M, config: &Config) -> Self {
        Self {
            mpu9250: MPU9250::new(mpu9250, config),
            ak8963: AK8963::new(ak8963, config),
            config: *config,
        }
    }

    /// Brings up both devices and runs the configured calibration rounds.
    /// The magnetometer is only reachable once the MPU9250 bypass is enabled.
    pub fn init<D: DelayMs<u8>>(&mut self, delay: &mut D) -> Result<bool, Error<E>> {
        self.config.validate()?;
        if !self.mpu9250.init(delay)? {
            warn!("MPU9250 not detected");
            return Ok(false);
        }
        if !self.ak8963.init(delay)? {
            warn!("AK8963 not detected");
            return Ok(false);
        }
        let rounds = self.config.gyroscope.calibration;
        if rounds > 0 {
            self.mpu9250.calibrate(AxisGroup::Gyroscope, rounds)?;
        }
        let rounds = self.config.accelerometer.calibration;
        if rounds > 0 {
            self.mpu9250.calibrate(AxisGroup::Accelerometer, rounds)?;
        }
        Ok(true)
    }

    pub fn calibrate(&mut self, group: AxisGroup, rounds: usize) -> Result<Bias, Error<E>> {
        self.mpu9250.calibrate(group, rounds)
    }

    /// Physical units per raw count under the configured scale
    pub fn resolution(&self, group: AxisGroup) -> f32 {
        self.config.scale().resolution(group)
    }

    pub fn update_gyroscope(&mut self) -> Result<(), Error<E>> {
        self.mpu9250.update_gyroscope()
    }

    pub fn update_accelerometer(&mut self) -> Result<(), Error<E>> {
        self.mpu9250.update_accelerometer()
    }

    pub fn update_magnetometer(&mut self) -> Result<Freshness, Error<E>> {
        self.ak8963.update()
    }

    pub fn read_gyro(&self) -> Vector3<f32> {
        self.mpu9250.gyroscope()
    }

    pub fn read_accel(&self) -> Vector3<f32> {
        self.mpu9250.acceleration()
    }

    pub fn read_mag(&self) -> Vector3<f32> {
        self.ak8963.magnetism()
    }

    pub fn mpu9250(&mut self) -> &mut MPU9250<A> {
        &mut self.mpu9250
    }

    pub fn ak8963(&mut self) -> &mut AK8963<M> {
        &mut self.ak8963
    }

    pub fn free(self) -> (A, M) {
        (self.mpu9250.free(), self.ak8963.free())
    }
}

impl<E, A, M> Gyroscope for NineDOF<A, M>
where
    E: Debug,
    A: RegAccess<Error = E>,
    M: RegAccess<Error = E>,
{
    type Error = Error<E>;

    fn update_gyroscope(&mut self) -> Result<(), Error<E>> {
        self.mpu9250.update_gyroscope()
    }

    fn raw_gyroscope(&self) -> Axes {
        self.mpu9250.raw_gyroscope()
    }

    fn gyroscope_resolution(&self) -> f32 {
        self.resolution(AxisGroup::Gyroscope)
    }

    fn update_auxiliary(&mut self) -> Result<(), Error<E>> {
        self.mpu9250.update_accelerometer()?;
        self.ak8963.update().map(|_| ())
    }
}

mod test {
    #[cfg(test)]
    use crate::drivers::fake::FakeBus;

    #[cfg(test)]
    fn buses() -> (FakeBus, FakeBus) {
        use crate::drivers::{ak8963, mpu9250};

        let who_am_i = mpu9250::registers::WHO_AM_I;
        let mpu = FakeBus::new().with(mpu9250::Register::WhoAmI.addr(), &[who_am_i]);
        let mag = FakeBus::new()
            .with(ak8963::Register::WhoAmI.addr(), &[ak8963::registers::WHO_AM_I])
            .with(ak8963::Register::SensitivityX.addr(), &[128, 128, 128]);
        (mpu, mag)
    }

    #[test]
    fn test_init_with_calibration() {
        use super::NineDOF;
        use crate::config::Config;
        use crate::drivers::fake::NoDelay;
        use crate::drivers::mpu9250::Register;
        use crate::scale::AxisGroup;
        use crate::types::sensor::Axes;

        let (mut mpu, mag) = buses();
        mpu.set(Register::GyroXHigh.addr(), &[0x00, 0x64, 0xff, 0xce, 0x00, 0x14]);
        let mut config = Config::default();
        config.gyroscope.calibration = 5;
        let mut nine_dof = NineDOF::new(mpu, mag, &config);
        assert_eq!(nine_dof.init(&mut NoDelay).unwrap(), true);
        assert_eq!(nine_dof.mpu9250().bias(AxisGroup::Gyroscope), Axes::new(100, -50, 20));
        assert_eq!(nine_dof.mpu9250().bias(AxisGroup::Accelerometer), Axes::default());
    }

    #[test]
    fn test_magnetometer_missing() {
        use super::NineDOF;
        use crate::config::Config;
        use crate::drivers::fake::{FakeBus, NoDelay};

        let (mpu, _) = buses();
        let mut nine_dof = NineDOF::new(mpu, FakeBus::new(), &Config::default());
        assert_eq!(nine_dof.init(&mut NoDelay).unwrap(), false);
        let (mpu, _) = nine_dof.free();
        assert!(mpu.reads < 100);
    }

    #[test]
    fn test_invalid_sample_rate() {
        use super::NineDOF;
        use crate::config::Config;
        use crate::drivers::fake::NoDelay;
        use crate::error::{Error, InvalidConfiguration};

        let (mpu, mag) = buses();
        let mut config = Config::default();
        config.integration.sample_rate = 9000;
        let mut nine_dof = NineDOF::new(mpu, mag, &config);
        let expected = Error::InvalidConfiguration(InvalidConfiguration::SampleRate(9000));
        assert_eq!(nine_dof.init(&mut NoDelay), Err(expected));
    }

    #[test]
    fn test_resolution() {
        use super::NineDOF;
        use crate::config::Config;
        use crate::imu::Gyroscope;
        use crate::scale::{AccelScale, AxisGroup, GyroScale, MagScale};

        let (mpu, mag) = buses();
        let mut config = Config::default();
        config.gyroscope.range = GyroScale::DPS2000;
        config.accelerometer.range = AccelScale::G2;
        config.magnetometer.resolution = MagScale::Bits14;
        let nine_dof = NineDOF::new(mpu, mag, &config);
        assert_eq!(nine_dof.resolution(AxisGroup::Gyroscope), 4000.0 / 65536.0);
        assert_eq!(nine_dof.resolution(AxisGroup::Accelerometer), 4.0 / 65536.0);
        assert_eq!(nine_dof.resolution(AxisGroup::Magnetometer), MagScale::Bits14.resolution());
        assert_eq!(nine_dof.gyroscope_resolution(), GyroScale::DPS2000.resolution());
    }

    #[test]
    fn test_read_last_value() {
        use hex_literal::hex;
        use nalgebra::Vector3;

        use super::NineDOF;
        use crate::config::Config;
        use crate::drivers::ak8963::{self, Freshness};
        use crate::drivers::mpu9250::Register;
        use crate::imu::Gyroscope;

        let (mut mpu, mut mag) = buses();
        mpu.set(Register::GyroXHigh.addr(), &hex!("0100 0000 0000"));
        mpu.set(Register::AccelerometerXHigh.addr(), &hex!("0000 2000 0000"));
        mag.set(ak8963::Register::Status1.addr(), &[0x01]);
        mag.set(ak8963::Register::XLow.addr(), &hex!("0000 0000 e803 00"));
        let mut nine_dof = NineDOF::new(mpu, mag, &Config::default());

        nine_dof.update_gyroscope().unwrap();
        assert_eq!(nine_dof.read_accel(), Vector3::zeros());
        assert_eq!(nine_dof.read_mag(), Vector3::zeros());
        assert!((nine_dof.read_gyro().x - 1.953125).abs() < 1e-6);

        nine_dof.update_auxiliary().unwrap();
        assert_eq!(nine_dof.read_accel(), Vector3::new(0.0, 1.0, 0.0));
        assert!((nine_dof.read_mag().z - 1000.0 * 4912.0 * 10.0 / 32760.0).abs() < 1e-2);
        assert_eq!(nine_dof.update_magnetometer().unwrap(), Freshness::Updated);
    }
}
