pub mod registers;

use core::convert::TryFrom;
use core::fmt::Debug;

use embedded_hal::blocking::delay::DelayMs;
use hal::bus::RegAccess;
use nalgebra::Vector3;

use crate::config::Config;
use crate::error::{Error, InvalidConfiguration};
use crate::scale::MagScale;
use crate::types::sensor::{Axes, Sensitivity};

pub use registers::Register;

const POWER_DOWN: u8 = 0x00;
const FUSE_ROM_ACCESS: u8 = 0x0F;
const DATA_READY: u8 = 0x01;
const MAGNETIC_OVERFLOW: u8 = 0x08;
const SETTLE_MS: u8 = 10;

/// Continuous measurement rate, CNTL1 MODE bits
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Mode {
    Continuous8Hz = 0x02,
    Continuous100Hz = 0x06,
}

impl Mode {
    pub const fn hz(self) -> u8 {
        match self {
            Self::Continuous8Hz => 8,
            Self::Continuous100Hz => 100,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::Continuous100Hz
    }
}

impl TryFrom<u8> for Mode {
    type Error = InvalidConfiguration;

    fn try_from(hz: u8) -> Result<Self, InvalidConfiguration> {
        match hz {
            8 => Ok(Self::Continuous8Hz),
            100 => Ok(Self::Continuous100Hz),
            _ => Err(InvalidConfiguration::MagMode(hz)),
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> u8 {
        mode.hz()
    }
}

/// Outcome of a magnetometer update that did not fail on the bus
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Freshness {
    Updated,
    /// No new measurement since the last read
    Stale,
    /// Field out of range, the measurement was dropped
    Overflow,
}

pub struct AK8963<BUS> {
    bus: BUS,
    scale: MagScale,
    mode: Mode,
    sensitivity: Sensitivity,
    bias: Vector3<f32>,
    raw: Axes,
    magnetism: Vector3<f32>,
}

impl<E: Debug, BUS: RegAccess<Error = E>> AK8963<BUS> {
    pub fn new(bus: BUS, config: &Config) -> Self {
        Self {
            bus,
            scale: config.magnetometer.resolution,
            mode: config.magnetometer.mode,
            sensitivity: Sensitivity::default(),
            bias: Vector3::from(config.magnetometer.bias),
            raw: Axes::default(),
            magnetism: Vector3::zeros(),
        }
    }

    fn write<D: DelayMs<u8>>(&mut self, value: u8, delay: &mut D) -> Result<(), Error<E>> {
        self.bus.write_register(Register::Control1.addr(), value).map_err(Error::Bus)?;
        delay.delay_ms(SETTLE_MS);
        Ok(())
    }

    pub fn verify(&mut self) -> Result<bool, Error<E>> {
        let who_am_i = self.bus.read_register(Register::WhoAmI.addr()).map_err(Error::Bus)?;
        Ok(who_am_i == registers::WHO_AM_I)
    }

    /// Reads the fuse ROM sensitivity and starts continuous measurement.
    /// Returns false if no AK8963 answers on the bus.
    pub fn init<D: DelayMs<u8>>(&mut self, delay: &mut D) -> Result<bool, Error<E>> {
        if !self.verify()? {
            return Ok(false);
        }
        info!("AK8963 detected");

        self.write(POWER_DOWN, delay)?;
        self.write(FUSE_ROM_ACCESS, delay)?;
        let mut asa = [0u8; 3];
        let address = Register::SensitivityX.addr();
        self.bus.read_registers(address, &mut asa).map_err(Error::Bus)?;
        self.sensitivity = Sensitivity::from_fuse(asa);
        self.write(POWER_DOWN, delay)?;
        self.write(self.scale.control_bit() << 4 | self.mode as u8, delay)?;

        let (bits, hz) = (self.scale.bits(), self.mode.hz());
        info!("AK8963 initialized with {}bit output at {}Hz, {:?}", bits, hz, self.sensitivity);
        Ok(true)
    }

    /// Takes the pending measurement if any.
    ///
    /// Stale and overflowed measurements keep the previous value.
    pub fn update(&mut self) -> Result<Freshness, Error<E>> {
        let status = self.bus.read_register(Register::Status1.addr()).map_err(Error::Bus)?;
        if status & DATA_READY == 0 {
            return Ok(Freshness::Stale);
        }
        // Data registers followed by ST2, reading ST2 releases the data registers
        let mut bytes = [0u8; 7];
        self.bus.read_registers(Register::XLow.addr(), &mut bytes).map_err(Error::Bus)?;
        if bytes[6] & MAGNETIC_OVERFLOW > 0 {
            debug!("AK8963 magnetic overflow");
            return Ok(Freshness::Overflow);
        }
        let mut data = [0u8; 6];
        data.copy_from_slice(&bytes[..6]);
        self.raw = Axes::from_le_bytes(&data);
        let sensitivity: Vector3<f32> = self.sensitivity.into();
        let magnetism = self.raw.scale(self.scale.resolution()).component_mul(&sensitivity);
        self.magnetism = magnetism - self.bias;
        Ok(Freshness::Updated)
    }

    /// Milligauss of the last accepted measurement
    pub fn magnetism(&self) -> Vector3<f32> {
        self.magnetism
    }

    pub fn raw(&self) -> Axes {
        self.raw
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn bias(&self) -> Vector3<f32> {
        self.bias
    }

    pub fn set_bias(&mut self, bias: Vector3<f32>) {
        self.bias = bias;
    }

    pub fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }

    pub fn free(self) -> BUS {
        self.bus
    }
}

mod test {
    #[cfg(test)]
    fn ak8963(config: &crate::config::Config) -> super::AK8963<crate::drivers::fake::FakeBus> {
        use super::{registers::WHO_AM_I, Register, AK8963};
        use crate::drivers::fake::{FakeBus, NoDelay};

        let bus = FakeBus::new()
            .with(Register::WhoAmI.addr(), &[WHO_AM_I])
            .with(Register::SensitivityX.addr(), &[128, 192, 64]);
        let mut ak8963 = AK8963::new(bus, config);
        assert_eq!(ak8963.init(&mut NoDelay).unwrap(), true);
        ak8963
    }

    #[test]
    fn test_init() {
        use super::Register;
        use crate::config::Config;
        use crate::drivers::ak8963::Mode;
        use crate::scale::MagScale;
        use crate::types::sensor::Sensitivity;

        let mut config = Config::default();
        config.magnetometer.resolution = MagScale::Bits14;
        config.magnetometer.mode = Mode::Continuous8Hz;
        let ak8963 = ak8963(&config);
        assert_eq!(ak8963.sensitivity(), Sensitivity { x: 1.0, y: 1.25, z: 0.75 });

        let bus = ak8963.free();
        let control: Vec<u8> = bus
            .writes
            .iter()
            .filter(|(address, _)| *address == Register::Control1.addr())
            .map(|(_, bytes)| bytes[0])
            .collect();
        assert_eq!(control, vec![0x00, 0x0F, 0x00, 0x02]);

        let ak8963 = self::ak8963(&Config::default());
        assert_eq!(ak8963.free().registers[Register::Control1.addr() as usize], 0x16);
    }

    #[test]
    fn test_update() {
        use hex_literal::hex;
        use nalgebra::Vector3;

        use super::{Freshness, Register};
        use crate::config::Config;
        use crate::types::sensor::Axes;

        let mut config = Config::default();
        config.magnetometer.bias = [1.0, 0.0, -1.0];
        let mut ak8963 = ak8963(&config);
        ak8963.bus_mut().set(Register::Status1.addr(), &[0x01]);
        ak8963.bus_mut().set(Register::XLow.addr(), &hex!("6400 64ff 0000 10"));
        assert_eq!(ak8963.update().unwrap(), Freshness::Updated);
        assert_eq!(ak8963.raw(), Axes::new(100, -156, 0));

        let resolution = 10.0 * 4912.0 / 32760.0;
        let expected = Vector3::new(100.0 * resolution - 1.0, -156.0 * resolution * 1.25, 1.0);
        assert!((ak8963.magnetism() - expected).norm() < 1e-3);
    }

    #[test]
    fn test_stale_and_overflow() {
        use hex_literal::hex;

        use super::{Freshness, Register};
        use crate::config::Config;

        let mut ak8963 = ak8963(&Config::default());
        ak8963.bus_mut().set(Register::Status1.addr(), &[0x01]);
        ak8963.bus_mut().set(Register::XLow.addr(), &hex!("1000 2000 3000 00"));
        assert_eq!(ak8963.update().unwrap(), Freshness::Updated);
        let previous = ak8963.magnetism();

        ak8963.bus_mut().set(Register::XLow.addr(), &hex!("ffff ffff ffff 08"));
        assert_eq!(ak8963.update().unwrap(), Freshness::Overflow);
        assert_eq!(ak8963.magnetism(), previous);

        ak8963.bus_mut().set(Register::Status1.addr(), &[0x00]);
        let reads = ak8963.bus_mut().reads;
        assert_eq!(ak8963.update().unwrap(), Freshness::Stale);
        assert_eq!(ak8963.magnetism(), previous);
        assert_eq!(ak8963.bus_mut().reads, reads + 1);
    }

    #[test]
    fn test_bus_error() {
        use super::Register;
        use crate::config::Config;
        use crate::drivers::fake::BusFault;
        use crate::error::Error;

        let mut ak8963 = ak8963(&Config::default());
        ak8963.bus_mut().set(Register::Status1.addr(), &[0x01]);
        ak8963.bus_mut().fail = true;
        assert_eq!(ak8963.update(), Err(Error::Bus(BusFault)));
        assert_eq!(ak8963.raw(), Default::default());
    }

    #[test]
    fn test_mode() {
        use core::convert::TryFrom;

        use super::Mode;
        use crate::error::InvalidConfiguration;

        assert_eq!(Mode::try_from(8), Ok(Mode::Continuous8Hz));
        assert_eq!(Mode::try_from(100), Ok(Mode::Continuous100Hz));
        assert_eq!(Mode::try_from(50), Err(InvalidConfiguration::MagMode(50)));
        assert_eq!(Mode::Continuous100Hz as u8, 0x06);
    }
}
