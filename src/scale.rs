//! Full-scale range settings and the physical resolution of one raw count.

use core::convert::TryFrom;

use crate::error::InvalidConfiguration;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AxisGroup {
    Gyroscope,
    Accelerometer,
    Magnetometer,
}

/// Gyroscope range in degree per second
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum GyroScale {
    DPS250,
    DPS500,
    DPS1000,
    DPS2000,
}

impl GyroScale {
    pub const fn full_scale(self) -> u16 {
        match self {
            Self::DPS250 => 250,
            Self::DPS500 => 500,
            Self::DPS1000 => 1000,
            Self::DPS2000 => 2000,
        }
    }

    /// Degree per second per count
    pub fn resolution(self) -> f32 {
        (self.full_scale() as f64 * 2.0 / 65536.0) as f32
    }

    /// GYRO_CONFIG FS_SEL bits
    pub const fn bits(self) -> u8 {
        match self {
            Self::DPS250 => 0x00,
            Self::DPS500 => 0x08,
            Self::DPS1000 => 0x10,
            Self::DPS2000 => 0x18,
        }
    }
}

impl Default for GyroScale {
    fn default() -> Self {
        Self::DPS250
    }
}

impl TryFrom<u16> for GyroScale {
    type Error = InvalidConfiguration;

    fn try_from(dps: u16) -> Result<Self, InvalidConfiguration> {
        match dps {
            250 => Ok(Self::DPS250),
            500 => Ok(Self::DPS500),
            1000 => Ok(Self::DPS1000),
            2000 => Ok(Self::DPS2000),
            _ => Err(InvalidConfiguration::GyroRange(dps)),
        }
    }
}

impl From<GyroScale> for u16 {
    fn from(scale: GyroScale) -> u16 {
        scale.full_scale()
    }
}

/// Accelerometer range in g
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum AccelScale {
    G2,
    G4,
    G8,
    G16,
}

impl AccelScale {
    pub const fn full_scale(self) -> u16 {
        match self {
            Self::G2 => 2,
            Self::G4 => 4,
            Self::G8 => 8,
            Self::G16 => 16,
        }
    }

    /// g per count
    pub fn resolution(self) -> f32 {
        (self.full_scale() as f64 / 32768.0) as f32
    }

    /// ACCEL_CONFIG ACCEL_FS_SEL bits
    pub const fn bits(self) -> u8 {
        match self {
            Self::G2 => 0x00,
            Self::G4 => 0x08,
            Self::G8 => 0x10,
            Self::G16 => 0x18,
        }
    }
}

impl Default for AccelScale {
    fn default() -> Self {
        Self::G4
    }
}

impl TryFrom<u16> for AccelScale {
    type Error = InvalidConfiguration;

    fn try_from(g: u16) -> Result<Self, InvalidConfiguration> {
        match g {
            2 => Ok(Self::G2),
            4 => Ok(Self::G4),
            8 => Ok(Self::G8),
            16 => Ok(Self::G16),
            _ => Err(InvalidConfiguration::AccelRange(g)),
        }
    }
}

impl From<AccelScale> for u16 {
    fn from(scale: AccelScale) -> u16 {
        scale.full_scale()
    }
}

/// Magnetometer output width
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MagScale {
    Bits14,
    Bits16,
}

impl MagScale {
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits14 => 14,
            Self::Bits16 => 16,
        }
    }

    /// Milligauss per count
    pub fn resolution(self) -> f32 {
        match self {
            Self::Bits14 => (10.0 * 4912.0 / 8190.0) as f32,
            Self::Bits16 => (10.0 * 4912.0 / 32760.0) as f32,
        }
    }

    /// CNTL1 BIT field, placed at bit 4
    pub const fn control_bit(self) -> u8 {
        match self {
            Self::Bits14 => 0,
            Self::Bits16 => 1,
        }
    }
}

impl Default for MagScale {
    fn default() -> Self {
        Self::Bits16
    }
}

impl TryFrom<u8> for MagScale {
    type Error = InvalidConfiguration;

    fn try_from(bits: u8) -> Result<Self, InvalidConfiguration> {
        match bits {
            14 => Ok(Self::Bits14),
            16 => Ok(Self::Bits16),
            _ => Err(InvalidConfiguration::MagResolution(bits)),
        }
    }
}

impl From<MagScale> for u8 {
    fn from(scale: MagScale) -> u8 {
        scale.bits()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Scale {
    pub gyroscope: GyroScale,
    pub accelerometer: AccelScale,
    pub magnetometer: MagScale,
}

impl Scale {
    pub fn resolution(&self, group: AxisGroup) -> f32 {
        match group {
            AxisGroup::Gyroscope => self.gyroscope.resolution(),
            AxisGroup::Accelerometer => self.accelerometer.resolution(),
            AxisGroup::Magnetometer => self.magnetometer.resolution(),
        }
    }
}

mod test {
    #[test]
    fn test_resolution() {
        use super::{AccelScale, GyroScale, MagScale};

        assert!((GyroScale::DPS250.resolution() - 0.007629).abs() < 1e-6);
        assert!((GyroScale::DPS2000.resolution() - 0.061035).abs() < 1e-6);
        assert!((AccelScale::G4.resolution() - 0.0001221).abs() < 1e-7);
        assert!((AccelScale::G16.resolution() - 0.00048828).abs() < 1e-7);
        assert!((MagScale::Bits16.resolution() - 1.4993).abs() < 1e-4);
        assert!((MagScale::Bits14.resolution() - 5.9976).abs() < 1e-4);
    }

    #[test]
    fn test_default_scale() {
        use super::{AccelScale, AxisGroup, GyroScale, MagScale, Scale};

        let scale = Scale::default();
        assert_eq!(scale.gyroscope, GyroScale::DPS250);
        assert_eq!(scale.accelerometer, AccelScale::G4);
        assert_eq!(scale.magnetometer, MagScale::Bits16);
        assert_eq!(scale.resolution(AxisGroup::Gyroscope), GyroScale::DPS250.resolution());
    }

    #[test]
    fn test_invalid_range() {
        use core::convert::TryFrom;

        use super::{AccelScale, GyroScale, MagScale};
        use crate::error::InvalidConfiguration;

        assert_eq!(GyroScale::try_from(1000), Ok(GyroScale::DPS1000));
        assert_eq!(GyroScale::try_from(300), Err(InvalidConfiguration::GyroRange(300)));
        assert_eq!(AccelScale::try_from(3), Err(InvalidConfiguration::AccelRange(3)));
        assert_eq!(MagScale::try_from(12), Err(InvalidConfiguration::MagResolution(12)));
    }

    #[test]
    fn test_register_bits() {
        use super::{AccelScale, GyroScale, MagScale};

        assert_eq!(GyroScale::DPS2000.bits(), 0x18);
        assert_eq!(AccelScale::G4.bits(), 0x08);
        assert_eq!(MagScale::Bits16.control_bit() << 4, 0x10);
    }
}
