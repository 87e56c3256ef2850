use crate::drivers::ak8963::Mode;
use crate::scale::{AccelScale, GyroScale, MagScale};

/// Where the gyroscope zero point correction is applied
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trim {
    /// Subtracted from every sample by the driver
    Software,
    /// Written to the device offset registers
    Hardware,
}

impl Default for Trim {
    fn default() -> Self {
        Self::Software
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Gyroscope {
    pub range: GyroScale,
    pub trim: Trim,
    /// Calibration rounds run during init, zero to skip
    pub calibration: usize,
}

impl Default for Gyroscope {
    fn default() -> Self {
        Self { range: GyroScale::default(), trim: Trim::default(), calibration: 4 }
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Accelerometer {
    pub range: AccelScale,
    pub calibration: usize,
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Magnetometer {
    pub resolution: MagScale,
    pub mode: Mode,
    /// Hard iron offset in milligauss
    pub bias: [f32; 3],
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Integration {
    /// Ticks per second
    pub sample_rate: u16,
    /// Refresh accelerometer and magnetometer on every tick
    pub fusion: bool,
}

impl Default for Integration {
    fn default() -> Self {
        Self { sample_rate: 1000, fusion: false }
    }
}
