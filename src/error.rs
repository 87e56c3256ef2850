use core::fmt;

/// A setting the device cannot be configured with.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InvalidConfiguration {
    GyroRange(u16),
    AccelRange(u16),
    MagResolution(u8),
    MagMode(u8),
    SampleRate(u16),
    /// The axis group has no calibration gains
    Calibration,
}

impl fmt::Display for InvalidConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::GyroRange(dps) => write!(f, "unsupported gyroscope range +/-{}dps", dps),
            Self::AccelRange(g) => write!(f, "unsupported accelerometer range +/-{}g", g),
            Self::MagResolution(bits) => {
                write!(f, "unsupported magnetometer resolution {}bit", bits)
            }
            Self::MagMode(hz) => write!(f, "unsupported magnetometer rate {}Hz", hz),
            Self::SampleRate(hz) => write!(f, "sample rate {}Hz out of range 1..=8000", hz),
            Self::Calibration => write!(f, "axis group cannot be calibrated"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Error<E> {
    /// Transport failure on a register transaction
    Bus(E),
    InvalidConfiguration(InvalidConfiguration),
}

impl<E> From<InvalidConfiguration> for Error<E> {
    fn from(e: InvalidConfiguration) -> Self {
        Self::InvalidConfiguration(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus error: {:?}", e),
            Self::InvalidConfiguration(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}

#[cfg(feature = "std")]
impl std::error::Error for InvalidConfiguration {}
