pub mod imu;

use crate::drivers::mpu9250::MAX_SAMPLE_RATE;
use crate::error::InvalidConfiguration;
use crate::scale::Scale;

pub use imu::{Accelerometer, Gyroscope, Integration, Magnetometer, Trim};

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub gyroscope: Gyroscope,
    pub accelerometer: Accelerometer,
    pub magnetometer: Magnetometer,
    pub integration: Integration,
}

impl Config {
    pub fn scale(&self) -> Scale {
        Scale {
            gyroscope: self.gyroscope.range,
            accelerometer: self.accelerometer.range,
            magnetometer: self.magnetometer.resolution,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        self.integration.validate()
    }
}

impl Integration {
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        match self.sample_rate {
            1..=MAX_SAMPLE_RATE => Ok(()),
            rate => Err(InvalidConfiguration::SampleRate(rate)),
        }
    }
}

mod test {
    #[test]
    fn test_default_config() {
        use super::{Config, Trim};
        use crate::scale::{AccelScale, GyroScale, MagScale};

        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.gyroscope.range, GyroScale::DPS250);
        assert_eq!(config.gyroscope.trim, Trim::Software);
        assert_eq!(config.gyroscope.calibration, 4);
        assert_eq!(config.accelerometer.range, AccelScale::G4);
        assert_eq!(config.magnetometer.resolution, MagScale::Bits16);
        assert_eq!(config.integration.sample_rate, 1000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_read_config() {
        use super::{Config, Trim};
        use crate::drivers::ak8963::Mode;
        use crate::scale::{AccelScale, GyroScale, MagScale};

        let json = r#"{
            "gyroscope": { "range": 1000, "trim": "hardware", "calibration": 5 },
            "accelerometer": { "range": 16, "calibration": 1 },
            "magnetometer": { "resolution": 14, "mode": 8, "bias": [12.5, -3.0, 40.0] },
            "integration": { "sample-rate": 8000, "fusion": true }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.gyroscope.range, GyroScale::DPS1000);
        assert_eq!(config.gyroscope.trim, Trim::Hardware);
        assert_eq!(config.gyroscope.calibration, 5);
        assert_eq!(config.accelerometer.range, AccelScale::G16);
        assert_eq!(config.magnetometer.resolution, MagScale::Bits14);
        assert_eq!(config.magnetometer.mode, Mode::Continuous8Hz);
        assert_eq!(config.magnetometer.bias, [12.5, -3.0, 40.0]);
        assert!(config.integration.fusion);
        assert_eq!(config.validate(), Ok(()));

        let serialized = serde_json::to_string(&config).unwrap();
        assert!(serialized.contains("\"sample-rate\":8000"));
        assert!(serialized.contains("\"range\":1000"));
    }

    #[test]
    fn test_invalid_config() {
        use super::Config;
        use crate::error::InvalidConfiguration;

        for json in [
            r#"{ "gyroscope": { "range": 300 } }"#,
            r#"{ "accelerometer": { "range": 3 } }"#,
            r#"{ "magnetometer": { "resolution": 12 } }"#,
            r#"{ "magnetometer": { "mode": 50 } }"#,
        ] {
            assert!(serde_json::from_str::<Config>(json).is_err(), "{}", json);
        }

        let mut config = Config::default();
        config.integration.sample_rate = 0;
        assert_eq!(config.validate(), Err(InvalidConfiguration::SampleRate(0)));
        config.integration.sample_rate = 8001;
        assert_eq!(config.validate(), Err(InvalidConfiguration::SampleRate(8001)));
    }
}
