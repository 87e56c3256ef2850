use alloc::sync::Arc;

use nalgebra::Vector3;
use serde::ser::SerializeStruct;

use crate::sync::ReadSpinLock;
use crate::types::Euler;

/// Snapshot published after every integration tick
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Attitude {
    /// Accumulated angles in radians
    pub euler: Euler,
    /// Bias corrected angular rate of the last tick in degree per second
    pub gyro: Vector3<f32>,
    pub ticks: u32,
}

impl Default for Attitude {
    fn default() -> Self {
        Self { euler: Euler::default(), gyro: Vector3::zeros(), ticks: 0 }
    }
}

impl serde::Serialize for Attitude {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut struct_ = serializer.serialize_struct("Attitude", 3)?;
        struct_.serialize_field("euler", &self.euler)?;
        let gyro: [f32; 3] = self.gyro.into();
        struct_.serialize_field("gyro", &gyro[..])?;
        struct_.serialize_field("ticks", &self.ticks)?;
        struct_.end()
    }
}

/// Cheap cloneable view of the latest attitude, never observes a half written snapshot
#[derive(Clone)]
pub struct AttitudeReader(pub(crate) Arc<ReadSpinLock<Attitude>>);

impl AttitudeReader {
    pub fn read(&self) -> Attitude {
        self.0.read()
    }

    pub fn yaw(&self) -> f32 {
        self.read().euler.yaw
    }

    pub fn roll(&self) -> f32 {
        self.read().euler.roll
    }

    pub fn pitch(&self) -> f32 {
        self.read().euler.pitch
    }
}

mod test {
    #[test]
    fn test_serialize() {
        use nalgebra::Vector3;
        use serde_json::json;

        use super::Attitude;
        use crate::types::Euler;

        let expected = json!({
            "euler": {"roll": 0.5, "pitch": 0.0, "yaw": -1.0},
            "gyro": [1.0, 2.0, 3.0],
            "ticks": 7
        });
        let attitude = Attitude {
            euler: Euler::new(0.5, 0.0, -1.0),
            gyro: Vector3::new(1.0, 2.0, 3.0),
            ticks: 7,
        };
        assert_eq!(expected, serde_json::to_value(&attitude).unwrap());
    }
}
