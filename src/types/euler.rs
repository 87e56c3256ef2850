use core::f32::consts::PI;
use core::ops;

pub const DEGREE_PER_RADIAN: f32 = 180.0 / PI;

/// Attitude in radians, x axis is pitch, y axis is roll and z axis is yaw
#[derive(Default, Copy, Clone, Serialize, Debug, PartialEq)]
pub struct Euler {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Euler {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn degrees(self) -> Self {
        self * DEGREE_PER_RADIAN
    }
}

impl ops::Mul<f32> for Euler {
    type Output = Self;

    fn mul(self, m: f32) -> Euler {
        Euler { roll: self.roll * m, pitch: self.pitch * m, yaw: self.yaw * m }
    }
}

mod test {
    #[test]
    fn test_degrees() {
        use core::f32::consts::PI;

        use super::Euler;

        let degrees = Euler::new(PI / 2.0, -PI / 4.0, PI).degrees();
        assert!((degrees.roll - 90.0).abs() < 1e-4);
        assert!((degrees.pitch + 45.0).abs() < 1e-4);
        assert!((degrees.yaw - 180.0).abs() < 1e-4);
    }
}
