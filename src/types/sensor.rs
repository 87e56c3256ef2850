use core::ops;

use nalgebra::Vector3;

/// Raw signed counts of a three axis sensor
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Axes {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Zero point correction in raw counts
pub type Bias = Axes;

/// Two bytes, high byte first, as a sign extended count
#[inline]
pub fn sign_extend(high: u8, low: u8) -> i32 {
    let value = (high as i32) << 8 | low as i32;
    if value >= 32768 {
        value - 65536
    } else {
        value
    }
}

impl Axes {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn from_be_bytes(bytes: &[u8; 6]) -> Self {
        Self {
            x: sign_extend(bytes[0], bytes[1]),
            y: sign_extend(bytes[2], bytes[3]),
            z: sign_extend(bytes[4], bytes[5]),
        }
    }

    pub fn from_le_bytes(bytes: &[u8; 6]) -> Self {
        Self {
            x: sign_extend(bytes[1], bytes[0]),
            y: sign_extend(bytes[3], bytes[2]),
            z: sign_extend(bytes[5], bytes[4]),
        }
    }

    pub fn scale(self, resolution: f32) -> Vector3<f32> {
        Vector3::new(self.x as f32, self.y as f32, self.z as f32) * resolution
    }

    /// Trim register image: each axis negated, divided by 4, high byte first
    pub fn to_trim_bytes(&self) -> [u8; 6] {
        let (x, y, z) = ((-self.x / 4) as i16, (-self.y / 4) as i16, (-self.z / 4) as i16);
        let (x, y, z) = (x.to_be_bytes(), y.to_be_bytes(), z.to_be_bytes());
        [x[0], x[1], y[0], y[1], z[0], z[1]]
    }
}

impl ops::Index<usize> for Axes {
    type Output = i32;

    fn index(&self, index: usize) -> &i32 {
        match index {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl ops::IndexMut<usize> for Axes {
    fn index_mut(&mut self, index: usize) -> &mut i32 {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl ops::Add for Axes {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y, z: self.z + other.z }
    }
}

impl ops::AddAssign for Axes {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl ops::Sub for Axes {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y, z: self.z - other.z }
    }
}

impl From<(i32, i32, i32)> for Axes {
    fn from(t: (i32, i32, i32)) -> Self {
        Self { x: t.0, y: t.1, z: t.2 }
    }
}

/// Per axis factory adjustment of the magnetometer
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Sensitivity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Sensitivity {
    /// From the fuse ROM ASA values, `(asa - 128) / 256 + 1`
    pub fn from_fuse(asa: [u8; 3]) -> Self {
        let adjust = |v: u8| (v as f32 - 128.0) / 256.0 + 1.0;
        Self { x: adjust(asa[0]), y: adjust(asa[1]), z: adjust(asa[2]) }
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0, z: 1.0 }
    }
}

impl Into<Vector3<f32>> for Sensitivity {
    fn into(self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

mod test {
    #[test]
    fn test_sign_extend() {
        use super::sign_extend;

        assert_eq!(sign_extend(0x80, 0x00), -32768);
        assert_eq!(sign_extend(0x7F, 0xFF), 32767);
        assert_eq!(sign_extend(0xFF, 0xFF), -1);
        assert_eq!(sign_extend(0x00, 0x01), 1);
    }

    #[test]
    fn test_axes_from_bytes() {
        use hex_literal::hex;

        use super::Axes;

        let bytes = hex!("8000 7fff fffe");
        assert_eq!(Axes::from_be_bytes(&bytes), Axes::new(-32768, 32767, -2));
        assert_eq!(Axes::from_le_bytes(&bytes), Axes::new(128, -129, -257));
    }

    #[test]
    fn test_trim_bytes() {
        use hex_literal::hex;

        use super::Axes;

        let bias = Axes::new(100, -40, 7);
        assert_eq!(bias.to_trim_bytes(), hex!("ffe7 000a ffff"));
    }

    #[test]
    fn test_sensitivity_from_fuse() {
        use super::Sensitivity;

        let sensitivity = Sensitivity::from_fuse([128, 192, 0]);
        assert_eq!(sensitivity, Sensitivity { x: 1.0, y: 1.25, z: 0.5 });
    }
}
