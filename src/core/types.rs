//! Core value types: 3-D integer vectors, scalar pixel types, connectivity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// Signed coordinate type used throughout the crate.
///
/// Coordinates may be negative: the seed-exchange protocol addresses seed
/// files one plane *below* the image (z = -1) at the lower boundary.
pub type Coord = i64;

/// A 3-D integer vector, used for coordinates, sizes and margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: Coord,
    /// Y component.
    pub y: Coord,
    /// Z component.
    pub z: Coord,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Vec3 = Vec3 { x: 0, y: 0, z: 0 };

    /// Create a new vector.
    pub const fn new(x: Coord, y: Coord, z: Coord) -> Self {
        Self { x, y, z }
    }

    /// Create a vector with the same value in every component.
    pub const fn splat(v: Coord) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Component-wise minimum.
    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Number of pixels in a volume of this size.
    ///
    /// Negative components count as zero.
    pub fn pixel_count(self) -> usize {
        let w = self.x.max(0) as usize;
        let h = self.y.max(0) as usize;
        let d = self.z.max(0) as usize;
        w * h * d
    }

    /// True if every component is non-negative.
    pub fn is_non_negative(self) -> bool {
        self.x >= 0 && self.y >= 0 && self.z >= 0
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Neighbor-adjacency model used by propagation kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// 6-connected: face neighbors only.
    Nearest,
    /// 26-connected: face, edge and corner neighbors.
    All,
}

const NEAREST_OFFSETS: [Vec3; 6] = [
    Vec3::new(-1, 0, 0),
    Vec3::new(1, 0, 0),
    Vec3::new(0, -1, 0),
    Vec3::new(0, 1, 0),
    Vec3::new(0, 0, -1),
    Vec3::new(0, 0, 1),
];

const ALL_OFFSETS: [Vec3; 26] = [
    Vec3::new(-1, -1, -1),
    Vec3::new(0, -1, -1),
    Vec3::new(1, -1, -1),
    Vec3::new(-1, 0, -1),
    Vec3::new(0, 0, -1),
    Vec3::new(1, 0, -1),
    Vec3::new(-1, 1, -1),
    Vec3::new(0, 1, -1),
    Vec3::new(1, 1, -1),
    Vec3::new(-1, -1, 0),
    Vec3::new(0, -1, 0),
    Vec3::new(1, -1, 0),
    Vec3::new(-1, 0, 0),
    Vec3::new(1, 0, 0),
    Vec3::new(-1, 1, 0),
    Vec3::new(0, 1, 0),
    Vec3::new(1, 1, 0),
    Vec3::new(-1, -1, 1),
    Vec3::new(0, -1, 1),
    Vec3::new(1, -1, 1),
    Vec3::new(-1, 0, 1),
    Vec3::new(0, 0, 1),
    Vec3::new(1, 0, 1),
    Vec3::new(-1, 1, 1),
    Vec3::new(0, 1, 1),
    Vec3::new(1, 1, 1),
];

impl Connectivity {
    /// Neighbor offsets for this adjacency model.
    pub fn offsets(self) -> &'static [Vec3] {
        match self {
            Connectivity::Nearest => &NEAREST_OFFSETS,
            Connectivity::All => &ALL_OFFSETS,
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Nearest => write!(f, "nearest"),
            Connectivity::All => write!(f, "all"),
        }
    }
}

impl FromStr for Connectivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(Connectivity::Nearest),
            "all" => Ok(Connectivity::All),
            other => Err(format!(
                "unknown connectivity '{}', expected 'nearest' or 'all'",
                other
            )),
        }
    }
}

/// Scalar pixel type tag, used by the image source lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit float.
    F32,
}

impl ScalarType {
    /// Bytes per pixel of this scalar type.
    pub fn bytes(self) -> usize {
        match self {
            ScalarType::U8 => 1,
            ScalarType::U16 => 2,
            ScalarType::F32 => 4,
        }
    }

    /// Infer a scalar type from a pixel size in bytes.
    pub fn from_bytes(bytes: usize) -> Option<ScalarType> {
        match bytes {
            1 => Some(ScalarType::U8),
            2 => Some(ScalarType::U16),
            4 => Some(ScalarType::F32),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::U8 => write!(f, "uint8"),
            ScalarType::U16 => write!(f, "uint16"),
            ScalarType::F32 => write!(f, "float32"),
        }
    }
}

/// Pixel scalar contract.
///
/// Operations receive colors and thresholds as `f64` (the argument contract
/// of the orchestration layer) and round them to the concrete pixel type.
pub trait Scalar:
    Copy + PartialEq + PartialOrd + Default + Send + Sync + fmt::Debug + 'static
{
    /// Runtime tag for this scalar type.
    const TYPE: ScalarType;

    /// Bytes per pixel.
    const BYTES: usize;

    /// Round an `f64` argument to this pixel type, clamping integer types.
    fn from_f64(v: f64) -> Self;

    /// Widen this pixel value to `f64`.
    fn to_f64(self) -> f64;

    /// Decode one pixel from little-endian bytes. `bytes.len()` equals `BYTES`.
    fn from_le_bytes(bytes: &[u8]) -> Self;

    /// Append this pixel as little-endian bytes.
    fn write_le(self, out: &mut Vec<u8>);
}

impl Scalar for u8 {
    const TYPE: ScalarType = ScalarType::U8;
    const BYTES: usize = 1;

    fn from_f64(v: f64) -> Self {
        v.round().clamp(0.0, u8::MAX as f64) as u8
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_le_bytes(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Scalar for u16 {
    const TYPE: ScalarType = ScalarType::U16;
    const BYTES: usize = 2;

    fn from_f64(v: f64) -> Self {
        v.round().clamp(0.0, u16::MAX as f64) as u16
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_le_bytes(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Scalar for f32 {
    const TYPE: ScalarType = ScalarType::F32;
    const BYTES: usize = 4;

    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_le_bytes(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_arithmetic() {
        let a = Vec3::new(1, 2, 3);
        let b = Vec3::new(10, 20, 30);
        assert_eq!(a + b, Vec3::new(11, 22, 33));
        assert_eq!(b - a, Vec3::new(9, 18, 27));
        assert_eq!(-a, Vec3::new(-1, -2, -3));
    }

    #[test]
    fn test_pixel_count() {
        assert_eq!(Vec3::new(4, 5, 6).pixel_count(), 120);
        assert_eq!(Vec3::new(4, -1, 6).pixel_count(), 0);
    }

    #[test]
    fn test_connectivity_offsets() {
        assert_eq!(Connectivity::Nearest.offsets().len(), 6);
        assert_eq!(Connectivity::All.offsets().len(), 26);
        assert!(!Connectivity::All.offsets().contains(&Vec3::ZERO));
    }

    #[test]
    fn test_connectivity_parse() {
        assert_eq!("nearest".parse::<Connectivity>().unwrap(), Connectivity::Nearest);
        assert_eq!("all".parse::<Connectivity>().unwrap(), Connectivity::All);
        assert!("diagonal".parse::<Connectivity>().is_err());
    }

    #[test]
    fn test_scalar_rounding() {
        assert_eq!(u8::from_f64(255.7), 255);
        assert_eq!(u8::from_f64(-3.0), 0);
        assert_eq!(u16::from_f64(1.4), 1);
        assert_eq!(f32::from_f64(1.5), 1.5f32);
    }

    #[test]
    fn test_scalar_type_from_bytes() {
        assert_eq!(ScalarType::from_bytes(1), Some(ScalarType::U8));
        assert_eq!(ScalarType::from_bytes(2), Some(ScalarType::U16));
        assert_eq!(ScalarType::from_bytes(4), Some(ScalarType::F32));
        assert_eq!(ScalarType::from_bytes(3), None);
    }
}
