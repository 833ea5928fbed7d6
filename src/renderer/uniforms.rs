// renderer/uniforms.rs
use std::fmt;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// Declared type of a non-sampler uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Int,
    UInt,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl UniformType {
    /// Number of 32-bit components one element of this type occupies.
    pub const fn component_count(self) -> usize {
        match self {
            Self::Int | Self::UInt | Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Mat2 => "mat2",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single uniform element, tagged with its shape.
///
/// Pass storage keeps one of these per declared element, so indexed access
/// stays O(1) without reinterpreting raw bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    UInt(u32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    /// The zero value for `ty`; freshly bound programs start from this.
    pub fn zero(ty: UniformType) -> Self {
        match ty {
            UniformType::Int => Self::Int(0),
            UniformType::UInt => Self::UInt(0),
            UniformType::Float => Self::Float(0.0),
            UniformType::Vec2 => Self::Vec2(Vec2::ZERO),
            UniformType::Vec3 => Self::Vec3(Vec3::ZERO),
            UniformType::Vec4 => Self::Vec4(Vec4::ZERO),
            UniformType::Mat2 => Self::Mat2(Mat2::ZERO),
            UniformType::Mat3 => Self::Mat3(Mat3::ZERO),
            UniformType::Mat4 => Self::Mat4(Mat4::ZERO),
        }
    }

    pub fn uniform_type(&self) -> UniformType {
        match self {
            Self::Int(_) => UniformType::Int,
            Self::UInt(_) => UniformType::UInt,
            Self::Float(_) => UniformType::Float,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::Mat2(_) => UniformType::Mat2,
            Self::Mat3(_) => UniformType::Mat3,
            Self::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Appends the tightly packed little-endian bytes of this value.
    pub fn write_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Int(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::UInt(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Float(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Vec2(v) => out.extend_from_slice(bytemuck::cast_slice(&v.to_array())),
            Self::Vec3(v) => out.extend_from_slice(bytemuck::cast_slice(&v.to_array())),
            Self::Vec4(v) => out.extend_from_slice(bytemuck::cast_slice(&v.to_array())),
            Self::Mat2(m) => out.extend_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
            Self::Mat3(m) => out.extend_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
            Self::Mat4(m) => out.extend_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
        }
    }
}

/// Packs a run of uniform elements into one byte buffer for upload.
pub fn pack_uniforms(values: &[UniformValue]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(
        values
            .iter()
            .map(|v| v.uniform_type().component_count() * 4)
            .sum(),
    );
    for value in values {
        value.write_bytes(&mut bytes);
    }
    bytes
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Mat2> for UniformValue {
    fn from(m: Mat2) -> Self {
        Self::Mat2(m)
    }
}

impl From<Mat3> for UniformValue {
    fn from(m: Mat3) -> Self {
        Self::Mat3(m)
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::Mat4(m)
    }
}
