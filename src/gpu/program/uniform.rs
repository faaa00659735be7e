use serde::{Deserialize, Serialize};

/// GLSL uniform types, spelled as in shader source when (de)serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Bool,
    BVec2,
    BVec3,
    BVec4,
    Mat2,
    Mat3,
    Mat4,
    #[serde(rename = "sampler1D")]
    Sampler1D,
    #[serde(rename = "sampler2D")]
    Sampler2D,
    #[serde(rename = "sampler3D")]
    Sampler3D,
}

/// The upload entry point a uniform type is sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformFunction {
    /// `glUniform{n}fv`
    Float(usize),
    /// `glUniform{n}iv`
    Int(usize),
    /// `glUniformMatrix{n}fv`
    Matrix(usize),
    /// `glUniform1i` with a texture unit index
    Sampler,
}

impl UniformType {
    pub fn function(self) -> UniformFunction {
        use UniformFunction::*;
        match self {
            Self::Float => Float(1),
            Self::Vec2 => Float(2),
            Self::Vec3 => Float(3),
            Self::Vec4 => Float(4),
            Self::Int | Self::Bool => Int(1),
            Self::IVec2 | Self::BVec2 => Int(2),
            Self::IVec3 | Self::BVec3 => Int(3),
            Self::IVec4 | Self::BVec4 => Int(4),
            Self::Mat2 => Matrix(2),
            Self::Mat3 => Matrix(3),
            Self::Mat4 => Matrix(4),
            Self::Sampler1D | Self::Sampler2D | Self::Sampler3D => Sampler,
        }
    }

    /// Scalars per element.
    pub fn components(self) -> usize {
        match self.function() {
            UniformFunction::Float(n) | UniformFunction::Int(n) => n,
            UniformFunction::Matrix(dim) => dim * dim,
            UniformFunction::Sampler => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    Float(&'a [f32]),
    Int(&'a [i32]),
}

impl UniformValue<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(data) => data.len(),
            Self::Int(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<&'a [f32]> for UniformValue<'a> {
    fn from(data: &'a [f32]) -> Self {
        Self::Float(data)
    }
}

impl<'a> From<&'a [i32]> for UniformValue<'a> {
    fn from(data: &'a [i32]) -> Self {
        Self::Int(data)
    }
}

impl<'a, const N: usize> From<&'a [f32; N]> for UniformValue<'a> {
    fn from(data: &'a [f32; N]) -> Self {
        Self::Float(data)
    }
}

impl<'a, const N: usize> From<&'a [i32; N]> for UniformValue<'a> {
    fn from(data: &'a [i32; N]) -> Self {
        Self::Int(data)
    }
}

impl<'a> From<&'a Vec<f32>> for UniformValue<'a> {
    fn from(data: &'a Vec<f32>) -> Self {
        Self::Float(data)
    }
}

impl<'a> From<&'a Vec<i32>> for UniformValue<'a> {
    fn from(data: &'a Vec<i32>) -> Self {
        Self::Int(data)
    }
}

/// Checks that `value` can be uploaded as `ty`, returning why not.
pub(crate) fn check_value(ty: UniformType, value: &UniformValue<'_>) -> Result<(), String> {
    if value.is_empty() {
        return Err("value is empty".to_string());
    }
    let components = ty.components();
    if value.len() % components != 0 {
        return Err(format!(
            "{} scalars is not a multiple of {} for {:?}",
            value.len(),
            components,
            ty
        ));
    }
    match (ty.function(), value) {
        (UniformFunction::Float(_) | UniformFunction::Matrix(_), UniformValue::Int(_)) => {
            Err(format!("integer data for float type {:?}", ty))
        }
        _ => Ok(()),
    }
}
