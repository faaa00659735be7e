use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl AttributeType {
    pub fn components(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }

    pub fn gl_type(self) -> u32 {
        gl::FLOAT
    }
}

/// Where an attribute gets its data from.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// One value shared by every vertex.
    Constant(Vec<f32>),
    /// Per-vertex data read from a vertex buffer.
    Buffer {
        buffer: u32,
        stride: i32,
        offset: usize,
    },
}

/// A resolved attribute source, re-applied before every draw.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AttributeBinding {
    Constant {
        location: u32,
        values: Vec<f32>,
    },
    Buffer {
        location: u32,
        buffer: u32,
        size: i32,
        data_type: u32,
        stride: i32,
        offset: usize,
    },
}

impl AttributeBinding {
    pub(crate) fn new(location: u32, ty: AttributeType, value: AttributeValue) -> Self {
        match value {
            AttributeValue::Constant(values) => Self::Constant { location, values },
            AttributeValue::Buffer {
                buffer,
                stride,
                offset,
            } => Self::Buffer {
                location,
                buffer,
                size: ty.components() as i32,
                data_type: ty.gl_type(),
                stride,
                offset,
            },
        }
    }
}
