//! The graphics driver surface consumed by the caching layer.
//!
//! Everything that talks to the GPU goes through [`GraphicsApi`]. Methods take
//! `&self` because driver state lives on the driver side, handles are GL names
//! and locations are GL signed integers where anything negative means "not found".

use crate::utils::error::{GlooError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Legacy unsized pixel formats that the core-profile bindings do not export.
pub const ALPHA: u32 = 0x1906;
pub const LUMINANCE: u32 = 0x1909;
pub const LUMINANCE_ALPHA: u32 = 0x190A;

/// Converts a size or index to the `GLint`/`GLsizei` the driver takes.
pub(crate) fn gl_int(what: &'static str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| GlooError::OutOfRange { what, value })
}

/// A uniform or attribute reported by the linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    pub size: i32,
    pub gl_type: u32,
}

impl ActiveVariable {
    pub fn new(name: impl Into<String>, gl_type: u32, size: i32) -> Self {
        Self {
            name: name.into(),
            size,
            gl_type,
        }
    }
}

pub trait GraphicsApi {
    // Programs
    fn create_program(&self) -> u32;
    fn delete_program(&self, program: u32);
    fn use_program(&self, program: u32);
    fn link_program(&self, program: u32);
    fn program_link_status(&self, program: u32) -> bool;
    fn validate_program(&self, program: u32);
    fn program_validate_status(&self, program: u32) -> bool;
    fn program_info_log(&self, program: u32) -> String;

    // Shader stages
    fn create_shader(&self, stage: ShaderStage) -> u32;
    fn shader_source(&self, shader: u32, source: &str);
    fn compile_shader(&self, shader: u32);
    fn shader_compile_status(&self, shader: u32) -> bool;
    fn shader_info_log(&self, shader: u32) -> String;
    fn attach_shader(&self, program: u32, shader: u32);
    fn detach_shader(&self, program: u32, shader: u32);
    fn delete_shader(&self, shader: u32);

    // Introspection
    fn active_attribute_count(&self, program: u32) -> u32;
    fn active_attribute(&self, program: u32, index: u32) -> ActiveVariable;
    fn active_uniform_count(&self, program: u32) -> u32;
    fn active_uniform(&self, program: u32, index: u32) -> ActiveVariable;
    fn uniform_location(&self, program: u32, name: &str) -> i32;
    fn attrib_location(&self, program: u32, name: &str) -> i32;

    // Uniform upload. `components` is 1..=4, `dim` is 2..=4.
    fn uniform_fv(&self, location: i32, components: usize, data: &[f32]);
    fn uniform_iv(&self, location: i32, components: usize, data: &[i32]);
    fn uniform_matrix_fv(&self, location: i32, dim: usize, data: &[f32]);
    fn uniform_1i(&self, location: i32, value: i32);

    // Vertex attributes
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: usize,
    );
    fn vertex_attrib_fv(&self, index: u32, values: &[f32]);

    // Drawing
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: usize);
    fn get_error(&self) -> u32;

    // Buffers
    fn create_buffer(&self) -> u32;
    fn delete_buffer(&self, buffer: u32);
    fn bind_buffer(&self, target: u32, buffer: u32);
    fn buffer_data_size(&self, target: u32, size: usize, usage: u32);
    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]);

    // Textures
    fn create_texture(&self) -> u32;
    fn delete_texture(&self, texture: u32);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: u32, texture: u32);
    fn tex_parameter_i(&self, target: u32, pname: u32, value: i32);
    fn tex_image_2d(&self, target: u32, format: u32, width: i32, height: i32);
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_2d(
        &self,
        target: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        data_type: u32,
        data: &[u8],
    );
    fn pixel_store_i(&self, pname: u32, value: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Vertex => gl::VERTEX_SHADER,
            Self::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawMode {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Points => gl::POINTS,
            Self::Lines => gl::LINES,
            Self::LineLoop => gl::LINE_LOOP,
            Self::LineStrip => gl::LINE_STRIP,
            Self::Triangles => gl::TRIANGLES,
            Self::TriangleStrip => gl::TRIANGLE_STRIP,
            Self::TriangleFan => gl::TRIANGLE_FAN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
}

impl IndexType {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::UnsignedByte => gl::UNSIGNED_BYTE,
            Self::UnsignedShort => gl::UNSIGNED_SHORT,
            Self::UnsignedInt => gl::UNSIGNED_INT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Array => gl::ARRAY_BUFFER,
            Self::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferUsage {
    StaticDraw,
    #[default]
    DynamicDraw,
    StreamDraw,
}

impl BufferUsage {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::StaticDraw => gl::STATIC_DRAW,
            Self::DynamicDraw => gl::DYNAMIC_DRAW,
            Self::StreamDraw => gl::STREAM_DRAW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    Luminance,
    Alpha,
    LuminanceAlpha,
    Rgb,
    Rgba,
}

impl TextureFormat {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Luminance => LUMINANCE,
            Self::Alpha => ALPHA,
            Self::LuminanceAlpha => LUMINANCE_ALPHA,
            Self::Rgb => gl::RGB,
            Self::Rgba => gl::RGBA,
        }
    }

    /// Channels per texel.
    pub fn components(self) -> usize {
        match self {
            Self::Luminance | Self::Alpha => 1,
            Self::LuminanceAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Nearest => gl::NEAREST,
            Self::Linear => gl::LINEAR,
            Self::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
            Self::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
            Self::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
            Self::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

impl TextureWrap {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Repeat => gl::REPEAT,
            Self::ClampToEdge => gl::CLAMP_TO_EDGE,
            Self::MirroredRepeat => gl::MIRRORED_REPEAT,
        }
    }
}
