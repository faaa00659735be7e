use super::attribute::AttributeBinding;
use super::uniform::{UniformFunction, UniformType, UniformValue};
use crate::gpu::api::{DrawMode, GraphicsApi, IndexType};
use std::rc::Rc;

/// Proof that a program has been made current.
///
/// Every operation that depends on the current program (uniform uploads,
/// sampler binds, attribute setup, draw calls) is a method here, so callers
/// cannot issue one without activating first.
#[must_use]
pub struct Activation<A: GraphicsApi> {
    api: Rc<A>,
    program: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SamplerBinding {
    pub target: u32,
    pub texture: u32,
    pub unit: u32,
}

impl<A: GraphicsApi> Activation<A> {
    pub(crate) fn new(api: Rc<A>, program: u32) -> Self {
        api.use_program(program);
        Self { api, program }
    }

    pub fn program(&self) -> u32 {
        self.program
    }

    /// Sends `value` through the upload function for `ty`. The value must
    /// already have passed `check_value`.
    pub(crate) fn upload_uniform(&self, location: i32, ty: UniformType, value: UniformValue<'_>) {
        match (ty.function(), value) {
            (UniformFunction::Float(n), UniformValue::Float(data)) => {
                self.api.uniform_fv(location, n, data)
            }
            (UniformFunction::Matrix(dim), UniformValue::Float(data)) => {
                self.api.uniform_matrix_fv(location, dim, data)
            }
            (UniformFunction::Int(n), UniformValue::Int(data)) => {
                self.api.uniform_iv(location, n, data)
            }
            (UniformFunction::Int(n), UniformValue::Float(data)) => {
                let ints: Vec<i32> = data.iter().map(|v| *v as i32).collect();
                self.api.uniform_iv(location, n, &ints)
            }
            (UniformFunction::Sampler, UniformValue::Int(data)) => {
                self.api.uniform_1i(location, data[0])
            }
            (UniformFunction::Sampler, UniformValue::Float(data)) => {
                self.api.uniform_1i(location, data[0] as i32)
            }
            (UniformFunction::Float(_) | UniformFunction::Matrix(_), UniformValue::Int(_)) => {
                log::error!("Integer data reached a float uniform upload at {}", location)
            }
        }
    }

    pub(crate) fn set_sampler_unit(&self, location: i32, unit: u32) {
        self.api.uniform_1i(location, unit as i32);
    }

    pub(crate) fn bind_sampler(&self, binding: &SamplerBinding) {
        self.api.active_texture(binding.unit);
        self.api.bind_texture(binding.target, binding.texture);
    }

    pub(crate) fn apply_attribute(&self, binding: &AttributeBinding) {
        match binding {
            AttributeBinding::Buffer {
                location,
                buffer,
                size,
                data_type,
                stride,
                offset,
            } => {
                self.api.bind_buffer(gl::ARRAY_BUFFER, *buffer);
                self.api.enable_vertex_attrib_array(*location);
                self.api
                    .vertex_attrib_pointer(*location, *size, *data_type, false, *stride, *offset);
            }
            AttributeBinding::Constant { location, values } => {
                self.api.bind_buffer(gl::ARRAY_BUFFER, 0);
                self.api.disable_vertex_attrib_array(*location);
                self.api.vertex_attrib_fv(*location, values);
            }
        }
    }

    pub(crate) fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32) {
        self.api.draw_arrays(mode.to_gl(), first, count);
    }

    pub(crate) fn draw_elements(
        &self,
        mode: DrawMode,
        index_buffer: u32,
        index_type: IndexType,
        count: i32,
    ) {
        self.api.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, index_buffer);
        self.api
            .draw_elements(mode.to_gl(), count, index_type.to_gl(), 0);
        self.api.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, 0);
    }
}
