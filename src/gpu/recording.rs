//! A headless [`GraphicsApi`] that records every call.
//!
//! The linker, validator and error queue are scriptable, so program behaviour
//! can be exercised and inspected without a GL context.

use super::api::{ActiveVariable, GraphicsApi, ShaderStage};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateProgram(u32),
    DeleteProgram(u32),
    UseProgram(u32),
    LinkProgram(u32),
    ValidateProgram(u32),
    CreateShader(ShaderStage, u32),
    ShaderSource(u32),
    CompileShader(u32),
    AttachShader(u32, u32),
    DetachShader(u32, u32),
    DeleteShader(u32),
    UniformLocation(String),
    AttribLocation(String),
    UniformFloat {
        location: i32,
        components: usize,
        data: Vec<f32>,
    },
    UniformInt {
        location: i32,
        components: usize,
        data: Vec<i32>,
    },
    UniformMatrix {
        location: i32,
        dim: usize,
        data: Vec<f32>,
    },
    Uniform1i { location: i32, value: i32 },
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
        data_type: u32,
        stride: i32,
        offset: usize,
    },
    VertexAttrib { index: u32, values: Vec<f32> },
    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawElements {
        mode: u32,
        count: i32,
        index_type: u32,
    },
    GetError,
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer { target: u32, buffer: u32 },
    BufferData {
        target: u32,
        size: usize,
        usage: u32,
    },
    BufferSubData {
        target: u32,
        offset: usize,
        len: usize,
    },
    CreateTexture(u32),
    DeleteTexture(u32),
    ActiveTexture(u32),
    BindTexture { target: u32, texture: u32 },
    TexParameter { target: u32, pname: u32, value: i32 },
    TexImage2D {
        format: u32,
        width: i32,
        height: i32,
    },
    TexSubImage2D {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data_type: u32,
        len: usize,
    },
    PixelStore { pname: u32, value: i32 },
}

#[derive(Default)]
struct RecordingState {
    calls: Vec<Call>,
    next_handle: u32,
    attributes: Vec<ActiveVariable>,
    uniforms: Vec<ActiveVariable>,
    failing_stage: Option<ShaderStage>,
    shader_stages: HashMap<u32, ShaderStage>,
    fail_link: bool,
    fail_validation: bool,
    pending_errors: VecDeque<u32>,
    draw_error: Option<u32>,
    permissive: bool,
    assigned: HashMap<String, i32>,
}

impl RecordingState {
    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn record(&mut self, call: Call) {
        self.calls.push(call);
    }

    fn record_draw(&mut self, call: Call) {
        self.record(call);
        if let Some(code) = self.draw_error {
            self.pending_errors.push_back(code);
        }
    }
}

#[derive(Default)]
pub struct RecordingApi {
    state: RefCell<RecordingState>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that resolves every variable name to a location, for
    /// replaying command streams written against unknown shaders.
    pub fn permissive() -> Self {
        let api = Self::default();
        api.state.borrow_mut().permissive = true;
        api
    }

    /// Declares an active uniform. Arrays use the linker spelling, e.g. `u_mvp[0]`.
    pub fn with_uniform(self, name: &str, gl_type: u32, size: i32) -> Self {
        self.state
            .borrow_mut()
            .uniforms
            .push(ActiveVariable::new(name, gl_type, size));
        self
    }

    pub fn with_attribute(self, name: &str, gl_type: u32, size: i32) -> Self {
        self.state
            .borrow_mut()
            .attributes
            .push(ActiveVariable::new(name, gl_type, size));
        self
    }

    pub fn fail_compile(&self, stage: Option<ShaderStage>) {
        self.state.borrow_mut().failing_stage = stage;
    }

    pub fn fail_link(&self, fail: bool) {
        self.state.borrow_mut().fail_link = fail;
    }

    pub fn fail_validation(&self, fail: bool) {
        self.state.borrow_mut().fail_validation = fail;
    }

    /// Makes every draw call raise `code`, as a driver would for a bad draw.
    pub fn fail_draw(&self, code: Option<u32>) {
        self.state.borrow_mut().draw_error = code;
    }

    /// Queues an error code for `get_error` to report.
    pub fn push_error(&self, code: u32) {
        self.state.borrow_mut().pending_errors.push_back(code);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Call) -> bool,
    {
        self.state.borrow().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Locations are derived from declaration order: variable `i`, element `j`
    /// lives at `i * 16 + j`. The bare name of an array resolves to element 0.
    fn locate(state: &mut RecordingState, uniform: bool, name: &str) -> i32 {
        let variables = if uniform {
            &state.uniforms
        } else {
            &state.attributes
        };
        let location = Self::resolve(variables, name);
        if location >= 0 || !state.permissive {
            return location;
        }
        let next = state.assigned.len() as i32;
        *state.assigned.entry(name.to_string()).or_insert(1024 + next)
    }

    fn resolve(variables: &[ActiveVariable], name: &str) -> i32 {
        for (i, var) in variables.iter().enumerate() {
            let base = var.name.strip_suffix("[0]").unwrap_or(var.name.as_str());
            let location = (i * 16) as i32;
            if name == var.name || name == base {
                return location;
            }
            let element = name
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix('['))
                .and_then(|rest| rest.strip_suffix(']'))
                .and_then(|index| index.parse::<i32>().ok());
            if let Some(element) = element {
                if element < var.size {
                    return location + element;
                }
            }
        }
        -1
    }
}

impl GraphicsApi for RecordingApi {
    fn create_program(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        let handle = state.handle();
        state.record(Call::CreateProgram(handle));
        handle
    }

    fn delete_program(&self, program: u32) {
        self.state.borrow_mut().record(Call::DeleteProgram(program));
    }

    fn use_program(&self, program: u32) {
        self.state.borrow_mut().record(Call::UseProgram(program));
    }

    fn link_program(&self, program: u32) {
        self.state.borrow_mut().record(Call::LinkProgram(program));
    }

    fn program_link_status(&self, _program: u32) -> bool {
        !self.state.borrow().fail_link
    }

    fn validate_program(&self, program: u32) {
        self.state.borrow_mut().record(Call::ValidateProgram(program));
    }

    fn program_validate_status(&self, _program: u32) -> bool {
        !self.state.borrow().fail_validation
    }

    fn program_info_log(&self, _program: u32) -> String {
        let state = self.state.borrow();
        if state.fail_link {
            "error: undefined reference to main".to_string()
        } else if state.fail_validation {
            "error: sampler units conflict".to_string()
        } else {
            String::new()
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> u32 {
        let mut state = self.state.borrow_mut();
        let handle = state.handle();
        state.shader_stages.insert(handle, stage);
        state.record(Call::CreateShader(stage, handle));
        handle
    }

    fn shader_source(&self, shader: u32, _source: &str) {
        self.state.borrow_mut().record(Call::ShaderSource(shader));
    }

    fn compile_shader(&self, shader: u32) {
        self.state.borrow_mut().record(Call::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        let state = self.state.borrow();
        match state.failing_stage {
            Some(stage) => state.shader_stages.get(&shader) != Some(&stage),
            None => true,
        }
    }

    fn shader_info_log(&self, _shader: u32) -> String {
        "0:1: syntax error".to_string()
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.state.borrow_mut().record(Call::AttachShader(program, shader));
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.state.borrow_mut().record(Call::DetachShader(program, shader));
    }

    fn delete_shader(&self, shader: u32) {
        self.state.borrow_mut().record(Call::DeleteShader(shader));
    }

    fn active_attribute_count(&self, _program: u32) -> u32 {
        self.state.borrow().attributes.len() as u32
    }

    fn active_attribute(&self, _program: u32, index: u32) -> ActiveVariable {
        self.state.borrow().attributes[index as usize].clone()
    }

    fn active_uniform_count(&self, _program: u32) -> u32 {
        self.state.borrow().uniforms.len() as u32
    }

    fn active_uniform(&self, _program: u32, index: u32) -> ActiveVariable {
        self.state.borrow().uniforms[index as usize].clone()
    }

    fn uniform_location(&self, _program: u32, name: &str) -> i32 {
        let mut state = self.state.borrow_mut();
        state.record(Call::UniformLocation(name.to_string()));
        Self::locate(&mut state, true, name)
    }

    fn attrib_location(&self, _program: u32, name: &str) -> i32 {
        let mut state = self.state.borrow_mut();
        state.record(Call::AttribLocation(name.to_string()));
        Self::locate(&mut state, false, name)
    }

    fn uniform_fv(&self, location: i32, components: usize, data: &[f32]) {
        self.state.borrow_mut().record(Call::UniformFloat {
            location,
            components,
            data: data.to_vec(),
        });
    }

    fn uniform_iv(&self, location: i32, components: usize, data: &[i32]) {
        self.state.borrow_mut().record(Call::UniformInt {
            location,
            components,
            data: data.to_vec(),
        });
    }

    fn uniform_matrix_fv(&self, location: i32, dim: usize, data: &[f32]) {
        self.state.borrow_mut().record(Call::UniformMatrix {
            location,
            dim,
            data: data.to_vec(),
        });
    }

    fn uniform_1i(&self, location: i32, value: i32) {
        self.state
            .borrow_mut()
            .record(Call::Uniform1i { location, value });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.state
            .borrow_mut()
            .record(Call::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.state
            .borrow_mut()
            .record(Call::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        _normalized: bool,
        stride: i32,
        offset: usize,
    ) {
        self.state.borrow_mut().record(Call::VertexAttribPointer {
            index,
            size,
            data_type,
            stride,
            offset,
        });
    }

    fn vertex_attrib_fv(&self, index: u32, values: &[f32]) {
        self.state.borrow_mut().record(Call::VertexAttrib {
            index,
            values: values.to_vec(),
        });
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.state
            .borrow_mut()
            .record_draw(Call::DrawArrays { mode, first, count });
    }

    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, _offset: usize) {
        self.state.borrow_mut().record_draw(Call::DrawElements {
            mode,
            count,
            index_type,
        });
    }

    fn get_error(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        state.record(Call::GetError);
        state.pending_errors.pop_front().unwrap_or(gl::NO_ERROR)
    }

    fn create_buffer(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        let handle = state.handle();
        state.record(Call::CreateBuffer(handle));
        handle
    }

    fn delete_buffer(&self, buffer: u32) {
        self.state.borrow_mut().record(Call::DeleteBuffer(buffer));
    }

    fn bind_buffer(&self, target: u32, buffer: u32) {
        self.state
            .borrow_mut()
            .record(Call::BindBuffer { target, buffer });
    }

    fn buffer_data_size(&self, target: u32, size: usize, usage: u32) {
        self.state
            .borrow_mut()
            .record(Call::BufferData { target, size, usage });
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        self.state.borrow_mut().record(Call::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn create_texture(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        let handle = state.handle();
        state.record(Call::CreateTexture(handle));
        handle
    }

    fn delete_texture(&self, texture: u32) {
        self.state.borrow_mut().record(Call::DeleteTexture(texture));
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: u32, texture: u32) {
        self.state
            .borrow_mut()
            .record(Call::BindTexture { target, texture });
    }

    fn tex_parameter_i(&self, target: u32, pname: u32, value: i32) {
        self.state
            .borrow_mut()
            .record(Call::TexParameter { target, pname, value });
    }

    fn tex_image_2d(&self, _target: u32, format: u32, width: i32, height: i32) {
        self.state.borrow_mut().record(Call::TexImage2D {
            format,
            width,
            height,
        });
    }

    fn tex_sub_image_2d(
        &self,
        _target: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        _format: u32,
        data_type: u32,
        data: &[u8],
    ) {
        self.state.borrow_mut().record(Call::TexSubImage2D {
            x,
            y,
            width,
            height,
            data_type,
            len: data.len(),
        });
    }

    fn pixel_store_i(&self, pname: u32, value: i32) {
        self.state
            .borrow_mut()
            .record(Call::PixelStore { pname, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_elements_resolve_within_size() {
        let api = RecordingApi::new().with_uniform("u_mvp[0]", gl::FLOAT_MAT4, 4);
        assert_eq!(api.uniform_location(1, "u_mvp"), 0);
        assert_eq!(api.uniform_location(1, "u_mvp[3]"), 3);
        assert_eq!(api.uniform_location(1, "u_mvp[4]"), -1);
        assert_eq!(api.uniform_location(1, "u_other"), -1);
    }

    #[test]
    fn test_permissive_assigns_stable_locations() {
        let api = RecordingApi::permissive();
        let first = api.uniform_location(1, "u_scale");
        assert!(first >= 0);
        assert_eq!(api.uniform_location(1, "u_scale"), first);
        assert_ne!(api.attrib_location(1, "a_position"), first);
    }

    #[test]
    fn test_error_queue_drains_to_no_error() {
        let api = RecordingApi::new();
        api.push_error(gl::INVALID_ENUM);
        assert_eq!(api.get_error(), gl::INVALID_ENUM);
        assert_eq!(api.get_error(), gl::NO_ERROR);
    }
}
