use super::api::{ActiveVariable, GraphicsApi, ShaderStage};
use gl::types::*;
use std::ffi::{c_void, CString};
use std::ptr;

// glGetActiveAttrib / glGetActiveUniform
type ActiveQuery =
    unsafe fn(GLuint, GLuint, GLsizei, *mut GLsizei, *mut GLint, *mut GLenum, *mut GLchar);

/// [`GraphicsApi`] over the process-wide OpenGL function pointers.
///
/// A context must be current on the calling thread for every method.
pub struct NativeGl {
    _private: (),
}

impl NativeGl {
    /// Loads the GL entry points through `loader` (typically the windowing
    /// system's `get_proc_address`).
    pub fn load_with<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        Self { _private: () }
    }

    fn whitespace_buffer(len: usize) -> Vec<u8> {
        let mut buffer: Vec<u8> = Vec::with_capacity(len + 1);
        buffer.extend([b' '].iter().cycle().take(len + 1));
        buffer
    }

    fn log_to_string(mut buffer: Vec<u8>, written: GLsizei) -> String {
        buffer.truncate(written.max(0) as usize);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    fn program_iv(program: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe {
            gl::GetProgramiv(program, pname, &mut value);
        }
        value
    }

    fn shader_iv(shader: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe {
            gl::GetShaderiv(shader, pname, &mut value);
        }
        value
    }

    fn active_variable(
        program: GLuint,
        index: GLuint,
        max_len_pname: GLenum,
        query: ActiveQuery,
    ) -> ActiveVariable {
        let max_len = Self::program_iv(program, max_len_pname).max(1);
        let mut name = Self::whitespace_buffer(max_len as usize);
        let mut written = 0;
        let mut size = 0;
        let mut gl_type = 0;
        unsafe {
            query(
                program,
                index,
                max_len,
                &mut written,
                &mut size,
                &mut gl_type,
                name.as_mut_ptr() as *mut GLchar,
            );
        }
        ActiveVariable {
            name: Self::log_to_string(name, written),
            size,
            gl_type,
        }
    }
}

impl GraphicsApi for NativeGl {
    fn create_program(&self) -> u32 {
        unsafe { gl::CreateProgram() }
    }

    fn delete_program(&self, program: u32) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn use_program(&self, program: u32) {
        unsafe { gl::UseProgram(program) }
    }

    fn link_program(&self, program: u32) {
        unsafe { gl::LinkProgram(program) }
    }

    fn program_link_status(&self, program: u32) -> bool {
        Self::program_iv(program, gl::LINK_STATUS) != 0
    }

    fn validate_program(&self, program: u32) {
        unsafe { gl::ValidateProgram(program) }
    }

    fn program_validate_status(&self, program: u32) -> bool {
        Self::program_iv(program, gl::VALIDATE_STATUS) != 0
    }

    fn program_info_log(&self, program: u32) -> String {
        let len = Self::program_iv(program, gl::INFO_LOG_LENGTH);
        let mut buffer = Self::whitespace_buffer(len.max(0) as usize);
        let mut written = 0;
        unsafe {
            gl::GetProgramInfoLog(
                program,
                buffer.len() as GLsizei,
                &mut written,
                buffer.as_mut_ptr() as *mut GLchar,
            );
        }
        Self::log_to_string(buffer, written)
    }

    fn create_shader(&self, stage: ShaderStage) -> u32 {
        unsafe { gl::CreateShader(stage.to_gl()) }
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let ptr = source.as_ptr() as *const GLchar;
        let len = source.len() as GLint;
        unsafe {
            gl::ShaderSource(shader, 1, &ptr, &len);
        }
    }

    fn compile_shader(&self, shader: u32) {
        unsafe { gl::CompileShader(shader) }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        Self::shader_iv(shader, gl::COMPILE_STATUS) != 0
    }

    fn shader_info_log(&self, shader: u32) -> String {
        let len = Self::shader_iv(shader, gl::INFO_LOG_LENGTH);
        let mut buffer = Self::whitespace_buffer(len.max(0) as usize);
        let mut written = 0;
        unsafe {
            gl::GetShaderInfoLog(
                shader,
                buffer.len() as GLsizei,
                &mut written,
                buffer.as_mut_ptr() as *mut GLchar,
            );
        }
        Self::log_to_string(buffer, written)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        unsafe { gl::DetachShader(program, shader) }
    }

    fn delete_shader(&self, shader: u32) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn active_attribute_count(&self, program: u32) -> u32 {
        Self::program_iv(program, gl::ACTIVE_ATTRIBUTES).max(0) as u32
    }

    fn active_attribute(&self, program: u32, index: u32) -> ActiveVariable {
        Self::active_variable(
            program,
            index,
            gl::ACTIVE_ATTRIBUTE_MAX_LENGTH,
            gl::GetActiveAttrib,
        )
    }

    fn active_uniform_count(&self, program: u32) -> u32 {
        Self::program_iv(program, gl::ACTIVE_UNIFORMS).max(0) as u32
    }

    fn active_uniform(&self, program: u32, index: u32) -> ActiveVariable {
        Self::active_variable(
            program,
            index,
            gl::ACTIVE_UNIFORM_MAX_LENGTH,
            gl::GetActiveUniform,
        )
    }

    fn uniform_location(&self, program: u32, name: &str) -> i32 {
        match CString::new(name) {
            Ok(cname) => unsafe { gl::GetUniformLocation(program, cname.as_ptr()) },
            Err(_) => -1,
        }
    }

    fn attrib_location(&self, program: u32, name: &str) -> i32 {
        match CString::new(name) {
            Ok(cname) => unsafe { gl::GetAttribLocation(program, cname.as_ptr()) },
            Err(_) => -1,
        }
    }

    fn uniform_fv(&self, location: i32, components: usize, data: &[f32]) {
        let count = (data.len() / components.max(1)) as GLsizei;
        unsafe {
            match components {
                1 => gl::Uniform1fv(location, count, data.as_ptr()),
                2 => gl::Uniform2fv(location, count, data.as_ptr()),
                3 => gl::Uniform3fv(location, count, data.as_ptr()),
                _ => gl::Uniform4fv(location, count, data.as_ptr()),
            }
        }
    }

    fn uniform_iv(&self, location: i32, components: usize, data: &[i32]) {
        let count = (data.len() / components.max(1)) as GLsizei;
        unsafe {
            match components {
                1 => gl::Uniform1iv(location, count, data.as_ptr()),
                2 => gl::Uniform2iv(location, count, data.as_ptr()),
                3 => gl::Uniform3iv(location, count, data.as_ptr()),
                _ => gl::Uniform4iv(location, count, data.as_ptr()),
            }
        }
    }

    fn uniform_matrix_fv(&self, location: i32, dim: usize, data: &[f32]) {
        let count = (data.len() / (dim * dim).max(1)) as GLsizei;
        unsafe {
            match dim {
                2 => gl::UniformMatrix2fv(location, count, gl::FALSE, data.as_ptr()),
                3 => gl::UniformMatrix3fv(location, count, gl::FALSE, data.as_ptr()),
                _ => gl::UniformMatrix4fv(location, count, gl::FALSE, data.as_ptr()),
            }
        }
    }

    fn uniform_1i(&self, location: i32, value: i32) {
        unsafe { gl::Uniform1i(location, value) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { gl::EnableVertexAttribArray(index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { gl::DisableVertexAttribArray(index) }
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: usize,
    ) {
        let normalized = if normalized { gl::TRUE } else { gl::FALSE };
        unsafe {
            gl::VertexAttribPointer(
                index,
                size,
                data_type,
                normalized,
                stride,
                offset as *const c_void,
            );
        }
    }

    fn vertex_attrib_fv(&self, index: u32, values: &[f32]) {
        unsafe {
            match values.len() {
                0 => {}
                1 => gl::VertexAttrib1fv(index, values.as_ptr()),
                2 => gl::VertexAttrib2fv(index, values.as_ptr()),
                3 => gl::VertexAttrib3fv(index, values.as_ptr()),
                _ => gl::VertexAttrib4fv(index, values.as_ptr()),
            }
        }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { gl::DrawArrays(mode, first, count) }
    }

    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: usize) {
        unsafe { gl::DrawElements(mode, count, index_type, offset as *const c_void) }
    }

    fn get_error(&self) -> u32 {
        unsafe { gl::GetError() }
    }

    fn create_buffer(&self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenBuffers(1, &mut id);
        }
        id
    }

    fn delete_buffer(&self, buffer: u32) {
        unsafe { gl::DeleteBuffers(1, &buffer) }
    }

    fn bind_buffer(&self, target: u32, buffer: u32) {
        unsafe { gl::BindBuffer(target, buffer) }
    }

    fn buffer_data_size(&self, target: u32, size: usize, usage: u32) {
        unsafe { gl::BufferData(target, size as GLsizeiptr, ptr::null(), usage) }
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        unsafe {
            gl::BufferSubData(
                target,
                offset as GLintptr,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const c_void,
            );
        }
    }

    fn create_texture(&self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenTextures(1, &mut id);
        }
        id
    }

    fn delete_texture(&self, texture: u32) {
        unsafe { gl::DeleteTextures(1, &texture) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, target: u32, texture: u32) {
        unsafe { gl::BindTexture(target, texture) }
    }

    fn tex_parameter_i(&self, target: u32, pname: u32, value: i32) {
        unsafe { gl::TexParameteri(target, pname, value) }
    }

    fn tex_image_2d(&self, target: u32, format: u32, width: i32, height: i32) {
        unsafe {
            gl::TexImage2D(
                target,
                0,
                format as GLint,
                width,
                height,
                0,
                format,
                gl::UNSIGNED_BYTE,
                ptr::null(),
            );
        }
    }

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
    ) {
        unsafe {
            gl::TexSubImage2D(
                target,
                0,
                x,
                y,
                width,
                height,
                format,
                data_type,
                data.as_ptr() as *const c_void,
            );
        }
    }

    fn pixel_store_i(&self, pname: u32, value: i32) {
        unsafe { gl::PixelStorei(pname, value) }
    }
}
