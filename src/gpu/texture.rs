use super::api::{gl_int, GraphicsApi, TextureFilter, TextureFormat, TextureWrap};
use super::resource::GpuResource;
use crate::utils::error::{GlooError, Result};
use bytemuck::Pod;
use std::mem;
use std::rc::Rc;

/// Element types accepted for texel uploads, with their GL pixel type.
pub trait TexelData: Pod {
    const GL_TYPE: u32;
}

impl TexelData for i8 {
    const GL_TYPE: u32 = gl::BYTE;
}

impl TexelData for u8 {
    const GL_TYPE: u32 = gl::UNSIGNED_BYTE;
}

impl TexelData for i16 {
    const GL_TYPE: u32 = gl::SHORT;
}

impl TexelData for u16 {
    const GL_TYPE: u32 = gl::UNSIGNED_SHORT;
}

impl TexelData for i32 {
    const GL_TYPE: u32 = gl::INT;
}

impl TexelData for u32 {
    const GL_TYPE: u32 = gl::UNSIGNED_INT;
}

impl TexelData for f32 {
    const GL_TYPE: u32 = gl::FLOAT;
}

const DEFAULT_ALIGNMENT: i32 = 4;

/// Largest usable unpack alignment for rows of `row_bytes` bytes.
///
/// 4 is tried first because it is the driver default and needs no state change.
pub fn row_alignment(row_bytes: usize) -> i32 {
    [4, 8, 2, 1]
        .into_iter()
        .find(|alignment| row_bytes % alignment == 0)
        .map(|alignment| alignment as i32)
        .unwrap_or(1)
}

pub struct Texture2D<A: GraphicsApi> {
    api: Rc<A>,
    handle: u32,
    // (height, width, format) of the current storage
    shape_format: Option<(usize, usize, TextureFormat)>,
}

impl<A: GraphicsApi> Texture2D<A> {
    pub fn new(api: Rc<A>) -> Self {
        let handle = api.create_texture();
        Self {
            api,
            handle,
            shape_format: None,
        }
    }

    pub fn target(&self) -> u32 {
        gl::TEXTURE_2D
    }

    pub fn shape(&self) -> Option<(usize, usize)> {
        self.shape_format.map(|(height, width, _)| (height, width))
    }

    pub fn format(&self) -> Option<TextureFormat> {
        self.shape_format.map(|(_, _, format)| format)
    }

    pub fn set_wrapping(&self, wrap_s: TextureWrap, wrap_t: TextureWrap) {
        self.activate();
        self.api
            .tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, wrap_s.to_gl() as i32);
        self.api
            .tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, wrap_t.to_gl() as i32);
    }

    pub fn set_interpolation(&self, min: TextureFilter, mag: TextureFilter) {
        self.activate();
        self.api
            .tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, min.to_gl() as i32);
        self.api
            .tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, mag.to_gl() as i32);
    }

    /// Allocates `(height, width)` storage in `format`. A no-op when the
    /// shape and format are unchanged.
    pub fn set_size(&mut self, shape: (usize, usize), format: TextureFormat) -> Result<()> {
        let (height, width) = shape;
        if self.shape_format == Some((height, width, format)) {
            return Ok(());
        }
        let gl_width = gl_int("texture width", width)?;
        let gl_height = gl_int("texture height", height)?;
        self.shape_format = Some((height, width, format));
        self.activate();
        self.api
            .tex_image_2d(gl::TEXTURE_2D, format.to_gl(), gl_width, gl_height);
        log::debug!(
            "Texture {} storage set to {}x{} {:?}",
            self.handle,
            width,
            height,
            format
        );
        Ok(())
    }

    /// Uploads a `(height, width)` block of texels at `(y, x)`. The block
    /// must lie inside the allocated storage.
    pub fn set_data<T: TexelData>(
        &mut self,
        offset: (usize, usize),
        shape: (usize, usize),
        data: &[T],
    ) -> Result<()> {
        let (allocated_height, allocated_width, format) =
            self.shape_format.ok_or(GlooError::TextureNotAllocated)?;
        let (height, width) = shape;
        let (y, x) = offset;

        let region_error = || GlooError::TextureRegion {
            offset,
            shape,
            allocated: (allocated_height, allocated_width),
        };
        let bottom = y.checked_add(height).ok_or_else(region_error)?;
        let right = x.checked_add(width).ok_or_else(region_error)?;
        if bottom > allocated_height || right > allocated_width {
            return Err(region_error());
        }

        // Bounded by the allocated storage, so these cannot overflow.
        let row_len = width * format.components();
        let expected = height * row_len;
        if data.len() != expected {
            return Err(GlooError::TextureDataSize {
                expected,
                actual: data.len(),
            });
        }

        let gl_x = gl_int("texel x offset", x)?;
        let gl_y = gl_int("texel y offset", y)?;
        let gl_width = gl_int("texture width", width)?;
        let gl_height = gl_int("texture height", height)?;

        self.activate();
        let alignment = row_alignment(row_len * mem::size_of::<T>());
        if alignment != DEFAULT_ALIGNMENT {
            self.api.pixel_store_i(gl::UNPACK_ALIGNMENT, alignment);
        }
        self.api.tex_sub_image_2d(
            gl::TEXTURE_2D,
            gl_x,
            gl_y,
            gl_width,
            gl_height,
            format.to_gl(),
            T::GL_TYPE,
            bytemuck::cast_slice(data),
        );
        if alignment != DEFAULT_ALIGNMENT {
            self.api.pixel_store_i(gl::UNPACK_ALIGNMENT, DEFAULT_ALIGNMENT);
        }
        Ok(())
    }
}

impl<A: GraphicsApi> GpuResource for Texture2D<A> {
    fn handle(&self) -> u32 {
        self.handle
    }

    fn activate(&self) {
        self.api.bind_texture(gl::TEXTURE_2D, self.handle);
    }

    fn deactivate(&self) {
        self.api.bind_texture(gl::TEXTURE_2D, 0);
    }
}

impl<A: GraphicsApi> Drop for Texture2D<A> {
    fn drop(&mut self) {
        self.api.delete_texture(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{Call, RecordingApi};

    #[test]
    fn test_row_alignment_prefers_four() {
        assert_eq!(row_alignment(16), 4);
        assert_eq!(row_alignment(12), 4);
        assert_eq!(row_alignment(6), 2);
        assert_eq!(row_alignment(3), 1);
        assert_eq!(row_alignment(0), 4);
    }

    #[test]
    fn test_set_size_skips_unchanged_storage() {
        let api = Rc::new(RecordingApi::new());
        let mut texture = Texture2D::new(api.clone());
        let allocations = || api.count(|c| matches!(c, Call::TexImage2D { .. }));

        texture.set_size((32, 64), TextureFormat::Rgba).unwrap();
        texture.set_size((32, 64), TextureFormat::Rgba).unwrap();
        assert_eq!(allocations(), 1);

        texture.set_size((32, 64), TextureFormat::Rgb).unwrap();
        assert_eq!(allocations(), 2);
        assert!(api.calls().contains(&Call::TexImage2D {
            format: gl::RGB,
            width: 64,
            height: 32,
        }));
    }

    #[test]
    fn test_unaligned_rows_toggle_unpack_alignment() {
        let api = Rc::new(RecordingApi::new());
        let mut texture = Texture2D::new(api.clone());
        texture.set_size((2, 3), TextureFormat::Rgb).unwrap();
        api.clear_calls();

        // 3 RGB u8 texels per row = 9 bytes, only 1-aligned.
        texture.set_data((0, 0), (2, 3), &[0u8; 18]).unwrap();

        let stores: Vec<Call> = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::PixelStore { .. }))
            .collect();
        assert_eq!(
            stores,
            vec![
                Call::PixelStore {
                    pname: gl::UNPACK_ALIGNMENT,
                    value: 1,
                },
                Call::PixelStore {
                    pname: gl::UNPACK_ALIGNMENT,
                    value: 4,
                },
            ]
        );
    }

    #[test]
    fn test_aligned_rows_leave_unpack_alignment_alone() {
        let api = Rc::new(RecordingApi::new());
        let mut texture = Texture2D::new(api.clone());
        texture.set_size((4, 4), TextureFormat::Luminance).unwrap();

        texture.set_data((1, 2), (2, 2), &[0.5f32; 4]).unwrap();

        assert_eq!(api.count(|c| matches!(c, Call::PixelStore { .. })), 0);
        assert!(api.calls().contains(&Call::TexSubImage2D {
            x: 2,
            y: 1,
            width: 2,
            height: 2,
            data_type: gl::FLOAT,
            len: 16,
        }));
    }

    #[test]
    fn test_set_data_requires_storage_and_matching_length() {
        let api = Rc::new(RecordingApi::new());
        let mut texture = Texture2D::new(api);

        let result = texture.set_data((0, 0), (1, 1), &[0u8; 4]);
        assert!(matches!(result, Err(GlooError::TextureNotAllocated)));

        texture.set_size((1, 1), TextureFormat::Rgba).unwrap();
        let result = texture.set_data((0, 0), (1, 1), &[0u8; 3]);
        assert!(matches!(
            result,
            Err(GlooError::TextureDataSize {
                expected: 4,
                actual: 3,
            })
        ));
    }

    #[test]
    fn test_set_data_outside_storage_fails() {
        let api = Rc::new(RecordingApi::new());
        let mut texture = Texture2D::new(api.clone());
        texture.set_size((4, 4), TextureFormat::Alpha).unwrap();

        let result = texture.set_data((3, 0), (2, 2), &[0u8; 4]);
        assert!(matches!(
            result,
            Err(GlooError::TextureRegion {
                allocated: (4, 4),
                ..
            })
        ));

        let result = texture.set_data((0, usize::MAX), (1, 1), &[0u8; 1]);
        assert!(matches!(result, Err(GlooError::TextureRegion { .. })));
        assert_eq!(api.count(|c| matches!(c, Call::TexSubImage2D { .. })), 0);
    }

    #[test]
    fn test_oversized_storage_is_rejected() {
        let api = Rc::new(RecordingApi::new());
        let mut texture = Texture2D::new(api.clone());

        let result = texture.set_size((1, usize::MAX), TextureFormat::Rgba);
        assert!(matches!(
            result,
            Err(GlooError::OutOfRange {
                what: "texture width",
                ..
            })
        ));
        assert_eq!(texture.shape(), None);
        assert_eq!(api.count(|c| matches!(c, Call::TexImage2D { .. })), 0);
    }

    #[test]
    fn test_sampler_parameters() {
        let api = Rc::new(RecordingApi::new());
        let texture = Texture2D::new(api.clone());

        texture.set_wrapping(TextureWrap::ClampToEdge, TextureWrap::Repeat);
        texture.set_interpolation(TextureFilter::Nearest, TextureFilter::Linear);

        let params: Vec<(u32, i32)> = api
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::TexParameter { pname, value, .. } => Some((pname, value)),
                _ => None,
            })
            .collect();
        assert_eq!(
            params,
            vec![
                (gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as i32),
                (gl::TEXTURE_WRAP_T, gl::REPEAT as i32),
                (gl::TEXTURE_MIN_FILTER, gl::NEAREST as i32),
                (gl::TEXTURE_MAG_FILTER, gl::LINEAR as i32),
            ]
        );
    }
}
