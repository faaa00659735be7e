use super::api::{BufferTarget, BufferUsage, GraphicsApi};
use super::resource::GpuResource;
use crate::utils::error::{GlooError, Result};
use bytemuck::Pod;
use std::rc::Rc;

/// A GPU byte range bound to a vertex or index target.
pub struct Buffer<A: GraphicsApi> {
    api: Rc<A>,
    handle: u32,
    target: BufferTarget,
    usage: BufferUsage,
    size: usize,
}

impl<A: GraphicsApi> Buffer<A> {
    pub fn new(api: Rc<A>, target: BufferTarget) -> Self {
        let handle = api.create_buffer();
        Self {
            api,
            handle,
            target,
            usage: BufferUsage::default(),
            size: 0,
        }
    }

    /// A buffer for vertex attributes.
    pub fn vertex(api: Rc<A>) -> Self {
        Self::new(api, BufferTarget::Array)
    }

    /// A buffer for element indices.
    pub fn index(api: Rc<A>) -> Self {
        Self::new(api, BufferTarget::ElementArray)
    }

    pub fn with_usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// (Re)allocates storage, skipping the driver call when `nbytes` is
    /// already the allocated size.
    pub fn set_size(&mut self, nbytes: usize) {
        if nbytes == self.size {
            return;
        }
        self.activate();
        self.api
            .buffer_data_size(self.target.to_gl(), nbytes, self.usage.to_gl());
        log::debug!("Buffer {} resized {} -> {} bytes", self.handle, self.size, nbytes);
        self.size = nbytes;
    }

    /// Uploads `data` at byte `offset`. Storage must already be large enough.
    pub fn set_data<T: Pod>(&mut self, offset: usize, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let end = offset.checked_add(bytes.len());
        if end.map_or(true, |end| end > self.size) {
            return Err(GlooError::BufferOverflow {
                offset,
                len: bytes.len(),
                size: self.size,
            });
        }
        self.activate();
        self.api.buffer_sub_data(self.target.to_gl(), offset, bytes);
        Ok(())
    }
}

impl<A: GraphicsApi> GpuResource for Buffer<A> {
    fn handle(&self) -> u32 {
        self.handle
    }

    fn activate(&self) {
        self.api.bind_buffer(self.target.to_gl(), self.handle);
    }

    fn deactivate(&self) {
        self.api.bind_buffer(self.target.to_gl(), 0);
    }
}

impl<A: GraphicsApi> Drop for Buffer<A> {
    fn drop(&mut self) {
        self.api.delete_buffer(self.handle);
    }
}
