pub mod api;
pub mod buffer;
pub mod check;
pub mod native;
pub mod program;
pub mod recording;
pub mod resource;
pub mod texture;

pub use api::{
    BufferTarget, BufferUsage, DrawMode, GraphicsApi, IndexType, ShaderStage, TextureFilter,
    TextureFormat, TextureWrap,
};
pub use buffer::Buffer;
pub use check::check_error;
pub use native::NativeGl;
pub use program::{
    Activation, AttributeType, AttributeValue, Selection, ShaderProgram, UniformType,
    UniformValue,
};
pub use recording::RecordingApi;
pub use resource::GpuResource;
pub use texture::{TexelData, Texture2D};
