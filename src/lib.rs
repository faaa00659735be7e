pub mod config;
pub mod glir;
pub mod gpu;
pub mod utils;

// Re-export commonly used types
pub use config::GlooConfig;
pub use glir::{parse_commands, Command, GlirContext, GlooObject, ObjectKind};
pub use gpu::{
    check_error, Buffer, GpuResource, GraphicsApi, NativeGl, RecordingApi, Selection,
    ShaderProgram, Texture2D, UniformType,
};
pub use utils::error::{GlooError, Result};
