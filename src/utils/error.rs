use crate::glir::ObjectKind;
use crate::gpu::api::ShaderStage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlooError {
    #[error("errors in {stage} shader:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("program link error:\n{log}")]
    ProgramLink { log: String },

    #[error("program validation error:\n{log}")]
    ProgramValidation { log: String },

    #[error("program has no linked code")]
    ProgramNotLinked,

    #[error("graphics API reported errors ({checkpoint}): {}", format_codes(.codes))]
    GraphicsApi { checkpoint: String, codes: Vec<u32> },

    #[error("invalid value for uniform '{name}': {reason}")]
    UniformValue { name: String, reason: String },

    #[error("invalid value for attribute '{name}': {reason}")]
    AttributeValue { name: String, reason: String },

    #[error("buffer write of {len} bytes at offset {offset} exceeds allocated size {size}")]
    BufferOverflow { offset: usize, len: usize, size: usize },

    #[error("texture storage has not been allocated")]
    TextureNotAllocated,

    #[error("texture data has {actual} elements, expected {expected}")]
    TextureDataSize { expected: usize, actual: usize },

    #[error(
        "texture write of {}x{} at ({}, {}) exceeds allocated {}x{}",
        .shape.0, .shape.1, .offset.0, .offset.1, .allocated.0, .allocated.1
    )]
    TextureRegion {
        offset: (usize, usize),
        shape: (usize, usize),
        allocated: (usize, usize),
    },

    #[error("{what} {value} is out of range for the graphics API")]
    OutOfRange { what: &'static str, value: usize },

    #[error("unknown object id {0}")]
    UnknownObject(u32),

    #[error("object id {0} already exists")]
    DuplicateObject(u32),

    #[error("object {id} is not a {expected}")]
    WrongObjectKind { id: u32, expected: ObjectKind },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("command parse error: {0}")]
    CommandParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GlooError>;

fn format_codes(codes: &[u32]) -> String {
    codes
        .iter()
        .map(|code| format!("0x{:04X}", code))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphics_error_lists_codes() {
        let err = GlooError::GraphicsApi {
            checkpoint: "before draw".to_string(),
            codes: vec![0x0500, 0x0502],
        };
        assert_eq!(
            err.to_string(),
            "graphics API reported errors (before draw): 0x0500 0x0502"
        );
    }

    #[test]
    fn test_compile_error_names_stage() {
        let err = GlooError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "0:1: syntax error".to_string(),
        };
        assert!(err.to_string().starts_with("errors in fragment shader:"));
    }
}
