use crate::gpu::api::{DrawMode, IndexType, TextureFilter, TextureFormat, TextureWrap};
use crate::gpu::program::{AttributeType, UniformType};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    VertexBuffer,
    IndexBuffer,
    Texture2D,
    Program,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VertexBuffer => f.write_str("vertex buffer"),
            Self::IndexBuffer => f.write_str("index buffer"),
            Self::Texture2D => f.write_str("texture"),
            Self::Program => f.write_str("program"),
        }
    }
}

/// One GLIR instruction. Objects are addressed by caller-chosen ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Create {
        id: u32,
        kind: ObjectKind,
    },
    Delete {
        id: u32,
    },
    Shaders {
        id: u32,
        vertex: String,
        fragment: String,
    },
    Size {
        id: u32,
        size: StorageSize,
    },
    Data {
        id: u32,
        #[serde(default)]
        offset: DataOffset,
        /// `[height, width]` of the block for textures; the whole texture if absent.
        #[serde(default)]
        shape: Option<[usize; 2]>,
        data: TypedData,
    },
    Attribute {
        program: u32,
        name: String,
        #[serde(rename = "type")]
        ty: AttributeType,
        value: AttributeSource,
    },
    Uniform {
        program: u32,
        name: String,
        #[serde(rename = "type")]
        ty: UniformType,
        value: Vec<f32>,
    },
    Texture {
        program: u32,
        name: String,
        texture: u32,
    },
    Interpolation {
        id: u32,
        min: TextureFilter,
        mag: TextureFilter,
    },
    Wrapping {
        id: u32,
        wrap: [TextureWrap; 2],
    },
    Draw {
        program: u32,
        mode: DrawMode,
        selection: DrawSelection,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StorageSize {
    Bytes(usize),
    Texture {
        /// `[height, width]`
        shape: [usize; 2],
        format: TextureFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataOffset {
    /// Byte offset into a buffer.
    Linear(usize),
    /// `[y, x]` texel offset into a texture.
    Texel([usize; 2]),
}

impl Default for DataOffset {
    fn default() -> Self {
        Self::Linear(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeSource {
    Buffer {
        buffer: u32,
        stride: i32,
        offset: usize,
    },
    Constant(Vec<f32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DrawSelection {
    Elements {
        index_buffer: u32,
        index_type: IndexType,
        count: usize,
    },
    Range {
        first: usize,
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_parse_from_json() {
        let commands: Vec<Command> = serde_json::from_str(
            r#"[
                {"cmd": "create", "id": 1, "kind": "VertexBuffer"},
                {"cmd": "size", "id": 1, "size": 48},
                {"cmd": "size", "id": 2, "size": {"shape": [4, 8], "format": "rgba"}},
                {"cmd": "data", "id": 1, "data": {"f32": [0.0, 1.0]}},
                {"cmd": "data", "id": 2, "offset": [1, 2], "shape": [1, 1], "data": {"u8": [1, 2, 3, 4]}},
                {"cmd": "attribute", "program": 3, "name": "a_pos", "type": "vec2",
                 "value": {"buffer": 1, "stride": 8, "offset": 0}},
                {"cmd": "attribute", "program": 3, "name": "a_color", "type": "vec3",
                 "value": [1.0, 0.0, 0.0]},
                {"cmd": "uniform", "program": 3, "name": "u_flag", "type": "bool", "value": [1]},
                {"cmd": "wrapping", "id": 2, "wrap": ["repeat", "clamp_to_edge"]},
                {"cmd": "draw", "program": 3, "mode": "triangles",
                 "selection": {"index_buffer": 4, "index_type": "unsigned_short", "count": 6}}
            ]"#,
        )
        .unwrap();

        assert_eq!(commands.len(), 10);
        assert_eq!(
            commands[2],
            Command::Size {
                id: 2,
                size: StorageSize::Texture {
                    shape: [4, 8],
                    format: TextureFormat::Rgba,
                },
            }
        );
        assert!(matches!(
            commands[4],
            Command::Data {
                offset: DataOffset::Texel([1, 2]),
                shape: Some([1, 1]),
                ..
            }
        ));
        assert!(matches!(
            commands[6],
            Command::Attribute {
                value: AttributeSource::Constant(_),
                ..
            }
        ));
        assert!(matches!(
            commands[9],
            Command::Draw {
                selection: DrawSelection::Elements { count: 6, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_range_selection_parses() {
        let selection: DrawSelection =
            serde_json::from_str(r#"{"first": 3, "count": 9}"#).unwrap();
        assert_eq!(selection, DrawSelection::Range { first: 3, count: 9 });
    }
}
