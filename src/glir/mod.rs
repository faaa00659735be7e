//! GLIR: a serializable command stream driving buffers, textures and programs.
//!
//! Commands address objects by ids chosen by the sender. In deferred mode
//! commands queue up until `execute_pending`, so a whole frame can be
//! recorded before a context is current.

pub mod command;

pub use command::{
    AttributeSource, Command, DataOffset, DrawSelection, ObjectKind, StorageSize, TypedData,
};

use crate::config::GlooConfig;
use crate::gpu::api::{BufferUsage, GraphicsApi};
use crate::gpu::buffer::Buffer;
use crate::gpu::program::{AttributeValue, Selection, ShaderProgram};
use crate::gpu::resource::GpuResource;
use crate::gpu::texture::{TexelData, Texture2D};
use crate::utils::error::{GlooError, Result};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

pub enum GlooObject<A: GraphicsApi> {
    VertexBuffer(Buffer<A>),
    IndexBuffer(Buffer<A>),
    Texture2D(Texture2D<A>),
    Program(ShaderProgram<A>),
}

impl<A: GraphicsApi> GlooObject<A> {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::VertexBuffer(_) => ObjectKind::VertexBuffer,
            Self::IndexBuffer(_) => ObjectKind::IndexBuffer,
            Self::Texture2D(_) => ObjectKind::Texture2D,
            Self::Program(_) => ObjectKind::Program,
        }
    }

    pub fn handle(&self) -> u32 {
        match self {
            Self::VertexBuffer(buffer) | Self::IndexBuffer(buffer) => buffer.handle(),
            Self::Texture2D(texture) => texture.handle(),
            Self::Program(program) => program.handle(),
        }
    }

    fn delete(self) {
        match self {
            Self::VertexBuffer(buffer) | Self::IndexBuffer(buffer) => buffer.delete(),
            Self::Texture2D(texture) => texture.delete(),
            Self::Program(program) => program.delete(),
        }
    }
}

pub struct GlirContext<A: GraphicsApi> {
    api: Rc<A>,
    objects: HashMap<u32, GlooObject<A>>,
    queue: VecDeque<Command>,
    deferred: bool,
    buffer_usage: BufferUsage,
}

impl<A: GraphicsApi> GlirContext<A> {
    pub fn new(api: Rc<A>) -> Self {
        Self::from_config(api, &GlooConfig::default())
    }

    pub fn from_config(api: Rc<A>, config: &GlooConfig) -> Self {
        Self {
            api,
            objects: HashMap::new(),
            queue: VecDeque::new(),
            deferred: config.deferred,
            buffer_usage: config.buffer_usage,
        }
    }

    pub fn api(&self) -> &Rc<A> {
        &self.api
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Switching deferral off does not flush commands already queued.
    pub fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn object(&self, id: u32) -> Option<&GlooObject<A>> {
        self.objects.get(&id)
    }

    pub fn program(&self, id: u32) -> Result<&ShaderProgram<A>> {
        match self.objects.get(&id) {
            Some(GlooObject::Program(program)) => Ok(program),
            Some(_) => Err(wrong_kind(id, ObjectKind::Program)),
            None => Err(GlooError::UnknownObject(id)),
        }
    }

    /// Queues `command`, or runs it at once when not deferred.
    pub fn command(&mut self, command: Command) -> Result<()> {
        if self.deferred {
            self.queue.push_back(command);
            Ok(())
        } else {
            self.execute(command)
        }
    }

    /// Runs queued commands in order and returns how many ran.
    ///
    /// Stops at the first failing command; it is consumed and the rest stay queued.
    pub fn execute_pending(&mut self) -> Result<usize> {
        let mut executed = 0;
        while let Some(command) = self.queue.pop_front() {
            self.execute(command)?;
            executed += 1;
        }
        if executed > 0 {
            log::debug!("Executed {} queued GLIR commands", executed);
        }
        Ok(executed)
    }

    pub fn execute(&mut self, command: Command) -> Result<()> {
        log::trace!("GLIR {:?}", command);
        match command {
            Command::Create { id, kind } => self.create(id, kind),
            Command::Delete { id } => {
                let object = self.objects.remove(&id).ok_or(GlooError::UnknownObject(id))?;
                log::debug!("Deleting {} {}", object.kind(), id);
                object.delete();
                Ok(())
            }
            Command::Shaders {
                id,
                vertex,
                fragment,
            } => self.program_mut(id)?.set_shaders(&vertex, &fragment),
            Command::Size { id, size } => self.size(id, size),
            Command::Data {
                id,
                offset,
                shape,
                data,
            } => self.data(id, offset, shape, &data),
            Command::Attribute {
                program,
                name,
                ty,
                value,
            } => {
                let value = match value {
                    AttributeSource::Buffer {
                        buffer,
                        stride,
                        offset,
                    } => AttributeValue::Buffer {
                        buffer: self.buffer_handle(buffer, ObjectKind::VertexBuffer)?,
                        stride,
                        offset,
                    },
                    AttributeSource::Constant(values) => AttributeValue::Constant(values),
                };
                self.program_mut(program)?.set_attribute(&name, ty, value)
            }
            Command::Uniform {
                program,
                name,
                ty,
                value,
            } => self.program_mut(program)?.set_uniform(&name, ty, &value),
            Command::Texture {
                program,
                name,
                texture,
            } => {
                let (target, handle) = match self.objects.get(&texture) {
                    Some(GlooObject::Texture2D(texture)) => (texture.target(), texture.handle()),
                    Some(_) => return Err(wrong_kind(texture, ObjectKind::Texture2D)),
                    None => return Err(GlooError::UnknownObject(texture)),
                };
                self.program_mut(program)?.bind_sampler(&name, target, handle)
            }
            Command::Interpolation { id, min, mag } => {
                self.texture_mut(id)?.set_interpolation(min, mag);
                Ok(())
            }
            Command::Wrapping { id, wrap } => {
                self.texture_mut(id)?.set_wrapping(wrap[0], wrap[1]);
                Ok(())
            }
            Command::Draw {
                program,
                mode,
                selection,
            } => {
                let selection = match selection {
                    DrawSelection::Elements {
                        index_buffer,
                        index_type,
                        count,
                    } => Selection::Elements {
                        buffer: self.buffer_handle(index_buffer, ObjectKind::IndexBuffer)?,
                        index_type,
                        count,
                    },
                    DrawSelection::Range { first, count } => Selection::Range { first, count },
                };
                self.program_mut(program)?.draw(mode, selection)
            }
        }
    }

    fn create(&mut self, id: u32, kind: ObjectKind) -> Result<()> {
        if self.objects.contains_key(&id) {
            return Err(GlooError::DuplicateObject(id));
        }
        let api = self.api.clone();
        let object = match kind {
            ObjectKind::VertexBuffer => {
                GlooObject::VertexBuffer(Buffer::vertex(api).with_usage(self.buffer_usage))
            }
            ObjectKind::IndexBuffer => {
                GlooObject::IndexBuffer(Buffer::index(api).with_usage(self.buffer_usage))
            }
            ObjectKind::Texture2D => GlooObject::Texture2D(Texture2D::new(api)),
            ObjectKind::Program => GlooObject::Program(ShaderProgram::new(api)),
        };
        log::debug!("Created {} {} (handle {})", kind, id, object.handle());
        self.objects.insert(id, object);
        Ok(())
    }

    fn size(&mut self, id: u32, size: StorageSize) -> Result<()> {
        match (self.get_mut(id)?, size) {
            (
                GlooObject::VertexBuffer(buffer) | GlooObject::IndexBuffer(buffer),
                StorageSize::Bytes(nbytes),
            ) => {
                buffer.set_size(nbytes);
                Ok(())
            }
            (GlooObject::Texture2D(texture), StorageSize::Texture { shape, format }) => {
                texture.set_size((shape[0], shape[1]), format)
            }
            (object, size) => Err(GlooError::InvalidCommand(format!(
                "size {:?} does not apply to {} {}",
                size,
                object.kind(),
                id
            ))),
        }
    }

    fn data(
        &mut self,
        id: u32,
        offset: DataOffset,
        shape: Option<[usize; 2]>,
        data: &TypedData,
    ) -> Result<()> {
        match self.get_mut(id)? {
            GlooObject::VertexBuffer(buffer) | GlooObject::IndexBuffer(buffer) => {
                let DataOffset::Linear(offset) = offset else {
                    return Err(GlooError::InvalidCommand(format!(
                        "buffer {} takes a byte offset",
                        id
                    )));
                };
                match data {
                    TypedData::I8(values) => buffer.set_data(offset, values),
                    TypedData::U8(values) => buffer.set_data(offset, values),
                    TypedData::I16(values) => buffer.set_data(offset, values),
                    TypedData::U16(values) => buffer.set_data(offset, values),
                    TypedData::I32(values) => buffer.set_data(offset, values),
                    TypedData::U32(values) => buffer.set_data(offset, values),
                    TypedData::F32(values) => buffer.set_data(offset, values),
                }
            }
            GlooObject::Texture2D(texture) => {
                let offset = match offset {
                    DataOffset::Texel([y, x]) => (y, x),
                    DataOffset::Linear(0) => (0, 0),
                    DataOffset::Linear(_) => {
                        return Err(GlooError::InvalidCommand(format!(
                            "texture {} takes a [y, x] offset",
                            id
                        )))
                    }
                };
                let shape = match shape {
                    Some([height, width]) => (height, width),
                    None => texture.shape().ok_or(GlooError::TextureNotAllocated)?,
                };
                match data {
                    TypedData::I8(values) => upload(texture, offset, shape, values),
                    TypedData::U8(values) => upload(texture, offset, shape, values),
                    TypedData::I16(values) => upload(texture, offset, shape, values),
                    TypedData::U16(values) => upload(texture, offset, shape, values),
                    TypedData::I32(values) => upload(texture, offset, shape, values),
                    TypedData::U32(values) => upload(texture, offset, shape, values),
                    TypedData::F32(values) => upload(texture, offset, shape, values),
                }
            }
            GlooObject::Program(_) => Err(GlooError::InvalidCommand(format!(
                "program {} does not take data",
                id
            ))),
        }
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut GlooObject<A>> {
        self.objects.get_mut(&id).ok_or(GlooError::UnknownObject(id))
    }

    fn program_mut(&mut self, id: u32) -> Result<&mut ShaderProgram<A>> {
        match self.get_mut(id)? {
            GlooObject::Program(program) => Ok(program),
            _ => Err(wrong_kind(id, ObjectKind::Program)),
        }
    }

    fn texture_mut(&mut self, id: u32) -> Result<&mut Texture2D<A>> {
        match self.get_mut(id)? {
            GlooObject::Texture2D(texture) => Ok(texture),
            _ => Err(wrong_kind(id, ObjectKind::Texture2D)),
        }
    }

    fn buffer_handle(&self, id: u32, kind: ObjectKind) -> Result<u32> {
        match self.objects.get(&id) {
            Some(object) if object.kind() == kind => Ok(object.handle()),
            Some(_) => Err(wrong_kind(id, kind)),
            None => Err(GlooError::UnknownObject(id)),
        }
    }
}

fn upload<A: GraphicsApi, T: TexelData>(
    texture: &mut Texture2D<A>,
    offset: (usize, usize),
    shape: (usize, usize),
    data: &[T],
) -> Result<()> {
    texture.set_data(offset, shape, data)
}

fn wrong_kind(id: u32, expected: ObjectKind) -> GlooError {
    GlooError::WrongObjectKind { id, expected }
}

/// Parses a JSON array of commands.
pub fn parse_commands(json: &str) -> Result<Vec<Command>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::api::{DrawMode, IndexType, TextureFilter, TextureFormat, TextureWrap};
    use crate::gpu::program::{AttributeType, UniformType};
    use crate::gpu::recording::{Call, RecordingApi};

    const VERT: &str = "attribute vec2 a_pos; void main() {}";
    const FRAG: &str = "uniform sampler2D u_tex; void main() {}";

    fn immediate(api: &Rc<RecordingApi>) -> GlirContext<RecordingApi> {
        let mut ctx = GlirContext::new(api.clone());
        ctx.set_deferred(false);
        ctx
    }

    fn scene_api() -> Rc<RecordingApi> {
        Rc::new(
            RecordingApi::new()
                .with_attribute("a_pos", gl::FLOAT_VEC2, 1)
                .with_uniform("u_scale", gl::FLOAT, 1)
                .with_uniform("u_tex", gl::SAMPLER_2D, 1),
        )
    }

    fn create(ctx: &mut GlirContext<RecordingApi>, id: u32, kind: ObjectKind) {
        ctx.execute(Command::Create { id, kind }).unwrap();
    }

    #[test]
    fn test_deferred_by_default() {
        let api = scene_api();
        let mut ctx = GlirContext::new(api.clone());
        assert!(ctx.is_deferred());

        ctx.command(Command::Create {
            id: 1,
            kind: ObjectKind::Program,
        })
        .unwrap();
        assert_eq!(ctx.pending(), 1);
        assert!(ctx.object(1).is_none());

        assert_eq!(ctx.execute_pending().unwrap(), 1);
        assert_eq!(ctx.pending(), 0);
        assert_eq!(ctx.object(1).map(GlooObject::kind), Some(ObjectKind::Program));
    }

    #[test]
    fn test_execute_pending_stops_at_failure() {
        let api = scene_api();
        let mut ctx = GlirContext::new(api.clone());
        ctx.command(Command::Create {
            id: 1,
            kind: ObjectKind::Texture2D,
        })
        .unwrap();
        ctx.command(Command::Delete { id: 5 }).unwrap();
        ctx.command(Command::Create {
            id: 2,
            kind: ObjectKind::Texture2D,
        })
        .unwrap();

        assert!(matches!(ctx.execute_pending(), Err(GlooError::UnknownObject(5))));
        assert!(ctx.object(1).is_some());
        assert_eq!(ctx.pending(), 1);

        assert_eq!(ctx.execute_pending().unwrap(), 1);
        assert!(ctx.object(2).is_some());
    }

    #[test]
    fn test_duplicate_create_is_rejected() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::VertexBuffer);

        let result = ctx.command(Command::Create {
            id: 1,
            kind: ObjectKind::Program,
        });
        assert!(matches!(result, Err(GlooError::DuplicateObject(1))));
    }

    #[test]
    fn test_delete_releases_handle() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::VertexBuffer);
        let handle = ctx.object(1).map(GlooObject::handle).unwrap();

        ctx.command(Command::Delete { id: 1 }).unwrap();

        assert!(ctx.object(1).is_none());
        assert_eq!(api.count(|c| *c == Call::DeleteBuffer(handle)), 1);
    }

    #[test]
    fn test_buffer_size_and_data() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::VertexBuffer);

        ctx.command(Command::Size {
            id: 1,
            size: StorageSize::Bytes(16),
        })
        .unwrap();
        ctx.command(Command::Data {
            id: 1,
            offset: DataOffset::Linear(8),
            shape: None,
            data: TypedData::F32(vec![1.0, 2.0]),
        })
        .unwrap();

        assert!(api.calls().contains(&Call::BufferSubData {
            target: gl::ARRAY_BUFFER,
            offset: 8,
            len: 8,
        }));

        let overflow = ctx.command(Command::Data {
            id: 1,
            offset: DataOffset::Linear(12),
            shape: None,
            data: TypedData::F32(vec![1.0, 2.0]),
        });
        assert!(matches!(overflow, Err(GlooError::BufferOverflow { .. })));
    }

    #[test]
    fn test_out_of_range_offsets_are_errors() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::VertexBuffer);
        create(&mut ctx, 2, ObjectKind::Texture2D);
        ctx.command(Command::Size {
            id: 1,
            size: StorageSize::Bytes(4),
        })
        .unwrap();
        ctx.command(Command::Size {
            id: 2,
            size: StorageSize::Texture {
                shape: [2, 2],
                format: TextureFormat::Alpha,
            },
        })
        .unwrap();

        let commands = parse_commands(
            r#"[
                {"cmd": "data", "id": 1, "offset": 18446744073709551615, "data": {"u8": [1]}},
                {"cmd": "data", "id": 2, "offset": [0, 18446744073709551615], "shape": [1, 1],
                 "data": {"u8": [1]}}
            ]"#,
        )
        .unwrap();
        let mut results = commands.into_iter().map(|command| ctx.command(command));

        assert!(matches!(
            results.next(),
            Some(Err(GlooError::BufferOverflow { .. }))
        ));
        assert!(matches!(
            results.next(),
            Some(Err(GlooError::TextureRegion { .. }))
        ));
        assert_eq!(api.count(|c| matches!(c, Call::BufferSubData { .. })), 0);
        assert_eq!(api.count(|c| matches!(c, Call::TexSubImage2D { .. })), 0);
    }

    #[test]
    fn test_texture_size_mismatch_is_invalid() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::Texture2D);

        let result = ctx.command(Command::Size {
            id: 1,
            size: StorageSize::Bytes(64),
        });
        assert!(matches!(result, Err(GlooError::InvalidCommand(_))));
    }

    #[test]
    fn test_texture_data_defaults_to_whole_texture() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::Texture2D);
        ctx.command(Command::Size {
            id: 1,
            size: StorageSize::Texture {
                shape: [2, 2],
                format: TextureFormat::Rgba,
            },
        })
        .unwrap();

        ctx.command(Command::Data {
            id: 1,
            offset: DataOffset::default(),
            shape: None,
            data: TypedData::U8(vec![255; 16]),
        })
        .unwrap();

        assert!(api.calls().contains(&Call::TexSubImage2D {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
            data_type: gl::UNSIGNED_BYTE,
            len: 16,
        }));
    }

    #[test]
    fn test_texture_parameters() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::Texture2D);

        ctx.command(Command::Interpolation {
            id: 1,
            min: TextureFilter::Nearest,
            mag: TextureFilter::Linear,
        })
        .unwrap();
        ctx.command(Command::Wrapping {
            id: 1,
            wrap: [TextureWrap::Repeat, TextureWrap::ClampToEdge],
        })
        .unwrap();

        assert_eq!(api.count(|c| matches!(c, Call::TexParameter { .. })), 4);
    }

    #[test]
    fn test_wrong_kind_is_reported() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::VertexBuffer);

        let result = ctx.command(Command::Shaders {
            id: 1,
            vertex: VERT.to_string(),
            fragment: FRAG.to_string(),
        });
        assert!(matches!(
            result,
            Err(GlooError::WrongObjectKind {
                id: 1,
                expected: ObjectKind::Program,
            })
        ));
    }

    #[test]
    fn test_frame_replay() {
        let api = scene_api();
        let mut ctx = GlirContext::new(api.clone());
        let commands = vec![
            Command::Create {
                id: 1,
                kind: ObjectKind::Program,
            },
            Command::Create {
                id: 2,
                kind: ObjectKind::VertexBuffer,
            },
            Command::Create {
                id: 3,
                kind: ObjectKind::IndexBuffer,
            },
            Command::Create {
                id: 4,
                kind: ObjectKind::Texture2D,
            },
            Command::Shaders {
                id: 1,
                vertex: VERT.to_string(),
                fragment: FRAG.to_string(),
            },
            Command::Size {
                id: 2,
                size: StorageSize::Bytes(24),
            },
            Command::Data {
                id: 2,
                offset: DataOffset::Linear(0),
                shape: None,
                data: TypedData::F32(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
            },
            Command::Size {
                id: 3,
                size: StorageSize::Bytes(6),
            },
            Command::Data {
                id: 3,
                offset: DataOffset::Linear(0),
                shape: None,
                data: TypedData::U16(vec![0, 1, 2]),
            },
            Command::Size {
                id: 4,
                size: StorageSize::Texture {
                    shape: [1, 1],
                    format: TextureFormat::Rgba,
                },
            },
            Command::Attribute {
                program: 1,
                name: "a_pos".to_string(),
                ty: AttributeType::Vec2,
                value: AttributeSource::Buffer {
                    buffer: 2,
                    stride: 8,
                    offset: 0,
                },
            },
            Command::Uniform {
                program: 1,
                name: "u_scale".to_string(),
                ty: UniformType::Float,
                value: vec![2.0],
            },
            Command::Texture {
                program: 1,
                name: "u_tex".to_string(),
                texture: 4,
            },
            Command::Draw {
                program: 1,
                mode: DrawMode::Triangles,
                selection: DrawSelection::Elements {
                    index_buffer: 3,
                    index_type: IndexType::UnsignedShort,
                    count: 3,
                },
            },
        ];
        for command in commands {
            ctx.command(command).unwrap();
        }
        assert_eq!(api.count(|c| matches!(c, Call::DrawElements { .. })), 0);

        assert_eq!(ctx.execute_pending().unwrap(), 14);

        let program = ctx.program(1).unwrap();
        assert!(program.is_validated());
        assert!(program.unset_variables().is_empty());
        assert_eq!(program.texture_unit("u_tex"), Some(0));
        assert_eq!(
            api.count(|c| *c
                == Call::DrawElements {
                    mode: gl::TRIANGLES,
                    count: 3,
                    index_type: gl::UNSIGNED_SHORT,
                }),
            1
        );
    }

    #[test]
    fn test_draw_with_vertex_buffer_as_index_fails() {
        let api = scene_api();
        let mut ctx = immediate(&api);
        create(&mut ctx, 1, ObjectKind::Program);
        create(&mut ctx, 2, ObjectKind::VertexBuffer);
        ctx.command(Command::Shaders {
            id: 1,
            vertex: VERT.to_string(),
            fragment: FRAG.to_string(),
        })
        .unwrap();

        let result = ctx.command(Command::Draw {
            program: 1,
            mode: DrawMode::Triangles,
            selection: DrawSelection::Elements {
                index_buffer: 2,
                index_type: IndexType::UnsignedShort,
                count: 3,
            },
        });
        assert!(matches!(
            result,
            Err(GlooError::WrongObjectKind {
                id: 2,
                expected: ObjectKind::IndexBuffer,
            })
        ));
    }

    #[test]
    fn test_parse_commands_rejects_unknown_command() {
        let result = parse_commands(r#"[{"cmd": "func", "name": "glClear"}]"#);
        assert!(matches!(result, Err(GlooError::CommandParse(_))));

        let commands = parse_commands(r#"[{"cmd": "delete", "id": 3}]"#).unwrap();
        assert_eq!(commands, vec![Command::Delete { id: 3 }]);
    }
}
