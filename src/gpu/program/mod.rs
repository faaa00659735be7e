//! Shader program with cached variable locations and deferred binding state.
//!
//! A program tracks which of its active uniforms and attributes the caller has
//! set, remembers resolved locations and names that failed to resolve, assigns
//! texture units to samplers, and re-applies sampler and attribute bindings
//! before every draw. Driver-side validation runs once per link, at the first
//! non-empty draw, when sampler units are final.

pub mod activation;
pub mod attribute;
pub mod uniform;

pub use activation::Activation;
pub use attribute::{AttributeType, AttributeValue};
pub use uniform::{UniformFunction, UniformType, UniformValue};

use self::activation::SamplerBinding;
use self::attribute::AttributeBinding;
use super::api::{gl_int, ActiveVariable, DrawMode, GraphicsApi, IndexType, ShaderStage};
use super::check::check_error;
use super::resource::GpuResource;
use super::texture::Texture2D;
use crate::utils::error::{GlooError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Which vertices a draw call consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// `count` indices of `index_type` read from the index buffer `buffer`.
    Elements {
        buffer: u32,
        index_type: IndexType,
        count: usize,
    },
    /// `count` consecutive vertices starting at `first`.
    Range { first: usize, count: usize },
}

impl Selection {
    pub fn count(&self) -> usize {
        match self {
            Self::Elements { count, .. } | Self::Range { count, .. } => *count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariableKind {
    Uniform,
    Attribute,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => f.write_str("uniform"),
            Self::Attribute => f.write_str("attribute"),
        }
    }
}

enum Lookup {
    Found(i32),
    NewlyInvalid,
    KnownInvalid,
}

pub struct ShaderProgram<A: GraphicsApi> {
    api: Rc<A>,
    handle: u32,
    linked: bool,
    active_variables: HashSet<String>,
    unset_variables: HashSet<String>,
    locations: HashMap<String, i32>,
    invalid_names: HashSet<String>,
    samplers: HashMap<String, SamplerBinding>,
    attributes: HashMap<String, AttributeBinding>,
    validated: bool,
}

impl<A: GraphicsApi> ShaderProgram<A> {
    pub fn new(api: Rc<A>) -> Self {
        let handle = api.create_program();
        Self {
            api,
            handle,
            linked: false,
            active_variables: HashSet::new(),
            unset_variables: HashSet::new(),
            locations: HashMap::new(),
            invalid_names: HashSet::new(),
            samplers: HashMap::new(),
            attributes: HashMap::new(),
            validated: false,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Every uniform and attribute the linker reported, arrays expanded per element.
    pub fn active_variables(&self) -> &HashSet<String> {
        &self.active_variables
    }

    pub fn unset_variables(&self) -> &HashSet<String> {
        &self.unset_variables
    }

    /// Names that were looked up and had no location.
    pub fn invalid_names(&self) -> &HashSet<String> {
        &self.invalid_names
    }

    pub fn texture_unit(&self, name: &str) -> Option<u32> {
        self.samplers.get(name).map(|binding| binding.unit)
    }

    /// Makes this the current program.
    pub fn activation(&self) -> Activation<A> {
        Activation::new(self.api.clone(), self.handle)
    }

    /// Compiles and links the two stages, replacing any previous code.
    ///
    /// On failure the program stays unlinked and may be retried.
    pub fn set_shaders(&mut self, vertex: &str, fragment: &str) -> Result<()> {
        self.linked = false;

        let vert = self.api.create_shader(ShaderStage::Vertex);
        let frag = self.api.create_shader(ShaderStage::Fragment);
        let result = self.compile_and_link([
            (vert, ShaderStage::Vertex, vertex),
            (frag, ShaderStage::Fragment, fragment),
        ]);
        // Stage objects are only needed until the link completes.
        self.api.delete_shader(vert);
        self.api.delete_shader(frag);
        result?;

        self.active_variables = self.collect_active_variables();
        self.unset_variables = self.active_variables.clone();
        self.locations.clear();
        self.invalid_names.clear();
        self.samplers.clear();
        self.attributes.clear();
        self.validated = false;
        self.linked = true;
        log::debug!(
            "Program {} linked with {} active variables",
            self.handle,
            self.active_variables.len()
        );
        Ok(())
    }

    fn compile_and_link(&self, stages: [(u32, ShaderStage, &str); 2]) -> Result<()> {
        for (shader, stage, source) in stages {
            self.api.shader_source(shader, source);
            self.api.compile_shader(shader);
            if !self.api.shader_compile_status(shader) {
                return Err(GlooError::ShaderCompile {
                    stage,
                    log: self.api.shader_info_log(shader),
                });
            }
        }

        for (shader, _, _) in stages {
            self.api.attach_shader(self.handle, shader);
        }
        self.api.link_program(self.handle);
        let link_log = if self.api.program_link_status(self.handle) {
            None
        } else {
            Some(self.api.program_info_log(self.handle))
        };
        for (shader, _, _) in stages {
            self.api.detach_shader(self.handle, shader);
        }

        match link_log {
            Some(log) => Err(GlooError::ProgramLink { log }),
            None => Ok(()),
        }
    }

    fn collect_active_variables(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for index in 0..self.api.active_attribute_count(self.handle) {
            expand_variable(&self.api.active_attribute(self.handle, index), &mut names);
        }
        for index in 0..self.api.active_uniform_count(self.handle) {
            expand_variable(&self.api.active_uniform(self.handle, index), &mut names);
        }
        names
    }

    fn ensure_linked(&self) -> Result<()> {
        if self.linked {
            Ok(())
        } else {
            Err(GlooError::ProgramNotLinked)
        }
    }

    fn lookup(&mut self, name: &str, kind: VariableKind) -> Lookup {
        if let Some(&location) = self.locations.get(name) {
            return Lookup::Found(location);
        }
        if self.invalid_names.contains(name) {
            return Lookup::KnownInvalid;
        }

        let location = match kind {
            VariableKind::Uniform => self.api.uniform_location(self.handle, name),
            VariableKind::Attribute => self.api.attrib_location(self.handle, name),
        };
        if location < 0 {
            self.invalid_names.insert(name.to_string());
            return Lookup::NewlyInvalid;
        }

        self.locations.insert(name.to_string(), location);
        Lookup::Found(location)
    }

    /// Resolves a uniform location, warning once for names without one.
    fn uniform_location(&mut self, name: &str) -> Option<i32> {
        match self.lookup(name, VariableKind::Uniform) {
            Lookup::Found(location) => Some(location),
            Lookup::NewlyInvalid => {
                log::warn!("Variable {} is not an active {}", name, VariableKind::Uniform);
                None
            }
            Lookup::KnownInvalid => None,
        }
    }

    /// Records that `name` and its first `count` array elements have a value.
    fn mark_set(&mut self, name: &str, count: usize) {
        self.unset_variables.remove(name);
        for index in 0..count {
            self.unset_variables.remove(&format!("{}[{}]", name, index));
        }
    }

    /// Uploads a uniform value. Array uniforms take all elements at once.
    pub fn set_uniform<'v>(
        &mut self,
        name: &str,
        ty: UniformType,
        value: impl Into<UniformValue<'v>>,
    ) -> Result<()> {
        self.ensure_linked()?;
        let value = value.into();
        let Some(location) = self.uniform_location(name) else {
            return Ok(());
        };
        uniform::check_value(ty, &value).map_err(|reason| GlooError::UniformValue {
            name: name.to_string(),
            reason,
        })?;

        self.mark_set(name, value.len() / ty.components());
        self.activation().upload_uniform(location, ty, value);
        Ok(())
    }

    /// Records an attribute source; it is applied at draw time.
    pub fn set_attribute(
        &mut self,
        name: &str,
        ty: AttributeType,
        value: AttributeValue,
    ) -> Result<()> {
        self.ensure_linked()?;
        let location = match self.lookup(name, VariableKind::Attribute) {
            Lookup::Found(location) => location,
            Lookup::NewlyInvalid => {
                match value {
                    // Usually an unused member of an interleaved vertex buffer.
                    AttributeValue::Buffer { offset, .. } if offset > 0 => {
                        log::debug!("Skipping unused buffer attribute {}", name)
                    }
                    _ => log::warn!(
                        "Variable {} is not an active {}",
                        name,
                        VariableKind::Attribute
                    ),
                }
                return Ok(());
            }
            Lookup::KnownInvalid => return Ok(()),
        };

        if let AttributeValue::Constant(values) = &value {
            if values.len() != ty.components() {
                return Err(GlooError::AttributeValue {
                    name: name.to_string(),
                    reason: format!(
                        "{} values for {:?}, expected {}",
                        values.len(),
                        ty,
                        ty.components()
                    ),
                });
            }
        }

        self.mark_set(name, 0);
        self.attributes.insert(
            name.to_string(),
            AttributeBinding::new(location as u32, ty, value),
        );
        Ok(())
    }

    /// Attaches `texture` to the sampler `name`.
    pub fn set_texture(&mut self, name: &str, texture: &Texture2D<A>) -> Result<()> {
        self.bind_sampler(name, texture.target(), texture.handle())
    }

    /// Attaches the texture `texture` of kind `target` to the sampler `name`.
    ///
    /// The first texture set for a name fixes its unit for the rest of the link.
    pub fn bind_sampler(&mut self, name: &str, target: u32, texture: u32) -> Result<()> {
        self.ensure_linked()?;
        let Some(location) = self.uniform_location(name) else {
            return Ok(());
        };

        self.mark_set(name, 0);
        let unit = match self.samplers.get(name) {
            Some(binding) => binding.unit,
            None => self.samplers.len() as u32,
        };
        self.samplers.insert(
            name.to_string(),
            SamplerBinding {
                target,
                texture,
                unit,
            },
        );
        self.activation().set_sampler_unit(location, unit);
        Ok(())
    }

    /// Draws `selection` with every recorded binding applied.
    ///
    /// An empty selection does nothing.
    pub fn draw(&mut self, mode: DrawMode, selection: Selection) -> Result<()> {
        self.ensure_linked()?;
        if selection.count() == 0 {
            return Ok(());
        }

        let count = gl_int("draw count", selection.count())?;
        let first = match selection {
            Selection::Range { first, .. } => gl_int("first vertex", first)?,
            Selection::Elements { .. } => 0,
        };

        check_error(&*self.api, "before draw")?;
        let activation = self.pre_draw()?;
        match selection {
            Selection::Elements {
                buffer, index_type, ..
            } => activation.draw_elements(mode, buffer, index_type, count),
            Selection::Range { .. } => activation.draw_arrays(mode, first, count),
        }
        check_error(&*self.api, "after draw")
    }

    fn pre_draw(&mut self) -> Result<Activation<A>> {
        let activation = self.activation();
        for binding in self.samplers.values() {
            activation.bind_sampler(binding);
        }
        for binding in self.attributes.values() {
            activation.apply_attribute(binding);
        }
        // Only now are sampler units final.
        if !self.validated {
            self.validated = true;
            self.validate()?;
        }
        Ok(activation)
    }

    fn validate(&self) -> Result<()> {
        if !self.unset_variables.is_empty() {
            let mut names: Vec<&str> = self.unset_variables.iter().map(String::as_str).collect();
            names.sort_unstable();
            log::warn!("Program has unset variables: {}", names.join(", "));
        }

        self.api.validate_program(self.handle);
        if self.api.program_validate_status(self.handle) {
            Ok(())
        } else {
            Err(GlooError::ProgramValidation {
                log: self.api.program_info_log(self.handle),
            })
        }
    }
}

impl<A: GraphicsApi> GpuResource for ShaderProgram<A> {
    fn handle(&self) -> u32 {
        self.handle
    }

    fn activate(&self) {
        self.api.use_program(self.handle);
    }

    fn deactivate(&self) {
        self.api.use_program(0);
    }
}

impl<A: GraphicsApi> Drop for ShaderProgram<A> {
    fn drop(&mut self) {
        self.api.delete_program(self.handle);
    }
}

/// Splits `name[index]` into `name`. Only a trailing subscript counts.
fn array_base(name: &str) -> Option<&str> {
    let name = name.trim_end();
    let inner = name.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let index = &inner[open + 1..];
    let base = inner[..open].trim_end();
    if base.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(base)
}

fn expand_variable(variable: &ActiveVariable, names: &mut HashSet<String>) {
    let base = array_base(&variable.name);
    if base.is_none() && variable.size <= 1 {
        names.insert(variable.name.clone());
        return;
    }
    let base = base.unwrap_or(variable.name.as_str());
    for index in 0..variable.size.max(1) {
        names.insert(format!("{}[{}]", base, index));
    }
}
