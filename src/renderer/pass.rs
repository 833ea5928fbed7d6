// renderer/pass.rs
//
// A pass binds one program to concrete per-draw values: local uniform
// values, textures for local samplers, and the raster state to push.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::renderer::device::Device;
use crate::renderer::program::{ProgramReflection, SamplerType, Uniform};
use crate::renderer::render_context::RenderContext;
use crate::renderer::state::{BlendFactor, CompareFunction, CullMode, RenderState, StencilOp};
use crate::renderer::texture::{Texture, TextureKind};
use crate::renderer::uniforms::{UniformType, UniformValue};

static NEXT_PASS_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub u32);

impl PassId {
    fn allocate() -> Self {
        Self(NEXT_PASS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no program is bound")]
    NoProgram,
    #[error("unknown uniform '{0}'")]
    UnknownUniform(String),
    #[error("unknown sampler '{0}'")]
    UnknownSampler(String),
    #[error("uniform '{0}' is shared and cannot be set on a pass")]
    SharedUniform(String),
    #[error("sampler '{0}' is shared and cannot be set on a pass")]
    SharedSampler(String),
    #[error("uniform '{name}' is declared as {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: UniformType,
        found: UniformType,
    },
    #[error("sampler '{name}' is a {expected} and cannot read a {found:?} texture")]
    SamplerMismatch {
        name: String,
        expected: SamplerType,
        found: TextureKind,
    },
    #[error("uniform '{name}' holds {expected} elements, got {found}")]
    ElementCount {
        name: String,
        expected: u16,
        found: usize,
    },
    #[error("state index was resolved against a different program layout")]
    StaleIndex,
    #[error("no shared program state is active for shared input '{0}'")]
    NoSharedState(String),
}

/// Opaque handle to a local uniform of a pass's program.
///
/// Resolve once with [`Pass::uniform_state_index`] after every
/// [`Pass::set_program`] and reuse it on the hot path. The index is bound
/// to the program's exact uniform and sampler layout, so it stays valid on
/// any pass whose program has the same layout and is stale everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformStateIndex {
    layout: u64,
    index: usize,
    offset: usize,
}

/// Opaque handle to a local sampler of a pass's program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerStateIndex {
    layout: u64,
    index: usize,
    slot: usize,
}

impl SamplerStateIndex {
    /// Texture unit the sampler is bound to during `apply`.
    pub fn unit(&self) -> u32 {
        self.index as u32
    }
}

#[derive(Debug)]
pub struct Pass {
    id: PassId,
    program: Option<Arc<ProgramReflection>>,
    layout: u64,
    values: Vec<UniformValue>,
    textures: Vec<Option<Texture>>,
    state: RenderState,
}

impl Default for Pass {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Pass {
    /// Copies values, textures and raster state; the copy gets its own ID.
    fn clone(&self) -> Self {
        Self {
            id: PassId::allocate(),
            program: self.program.clone(),
            layout: self.layout,
            values: self.values.clone(),
            textures: self.textures.clone(),
            state: self.state,
        }
    }
}

impl Pass {
    pub fn new() -> Self {
        Self {
            id: PassId::allocate(),
            program: None,
            layout: 0,
            values: Vec::new(),
            textures: Vec::new(),
            state: RenderState::default(),
        }
    }

    pub fn with_program(program: Arc<ProgramReflection>) -> Self {
        let mut pass = Self::new();
        pass.set_program(Some(program));
        pass
    }

    pub fn id(&self) -> PassId {
        self.id
    }

    pub fn program(&self) -> Option<&Arc<ProgramReflection>> {
        self.program.as_ref()
    }

    /// Binds a new program (or detaches with `None`), zeroing all local
    /// values and textures. Indices resolved earlier stop being valid.
    pub fn set_program(&mut self, program: Option<Arc<ProgramReflection>>) {
        self.values.clear();
        self.textures.clear();
        self.layout = program.as_deref().map_or(0, layout_fingerprint);

        if let Some(program) = program.as_deref() {
            for uniform in program.uniforms().iter().filter(|u| !u.is_shared()) {
                let zero = UniformValue::zero(uniform.ty);
                self.values
                    .extend(std::iter::repeat(zero).take(uniform.element_count as usize));
            }
            let local_samplers = program.samplers().iter().filter(|s| !s.is_shared()).count();
            self.textures.resize(local_samplers, None);
        }

        self.program = program;
    }

    pub fn has_uniform_state(&self, name: &str) -> bool {
        self.program
            .as_deref()
            .and_then(|p| p.find_uniform(name))
            .is_some_and(|u| !u.is_shared())
    }

    pub fn has_sampler_state(&self, name: &str) -> bool {
        self.program
            .as_deref()
            .and_then(|p| p.find_sampler(name))
            .is_some_and(|s| !s.is_shared())
    }

    pub fn uniform_state_index(&self, name: &str) -> Result<UniformStateIndex, StateError> {
        let program = self.program.as_deref().ok_or(StateError::NoProgram)?;

        let mut offset = 0usize;
        for (index, uniform) in program.uniforms().iter().enumerate() {
            if uniform.name == name {
                if uniform.is_shared() {
                    return Err(StateError::SharedUniform(name.to_owned()));
                }
                return Ok(UniformStateIndex {
                    layout: self.layout,
                    index,
                    offset,
                });
            }
            if !uniform.is_shared() {
                offset += uniform.element_count as usize;
            }
        }

        Err(StateError::UnknownUniform(name.to_owned()))
    }

    pub fn sampler_state_index(&self, name: &str) -> Result<SamplerStateIndex, StateError> {
        let program = self.program.as_deref().ok_or(StateError::NoProgram)?;

        let mut slot = 0usize;
        for (index, sampler) in program.samplers().iter().enumerate() {
            if sampler.name == name {
                if sampler.is_shared() {
                    return Err(StateError::SharedSampler(name.to_owned()));
                }
                return Ok(SamplerStateIndex {
                    layout: self.layout,
                    index,
                    slot,
                });
            }
            if !sampler.is_shared() {
                slot += 1;
            }
        }

        Err(StateError::UnknownSampler(name.to_owned()))
    }

    /// Sets a local uniform by name. On failure the stored value is kept.
    pub fn set_uniform(
        &mut self,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), StateError> {
        let value = value.into();
        let result = self
            .uniform_state_index(name)
            .and_then(|index| self.write_uniform(index, std::slice::from_ref(&value)));
        report(result)
    }

    pub fn set_uniform_at(
        &mut self,
        index: UniformStateIndex,
        value: impl Into<UniformValue>,
    ) -> Result<(), StateError> {
        let value = value.into();
        report(self.write_uniform(index, std::slice::from_ref(&value)))
    }

    /// Writes the leading elements of an array uniform.
    pub fn set_uniform_array(
        &mut self,
        index: UniformStateIndex,
        values: &[UniformValue],
    ) -> Result<(), StateError> {
        report(self.write_uniform(index, values))
    }

    pub fn uniform(&self, name: &str) -> Result<UniformValue, StateError> {
        self.uniform_at(self.uniform_state_index(name)?)
    }

    pub fn uniform_at(&self, index: UniformStateIndex) -> Result<UniformValue, StateError> {
        Ok(self.uniform_array_at(index)?[0])
    }

    pub fn uniform_array_at(&self, index: UniformStateIndex) -> Result<&[UniformValue], StateError> {
        let program = self.program.as_deref().ok_or(StateError::NoProgram)?;
        let uniform = resolve_uniform(program, self.layout, index)?;
        let end = index.offset + uniform.element_count as usize;
        self.values
            .get(index.offset..end)
            .ok_or(StateError::StaleIndex)
    }

    pub fn set_sampler(&mut self, name: &str, texture: Option<Texture>) -> Result<(), StateError> {
        let result = self
            .sampler_state_index(name)
            .and_then(|index| self.write_sampler(index, texture));
        report(result)
    }

    pub fn set_sampler_at(
        &mut self,
        index: SamplerStateIndex,
        texture: Option<Texture>,
    ) -> Result<(), StateError> {
        report(self.write_sampler(index, texture))
    }

    pub fn sampler(&self, name: &str) -> Result<Option<Texture>, StateError> {
        self.sampler_at(self.sampler_state_index(name)?)
    }

    pub fn sampler_at(&self, index: SamplerStateIndex) -> Result<Option<Texture>, StateError> {
        let program = self.program.as_deref().ok_or(StateError::NoProgram)?;
        check_sampler_index(program, self.layout, index)?;
        self.textures
            .get(index.slot)
            .copied()
            .ok_or(StateError::StaleIndex)
    }

    fn write_uniform(
        &mut self,
        index: UniformStateIndex,
        values: &[UniformValue],
    ) -> Result<(), StateError> {
        let program = self.program.as_deref().ok_or(StateError::NoProgram)?;
        let uniform = resolve_uniform(program, self.layout, index)?;

        if values.is_empty() || values.len() > uniform.element_count as usize {
            return Err(StateError::ElementCount {
                name: uniform.name.clone(),
                expected: uniform.element_count,
                found: values.len(),
            });
        }
        if let Some(wrong) = values.iter().find(|v| v.uniform_type() != uniform.ty) {
            return Err(StateError::TypeMismatch {
                name: uniform.name.clone(),
                expected: uniform.ty,
                found: wrong.uniform_type(),
            });
        }

        let end = index.offset + values.len();
        let target = self
            .values
            .get_mut(index.offset..end)
            .ok_or(StateError::StaleIndex)?;
        target.copy_from_slice(values);
        Ok(())
    }

    fn write_sampler(
        &mut self,
        index: SamplerStateIndex,
        texture: Option<Texture>,
    ) -> Result<(), StateError> {
        let program = self.program.as_deref().ok_or(StateError::NoProgram)?;
        check_sampler_index(program, self.layout, index)?;

        let sampler = program
            .samplers()
            .get(index.index)
            .ok_or(StateError::StaleIndex)?;
        if let Some(texture) = &texture {
            if !sampler.ty.accepts(texture.kind) {
                return Err(StateError::SamplerMismatch {
                    name: sampler.name.clone(),
                    expected: sampler.ty,
                    found: texture.kind,
                });
            }
        }

        let slot = self
            .textures
            .get_mut(index.slot)
            .ok_or(StateError::StaleIndex)?;
        *slot = texture;
        Ok(())
    }

    /// Pushes this pass to the device: program, then every sampler in
    /// declaration order, then every uniform, then raster state.
    ///
    /// Shared inputs are pulled from the context's active
    /// [`SharedProgramState`](crate::renderer::SharedProgramState). Failures
    /// are logged and counted; the rest of the pass still applies.
    pub fn apply<D: Device>(&self, context: &mut RenderContext<D>) {
        let Some(program) = self.program.as_deref() else {
            context.report(&StateError::NoProgram);
            return;
        };

        let RenderContext {
            device,
            shared,
            stats,
        } = context;

        device.set_program(program.id());

        let mut slot = 0usize;
        for (unit, sampler) in program.samplers().iter().enumerate() {
            let unit = unit as u32;
            if !sampler.is_shared() {
                device.bind_texture(unit, self.textures[slot].as_ref());
                slot += 1;
                continue;
            }

            let result = match shared.as_ref() {
                Some(shared) => shared.update_sampler(sampler, unit, device),
                None => Err(StateError::NoSharedState(sampler.name.clone())),
            };
            if let Err(err) = result {
                stats.record_error(&err);
            }
        }

        let mut offset = 0usize;
        for (location, uniform) in program.uniforms().iter().enumerate() {
            let location = location as u32;
            if !uniform.is_shared() {
                let count = uniform.element_count as usize;
                device.upload_uniform(location, &self.values[offset..offset + count]);
                offset += count;
                continue;
            }

            let result = match shared.as_mut() {
                Some(shared) => shared.update_uniform(uniform, location, device),
                None => Err(StateError::NoSharedState(uniform.name.clone())),
            };
            if let Err(err) = result {
                stats.record_error(&err);
            }
        }

        device.set_render_state(&self.state);
        stats.passes_applied += 1;
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn set_state(&mut self, state: RenderState) {
        self.state = state;
    }

    pub fn is_blending(&self) -> bool {
        self.state.is_blending()
    }

    pub fn is_culling(&self) -> bool {
        self.state.is_culling()
    }

    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.state.cull_mode = mode;
    }

    pub fn set_blend_factors(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.src_factor = src;
        self.state.dst_factor = dst;
    }

    pub fn set_depth_testing(&mut self, enabled: bool) {
        self.state.depth_testing = enabled;
    }

    pub fn set_depth_writing(&mut self, enabled: bool) {
        self.state.depth_writing = enabled;
    }

    pub fn set_depth_function(&mut self, function: CompareFunction) {
        self.state.depth_function = function;
    }

    pub fn set_stencil_testing(&mut self, enabled: bool) {
        self.state.stencil_testing = enabled;
    }

    pub fn set_stencil_function(&mut self, function: CompareFunction, reference: u32) {
        self.state.stencil.function = function;
        self.state.stencil.reference = reference;
    }

    pub fn set_stencil_write_mask(&mut self, mask: u32) {
        self.state.stencil.write_mask = mask;
    }

    pub fn set_stencil_operations(
        &mut self,
        stencil_fail: StencilOp,
        depth_fail: StencilOp,
        depth_pass: StencilOp,
    ) {
        self.state.stencil.stencil_fail = stencil_fail;
        self.state.stencil.depth_fail = depth_fail;
        self.state.stencil.depth_pass = depth_pass;
    }

    pub fn set_color_writing(&mut self, enabled: bool) {
        self.state.color_writing = enabled;
    }

    pub fn set_wireframe(&mut self, enabled: bool) {
        self.state.wireframe = enabled;
    }

    pub fn set_line_smoothing(&mut self, enabled: bool) {
        self.state.line_smoothing = enabled;
    }

    pub fn set_multisampling(&mut self, enabled: bool) {
        self.state.multisampling = enabled;
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.state.line_width = width;
    }
}

/// Hash of everything that decides where a local value or texture lives.
fn layout_fingerprint(program: &ProgramReflection) -> u64 {
    let mut hasher = DefaultHasher::new();
    program.id().hash(&mut hasher);
    for uniform in program.uniforms() {
        uniform.name.hash(&mut hasher);
        uniform.ty.hash(&mut hasher);
        uniform.shared.hash(&mut hasher);
        uniform.element_count.hash(&mut hasher);
    }
    for sampler in program.samplers() {
        sampler.name.hash(&mut hasher);
        sampler.ty.hash(&mut hasher);
        sampler.shared.hash(&mut hasher);
    }
    hasher.finish()
}

fn resolve_uniform(
    program: &ProgramReflection,
    layout: u64,
    index: UniformStateIndex,
) -> Result<&Uniform, StateError> {
    if index.layout != layout {
        return Err(StateError::StaleIndex);
    }
    program
        .uniforms()
        .get(index.index)
        .filter(|u| !u.is_shared())
        .ok_or(StateError::StaleIndex)
}

fn check_sampler_index(
    program: &ProgramReflection,
    layout: u64,
    index: SamplerStateIndex,
) -> Result<(), StateError> {
    let valid = index.layout == layout
        && program
            .samplers()
            .get(index.index)
            .is_some_and(|s| !s.is_shared());
    if valid {
        Ok(())
    } else {
        Err(StateError::StaleIndex)
    }
}

fn report<T>(result: Result<T, StateError>) -> Result<T, StateError> {
    if let Err(err) = &result {
        log::warn!("Pass state rejected: {}", err);
    }
    result
}
