// renderer/device.rs
//
// The seam to the graphics API. Passes and queues issue calls in a fixed
// order: program, samplers in declaration order, uniforms in declaration
// order, then raster state.
use std::collections::HashMap;

use bitflags::bitflags;
use glam::Vec4;
use thiserror::Error;

use crate::renderer::primitive::{PrimitiveRange, VertexRange};
use crate::renderer::program::ProgramId;
use crate::renderer::state::RenderState;
use crate::renderer::texture::{Texture, TextureDescriptor, TextureId};
use crate::renderer::uniforms::{pack_uniforms, UniformValue};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// Where draws land: the real output surface or an off-screen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    Output,
    Offscreen(TargetId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("out of device memory creating {0}")]
    OutOfMemory(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub trait Device {
    fn set_program(&mut self, program: ProgramId);
    fn bind_texture(&mut self, unit: u32, texture: Option<&Texture>);
    /// Uploads `values` to the uniform declared at `location` in the
    /// current program.
    fn upload_uniform(&mut self, location: u32, values: &[UniformValue]);
    fn set_render_state(&mut self, state: &RenderState);
    fn set_target(&mut self, target: RenderTarget);
    fn clear(&mut self, flags: ClearFlags, color: Vec4, depth: f32);
    fn write_vertices(&mut self, range: &VertexRange, bytes: &[u8]);
    fn draw(&mut self, range: &PrimitiveRange);
    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<Texture, DeviceError>;
    fn create_target(
        &mut self,
        colors: &[Texture],
        depth: Option<&Texture>,
    ) -> Result<TargetId, DeviceError>;
}

/// One call received by a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetProgram(ProgramId),
    BindTexture {
        unit: u32,
        texture: Option<TextureId>,
    },
    Uniform {
        location: u32,
        values: Vec<UniformValue>,
    },
    RenderState(RenderState),
    SetTarget(RenderTarget),
    Clear {
        flags: ClearFlags,
        color: Vec4,
        depth: f32,
    },
    WriteVertices {
        range: VertexRange,
        bytes: Vec<u8>,
    },
    Draw(PrimitiveRange),
}

/// Device that performs nothing and remembers every call.
///
/// Uniform uploads are also packed into per-location byte buffers, the
/// same bytes a wgpu-backed device writes into its uniform buffer.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
    uniform_bytes: HashMap<u32, Vec<u8>>,
    next_texture: u32,
    next_target: u32,
    texture_budget: Option<u32>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits how many textures may be created before creation fails.
    pub fn with_texture_budget(budget: u32) -> Self {
        Self {
            texture_budget: Some(budget),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DeviceCall::Draw(_)))
            .count()
    }

    /// Bytes most recently uploaded to a uniform location.
    pub fn uniform_bytes(&self, location: u32) -> Option<&[u8]> {
        self.uniform_bytes.get(&location).map(Vec::as_slice)
    }

    fn record(&mut self, call: DeviceCall) {
        log::trace!("device: {:?}", call);
        self.calls.push(call);
    }
}

impl Device for RecordingDevice {
    fn set_program(&mut self, program: ProgramId) {
        self.record(DeviceCall::SetProgram(program));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<&Texture>) {
        self.record(DeviceCall::BindTexture {
            unit,
            texture: texture.map(|t| t.id),
        });
    }

    fn upload_uniform(&mut self, location: u32, values: &[UniformValue]) {
        self.uniform_bytes.insert(location, pack_uniforms(values));
        self.record(DeviceCall::Uniform {
            location,
            values: values.to_vec(),
        });
    }

    fn set_render_state(&mut self, state: &RenderState) {
        self.record(DeviceCall::RenderState(*state));
    }

    fn set_target(&mut self, target: RenderTarget) {
        self.record(DeviceCall::SetTarget(target));
    }

    fn clear(&mut self, flags: ClearFlags, color: Vec4, depth: f32) {
        self.record(DeviceCall::Clear {
            flags,
            color,
            depth,
        });
    }

    fn write_vertices(&mut self, range: &VertexRange, bytes: &[u8]) {
        self.record(DeviceCall::WriteVertices {
            range: *range,
            bytes: bytes.to_vec(),
        });
    }

    fn draw(&mut self, range: &PrimitiveRange) {
        self.record(DeviceCall::Draw(*range));
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<Texture, DeviceError> {
        if let Some(budget) = self.texture_budget {
            if self.next_texture >= budget {
                return Err(DeviceError::OutOfMemory(desc.label.to_owned()));
            }
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        Ok(Texture {
            id,
            kind: desc.kind,
            format: desc.format,
            width: desc.width,
            height: desc.height,
        })
    }

    fn create_target(
        &mut self,
        colors: &[Texture],
        depth: Option<&Texture>,
    ) -> Result<TargetId, DeviceError> {
        if colors.is_empty() && depth.is_none() {
            return Err(DeviceError::Unsupported(
                "render target without attachments".to_owned(),
            ));
        }
        let id = TargetId(self.next_target);
        self.next_target += 1;
        Ok(id)
    }
}
