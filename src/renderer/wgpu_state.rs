// renderer/wgpu_state.rs
//
// Translation of pass raster state into wgpu pipeline descriptors. A
// wgpu-backed `Device` builds its pipeline key from these in
// `set_render_state` and `draw`, and writes uniform buffers from
// `uniforms::pack_uniforms`. Line width and line smoothing have no wgpu
// equivalent and are dropped.
use crate::renderer::primitive::PrimitiveType;
use crate::renderer::state::{BlendFactor, CompareFunction, CullMode, RenderState, StencilOp};
use crate::renderer::texture::TextureFormat;

impl From<BlendFactor> for wgpu::BlendFactor {
    fn from(factor: BlendFactor) -> Self {
        match factor {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SrcColor => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DstColor => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        }
    }
}

impl From<CompareFunction> for wgpu::CompareFunction {
    fn from(function: CompareFunction) -> Self {
        match function {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Always => wgpu::CompareFunction::Always,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        }
    }
}

impl From<StencilOp> for wgpu::StencilOperation {
    fn from(op: StencilOp) -> Self {
        match op {
            StencilOp::Keep => wgpu::StencilOperation::Keep,
            StencilOp::Zero => wgpu::StencilOperation::Zero,
            StencilOp::Replace => wgpu::StencilOperation::Replace,
            StencilOp::Increment => wgpu::StencilOperation::IncrementClamp,
            StencilOp::Decrement => wgpu::StencilOperation::DecrementClamp,
            StencilOp::Invert => wgpu::StencilOperation::Invert,
            StencilOp::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
            StencilOp::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
        }
    }
}

impl From<TextureFormat> for wgpu::TextureFormat {
    fn from(format: TextureFormat) -> Self {
        match format {
            TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }
}

/// wgpu has no triangle fans; those return `None`.
pub fn topology(primitive: PrimitiveType) -> Option<wgpu::PrimitiveTopology> {
    match primitive {
        PrimitiveType::Points => Some(wgpu::PrimitiveTopology::PointList),
        PrimitiveType::Lines => Some(wgpu::PrimitiveTopology::LineList),
        PrimitiveType::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
        PrimitiveType::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
        PrimitiveType::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
        PrimitiveType::TriangleFan => None,
    }
}

/// Primitive state for drawing `primitive` with `state`.
///
/// Returns `None` when wgpu cannot express the combination: triangle fans,
/// or culling both faces (which draws no triangles at all).
pub fn primitive_state(
    state: &RenderState,
    primitive: PrimitiveType,
) -> Option<wgpu::PrimitiveState> {
    let cull_mode = match state.cull_mode {
        CullMode::None => None,
        CullMode::Back => Some(wgpu::Face::Back),
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Both => return None,
    };

    Some(wgpu::PrimitiveState {
        topology: topology(primitive)?,
        cull_mode,
        front_face: wgpu::FrontFace::Ccw,
        polygon_mode: if state.wireframe {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        },
        ..Default::default()
    })
}

pub fn blend_state(state: &RenderState) -> Option<wgpu::BlendState> {
    if !state.is_blending() {
        return None;
    }

    let component = wgpu::BlendComponent {
        src_factor: state.src_factor.into(),
        dst_factor: state.dst_factor.into(),
        operation: wgpu::BlendOperation::Add,
    };
    Some(wgpu::BlendState {
        color: component,
        alpha: component,
    })
}

pub fn color_writes(state: &RenderState) -> wgpu::ColorWrites {
    if state.color_writing {
        wgpu::ColorWrites::ALL
    } else {
        wgpu::ColorWrites::empty()
    }
}

pub fn depth_stencil_state(
    state: &RenderState,
    format: wgpu::TextureFormat,
) -> wgpu::DepthStencilState {
    let depth_compare = if state.depth_testing {
        state.depth_function.into()
    } else {
        wgpu::CompareFunction::Always
    };

    let stencil = if state.stencil_testing {
        let face = wgpu::StencilFaceState {
            compare: state.stencil.function.into(),
            fail_op: state.stencil.stencil_fail.into(),
            depth_fail_op: state.stencil.depth_fail.into(),
            pass_op: state.stencil.depth_pass.into(),
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask: !0,
            write_mask: state.stencil.write_mask,
        }
    } else {
        wgpu::StencilState::default()
    };

    wgpu::DepthStencilState {
        format,
        depth_write_enabled: state.depth_writing,
        depth_compare,
        stencil,
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Sample count for a pass given the surface's configured count.
pub fn sample_count(state: &RenderState, surface_samples: u32) -> u32 {
    if state.multisampling {
        surface_samples.max(1)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_state_has_no_blend() {
        assert!(blend_state(&RenderState::default()).is_none());
    }

    #[test]
    fn additive_overlay_maps_to_one_one() {
        let blend = blend_state(&RenderState::additive_overlay()).expect("blending");
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn disabled_depth_test_always_passes() {
        let state = RenderState::additive_overlay();
        let depth = depth_stencil_state(&state, wgpu::TextureFormat::Depth32Float);
        assert_eq!(depth.depth_compare, wgpu::CompareFunction::Always);
        assert!(!depth.depth_write_enabled);
    }

    #[test]
    fn stencil_write_mask_is_forwarded() {
        let mut state = RenderState::default();
        state.stencil_testing = true;
        state.stencil.write_mask = 0x0f;
        state.stencil.depth_pass = StencilOp::Increment;

        let depth = depth_stencil_state(&state, wgpu::TextureFormat::Depth24PlusStencil8);
        assert_eq!(depth.stencil.write_mask, 0x0f);
        assert_eq!(depth.stencil.front.pass_op, wgpu::StencilOperation::IncrementClamp);
    }

    #[test]
    fn fans_and_double_culling_are_unrepresentable() {
        let state = RenderState::default();
        assert!(primitive_state(&state, PrimitiveType::TriangleFan).is_none());

        let both = RenderState {
            cull_mode: CullMode::Both,
            ..RenderState::default()
        };
        assert!(primitive_state(&both, PrimitiveType::Triangles).is_none());
    }

    #[test]
    fn wireframe_uses_line_polygons() {
        let state = RenderState {
            wireframe: true,
            ..RenderState::default()
        };
        let primitive = primitive_state(&state, PrimitiveType::Triangles).expect("representable");
        assert_eq!(primitive.polygon_mode, wgpu::PolygonMode::Line);
        assert_eq!(primitive.cull_mode, Some(wgpu::Face::Back));
    }
}
