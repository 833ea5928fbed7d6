// renderer/state.rs
//
// Fixed-function toggles pushed to the device after a pass's uniforms.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Always,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    Decrement,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    pub function: CompareFunction,
    pub reference: u32,
    pub write_mask: u32,
    pub stencil_fail: StencilOp,
    pub depth_fail: StencilOp,
    pub depth_pass: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            function: CompareFunction::Always,
            reference: 0,
            write_mask: !0,
            stencil_fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            depth_pass: StencilOp::Keep,
        }
    }
}

/// Raster, blend, depth and stencil configuration of one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub cull_mode: CullMode,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub depth_testing: bool,
    pub depth_writing: bool,
    pub depth_function: CompareFunction,
    pub stencil_testing: bool,
    pub stencil: StencilState,
    pub color_writing: bool,
    pub wireframe: bool,
    pub line_smoothing: bool,
    pub multisampling: bool,
    pub line_width: f32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            depth_testing: true,
            depth_writing: true,
            depth_function: CompareFunction::LessEqual,
            stencil_testing: false,
            stencil: StencilState::default(),
            color_writing: true,
            wireframe: false,
            line_smoothing: false,
            multisampling: true,
            line_width: 1.0,
        }
    }
}

impl RenderState {
    /// Additive blending with depth test and write disabled; the state every
    /// light accumulation pass uses.
    pub fn additive_overlay() -> Self {
        Self {
            cull_mode: CullMode::None,
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::One,
            depth_testing: false,
            depth_writing: false,
            ..Self::default()
        }
    }

    pub fn is_blending(&self) -> bool {
        self.src_factor != BlendFactor::One || self.dst_factor != BlendFactor::Zero
    }

    pub fn is_culling(&self) -> bool {
        self.cull_mode != CullMode::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_opaque() {
        let state = RenderState::default();
        assert!(!state.is_blending());
        assert!(state.is_culling());
        assert!(state.depth_testing && state.depth_writing);
    }

    #[test]
    fn additive_overlay_blends_without_depth() {
        let state = RenderState::additive_overlay();
        assert!(state.is_blending());
        assert!(!state.depth_testing);
        assert!(!state.depth_writing);
        assert_eq!((state.src_factor, state.dst_factor), (BlendFactor::One, BlendFactor::One));
    }
}
