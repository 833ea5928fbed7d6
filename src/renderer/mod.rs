pub mod camera;
pub mod deferred;
pub mod device;
pub mod lights;
pub mod pass;
pub mod primitive;
pub mod program;
pub mod queue;
pub mod render_context;
pub mod shared;
pub mod state;
pub mod texture;
pub mod uniforms;
pub mod wgpu_state;

pub use camera::Camera;
pub use deferred::{DeferredPipeline, DeferredPrograms, FramePhase, GBuffer, PipelineError};
pub use device::{ClearFlags, Device, DeviceCall, DeviceError, RecordingDevice, RenderTarget, TargetId};
pub use lights::{DirectionalLight, Light, LightSet, PointLight};
pub use pass::{Pass, PassId, SamplerStateIndex, StateError, UniformStateIndex};
pub use primitive::{BufferId, GeometryPool, LightVertex, PrimitiveRange, PrimitiveType, VertexRange};
pub use program::{
    Attribute, AttributeType, InterfaceError, ProgramId, ProgramInterface, ProgramReflection,
    Sampler, SamplerType, Uniform,
};
pub use queue::{Bucket, Operation, QueueError, RenderQueue};
pub use render_context::{FrameStats, RenderContext};
pub use shared::{CameraProperties, DerivedMatrix, SharedId, SharedProgramState, SharedSignature};
pub use state::{BlendFactor, CompareFunction, CullMode, RenderState, StencilOp, StencilState};
pub use texture::{FilterMode, Texture, TextureDescriptor, TextureFormat, TextureId, TextureKind};
pub use uniforms::{pack_uniforms, UniformType, UniformValue};
