// renderer/program.rs
//
// Reflected metadata for compiled programs. The shader compiler/linker fills
// these in; the core only reads them.
use std::fmt;

use thiserror::Error;

use crate::renderer::shared::{SharedId, SharedSignature};
use crate::renderer::texture::TextureKind;
use crate::renderer::uniforms::UniformType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub ty: AttributeType,
    pub slot: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    SamplerRect,
}

impl SamplerType {
    /// The texture dimensionality this sampler can read.
    pub fn texture_kind(self) -> TextureKind {
        match self {
            Self::Sampler1D => TextureKind::D1,
            Self::Sampler2D => TextureKind::D2,
            Self::Sampler3D => TextureKind::D3,
            Self::SamplerCube => TextureKind::Cube,
            Self::SamplerRect => TextureKind::Rect,
        }
    }

    pub fn accepts(self, kind: TextureKind) -> bool {
        self.texture_kind() == kind
    }
}

impl fmt::Display for SamplerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sampler1D => "sampler1D",
            Self::Sampler2D => "sampler2D",
            Self::Sampler3D => "sampler3D",
            Self::SamplerCube => "samplerCube",
            Self::SamplerRect => "sampler2DRect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sampler {
    pub name: String,
    pub ty: SamplerType,
    pub shared: Option<SharedId>,
}

impl Sampler {
    pub fn is_shared(&self) -> bool {
        self.shared.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub name: String,
    pub ty: UniformType,
    pub shared: Option<SharedId>,
    pub element_count: u16,
}

impl Uniform {
    pub fn is_shared(&self) -> bool {
        self.shared.is_some()
    }
}

/// Immutable description of one linked program.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramReflection {
    id: ProgramId,
    name: String,
    attributes: Vec<Attribute>,
    samplers: Vec<Sampler>,
    uniforms: Vec<Uniform>,
}

impl ProgramReflection {
    pub fn new(id: ProgramId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: Vec::new(),
            samplers: Vec::new(),
            uniforms: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, ty: AttributeType) -> Self {
        let slot = self.attributes.len() as u32;
        self.attributes.push(Attribute {
            name: name.into(),
            ty,
            slot,
        });
        self
    }

    pub fn with_uniform(self, name: impl Into<String>, ty: UniformType) -> Self {
        self.push_uniform(name.into(), ty, None, 1)
    }

    pub fn with_uniform_array(self, name: impl Into<String>, ty: UniformType, count: u16) -> Self {
        self.push_uniform(name.into(), ty, None, count.max(1))
    }

    pub fn with_shared_uniform(
        self,
        name: impl Into<String>,
        ty: UniformType,
        shared: SharedId,
    ) -> Self {
        self.push_uniform(name.into(), ty, Some(shared), 1)
    }

    pub fn with_sampler(mut self, name: impl Into<String>, ty: SamplerType) -> Self {
        self.samplers.push(Sampler {
            name: name.into(),
            ty,
            shared: None,
        });
        self
    }

    pub fn with_shared_sampler(
        mut self,
        name: impl Into<String>,
        ty: SamplerType,
        shared: SharedId,
    ) -> Self {
        self.samplers.push(Sampler {
            name: name.into(),
            ty,
            shared: Some(shared),
        });
        self
    }

    fn push_uniform(
        mut self,
        name: String,
        ty: UniformType,
        shared: Option<SharedId>,
        element_count: u16,
    ) -> Self {
        self.uniforms.push(Uniform {
            name,
            ty,
            shared,
            element_count,
        });
        self
    }

    /// Marks every uniform whose name and type match a reserved signature
    /// as shared. Uniforms that are already shared are left alone.
    pub fn resolve_shared(mut self, signatures: &[SharedSignature]) -> Self {
        for uniform in self.uniforms.iter_mut().filter(|u| !u.is_shared()) {
            if let Some(sig) = signatures
                .iter()
                .find(|sig| sig.name == uniform.name && sig.ty == uniform.ty)
            {
                uniform.shared = Some(sig.id);
            }
        }
        self
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn samplers(&self) -> &[Sampler] {
        &self.samplers
    }

    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    pub fn find_uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    pub fn find_sampler(&self, name: &str) -> Option<&Sampler> {
        self.samplers.iter().find(|s| s.name == name)
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    #[error("program '{program}' lacks uniform '{name}'")]
    MissingUniform { program: String, name: String },
    #[error("program '{program}' declares uniform '{name}' as {found}, expected {expected}")]
    UniformType {
        program: String,
        name: String,
        expected: UniformType,
        found: UniformType,
    },
    #[error("program '{program}' lacks sampler '{name}'")]
    MissingSampler { program: String, name: String },
    #[error("program '{program}' declares sampler '{name}' as {found}, expected {expected}")]
    SamplerType {
        program: String,
        name: String,
        expected: SamplerType,
        found: SamplerType,
    },
    #[error("program '{program}' lacks attribute '{name}'")]
    MissingAttribute { program: String, name: String },
}

/// A set of inputs a program must declare to be usable in a given role.
#[derive(Debug, Clone, Default)]
pub struct ProgramInterface {
    uniforms: Vec<(String, UniformType)>,
    samplers: Vec<(String, SamplerType)>,
    attributes: Vec<(String, AttributeType)>,
}

impl ProgramInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uniform(mut self, name: &str, ty: UniformType) -> Self {
        self.uniforms.push((name.to_owned(), ty));
        self
    }

    pub fn sampler(mut self, name: &str, ty: SamplerType) -> Self {
        self.samplers.push((name.to_owned(), ty));
        self
    }

    pub fn attribute(mut self, name: &str, ty: AttributeType) -> Self {
        self.attributes.push((name.to_owned(), ty));
        self
    }

    /// Checks `program` against this interface, reporting the first
    /// missing or mistyped input.
    pub fn matches(&self, program: &ProgramReflection) -> Result<(), InterfaceError> {
        let program_name = || program.name().to_owned();

        for (name, expected) in &self.uniforms {
            let uniform =
                program
                    .find_uniform(name)
                    .ok_or_else(|| InterfaceError::MissingUniform {
                        program: program_name(),
                        name: name.clone(),
                    })?;
            if uniform.ty != *expected {
                return Err(InterfaceError::UniformType {
                    program: program_name(),
                    name: name.clone(),
                    expected: *expected,
                    found: uniform.ty,
                });
            }
        }

        for (name, expected) in &self.samplers {
            let sampler =
                program
                    .find_sampler(name)
                    .ok_or_else(|| InterfaceError::MissingSampler {
                        program: program_name(),
                        name: name.clone(),
                    })?;
            if sampler.ty != *expected {
                return Err(InterfaceError::SamplerType {
                    program: program_name(),
                    name: name.clone(),
                    expected: *expected,
                    found: sampler.ty,
                });
            }
        }

        for (name, _) in &self.attributes {
            if program.find_attribute(name).is_none() {
                return Err(InterfaceError::MissingAttribute {
                    program: program_name(),
                    name: name.clone(),
                });
            }
        }

        Ok(())
    }
}
