// renderer/texture.rs
//
// Texture objects themselves live in the device layer; the core only passes
// around copyable handles describing them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Dimensionality of a texture, checked against sampler declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    D1,
    D2,
    D3,
    Cube,
    Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8,
    Rgba16Float,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Non-owning handle to a device texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Texture {
    pub id: TextureId,
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub filter: FilterMode,
}

impl<'a> TextureDescriptor<'a> {
    /// Nearest-filtered rectangle texture, as used for G-buffer attachments.
    pub fn render_target(label: &'a str, format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            label,
            kind: TextureKind::Rect,
            format,
            width: width.max(1),
            height: height.max(1),
            filter: FilterMode::Nearest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_target_never_has_zero_extent() {
        let desc = TextureDescriptor::render_target("gbuffer", TextureFormat::Rgba8, 0, 0);
        assert_eq!((desc.width, desc.height), (1, 1));
        assert_eq!(desc.kind, TextureKind::Rect);
        assert_eq!(desc.filter, FilterMode::Nearest);
    }
}
