// renderer/primitive.rs
use bytemuck::{Pod, Zeroable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// A contiguous run of vertices inside one device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexRange {
    pub buffer: BufferId,
    pub start: u32,
    pub count: u32,
}

/// What one draw submits: a primitive type over a vertex range, optionally
/// indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveRange {
    pub primitive: PrimitiveType,
    pub vertices: VertexRange,
    pub indices: Option<VertexRange>,
}

impl PrimitiveRange {
    pub fn new(primitive: PrimitiveType, vertices: VertexRange) -> Self {
        Self {
            primitive,
            vertices,
            indices: None,
        }
    }

    pub fn indexed(primitive: PrimitiveType, vertices: VertexRange, indices: VertexRange) -> Self {
        Self {
            primitive,
            vertices,
            indices: Some(indices),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.indices {
            Some(indices) => indices.count == 0,
            None => self.vertices.count == 0,
        }
    }
}

/// Vertex of the full-screen light quad.
///
/// `clip_over_f` carries the view-space ray through each corner so the
/// fragment stage can rebuild position from depth alone.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightVertex {
    pub position: [f32; 2],
    pub mapping: [f32; 2],
    pub clip_over_f: [f32; 2],
}

/// Per-frame transient vertex storage.
///
/// Ranges are handed out front to back and all released by `reset`.
#[derive(Debug)]
pub struct GeometryPool {
    buffer: BufferId,
    capacity: u32,
    used: u32,
}

impl GeometryPool {
    pub fn new(buffer: BufferId, capacity: u32) -> Self {
        Self {
            buffer,
            capacity,
            used: 0,
        }
    }

    pub fn allocate(&mut self, count: u32) -> Option<VertexRange> {
        let end = self.used.checked_add(count)?;
        if end > self.capacity {
            return None;
        }
        let range = VertexRange {
            buffer: self.buffer,
            start: self.used,
            count,
        };
        self.used = end;
        Some(range)
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn remaining(&self) -> u32 {
        self.capacity - self.used
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }
}
