// renderer/queue.rs
//
// Per-frame draw submission. Operations are ordered by a packed integer key:
//
//   bit 63       bucket (0 opaque, 1 blended)
//   bits 56..63  layer
//   bits 24..56  pass ID
//   bits 0..24   submission index
//
// The submission index makes every key unique, so an unstable sort of the
// keys still yields a stable order of operations.
use glam::Mat4;
use thiserror::Error;

use crate::renderer::device::Device;
use crate::renderer::pass::Pass;
use crate::renderer::primitive::PrimitiveRange;
use crate::renderer::render_context::RenderContext;

const INDEX_BITS: u32 = 24;
const PASS_SHIFT: u32 = INDEX_BITS;
const LAYER_SHIFT: u32 = 56;
const BUCKET_SHIFT: u32 = 63;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Largest number of operations one queue can hold.
pub const MAX_OPERATIONS: usize = 1 << INDEX_BITS;
pub const MAX_LAYER: u8 = 0x7f;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Opaque,
    Blended,
}

impl Bucket {
    pub fn of(pass: &Pass) -> Self {
        if pass.is_blending() {
            Bucket::Blended
        } else {
            Bucket::Opaque
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("render queue is full ({capacity} operations)")]
    Full { capacity: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub transform: Mat4,
    pub pass: &'a Pass,
    pub range: PrimitiveRange,
    pub bucket: Bucket,
    pub layer: u8,
}

pub struct RenderQueue<'a> {
    operations: Vec<Operation<'a>>,
    keys: Vec<u64>,
    capacity: usize,
    sorted: bool,
}

impl<'a> RenderQueue<'a> {
    pub fn new() -> Self {
        Self::with_capacity(MAX_OPERATIONS)
    }

    /// `capacity` is clamped to [`MAX_OPERATIONS`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            operations: Vec::new(),
            keys: Vec::new(),
            capacity: capacity.min(MAX_OPERATIONS),
            sorted: true,
        }
    }

    pub fn add_operation(
        &mut self,
        transform: Mat4,
        pass: &'a Pass,
        range: PrimitiveRange,
    ) -> Result<(), QueueError> {
        self.add_operation_in_layer(transform, pass, range, 0)
    }

    /// Layers order operations within a bucket before the pass ID does.
    pub fn add_operation_in_layer(
        &mut self,
        transform: Mat4,
        pass: &'a Pass,
        range: PrimitiveRange,
        layer: u8,
    ) -> Result<(), QueueError> {
        let index = self.operations.len();
        if index >= self.capacity {
            log::error!(
                "Render queue full ({} operations); dropping draw for pass {:?}",
                self.capacity,
                pass.id()
            );
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }

        let layer = layer.min(MAX_LAYER);
        let bucket = Bucket::of(pass);
        self.keys.push(sort_key(bucket, layer, pass.id().0, index));
        self.operations.push(Operation {
            transform,
            pass,
            range,
            bucket,
            layer,
        });
        self.sorted = false;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sort keys in replay order.
    pub fn keys(&mut self) -> &[u64] {
        self.sort();
        &self.keys
    }

    /// Operations in replay order.
    pub fn operations(&mut self) -> impl Iterator<Item = &Operation<'a>> + '_ {
        self.sort();
        let operations = &self.operations;
        self.keys
            .iter()
            .map(move |key| &operations[(key & INDEX_MASK) as usize])
    }

    /// Operations in the order they were added.
    pub fn submitted(&self) -> &[Operation<'a>] {
        &self.operations
    }

    pub fn render<D: Device>(&mut self, context: &mut RenderContext<D>) {
        self.replay(context, None);
    }

    pub fn render_bucket<D: Device>(&mut self, context: &mut RenderContext<D>, bucket: Bucket) {
        self.replay(context, Some(bucket));
    }

    pub fn clear(&mut self) {
        self.operations.clear();
        self.keys.clear();
        self.sorted = true;
    }

    fn sort(&mut self) {
        if !self.sorted {
            self.keys.sort_unstable();
            self.sorted = true;
        }
    }

    // Consecutive operations that share a pass re-apply it in full; repeated
    // state is left for the device to filter.
    fn replay<D: Device>(&mut self, context: &mut RenderContext<D>, bucket: Option<Bucket>) {
        self.sort();

        for key in &self.keys {
            let operation = &self.operations[(key & INDEX_MASK) as usize];
            if bucket.is_some_and(|b| b != operation.bucket) {
                continue;
            }
            if operation.pass.program().is_none() {
                context.skip_operation(&format!("pass {:?} has no program", operation.pass.id()));
                continue;
            }

            if let Some(shared) = context.shared_state_mut() {
                shared.set_model_matrix(operation.transform);
            }
            operation.pass.apply(context);
            context.draw(&operation.range);
        }

        log::debug!(
            "Replayed {} operations ({:?} bucket filter)",
            self.operations.len(),
            bucket
        );
    }
}

impl Default for RenderQueue<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_key(bucket: Bucket, layer: u8, pass: u32, index: usize) -> u64 {
    let bucket = match bucket {
        Bucket::Opaque => 0u64,
        Bucket::Blended => 1u64,
    };
    (bucket << BUCKET_SHIFT)
        | (u64::from(layer) << LAYER_SHIFT)
        | (u64::from(pass) << PASS_SHIFT)
        | (index as u64 & INDEX_MASK)
}
