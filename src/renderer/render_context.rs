// src/renderer/render_context.rs

use glam::Vec4;

use crate::renderer::device::{ClearFlags, Device, RenderTarget};
use crate::renderer::pass::StateError;
use crate::renderer::primitive::PrimitiveRange;
use crate::renderer::shared::SharedProgramState;

/// Per-frame counters fed by every reported failure and submitted draw.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: u32,
    pub passes_applied: u32,
    pub skipped_operations: u32,
    pub state_errors: u32,
    pub missing_shared_state: u32,
    pub failed_allocations: u32,
}

impl FrameStats {
    pub(crate) fn record_error(&mut self, err: &StateError) {
        self.state_errors += 1;
        if let StateError::NoSharedState(_) = err {
            self.missing_shared_state += 1;
            log::error!("{}", err);
        } else {
            log::warn!("{}", err);
        }
    }
}

/// Everything a frame renders through: the device, the single active
/// shared state and the diagnostics for the frame.
///
/// Several contexts can coexist; nothing here is process-global.
pub struct RenderContext<D: Device> {
    pub(crate) device: D,
    pub(crate) shared: Option<SharedProgramState>,
    pub(crate) stats: FrameStats,
}

impl<D: Device> RenderContext<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            shared: None,
            stats: FrameStats::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Makes `state` the active shared state and returns the one it replaces.
    pub fn set_shared_state(
        &mut self,
        state: Option<SharedProgramState>,
    ) -> Option<SharedProgramState> {
        std::mem::replace(&mut self.shared, state)
    }

    pub fn shared_state(&self) -> Option<&SharedProgramState> {
        self.shared.as_ref()
    }

    pub fn shared_state_mut(&mut self) -> Option<&mut SharedProgramState> {
        self.shared.as_mut()
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Returns the counters gathered since the last call and starts over.
    pub fn take_stats(&mut self) -> FrameStats {
        std::mem::take(&mut self.stats)
    }

    pub fn set_target(&mut self, target: RenderTarget) {
        self.device.set_target(target);
    }

    pub fn clear(&mut self, flags: ClearFlags, color: Vec4) {
        self.device.clear(flags, color, 1.0);
    }

    pub fn draw(&mut self, range: &PrimitiveRange) {
        self.device.draw(range);
        self.stats.draws += 1;
    }

    pub(crate) fn report(&mut self, err: &StateError) {
        self.stats.record_error(err);
    }

    pub(crate) fn skip_operation(&mut self, reason: &str) {
        log::warn!("Skipping operation: {}", reason);
        self.stats.skipped_operations += 1;
    }

    pub(crate) fn failed_allocation(&mut self, what: &str) {
        log::error!("Failed to allocate {}; skipping", what);
        self.stats.failed_allocations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::RecordingDevice;

    #[test]
    fn only_one_shared_state_is_active() {
        let mut context = RenderContext::new(RecordingDevice::new());
        assert!(context.set_shared_state(Some(SharedProgramState::new())).is_none());

        let previous = context.set_shared_state(Some(SharedProgramState::new()));
        assert!(previous.is_some());
        assert!(context.shared_state().is_some());
    }

    #[test]
    fn missing_shared_state_is_counted_separately() {
        let mut context = RenderContext::new(RecordingDevice::new());
        context.report(&StateError::NoSharedState("wyMVP".to_owned()));
        context.report(&StateError::NoProgram);

        let stats = context.take_stats();
        assert_eq!(stats.state_errors, 2);
        assert_eq!(stats.missing_shared_state, 1);
        assert_eq!(*context.stats(), FrameStats::default());
    }
}
