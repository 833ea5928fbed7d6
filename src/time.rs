use std::time::Duration;

pub use instant::Instant;

/// Wall-clock source for the shared `wyTime` uniform.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame: 0,
        }
    }

    /// Marks the start of a new frame and returns the time since the last one.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now.duration_since(self.last);
        self.last = now;
        self.frame += 1;
        delta
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_never_decreases() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.elapsed_seconds(), 0.0);

        clock.tick();
        let first = clock.elapsed_seconds();
        clock.tick();
        assert!(clock.elapsed_seconds() >= first);
        assert_eq!(clock.frame(), 2);
    }
}
