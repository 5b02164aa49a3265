//! Frame timing

use std::time::{Duration, Instant};

/// Wall-clock timer measuring the time between consecutive frames
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_tick: Instant,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            frame_count: 0,
        }
    }

    /// Mark the end of a frame and return the time since the previous tick
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.frame_count += 1;
        elapsed
    }

    /// Restart timing from now without counting a frame
    pub fn reset(&mut self) {
        self.last_tick = Instant::now();
        self.frame_count = 0;
    }

    /// Number of ticks since creation or the last reset
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counts_frames() {
        let mut timer = FrameTimer::new();
        let _ = timer.tick();
        let _ = timer.tick();
        assert_eq!(timer.frame_count(), 2);

        timer.reset();
        assert_eq!(timer.frame_count(), 0);
    }
}
