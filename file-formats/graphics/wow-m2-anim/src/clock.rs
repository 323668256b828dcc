//! Global loop clocks
//!
//! Global loops are skeleton-wide timers that run independently of the
//! sequence currently playing. Channels bound to a loop sample their first
//! track at the loop's current time.

/// Runtime state of one global loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalLoop {
    /// Loop length in seconds; 0 disables the loop
    pub duration: f32,
    /// Current time in `[0, duration)`
    pub current_time: f32,
}

impl GlobalLoop {
    /// Create a loop from its authored duration in milliseconds
    pub fn from_millis(duration_ms: u32) -> Self {
        Self {
            duration: duration_ms as f32 / 1000.0,
            current_time: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.duration > 0.0
    }

    /// Advance by `dt` seconds and wrap; returns whether the loop moved
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.is_enabled() {
            return false;
        }

        self.current_time = (self.current_time + dt) % self.duration;
        if self.current_time < 0.0 {
            self.current_time += self.duration;
        }
        true
    }
}

/// Advance every loop of an instance; returns whether any loop moved
pub fn advance_all(loops: &mut [GlobalLoop], dt: f32) -> bool {
    let mut advanced = false;
    for global_loop in loops.iter_mut() {
        advanced |= global_loop.advance(dt);
    }
    advanced
}
