use std::time::Instant;

/// Wall-clock frame timer for real-time drivers.
pub struct FrameTimer {
    last: Instant,
    pub dt: f32,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            dt: 0.0,
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        self.dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation time, advanced only by physics ticks.
///
/// Time-based windows (coyote time, cooldowns, edge buffers) read this clock so
/// they behave the same at any frame rate. Seconds are kept in `f64` so long
/// sessions do not lose millisecond precision.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimClock {
    now: f64,
    ticks: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn advance(&mut self, dt: f32) {
        self.now += f64::from(dt.max(0.0));
        self.ticks += 1;
    }
}

const FALLBACK_STEP: f32 = 1.0 / 60.0;

/// Fixed-step accumulator.
#[derive(Clone, Copy, Debug)]
pub struct FixedStep {
    pub step: f32,
    pub max_substeps: u32,
    accumulator: f32,
}

impl FixedStep {
    /// A step that is not a positive finite number falls back to 1/60 s.
    pub fn new(step: f32, max_substeps: u32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            log::warn!("fixed timestep {step} is unusable, falling back to {FALLBACK_STEP}");
            FALLBACK_STEP
        };
        Self {
            step,
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
        }
    }

    /// Bank `frame_dt` and return how many fixed steps are due.
    ///
    /// Steps beyond `max_substeps` are dropped rather than carried, so one
    /// long stall cannot snowball into ever longer frames.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_substeps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_substeps && self.accumulator >= self.step {
            log::debug!(
                "dropping {:.3}s of simulation backlog after {} substeps",
                self.accumulator,
                steps
            );
            self.accumulator %= self.step;
        }
        steps
    }

    /// How far into the next fixed step the current frame falls (0..1).
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_accumulates_seconds_and_ticks() {
        let mut clock = SimClock::new();
        clock.advance(0.25);
        clock.advance(0.25);
        assert_eq!(clock.ticks(), 2);
        assert!((clock.now() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn fixed_step_banks_remainder() {
        let mut fixed = FixedStep::new(0.01, 8);
        assert_eq!(fixed.accumulate(0.025), 2);
        assert!((fixed.alpha() - 0.5).abs() < 1e-3);
        assert_eq!(fixed.accumulate(0.006), 1);
    }

    #[test]
    fn fixed_step_caps_substeps() {
        let mut fixed = FixedStep::new(0.01, 4);
        assert_eq!(fixed.accumulate(1.0), 4);
        assert!(fixed.alpha() < 1.0);
    }

    #[test]
    fn unusable_step_falls_back() {
        let mut fixed = FixedStep::new(0.0, 0);
        assert_eq!(fixed.step, FALLBACK_STEP);
        assert_eq!(fixed.max_substeps, 1);
        assert_eq!(fixed.accumulate(FALLBACK_STEP * 1.5), 1);
        assert!(fixed.alpha().is_finite());
    }
}
