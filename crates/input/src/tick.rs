use std::time::Duration;

/// Default camera tick rate.
pub const DEFAULT_TICK_HZ: f64 = 60.0;

/// Fixed-rate tick clock driven by variable frame times.
///
/// Frame time is accumulated and converted into whole ticks. At most
/// `max_ticks_per_advance` ticks are produced per call; any excess backlog
/// is dropped so a long stall does not replay seconds of input at once.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f64,
    accumulator: f64,
    max_ticks_per_advance: u32,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::from_hz(DEFAULT_TICK_HZ)
    }
}

impl FixedTimestep {
    pub fn from_hz(hz: f64) -> Self {
        Self {
            step: 1.0 / hz.max(1.0),
            accumulator: 0.0,
            max_ticks_per_advance: 8,
        }
    }

    /// Seconds per tick.
    pub fn step(&self) -> f32 {
        self.step as f32
    }

    /// Feed elapsed frame time and return the number of ticks to run.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed.as_secs_f64();
        let mut ticks = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            ticks += 1;
            if ticks == self.max_ticks_per_advance {
                if self.accumulator >= self.step {
                    tracing::debug!(
                        dropped_secs = self.accumulator,
                        "tick backlog dropped"
                    );
                }
                self.accumulator %= self.step;
                break;
            }
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_step_frames_accumulate() {
        let mut clock = FixedTimestep::from_hz(60.0);
        assert_eq!(clock.advance(Duration::from_millis(10)), 0);
        assert_eq!(clock.advance(Duration::from_millis(10)), 1);
    }

    #[test]
    fn long_frame_yields_multiple_ticks() {
        let mut clock = FixedTimestep::from_hz(100.0);
        assert_eq!(clock.advance(Duration::from_millis(35)), 3);
    }

    #[test]
    fn backlog_is_capped() {
        let mut clock = FixedTimestep::from_hz(60.0);
        assert_eq!(clock.advance(Duration::from_secs(5)), 8);
        // Backlog beyond the cap is gone.
        assert_eq!(clock.advance(Duration::ZERO), 0);
    }

    #[test]
    fn step_matches_rate() {
        let clock = FixedTimestep::default();
        assert!((clock.step() - 1.0 / 60.0).abs() < 1e-6);
    }
}
