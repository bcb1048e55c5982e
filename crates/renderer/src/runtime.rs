use std::time::Instant;

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds since the active program was installed.
    pub seconds: f32,
}

/// Monotonic clock whose origin moves every time a program is installed.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    origin: Instant,
}

impl FrameClock {
    pub fn new(origin: Instant) -> Self {
        Self { origin }
    }

    pub fn reset_at(&mut self, origin: Instant) {
        self.origin = origin;
    }

    /// Produces the sample for a frame rendered at `now`.
    pub fn sample_at(&self, now: Instant) -> TimeSample {
        let elapsed = now.saturating_duration_since(self.origin);
        TimeSample {
            seconds: elapsed.as_secs_f32(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn samples_seconds_since_origin() {
        let origin = Instant::now();
        let clock = FrameClock::new(origin);
        let first = clock.sample_at(origin + Duration::from_millis(1500));
        assert!((first.seconds - 1.5).abs() < 1e-6);
        assert_eq!(clock.sample_at(origin).seconds, 0.0);
    }

    #[test]
    fn reset_moves_origin() {
        let origin = Instant::now();
        let mut clock = FrameClock::new(origin);
        assert!((clock.sample_at(origin + Duration::from_secs(3)).seconds - 3.0).abs() < 1e-6);
        let swap = origin + Duration::from_secs(5);
        clock.reset_at(swap);
        let sample = clock.sample_at(swap + Duration::from_millis(250));
        assert!((sample.seconds - 0.25).abs() < 1e-6);
    }

    #[test]
    fn time_before_origin_saturates_to_zero() {
        let origin = Instant::now() + Duration::from_secs(1);
        let clock = FrameClock::new(origin);
        assert_eq!(clock.sample_at(Instant::now()).seconds, 0.0);
    }
}
