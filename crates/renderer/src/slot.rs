use std::time::Instant;

use crate::compile::CompileError;
use crate::runtime::{FrameClock, TimeSample};

/// Who asked for a program swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOrigin {
    /// The viewer moved to another shader of the listing.
    Navigation { shader: String },
    /// The live editor buffer changed.
    Editor,
}

impl SwapOrigin {
    pub fn is_editor(&self) -> bool {
        matches!(self, Self::Editor)
    }
}

/// Compile state shown as a border around the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorIndicator {
    #[default]
    Clear,
    Error,
}

impl ErrorIndicator {
    /// Border thickness in physical pixels.
    pub fn border_width(self) -> u32 {
        match self {
            Self::Clear => 1,
            Self::Error => 2,
        }
    }

    /// Border colour as written to the gamma-space surface. `#333333` when
    /// clear, red on error.
    pub fn border_color(self) -> [f64; 4] {
        match self {
            Self::Clear => [0.2, 0.2, 0.2, 1.0],
            Self::Error => [1.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Holds the single active program plus the state that travels with it.
///
/// A failed swap never touches the active program or its clock. Only editor
/// failures raise the indicator; any successful swap clears it.
#[derive(Debug)]
pub struct ProgramSlot<P> {
    active: Option<P>,
    clock: FrameClock,
    indicator: ErrorIndicator,
}

impl<P> ProgramSlot<P> {
    pub fn new(now: Instant) -> Self {
        Self {
            active: None,
            clock: FrameClock::new(now),
            indicator: ErrorIndicator::Clear,
        }
    }

    /// Applies the outcome of a compile attempt. On success the previous
    /// program is dropped and the time origin moves to `now`.
    pub fn apply(
        &mut self,
        origin: &SwapOrigin,
        outcome: Result<P, CompileError>,
        now: Instant,
    ) -> Result<(), CompileError> {
        match outcome {
            Ok(program) => {
                self.active = Some(program);
                self.clock.reset_at(now);
                self.indicator = ErrorIndicator::Clear;
                Ok(())
            }
            Err(err) => {
                if origin.is_editor() {
                    self.indicator = ErrorIndicator::Error;
                }
                Err(err)
            }
        }
    }

    pub fn active(&self) -> Option<&P> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut P> {
        self.active.as_mut()
    }

    pub fn indicator(&self) -> ErrorIndicator {
        self.indicator
    }

    pub fn sample(&self, now: Instant) -> TimeSample {
        self.clock.sample_at(now)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn failure() -> Result<&'static str, CompileError> {
        Err(CompileError::Fragment("0:3: syntax error".to_string()))
    }

    #[test]
    fn editor_failure_keeps_program_and_sets_indicator() {
        let start = Instant::now();
        let mut slot = ProgramSlot::new(start);
        let nav = SwapOrigin::Navigation {
            shader: "a.glsl".to_string(),
        };
        slot.apply(&nav, Ok("a"), start).unwrap();

        let later = start + Duration::from_secs(2);
        assert!(slot.apply(&SwapOrigin::Editor, failure(), later).is_err());
        assert_eq!(slot.active(), Some(&"a"));
        assert_eq!(slot.indicator(), ErrorIndicator::Error);

        // The clock was not reset by the failed attempt.
        let sample = slot.sample(later);
        assert!((sample.seconds - 2.0).abs() < 1e-6);
    }

    #[test]
    fn valid_submission_after_failure_clears_indicator() {
        let start = Instant::now();
        let mut slot = ProgramSlot::new(start);
        slot.apply(&SwapOrigin::Editor, failure(), start).unwrap_err();
        assert_eq!(slot.indicator(), ErrorIndicator::Error);
        assert!(slot.active().is_none());

        let swap = start + Duration::from_secs(1);
        slot.apply(&SwapOrigin::Editor, Ok("edited"), swap).unwrap();
        assert_eq!(slot.indicator(), ErrorIndicator::Clear);
        assert_eq!(slot.active(), Some(&"edited"));
        assert_eq!(slot.sample(swap).seconds, 0.0);
    }

    #[test]
    fn navigation_failure_leaves_indicator_alone() {
        let start = Instant::now();
        let mut slot = ProgramSlot::new(start);
        slot.apply(&SwapOrigin::Editor, Ok("first"), start).unwrap();
        let nav = SwapOrigin::Navigation {
            shader: "b.glsl".to_string(),
        };
        slot.apply(&nav, failure(), start).unwrap_err();
        assert_eq!(slot.indicator(), ErrorIndicator::Clear);
        assert_eq!(slot.active(), Some(&"first"));
    }

    #[test]
    fn border_matches_indicator() {
        assert_eq!(ErrorIndicator::Clear.border_width(), 1);
        assert_eq!(ErrorIndicator::Error.border_width(), 2);
        assert_eq!(ErrorIndicator::Error.border_color(), [1.0, 0.0, 0.0, 1.0]);
    }
}
