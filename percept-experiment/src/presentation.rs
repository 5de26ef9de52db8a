use std::time::Duration;

use async_trait::async_trait;
use percept_core::{Outcome, PhaseTally, RawInput, StandardPhase, Trial};
use tokio::time::Instant;

use crate::error::PresentationError;

/// A raw input stamped with the instant it was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub input: RawInput,
    pub at: Instant,
}

impl InputEvent {
    pub fn now(input: RawInput) -> Self {
        Self {
            input,
            at: Instant::now(),
        }
    }
}

/// What the subject sees between trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Outcome(Outcome),
    Blank,
}

/// End-of-block screen contents.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub phase: StandardPhase,
    pub tally: PhaseTally,
    pub accuracy_percent: f64,
    pub coaching: Option<&'static str>,
}

impl PhaseSummary {
    pub fn new(phase: StandardPhase, tally: PhaseTally) -> Self {
        Self {
            phase,
            tally,
            accuracy_percent: tally.accuracy_percent(),
            coaching: phase.gives_coaching().then(|| tally.coaching()),
        }
    }
}

/// Rendering and input collaborator of the session.
///
/// `next_input` must be cancel-safe: it is raced against the response
/// deadline and dropping it must not lose an event.
#[async_trait]
pub trait PresentationAdapter: Send {
    /// Renders the stimulus; resolves once presentation is complete.
    async fn present(&mut self, trial: &Trial) -> Result<(), PresentationError>;

    /// Drops input captured before now.
    fn discard_pending_input(&mut self);

    /// Next input event, or `None` once the input source is closed.
    async fn next_input(&mut self) -> Option<InputEvent>;

    async fn show_feedback(
        &mut self,
        feedback: Feedback,
        duration: Duration,
    ) -> Result<(), PresentationError>;

    /// Puts instruction page `page` of `total` on screen and returns.
    async fn show_page(&mut self, page: usize, total: usize) -> Result<(), PresentationError>;

    async fn show_summary(&mut self, summary: &PhaseSummary) -> Result<(), PresentationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_coaching_only_for_demo_and_test1() {
        let tally = PhaseTally {
            correct: 19,
            incorrect: 1,
            timeout: 0,
        };
        let demo = PhaseSummary::new(StandardPhase::Demo, tally);
        assert_eq!(demo.accuracy_percent, 95.0);
        assert_eq!(demo.coaching, Some("Try to go faster."));

        let test2 = PhaseSummary::new(StandardPhase::Test2, tally);
        assert_eq!(test2.coaching, None);
    }
}
