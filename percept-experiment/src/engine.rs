//! Single-trial runner: present, race the response against the deadline,
//! resolve, show feedback.

use std::time::Duration;

use percept_core::{
    KeyBindings, Outcome, Phase, ResponseAction, ResponseMapping, StandardPhase, Trial,
    TrialRecord, TrialState,
};
use percept_timing::{Deadline, MonotonicTimer, Timer};
use tokio::time::Instant;

use crate::presentation::{Feedback, PresentationAdapter};

/// First-signal-wins flag for one trial.
#[derive(Debug, Default)]
pub struct ResponseLatch {
    responded: bool,
}

impl ResponseLatch {
    /// Returns `true` for the first caller only.
    pub fn claim(&mut self) -> bool {
        !std::mem::replace(&mut self.responded, true)
    }
}

/// Deadline and latch of one open response window. Dropping it cancels the
/// deadline, whichever way the trial ended.
struct ResponseWindow {
    deadline: Deadline,
    latch: ResponseLatch,
}

impl ResponseWindow {
    fn open(opened: Instant, window: Duration) -> Self {
        Self {
            deadline: Deadline::arm_at(opened + window),
            latch: ResponseLatch::default(),
        }
    }
}

impl Drop for ResponseWindow {
    fn drop(&mut self) {
        if self.deadline.cancel() {
            tracing::trace!("Response deadline cancelled");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Responded { action: ResponseAction, at: Instant },
    TimedOut,
}

/// Tracks a trial's state and refuses illegal transitions.
#[derive(Debug)]
struct TrialProgress {
    state: TrialState,
}

impl TrialProgress {
    fn advance(&mut self, trial: &Trial, next: TrialState) -> bool {
        if self.state.can_advance_to(next) {
            tracing::debug!(trial = %trial.id, from = ?self.state, to = ?next, "Trial state");
            self.state = next;
            true
        } else {
            tracing::warn!(trial = %trial.id, from = ?self.state, to = ?next, "Refused trial transition");
            false
        }
    }
}

pub struct TrialEngine {
    keys: KeyBindings,
    mapping: ResponseMapping,
    window: Duration,
    feedback: Duration,
    timer: MonotonicTimer,
}

impl TrialEngine {
    pub fn new(
        keys: KeyBindings,
        mapping: ResponseMapping,
        window: Duration,
        feedback: Duration,
    ) -> Self {
        Self {
            keys,
            mapping,
            window,
            feedback,
            timer: MonotonicTimer,
        }
    }

    pub fn mapping(&self) -> ResponseMapping {
        self.mapping
    }

    /// Runs one trial to completion and returns its record.
    pub async fn run<A>(&self, adapter: &mut A, trial: &Trial, phase: StandardPhase) -> TrialRecord
    where
        A: PresentationAdapter + ?Sized,
    {
        let mut progress = TrialProgress {
            state: TrialState::Presenting,
        };

        let (outcome, reaction_time_ms, response, fallback) = match adapter.present(trial).await {
            Err(err) => {
                tracing::warn!(
                    trial = %trial.id,
                    error = %err,
                    "Presentation failed; recording fallback Correct"
                );
                (Outcome::Correct, 0, None, true)
            }
            Ok(()) => {
                // Reaction time and the deadline both count from this instant.
                let opened = self.timer.now();
                adapter.discard_pending_input();
                progress.advance(trial, TrialState::AwaitingResponse);

                let mut window = ResponseWindow::open(opened, self.window);
                match self.race(adapter, opened, &mut window).await {
                    Resolution::Responded { action, at } => {
                        let outcome = if self.mapping.is_correct(action, trial.ground_truth) {
                            Outcome::Correct
                        } else {
                            Outcome::Incorrect
                        };
                        let rt = self.timer.millis_between(opened, at);
                        (outcome, rt, Some(action), false)
                    }
                    Resolution::TimedOut => {
                        (Outcome::Timeout, self.window.as_millis() as u64, None, false)
                    }
                }
            }
        };
        progress.advance(trial, TrialState::Resolved(outcome));

        let feedback = if phase.shows_outcome_feedback() {
            Feedback::Outcome(outcome)
        } else {
            Feedback::Blank
        };
        if progress.advance(trial, TrialState::Feedback) {
            if let Err(err) = adapter.show_feedback(feedback, self.feedback).await {
                tracing::warn!(trial = %trial.id, error = %err, "Feedback screen failed");
            }
        }
        progress.advance(trial, TrialState::Complete);

        tracing::debug!(
            trial = %trial.id,
            outcome = ?outcome,
            rt_ms = reaction_time_ms,
            "Trial complete"
        );
        TrialRecord {
            trial_id: trial.id,
            item_number: trial.item_number(),
            ground_truth: trial.ground_truth,
            outcome,
            reaction_time_ms,
            response,
            fallback,
        }
    }

    /// Races the deadline against bound input. Input is polled first and
    /// judged by its capture stamp: one captured before `opened` is dropped,
    /// and one captured at or after the deadline instant resolves as a
    /// timeout.
    ///
    /// Returning from the `select!` ends the race, so the latch is claimed
    /// exactly once and records which signal won.
    async fn race<A>(
        &self,
        adapter: &mut A,
        opened: Instant,
        window: &mut ResponseWindow,
    ) -> Resolution
    where
        A: PresentationAdapter + ?Sized,
    {
        let mut input_open = true;
        loop {
            tokio::select! {
                biased;

                event = adapter.next_input(), if input_open => {
                    let Some(event) = event else {
                        tracing::debug!("Input closed; waiting for deadline");
                        input_open = false;
                        continue;
                    };
                    if event.at < opened {
                        tracing::debug!(
                            input = ?event.input,
                            "Dropping input captured before the window opened"
                        );
                        continue;
                    }
                    let Some(action) = self.keys.action_for(event.input) else {
                        tracing::trace!(input = ?event.input, "Ignoring unbound input");
                        continue;
                    };
                    let first = window.latch.claim();
                    debug_assert!(first, "response window resolved twice");
                    return if event.at < window.deadline.at() {
                        Resolution::Responded { action, at: event.at }
                    } else {
                        Resolution::TimedOut
                    };
                }
                () = window.deadline.fired() => {
                    let first = window.latch.claim();
                    debug_assert!(first, "response window resolved twice");
                    return Resolution::TimedOut;
                }
            }
        }
    }
}
