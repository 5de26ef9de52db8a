use serde::{Deserialize, Serialize};

use crate::condition::ConditionRow;
use crate::outcome::Outcome;
use crate::response::ResponseAction;
use crate::stimulus::Stimulus;

/// Stable identifier of a trial within its set: the 1-based stimulus index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrialId(pub usize);

impl std::fmt::Display for TrialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One stimulus and the answer it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub id: TrialId,
    pub stimulus: Stimulus,
    pub ground_truth: bool,
    pub condition: Option<ConditionRow>,
}

impl Trial {
    /// Item number for export: the condition sheet's number when present,
    /// otherwise the stimulus index.
    pub fn item_number(&self) -> usize {
        self.condition
            .as_ref()
            .map_or(self.id.0, |c| c.item_number as usize)
    }
}

/// Trial state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Presenting,
    AwaitingResponse,
    Resolved(Outcome),
    Feedback,
    Complete,
}

impl TrialState {
    /// Legal forward edges. Nothing leads back into `Presenting` or
    /// `AwaitingResponse`, and `Resolved` is entered at most once.
    pub fn can_advance_to(&self, next: TrialState) -> bool {
        use TrialState::*;
        matches!(
            (self, next),
            (Presenting, AwaitingResponse)
                | (Presenting, Resolved(_))
                | (AwaitingResponse, Resolved(_))
                | (Resolved(_), Feedback)
                | (Feedback, Complete)
        )
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_id: TrialId,
    pub item_number: usize,
    pub ground_truth: bool,
    pub outcome: Outcome,
    pub reaction_time_ms: u64,
    pub response: Option<ResponseAction>,
    /// Set when the outcome came from the playback-failure fallback.
    pub fallback: bool,
}
