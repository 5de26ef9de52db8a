use std::collections::HashMap;
use std::collections::hash_map::Entry;

use percept_core::{Outcome, PhaseTally, TrialId};

/// Outcome of a `ResultLedger::record` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    New,
    /// The trial already had an outcome; the stored one is returned untouched.
    AlreadyRecorded(Outcome),
}

/// Per-phase map from trial to outcome. Each trial is recorded at most once.
#[derive(Debug, Default)]
pub struct ResultLedger {
    outcomes: HashMap<TrialId, Outcome>,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trial: TrialId, outcome: Outcome) -> Recorded {
        match self.outcomes.entry(trial) {
            Entry::Vacant(slot) => {
                slot.insert(outcome);
                Recorded::New
            }
            Entry::Occupied(existing) => {
                let kept = *existing.get();
                tracing::warn!(
                    trial = %trial,
                    kept = ?kept,
                    dropped = ?outcome,
                    "Duplicate outcome ignored"
                );
                Recorded::AlreadyRecorded(kept)
            }
        }
    }

    pub fn get(&self, trial: TrialId) -> Option<Outcome> {
        self.outcomes.get(&trial).copied()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Single-pass tally. Consumes the ledger so its entries cannot reach
    /// the next phase.
    pub fn into_tally(self) -> PhaseTally {
        PhaseTally::from_outcomes(self.outcomes.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_record_never_overwrites() {
        let mut ledger = ResultLedger::new();
        assert_eq!(ledger.record(TrialId(1), Outcome::Correct), Recorded::New);
        assert_eq!(
            ledger.record(TrialId(1), Outcome::Timeout),
            Recorded::AlreadyRecorded(Outcome::Correct)
        );
        assert_eq!(ledger.get(TrialId(1)), Some(Outcome::Correct));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn tally_matches_distinct_trials() {
        let mut ledger = ResultLedger::new();
        ledger.record(TrialId(1), Outcome::Correct);
        ledger.record(TrialId(2), Outcome::Incorrect);
        ledger.record(TrialId(3), Outcome::Timeout);
        ledger.record(TrialId(2), Outcome::Correct);
        let tally = ledger.into_tally();
        assert_eq!(
            tally,
            PhaseTally {
                correct: 1,
                incorrect: 1,
                timeout: 1
            }
        );
    }
}
