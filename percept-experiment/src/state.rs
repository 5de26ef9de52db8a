use std::collections::HashMap;

use percept_core::{Phase, PhaseTally, StandardPhase, TrialRecord};
use percept_timing::{WallClock, WallStamp};

use crate::trial_set::TrialSet;

/// Everything a session accumulates between the first page and the last.
#[derive(Debug)]
pub struct SessionState {
    pub participant: String,
    pub phase: StandardPhase,
    pub started: WallStamp,
    pub ended: Option<WallStamp>,
    pub break_began: Option<WallStamp>,
    pub break_ended: Option<WallStamp>,
    /// Completed phases in run order; each tally is appended once.
    pub tallies: Vec<(StandardPhase, PhaseTally)>,
    /// Trial records of completed phases, in presentation order.
    pub records: HashMap<StandardPhase, Vec<TrialRecord>>,
    pending: HashMap<StandardPhase, TrialSet>,
}

impl SessionState {
    pub fn new(
        participant: impl Into<String>,
        sets: impl IntoIterator<Item = (StandardPhase, TrialSet)>,
        started: WallStamp,
    ) -> Self {
        Self {
            participant: participant.into(),
            phase: StandardPhase::default(),
            started,
            ended: None,
            break_began: None,
            break_ended: None,
            tallies: Vec::new(),
            records: HashMap::new(),
            pending: sets.into_iter().collect(),
        }
    }

    pub fn advance_phase(&mut self) -> bool {
        if let Some(next) = self.phase.next() {
            tracing::info!(from = %self.phase, to = %next, "Phase change");
            self.phase = next;
            true
        } else {
            false
        }
    }

    /// Advances until `target` is current. Returns `false` if `target` lies
    /// behind the current phase.
    pub fn advance_to(&mut self, target: StandardPhase) -> bool {
        while self.phase != target {
            if !self.advance_phase() {
                return false;
            }
        }
        true
    }

    /// Hands out the trial set of `phase`. Each set can be taken once.
    pub fn take_set(&mut self, phase: StandardPhase) -> Option<TrialSet> {
        self.pending.remove(&phase)
    }

    pub fn record_tally(&mut self, phase: StandardPhase, tally: PhaseTally) {
        debug_assert!(
            self.tally(phase).is_none(),
            "phase {phase} tallied twice"
        );
        self.tallies.push((phase, tally));
    }

    pub fn tally(&self, phase: StandardPhase) -> Option<PhaseTally> {
        self.tallies
            .iter()
            .find_map(|(p, t)| (*p == phase).then_some(*t))
    }

    pub fn mark_break_began(&mut self, at: WallStamp) {
        self.break_began.get_or_insert(at);
    }

    pub fn mark_break_ended(&mut self, at: WallStamp) {
        if self.break_began.is_some() {
            self.break_ended.get_or_insert(at);
        }
    }

    /// Break length known so far: zero before the break starts, and up to
    /// `now` while it is still running.
    pub fn break_duration_ms(&self, now: &WallStamp) -> u64 {
        match (&self.break_began, &self.break_ended) {
            (Some(began), Some(ended)) => WallClock::span_ms(began, ended),
            (Some(began), None) => WallClock::span_ms(began, now),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};

    fn stamp(min: u32, sec: u32) -> WallStamp {
        Local.with_ymd_and_hms(2024, 5, 2, 14, min, sec).unwrap()
    }

    fn empty_state() -> SessionState {
        SessionState::new("P01", Vec::<(StandardPhase, TrialSet)>::new(), stamp(0, 0))
    }

    #[test]
    fn phases_advance_in_order() {
        let mut state = empty_state();
        assert_eq!(state.phase, StandardPhase::Introduction);
        assert!(state.advance_to(StandardPhase::Break));
        assert_eq!(state.phase, StandardPhase::Break);
        assert!(state.advance_to(StandardPhase::Results));
        assert!(!state.advance_phase());
        assert!(!state.advance_to(StandardPhase::Demo));
    }

    #[test]
    fn break_duration_tracks_markers() {
        let mut state = empty_state();
        assert_eq!(state.break_duration_ms(&stamp(1, 0)), 0);

        // An end marker without a start is ignored.
        state.mark_break_ended(stamp(2, 0));
        assert!(state.break_ended.is_none());

        state.mark_break_began(stamp(10, 0));
        assert_eq!(state.break_duration_ms(&stamp(10, 30)), 30_000);
        state.mark_break_ended(stamp(12, 0));
        state.mark_break_ended(stamp(13, 0));
        assert_eq!(state.break_duration_ms(&(stamp(12, 0) + Duration::hours(1))), 120_000);
    }

    #[test]
    fn tallies_append_per_phase() {
        let mut state = empty_state();
        let tally = PhaseTally {
            correct: 3,
            incorrect: 1,
            timeout: 2,
        };
        state.record_tally(StandardPhase::Demo, tally);
        assert_eq!(state.tally(StandardPhase::Demo), Some(tally));
        assert_eq!(state.tally(StandardPhase::Test1), None);
    }
}
