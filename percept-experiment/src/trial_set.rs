use std::collections::VecDeque;
use std::path::Path;

use percept_core::{ConditionRow, Modality, Stimulus, Trial, TrialId};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::MaterialsError;

/// Shuffled queue of trials for one phase.
#[derive(Debug, Clone)]
pub struct TrialSet {
    name: String,
    trials: VecDeque<Trial>,
    declared: usize,
    shuffled: bool,
    popped: usize,
}

impl TrialSet {
    /// Pairs `answers[i]` with stimulus `i + 1` of `stimulus_dir`.
    ///
    /// # Errors
    ///
    /// `ConfigurationMismatch` when the answer count differs from `count`.
    pub fn build(
        name: impl Into<String>,
        answers: &[bool],
        count: usize,
        modality: Modality,
        stimulus_dir: &Path,
    ) -> Result<Self, MaterialsError> {
        let name = name.into();
        if answers.len() != count {
            return Err(MaterialsError::ConfigurationMismatch {
                set: name,
                expected: count,
                found: answers.len(),
            });
        }

        let trials = answers
            .iter()
            .enumerate()
            .map(|(i, &ground_truth)| Trial {
                id: TrialId(i + 1),
                stimulus: Stimulus::numbered(stimulus_dir, i + 1, modality),
                ground_truth,
                condition: None,
            })
            .collect();

        Ok(Self {
            name,
            trials,
            declared: count,
            shuffled: false,
            popped: 0,
        })
    }

    /// Attaches condition rows by stimulus index: row `i` describes stimulus `i + 1`.
    /// Only allowed before shuffling.
    pub fn attach_conditions(&mut self, rows: Vec<ConditionRow>) -> Result<(), MaterialsError> {
        if rows.len() != self.declared {
            return Err(MaterialsError::ConfigurationMismatch {
                set: format!("{} conditions", self.name),
                expected: self.declared,
                found: rows.len(),
            });
        }
        debug_assert!(!self.shuffled, "conditions attached after shuffle");
        for (trial, row) in self.trials.iter_mut().zip(rows) {
            trial.condition = Some(row);
        }
        Ok(())
    }

    /// One uniform permutation. Refused (returns `false`) once the set has
    /// been shuffled or a trial has been popped.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.shuffled || self.popped > 0 {
            tracing::warn!(set = %self.name, "Refusing to reshuffle trial set");
            return false;
        }
        self.trials.make_contiguous().shuffle(rng);
        self.shuffled = true;
        true
    }

    /// Removes and returns the head of the queue.
    ///
    /// # Panics
    ///
    /// Panics if the set is empty; check [`TrialSet::is_empty`] first.
    pub fn pop(&mut self) -> Trial {
        match self.trials.pop_front() {
            Some(trial) => {
                self.popped += 1;
                trial
            }
            None => panic!("pop() on exhausted trial set {}", self.name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Number of trials the set was built with.
    pub fn declared_len(&self) -> usize {
        self.declared
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter()
    }
}
