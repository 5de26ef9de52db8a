use serde::{Deserialize, Serialize};

/// Classification of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Correct,
    Incorrect,
    Timeout,
}

impl Outcome {
    /// Binary flag written to the `correct` export column.
    pub fn correct_flag(&self) -> u8 {
        match self {
            Outcome::Correct => 1,
            Outcome::Incorrect | Outcome::Timeout => 0,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Outcome::Correct)
    }
}

/// Outcome counts for one completed phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTally {
    pub correct: usize,
    pub incorrect: usize,
    pub timeout: usize,
}

impl PhaseTally {
    /// Counts outcomes in a single pass.
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a Outcome>,
    {
        outcomes
            .into_iter()
            .fold(PhaseTally::default(), |mut tally, outcome| {
                match outcome {
                    Outcome::Correct => tally.correct += 1,
                    Outcome::Incorrect => tally.incorrect += 1,
                    Outcome::Timeout => tally.timeout += 1,
                }
                tally
            })
    }

    pub fn total(&self) -> usize {
        self.correct + self.incorrect + self.timeout
    }

    /// Percentage of correct trials, rounded to two decimals. Zero for an empty phase.
    pub fn accuracy_percent(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let raw = self.correct as f64 / total as f64 * 100.0;
        (raw * 100.0).round() / 100.0
    }

    /// Pacing advice shown to the subject after a practice-like phase.
    pub fn coaching(&self) -> &'static str {
        let accuracy = self.accuracy_percent();
        if accuracy > 90.0 {
            "Try to go faster."
        } else if accuracy >= 80.0 {
            "Maintain speed and accuracy."
        } else {
            "Focus on being more accurate."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_each_outcome_once() {
        let outcomes = [
            Outcome::Correct,
            Outcome::Timeout,
            Outcome::Correct,
            Outcome::Incorrect,
            Outcome::Timeout,
            Outcome::Correct,
        ];
        let tally = PhaseTally::from_outcomes(&outcomes);
        assert_eq!(
            tally,
            PhaseTally {
                correct: 3,
                incorrect: 1,
                timeout: 2
            }
        );
        assert_eq!(tally.total(), outcomes.len());
    }

    #[test]
    fn accuracy_rounds_to_two_decimals() {
        let tally = PhaseTally {
            correct: 2,
            incorrect: 1,
            timeout: 0,
        };
        assert_eq!(tally.accuracy_percent(), 66.67);
        assert_eq!(PhaseTally::default().accuracy_percent(), 0.0);
    }

    #[test]
    fn coaching_thresholds() {
        let fast = PhaseTally {
            correct: 19,
            incorrect: 1,
            timeout: 0,
        };
        assert_eq!(fast.coaching(), "Try to go faster.");

        let boundary = PhaseTally {
            correct: 9,
            incorrect: 1,
            timeout: 0,
        };
        assert_eq!(boundary.coaching(), "Maintain speed and accuracy.");

        let slow = PhaseTally {
            correct: 1,
            incorrect: 1,
            timeout: 2,
        };
        assert_eq!(slow.coaching(), "Focus on being more accurate.");
    }

    #[test]
    fn only_correct_sets_flag() {
        assert_eq!(Outcome::Correct.correct_flag(), 1);
        assert_eq!(Outcome::Incorrect.correct_flag(), 0);
        assert_eq!(Outcome::Timeout.correct_flag(), 0);
    }
}
