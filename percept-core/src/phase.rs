use serde::{Deserialize, Serialize};

/// Defines session phases and their behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn next(&self) -> Option<Self>;

    fn is_practice(&self) -> bool {
        false
    }

    /// Demo trials show outcome icons; test trials show a blank screen.
    fn shows_outcome_feedback(&self) -> bool {
        self.is_practice()
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardPhase {
    #[default]
    Introduction,
    Demo,
    Test1,
    Break,
    Test2,
    Results,
}

impl StandardPhase {
    /// The phases that own a trial set, in the order they run.
    pub const TRIAL_PHASES: [StandardPhase; 3] = [Self::Demo, Self::Test1, Self::Test2];

    /// Lowercase name used in export filenames and the `block` column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::Demo => "demo",
            Self::Test1 => "test1",
            Self::Break => "break",
            Self::Test2 => "test2",
            Self::Results => "results",
        }
    }

    /// Whether the phase-summary screen carries a coaching line.
    pub fn gives_coaching(&self) -> bool {
        matches!(self, Self::Demo | Self::Test1)
    }
}

impl std::fmt::Display for StandardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Phase for StandardPhase {
    fn next(&self) -> Option<Self> {
        use StandardPhase::*;
        Some(match self {
            Introduction => Demo,
            Demo => Test1,
            Test1 => Break,
            Break => Test2,
            Test2 => Results,
            Results => return None,
        })
    }

    fn is_practice(&self) -> bool {
        matches!(self, StandardPhase::Demo)
    }
}
