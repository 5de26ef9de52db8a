pub mod condition;
pub mod outcome;
pub mod phase;
pub mod response;
pub mod stimulus;
pub mod trial;

pub use condition::ConditionRow;
pub use outcome::{Outcome, PhaseTally};
pub use phase::{Phase, StandardPhase};
pub use response::{KeyBindings, RawInput, ResponseAction, ResponseMapping};
pub use stimulus::{Modality, Stimulus};
pub use trial::{Trial, TrialId, TrialRecord, TrialState};
