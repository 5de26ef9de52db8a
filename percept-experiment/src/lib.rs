pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod ledger;
pub mod materials;
pub mod presentation;
pub mod scripted;
pub mod session;
pub mod state;
pub mod trial_set;

pub use config::{BlockMaterials, BlockSet, ExperimentConfig, PagePlan};
pub use engine::{ResponseLatch, TrialEngine};
pub use error::{ConfigError, ExportError, MaterialsError, PresentationError, SessionError};
pub use export::{
    CsvResultSink, MemorySink, PhaseResults, ResultRow, ResultSink, SessionSummary, read_phase_csv,
};
pub use ledger::{Recorded, ResultLedger};
pub use materials::{load_all, load_block, read_answers, read_conditions};
pub use presentation::{Feedback, InputEvent, PhaseSummary, PresentationAdapter};
pub use scripted::{Autopilot, PresenterEvent, ScriptedPresenter, TrialScript};
pub use session::SessionController;
pub use state::SessionState;
pub use trial_set::TrialSet;
