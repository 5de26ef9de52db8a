use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use percept_core::{ResponseMapping, StandardPhase};
use percept_experiment::{
    Autopilot, CsvResultSink, ExperimentConfig, PresentationAdapter, ScriptedPresenter,
    SessionController, TrialSet, load_all,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::terminal::{self, TerminalPresenter};

/// Command-line choices that shape a run.
#[derive(Debug, Default)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub participant: Option<String>,
    pub rehearsal: bool,
    pub simulate: bool,
    pub seed: Option<u64>,
}

pub struct App {
    config: ExperimentConfig,
    participant: String,
    mapping: ResponseMapping,
    sets: Vec<(StandardPhase, TrialSet)>,
    rng: StdRng,
    simulate: bool,
}

impl App {
    /// Loads configuration and every trial set, then asks for the
    /// participant. Nothing is shown to the subject before this succeeds.
    pub fn new(options: Options) -> Result<Self> {
        let mut config = match &options.config {
            Some(path) => ExperimentConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        if options.rehearsal {
            config = config.with_rehearsal_timings();
        }
        config.validate()?;

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let sets = load_all(&config, &mut rng).context("loading experiment materials")?;

        let raw = match options.participant {
            Some(id) => id,
            None => terminal::read_participant(config.participant_terminator)
                .context("reading participant identifier")?,
        };
        let participant = normalize_participant(&raw)?;

        let mapping = if config.counterbalance {
            ResponseMapping::for_participant(&participant)
        } else {
            ResponseMapping::default()
        };

        tracing::info!(
            participant = %participant,
            reversed_mapping = mapping == ResponseMapping::reversed(),
            rehearsal = options.rehearsal,
            window_ms = config.response_window_ms,
            "Session configured"
        );

        Ok(Self {
            config,
            participant,
            mapping,
            sets,
            rng,
            simulate: options.simulate,
        })
    }

    pub async fn run(self) -> Result<()> {
        if self.simulate {
            let keys = self.config.keys;
            let dwell = self.config.read_time() + Duration::from_millis(50);
            let autopilot = Autopilot::new(self.rng.clone(), keys, self.config.response_window());
            let presenter = ScriptedPresenter::new(keys, dwell).with_autopilot(autopilot);
            self.drive(presenter).await
        } else {
            let instructions = self.config.materials_root.join("instructions");
            let presenter =
                TerminalPresenter::start(self.config.keys, self.config.input_buffer, instructions)
                    .context("starting terminal presenter")?;
            self.drive(presenter).await
        }
    }

    async fn drive<A: PresentationAdapter>(self, presenter: A) -> Result<()> {
        let sink = CsvResultSink::new(&self.config.results_dir);
        let mut controller = SessionController::new(
            self.config,
            &self.participant,
            self.mapping,
            self.sets,
            presenter,
            sink,
        )?;
        let summary = controller.run().await?;
        drop(controller);

        println!("Experiment completed. Thank you, {}!", summary.participant_id);
        for phase in &summary.phases {
            println!(
                "  {:<6} {:>6.2}%  ({} correct, {} incorrect, {} timeout)",
                phase.phase.label(),
                phase.accuracy_percent,
                phase.correct,
                phase.incorrect,
                phase.timeout
            );
        }
        Ok(())
    }
}

/// Trims the identifier and refuses an empty one; it becomes a filename prefix.
fn normalize_participant(raw: &str) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        bail!("participant identifier must not be empty");
    }
    if id.contains(['/', '\\']) {
        bail!("participant identifier {id:?} must not contain path separators");
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_is_trimmed_and_checked() {
        assert_eq!(normalize_participant("  YC_014 ").unwrap(), "YC_014");
        assert!(normalize_participant("   ").is_err());
        assert!(normalize_participant("../x").is_err());
    }

    #[test]
    fn missing_materials_fail_before_prompt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("experiment.toml");
        std::fs::write(&path, "read_time_ms = 100\n").unwrap();

        let result = App::new(Options {
            config: Some(path),
            participant: Some("P01".into()),
            ..Options::default()
        });
        assert!(result.is_err());
    }
}
