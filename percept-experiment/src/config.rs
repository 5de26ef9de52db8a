use std::path::{Path, PathBuf};
use std::time::Duration;

use percept_core::{KeyBindings, Modality, StandardPhase};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where one block's stimuli, answers and optional condition sheet live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMaterials {
    pub stimulus_dir: PathBuf,
    pub answer_file: PathBuf,
    #[serde(default)]
    pub conditions_file: Option<PathBuf>,
    pub count: usize,
    pub modality: Modality,
}

impl BlockMaterials {
    /// Conventional layout of the mental-rotation materials.
    pub fn conventional(phase: StandardPhase, count: usize) -> Self {
        let label = phase.label();
        Self {
            stimulus_dir: PathBuf::from(format!("images/{label}_images")),
            answer_file: PathBuf::from(format!("answers/{label}_answer.txt")),
            conditions_file: Some(PathBuf::from(format!("conditions/{label}_conditions.csv"))),
            count,
            modality: Modality::Image,
        }
    }

    fn rooted(&self, root: &Path) -> Self {
        Self {
            stimulus_dir: root.join(&self.stimulus_dir),
            answer_file: root.join(&self.answer_file),
            conditions_file: self.conditions_file.as_ref().map(|p| root.join(p)),
            count: self.count,
            modality: self.modality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockSet {
    pub demo: BlockMaterials,
    pub test1: BlockMaterials,
    pub test2: BlockMaterials,
}

impl Default for BlockSet {
    fn default() -> Self {
        Self {
            demo: BlockMaterials::conventional(StandardPhase::Demo, 5),
            test1: BlockMaterials::conventional(StandardPhase::Test1, 96),
            test2: BlockMaterials::conventional(StandardPhase::Test2, 96),
        }
    }
}

impl BlockSet {
    pub fn get(&self, phase: StandardPhase) -> Option<&BlockMaterials> {
        match phase {
            StandardPhase::Demo => Some(&self.demo),
            StandardPhase::Test1 => Some(&self.test1),
            StandardPhase::Test2 => Some(&self.test2),
            _ => None,
        }
    }
}

/// Instruction slideshow layout. Page numbers are 1-based.
///
/// Continuing past `demo`, `test1` and `test2` starts that block. Showing
/// `break_page` starts the break clock and showing `test2` stops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagePlan {
    pub total: usize,
    pub demo: usize,
    pub test1: usize,
    pub break_page: usize,
    pub test2: usize,
}

impl Default for PagePlan {
    fn default() -> Self {
        Self {
            total: 10,
            demo: 6,
            test1: 7,
            break_page: 8,
            test2: 9,
        }
    }
}

impl PagePlan {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = 0 < self.demo
            && self.demo < self.test1
            && self.test1 < self.break_page
            && self.break_page < self.test2
            && self.test2 <= self.total;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::PagePlan(format!(
                "need 0 < demo ({}) < test1 ({}) < break ({}) < test2 ({}) <= total ({})",
                self.demo, self.test1, self.break_page, self.test2, self.total
            )))
        }
    }

    /// The trial block unlocked by continuing past `page`.
    pub fn block_after(&self, page: usize) -> Option<StandardPhase> {
        if page == self.demo {
            Some(StandardPhase::Demo)
        } else if page == self.test1 {
            Some(StandardPhase::Test1)
        } else if page == self.test2 {
            Some(StandardPhase::Test2)
        } else {
            None
        }
    }
}

/// Experiment configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub read_time_ms: u64,
    pub response_window_ms: u64,
    pub feedback_ms: u64,
    /// Capacity of the bounded input channel.
    pub input_buffer: usize,
    pub materials_root: PathBuf,
    pub results_dir: PathBuf,
    pub counterbalance: bool,
    pub participant_terminator: char,
    pub keys: KeyBindings,
    pub pages: PagePlan,
    pub blocks: BlockSet,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            read_time_ms: 10_000,
            response_window_ms: 5_000,
            feedback_ms: 2_000,
            input_buffer: 64,
            materials_root: PathBuf::from("."),
            results_dir: PathBuf::from("results"),
            counterbalance: false,
            participant_terminator: ';',
            keys: KeyBindings::default(),
            pages: PagePlan::default(),
            blocks: BlockSet::default(),
        }
    }
}

impl ExperimentConfig {
    /// Short timings for operator rehearsal runs.
    pub fn rehearsal() -> Self {
        Self::default().with_rehearsal_timings()
    }

    pub fn with_rehearsal_timings(mut self) -> Self {
        self.read_time_ms = 100;
        self.response_window_ms = 2_000;
        self.feedback_ms = 500;
        self
    }

    /// Reads a TOML file. A relative `materials_root` is resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if config.materials_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.materials_root = dir.join(&config.materials_root);
            }
        }
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.response_window_ms == 0 {
            return Err(ConfigError::ZeroResponseWindow);
        }
        if !self.keys.is_unambiguous() {
            return Err(ConfigError::AmbiguousKeys);
        }
        self.pages.validate()
    }

    pub fn response_window(&self) -> Duration {
        Duration::from_millis(self.response_window_ms)
    }

    pub fn feedback(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    pub fn read_time(&self) -> Duration {
        Duration::from_millis(self.read_time_ms)
    }

    /// Block materials with paths resolved against `materials_root`.
    pub fn block(&self, phase: StandardPhase) -> Result<BlockMaterials, ConfigError> {
        self.blocks
            .get(phase)
            .map(|b| b.rooted(&self.materials_root))
            .ok_or(ConfigError::MissingBlock(phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.response_window(), Duration::from_secs(5));
        assert_eq!(ExperimentConfig::rehearsal().read_time(), Duration::from_millis(100));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ExperimentConfig::from_toml(
            r#"
            response_window_ms = 2000
            counterbalance = true

            [keys]
            a = "d"
            b = "k"

            [blocks.demo]
            stimulus_dir = "videos/demo"
            answer_file = "answers/demo_answer.txt"
            count = 6
            modality = "video"
            "#,
        )
        .unwrap();
        assert_eq!(config.response_window_ms, 2000);
        assert!(config.counterbalance);
        assert_eq!(config.keys.a, 'd');
        assert_eq!(config.keys.proceed, ' ');
        assert_eq!(config.blocks.demo.modality, Modality::Video);
        assert_eq!(config.blocks.demo.conditions_file, None);
        assert_eq!(config.blocks.test1.count, 96);
        assert_eq!(config.feedback_ms, 2000);
    }

    #[test]
    fn rejects_zero_window_and_clashing_keys() {
        assert!(matches!(
            ExperimentConfig::from_toml("response_window_ms = 0"),
            Err(ConfigError::ZeroResponseWindow)
        ));
        assert!(matches!(
            ExperimentConfig::from_toml("[keys]\na = \"v\"\nb = \"v\""),
            Err(ConfigError::AmbiguousKeys)
        ));
    }

    #[test]
    fn page_plan_must_be_ordered() {
        let plan = PagePlan {
            total: 10,
            demo: 6,
            test1: 9,
            break_page: 8,
            test2: 9,
        };
        assert!(plan.validate().is_err());

        let plan = PagePlan::default();
        assert_eq!(plan.block_after(6), Some(StandardPhase::Demo));
        assert_eq!(plan.block_after(7), Some(StandardPhase::Test1));
        assert_eq!(plan.block_after(8), None);
        assert_eq!(plan.block_after(9), Some(StandardPhase::Test2));
    }

    #[test]
    fn block_paths_resolve_against_root() {
        let mut config = ExperimentConfig::default();
        config.materials_root = PathBuf::from("/data/rotation");
        let demo = config.block(StandardPhase::Demo).unwrap();
        assert_eq!(demo.stimulus_dir, PathBuf::from("/data/rotation/images/demo_images"));
        assert!(matches!(
            config.block(StandardPhase::Break),
            Err(ConfigError::MissingBlock(StandardPhase::Break))
        ));
    }
}
