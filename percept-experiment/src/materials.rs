//! Loading and validating stimulus materials
//!
//! Everything here runs before the first screen is shown. Any error is a
//! corrupted-materials condition and aborts the session.

use std::path::Path;

use percept_core::{ConditionRow, StandardPhase};
use rand::Rng;

use crate::config::{BlockMaterials, ExperimentConfig};
use crate::error::{MaterialsError, SessionError};
use crate::trial_set::TrialSet;

/// Reads an answer file: one `0`/`1` token per line, blank lines skipped.
pub fn read_answers(path: &Path) -> Result<Vec<bool>, MaterialsError> {
    let text = std::fs::read_to_string(path).map_err(|source| MaterialsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut answers = Vec::new();
    for (n, line) in text.lines().enumerate() {
        match line.trim() {
            "" => continue,
            "0" => answers.push(false),
            "1" => answers.push(true),
            other => {
                return Err(MaterialsError::InvalidAnswer {
                    path: path.to_path_buf(),
                    line: n + 1,
                    token: other.to_string(),
                });
            }
        }
    }
    tracing::debug!(path = %path.display(), count = answers.len(), "Loaded answers");
    Ok(answers)
}

/// Reads a condition sheet with header
/// `item_number,letter_name,rotation_angle,mirrored,block`.
pub fn read_conditions(path: &Path) -> Result<Vec<ConditionRow>, MaterialsError> {
    let conditions_err = |source| MaterialsError::Conditions {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(conditions_err)?;

    reader
        .deserialize()
        .collect::<Result<Vec<ConditionRow>, _>>()
        .map_err(conditions_err)
}

/// Builds one block's trial set and checks every stimulus file exists.
pub fn load_block(phase: StandardPhase, block: &BlockMaterials) -> Result<TrialSet, MaterialsError> {
    let answers = read_answers(&block.answer_file)?;
    let mut set = TrialSet::build(
        phase.label(),
        &answers,
        block.count,
        block.modality,
        &block.stimulus_dir,
    )?;

    if let Some(missing) = set.iter().find(|t| !t.stimulus.path.is_file()) {
        return Err(MaterialsError::MissingStimulus(missing.stimulus.path.clone()));
    }

    if let Some(path) = &block.conditions_file {
        set.attach_conditions(read_conditions(path)?)?;
    }
    Ok(set)
}

/// Loads, validates and shuffles the trial sets of every block, in run order.
pub fn load_all<R: Rng + ?Sized>(
    config: &ExperimentConfig,
    rng: &mut R,
) -> Result<Vec<(StandardPhase, TrialSet)>, SessionError> {
    let mut sets = Vec::with_capacity(StandardPhase::TRIAL_PHASES.len());
    for phase in StandardPhase::TRIAL_PHASES {
        let block = config.block(phase)?;
        let mut set = load_block(phase, &block)?;
        set.shuffle(rng);
        tracing::info!(phase = %phase, trials = set.len(), "Trial set ready");
        sets.push((phase, set));
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use percept_core::Modality;
    use std::fs;
    use tempfile::TempDir;

    fn write_block(root: &Path, name: &str, answers: &str, stimuli: usize) -> BlockMaterials {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for i in 1..=stimuli {
            fs::write(dir.join(format!("{i}.mp4")), b"stub").unwrap();
        }
        let answer_file = root.join(format!("{name}_answer.txt"));
        fs::write(&answer_file, answers).unwrap();
        BlockMaterials {
            stimulus_dir: dir,
            answer_file,
            conditions_file: None,
            count: stimuli,
            modality: Modality::Video,
        }
    }

    #[test]
    fn answers_skip_blanks_and_trim() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "1\n0\n\n 1 \r\n0\n").unwrap();
        assert_eq!(read_answers(&path).unwrap(), vec![true, false, true, false]);
    }

    #[test]
    fn bad_answer_token_reports_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "1\nyes\n").unwrap();
        let err = read_answers(&path).unwrap_err();
        assert!(matches!(err, MaterialsError::InvalidAnswer { line: 2, .. }));
    }

    #[test]
    fn five_answers_for_six_stimuli_is_a_mismatch() {
        let tmp = TempDir::new().unwrap();
        let block = write_block(tmp.path(), "test1", "1\n0\n1\n1\n0\n", 6);
        let err = load_block(StandardPhase::Test1, &block).unwrap_err();
        assert!(matches!(
            err,
            MaterialsError::ConfigurationMismatch {
                expected: 6,
                found: 5,
                ..
            }
        ));
    }

    #[test]
    fn missing_stimulus_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let block = write_block(tmp.path(), "demo", "1\n0\n1\n", 3);
        fs::remove_file(block.stimulus_dir.join("2.mp4")).unwrap();
        let err = load_block(StandardPhase::Demo, &block).unwrap_err();
        match err {
            MaterialsError::MissingStimulus(path) => assert!(path.ends_with("2.mp4")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn conditions_are_parsed_and_attached() {
        let tmp = TempDir::new().unwrap();
        let mut block = write_block(tmp.path(), "demo", "1\n0\n", 2);
        let sheet = tmp.path().join("demo_conditions.csv");
        fs::write(
            &sheet,
            "item_number,letter_name,rotation_angle,mirrored,block\n\
             1, F, 0, 1, practice\n\
             2, R, 240, 0, practice\n",
        )
        .unwrap();
        block.conditions_file = Some(sheet);

        let set = load_block(StandardPhase::Demo, &block).unwrap();
        let second = set.iter().nth(1).unwrap().condition.clone().unwrap();
        assert_eq!(second.letter_name, "R");
        assert_eq!(second.rotation_angle, 240);
        assert_eq!(second.block, "practice");
    }
}
