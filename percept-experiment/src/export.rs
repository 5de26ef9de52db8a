//! Result persistence: one CSV per phase and a JSON session summary.

use std::fs::File;
use std::path::{Path, PathBuf};

use percept_core::{ConditionRow, PhaseTally, StandardPhase, TrialRecord};
use percept_timing::{WallClock, WallStamp};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// One exported CSV row. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub participant_id: String,
    pub item_number: usize,
    pub letter_name: Option<String>,
    pub rotation_angle: Option<i32>,
    pub mirrored: u8,
    pub block: Option<String>,
    pub reaction_time_ms: u64,
    pub correct: u8,
    pub start_time: String,
    pub end_time: String,
    pub break_duration_ms: u64,
}

impl ResultRow {
    /// Without a condition row, `mirrored` carries the ground truth and the
    /// other condition columns stay empty.
    pub fn new(
        participant: &str,
        record: &TrialRecord,
        condition: Option<&ConditionRow>,
        span: &PhaseSpan,
    ) -> Self {
        Self {
            participant_id: participant.to_string(),
            item_number: record.item_number,
            letter_name: condition.map(|c| c.letter_name.clone()),
            rotation_angle: condition.map(|c| c.rotation_angle),
            mirrored: condition.map_or(u8::from(record.ground_truth), |c| c.mirrored),
            block: condition.map(|c| c.block.clone()),
            reaction_time_ms: record.reaction_time_ms,
            correct: record.outcome.correct_flag(),
            start_time: WallClock::format(&span.started),
            end_time: WallClock::format(&span.ended),
            break_duration_ms: span.break_duration_ms,
        }
    }
}

/// Session-level timestamps stamped onto every row of a phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseSpan {
    pub started: WallStamp,
    pub ended: WallStamp,
    pub break_duration_ms: u64,
}

/// A finished phase, ready to persist.
#[derive(Debug, Clone)]
pub struct PhaseResults {
    pub participant: String,
    pub phase: StandardPhase,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub phase: StandardPhase,
    pub correct: usize,
    pub incorrect: usize,
    pub timeout: usize,
    pub accuracy_percent: f64,
}

impl PhaseEntry {
    pub fn new(phase: StandardPhase, tally: PhaseTally) -> Self {
        Self {
            phase,
            correct: tally.correct,
            incorrect: tally.incorrect,
            timeout: tally.timeout,
            accuracy_percent: tally.accuracy_percent(),
        }
    }
}

/// Contents of `<participant>_session.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub participant_id: String,
    pub start_time: String,
    pub end_time: String,
    pub break_duration_ms: u64,
    pub reversed_mapping: bool,
    pub phases: Vec<PhaseEntry>,
}

/// Destination for finished results.
pub trait ResultSink: Send {
    /// Persists one phase. Returns where it went, if anywhere.
    fn write_phase(&mut self, results: &PhaseResults) -> Result<Option<PathBuf>, ExportError>;

    fn write_summary(&mut self, summary: &SessionSummary) -> Result<Option<PathBuf>, ExportError>;
}

/// Writes CSV and JSON files under one results directory. Existing files
/// are never overwritten; a `_2`, `_3`, ... suffix picks a fresh name.
#[derive(Debug, Clone)]
pub struct CsvResultSink {
    dir: PathBuf,
}

impl CsvResultSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn prepare(&self, stem: &str, extension: &str) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        Ok(unique_path(&self.dir, stem, extension))
    }
}

impl ResultSink for CsvResultSink {
    fn write_phase(&mut self, results: &PhaseResults) -> Result<Option<PathBuf>, ExportError> {
        let stem = format!("{}_{}_result", results.participant, results.phase.label());
        let path = self.prepare(&stem, "csv")?;
        let csv_err = |source| ExportError::Csv {
            path: path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
        for row in &results.rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), rows = results.rows.len(), "Phase results written");
        Ok(Some(path))
    }

    fn write_summary(&mut self, summary: &SessionSummary) -> Result<Option<PathBuf>, ExportError> {
        let path = self.prepare(&format!("{}_session", summary.participant_id), "json")?;
        let file = File::create(&path).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(file, summary)?;

        tracing::info!(path = %path.display(), "Session summary written");
        Ok(Some(path))
    }
}

/// Keeps everything in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub phases: Vec<PhaseResults>,
    pub summary: Option<SessionSummary>,
}

impl MemorySink {
    pub fn rows(&self, phase: StandardPhase) -> Option<&[ResultRow]> {
        self.phases
            .iter()
            .find(|p| p.phase == phase)
            .map(|p| p.rows.as_slice())
    }
}

impl ResultSink for MemorySink {
    fn write_phase(&mut self, results: &PhaseResults) -> Result<Option<PathBuf>, ExportError> {
        self.phases.push(results.clone());
        Ok(None)
    }

    fn write_summary(&mut self, summary: &SessionSummary) -> Result<Option<PathBuf>, ExportError> {
        self.summary = Some(summary.clone());
        Ok(None)
    }
}

/// `dir/stem.ext`, or the first free `dir/stem_N.ext` for N = 2, 3, ...
pub fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let first = dir.join(format!("{stem}.{extension}"));
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| dir.join(format!("{stem}_{n}.{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Reads back a phase CSV written by [`CsvResultSink`].
pub fn read_phase_csv(path: &Path) -> Result<Vec<ResultRow>, ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<ResultRow>, _>>()
        .map_err(csv_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use percept_core::{Outcome, TrialId};
    use tempfile::TempDir;

    fn span() -> PhaseSpan {
        PhaseSpan {
            started: Local.with_ymd_and_hms(2024, 5, 2, 14, 0, 0).unwrap(),
            ended: Local.with_ymd_and_hms(2024, 5, 2, 14, 20, 5).unwrap(),
            break_duration_ms: 0,
        }
    }

    fn record(id: usize, outcome: Outcome, rt: u64) -> TrialRecord {
        TrialRecord {
            trial_id: TrialId(id),
            item_number: id,
            ground_truth: id % 2 == 0,
            outcome,
            reaction_time_ms: rt,
            response: None,
            fallback: false,
        }
    }

    fn results(rows: Vec<ResultRow>) -> PhaseResults {
        PhaseResults {
            participant: "P07".into(),
            phase: StandardPhase::Test1,
            rows,
        }
    }

    #[test]
    fn row_without_conditions_uses_ground_truth() {
        let row = ResultRow::new("P07", &record(4, Outcome::Timeout, 2000), None, &span());
        assert_eq!(row.mirrored, 1);
        assert_eq!(row.correct, 0);
        assert_eq!(row.letter_name, None);
        assert_eq!(row.start_time, "2024-05-02 14:00:00");
        assert_eq!(row.end_time, "2024-05-02 14:20:05");
    }

    #[test]
    fn row_with_conditions_copies_them() {
        let condition = ConditionRow {
            item_number: 12,
            letter_name: "G".into(),
            rotation_angle: 300,
            mirrored: 0,
            block: "test1".into(),
        };
        let row = ResultRow::new(
            "P07",
            &record(3, Outcome::Correct, 812),
            Some(&condition),
            &span(),
        );
        assert_eq!(row.letter_name.as_deref(), Some("G"));
        assert_eq!(row.rotation_angle, Some(300));
        assert_eq!(row.mirrored, 0);
        assert_eq!(row.block.as_deref(), Some("test1"));
        assert_eq!(row.correct, 1);
    }

    #[test]
    fn export_then_read_back_keeps_order() {
        let tmp = TempDir::new().unwrap();
        let mut sink = CsvResultSink::new(tmp.path().join("results"));
        let records = [
            record(5, Outcome::Correct, 731),
            record(2, Outcome::Timeout, 2000),
            record(9, Outcome::Incorrect, 1288),
        ];
        let rows: Vec<_> = records
            .iter()
            .map(|r| ResultRow::new("P07", r, None, &span()))
            .collect();

        let path = sink.write_phase(&results(rows.clone())).unwrap().unwrap();
        assert!(path.ends_with("P07_test1_result.csv"));

        let back = read_phase_csv(&path).unwrap();
        assert_eq!(back, rows);
        let pairs: Vec<_> = back.iter().map(|r| (r.reaction_time_ms, r.correct)).collect();
        assert_eq!(pairs, vec![(731, 1), (2000, 0), (1288, 0)]);
    }

    #[test]
    fn header_matches_column_order() {
        let tmp = TempDir::new().unwrap();
        let mut sink = CsvResultSink::new(tmp.path());
        let row = ResultRow::new("P07", &record(1, Outcome::Correct, 500), None, &span());
        let path = sink.write_phase(&results(vec![row])).unwrap().unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "participant_id,item_number,letter_name,rotation_angle,mirrored,block,\
             reaction_time_ms,correct,start_time,end_time,break_duration_ms"
        );
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        let mut sink = CsvResultSink::new(tmp.path());
        let first = sink.write_phase(&results(Vec::new())).unwrap().unwrap();
        let second = sink.write_phase(&results(Vec::new())).unwrap().unwrap();
        let third = sink.write_phase(&results(Vec::new())).unwrap().unwrap();

        assert!(first.ends_with("P07_test1_result.csv"));
        assert!(second.ends_with("P07_test1_result_2.csv"));
        assert!(third.ends_with("P07_test1_result_3.csv"));
    }

    #[test]
    fn summary_is_json() {
        let tmp = TempDir::new().unwrap();
        let mut sink = CsvResultSink::new(tmp.path());
        let summary = SessionSummary {
            participant_id: "P07".into(),
            start_time: "2024-05-02 14:00:00".into(),
            end_time: "2024-05-02 14:50:00".into(),
            break_duration_ms: 95_000,
            reversed_mapping: false,
            phases: vec![PhaseEntry::new(
                StandardPhase::Demo,
                PhaseTally {
                    correct: 4,
                    incorrect: 1,
                    timeout: 0,
                },
            )],
        };
        let path = sink.write_summary(&summary).unwrap().unwrap();
        assert!(path.ends_with("P07_session.json"));

        let back: SessionSummary =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, summary);
        assert_eq!(back.phases[0].accuracy_percent, 80.0);
    }
}
