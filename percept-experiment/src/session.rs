//! Drives a whole session: instruction slideshow, the three trial blocks,
//! the break, exports and the final summary.

use std::time::Duration;

use percept_core::{ConditionRow, ResponseMapping, StandardPhase, TrialRecord};
use percept_timing::WallClock;
use tokio::time::sleep;

use crate::config::ExperimentConfig;
use crate::engine::TrialEngine;
use crate::error::{Result, SessionError};
use crate::export::{PhaseEntry, PhaseResults, PhaseSpan, ResultRow, ResultSink, SessionSummary};
use crate::ledger::ResultLedger;
use crate::presentation::{PhaseSummary, PresentationAdapter};
use crate::state::SessionState;
use crate::trial_set::TrialSet;

pub struct SessionController<A, S> {
    config: ExperimentConfig,
    engine: TrialEngine,
    adapter: A,
    sink: S,
    state: SessionState,
    clock: WallClock,
}

impl<A, S> SessionController<A, S>
where
    A: PresentationAdapter,
    S: ResultSink,
{
    /// `sets` must hold one loaded trial set per trial block.
    pub fn new(
        config: ExperimentConfig,
        participant: &str,
        mapping: ResponseMapping,
        sets: Vec<(StandardPhase, TrialSet)>,
        adapter: A,
        sink: S,
    ) -> Result<Self> {
        let participant = participant.trim();
        if participant.is_empty() {
            return Err(SessionError::EmptyParticipant);
        }
        config.validate()?;

        let engine = TrialEngine::new(
            config.keys,
            mapping,
            config.response_window(),
            config.feedback(),
        );
        let clock = WallClock;
        let state = SessionState::new(participant, sets, clock.now());

        Ok(Self {
            config,
            engine,
            adapter,
            sink,
            state,
            clock,
        })
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs every page and block, then finalises the session.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        let pages = self.config.pages;
        tracing::info!(
            participant = %self.state.participant,
            pages = pages.total,
            "Session started"
        );

        for page in 1..=pages.total {
            if page == pages.break_page {
                self.state.mark_break_began(self.clock.now());
                self.state.advance_to(StandardPhase::Break);
                tracing::info!("Break started");
            }
            if page == pages.test2 {
                self.state.mark_break_ended(self.clock.now());
                tracing::info!(
                    break_ms = self.state.break_duration_ms(&self.clock.now()),
                    "Break ended"
                );
            }

            if let Err(err) = self.adapter.show_page(page, pages.total).await {
                tracing::warn!(page, error = %err, "Instruction page failed");
            }
            self.await_proceed(self.config.read_time()).await;

            if let Some(phase) = pages.block_after(page) {
                self.run_block(phase).await?;
            }
        }

        Ok(self.finish())
    }

    /// Keeps the continue action locked for `locked`, then waits for it.
    async fn await_proceed(&mut self, locked: Duration) {
        sleep(locked).await;
        self.adapter.discard_pending_input();
        loop {
            match self.adapter.next_input().await {
                Some(event) if self.config.keys.is_proceed(event.input) => return,
                Some(_) => continue,
                None => {
                    tracing::warn!("Input closed while waiting to continue");
                    return;
                }
            }
        }
    }

    async fn run_block(&mut self, phase: StandardPhase) -> Result<()> {
        self.state.advance_to(phase);
        let mut set = self
            .state
            .take_set(phase)
            .ok_or(SessionError::MissingTrialSet(phase))?;
        let declared = set.declared_len();
        tracing::info!(phase = %phase, trials = set.len(), "Block started");

        let mut ledger = ResultLedger::new();
        let mut records: Vec<(TrialRecord, Option<ConditionRow>)> = Vec::with_capacity(declared);
        while !set.is_empty() {
            let trial = set.pop();
            let record = self.engine.run(&mut self.adapter, &trial, phase).await;
            ledger.record(record.trial_id, record.outcome);
            records.push((record, trial.condition));
        }

        let tally = ledger.into_tally();
        if tally.total() != declared {
            return Err(SessionError::TallyMismatch {
                phase,
                tallied: tally.total(),
                declared,
            });
        }
        self.state.record_tally(phase, tally);

        let ended = self.clock.now();
        let span = PhaseSpan {
            started: self.state.started,
            ended,
            break_duration_ms: self.state.break_duration_ms(&ended),
        };
        let results = PhaseResults {
            participant: self.state.participant.clone(),
            phase,
            rows: records
                .iter()
                .map(|(record, condition)| {
                    ResultRow::new(&self.state.participant, record, condition.as_ref(), &span)
                })
                .collect(),
        };
        if let Err(err) = self.sink.write_phase(&results) {
            tracing::error!(phase = %phase, error = %err, "Failed to export phase results");
        }

        let summary = PhaseSummary::new(phase, tally);
        tracing::info!(
            phase = %phase,
            correct = tally.correct,
            incorrect = tally.incorrect,
            timeout = tally.timeout,
            accuracy = summary.accuracy_percent,
            "Block complete"
        );
        if let Err(err) = self.adapter.show_summary(&summary).await {
            tracing::warn!(phase = %phase, error = %err, "Summary screen failed");
        }
        self.await_proceed(Duration::ZERO).await;

        self.state
            .records
            .insert(phase, records.into_iter().map(|(record, _)| record).collect());
        Ok(())
    }

    fn finish(&mut self) -> SessionSummary {
        let ended = self.clock.now();
        self.state.ended = Some(ended);
        self.state.advance_to(StandardPhase::Results);

        for (phase, tally) in &self.state.tallies {
            tracing::info!(
                phase = %phase,
                correct = tally.correct,
                incorrect = tally.incorrect,
                timeout = tally.timeout,
                "Final tally"
            );
        }

        let summary = SessionSummary {
            participant_id: self.state.participant.clone(),
            start_time: WallClock::format(&self.state.started),
            end_time: WallClock::format(&ended),
            break_duration_ms: self.state.break_duration_ms(&ended),
            reversed_mapping: self.engine.mapping() == ResponseMapping::reversed(),
            phases: self
                .state
                .tallies
                .iter()
                .map(|(phase, tally)| PhaseEntry::new(*phase, *tally))
                .collect(),
        };
        if let Err(err) = self.sink.write_summary(&summary) {
            tracing::error!(error = %err, "Failed to write session summary");
        }
        tracing::info!(participant = %summary.participant_id, "Session complete");
        summary
    }
}
