//! Presenter that plays back pre-scripted subject behaviour.
//!
//! Used by the test suites and by `--simulate` dry runs. Nothing is drawn;
//! every call is recorded in [`ScriptedPresenter::events`] and input is
//! delivered on the tokio clock, so paused-time tests are deterministic.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use percept_core::{KeyBindings, PhaseTally, RawInput, StandardPhase, Trial, TrialId};
use rand::Rng;
use rand::rngs::StdRng;
use tokio::time::{Instant, sleep, sleep_until};

use crate::error::PresentationError;
use crate::presentation::{Feedback, InputEvent, PhaseSummary, PresentationAdapter};

/// How the scripted subject behaves on one trial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialScript {
    /// Pressed while the stimulus is still being presented.
    pub early: Vec<RawInput>,
    /// Pressed at an offset from presentation complete.
    pub inputs: Vec<(Duration, RawInput)>,
    pub fail_playback: bool,
}

impl TrialScript {
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn respond(after_ms: u64, key: char) -> Self {
        Self::silent().then(after_ms, key)
    }

    pub fn failing() -> Self {
        Self {
            fail_playback: true,
            ..Self::default()
        }
    }

    pub fn then(mut self, after_ms: u64, key: char) -> Self {
        self.inputs
            .push((Duration::from_millis(after_ms), RawInput::Key(key)));
        self
    }

    pub fn early(mut self, key: char) -> Self {
        self.early.push(RawInput::Key(key));
        self
    }
}

/// Random subject for dry runs: presses one of the two response keys after
/// a uniform delay, which may overshoot the response window.
#[derive(Debug)]
pub struct Autopilot {
    rng: StdRng,
    keys: KeyBindings,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl Autopilot {
    pub fn new(rng: StdRng, keys: KeyBindings, window: Duration) -> Self {
        let window_ms = window.as_millis() as u64;
        Self {
            rng,
            keys,
            min_delay_ms: (window_ms / 10).max(1),
            max_delay_ms: window_ms + window_ms / 5,
        }
    }

    fn script(&mut self) -> TrialScript {
        let key = if self.rng.random_bool(0.5) {
            self.keys.a
        } else {
            self.keys.b
        };
        let delay = self
            .rng
            .random_range(self.min_delay_ms..=self.max_delay_ms.max(self.min_delay_ms));
        TrialScript::respond(delay, key)
    }
}

/// Everything the presenter was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterEvent {
    Presented(TrialId),
    PlaybackFailed(TrialId),
    Feedback(Feedback),
    Page(usize),
    Summary(StandardPhase, PhaseTally),
}

pub struct ScriptedPresenter {
    keys: KeyBindings,
    scripts: VecDeque<TrialScript>,
    autopilot: Option<Autopilot>,
    presentation_time: Duration,
    page_dwell: Duration,
    early: VecDeque<InputEvent>,
    scheduled: VecDeque<InputEvent>,
    events: Vec<PresenterEvent>,
}

impl ScriptedPresenter {
    /// `page_dwell` is how long the subject stays on an instruction page
    /// before pressing proceed.
    pub fn new(keys: KeyBindings, page_dwell: Duration) -> Self {
        Self {
            keys,
            scripts: VecDeque::new(),
            autopilot: None,
            presentation_time: Duration::ZERO,
            page_dwell,
            early: VecDeque::new(),
            scheduled: VecDeque::new(),
            events: Vec::new(),
        }
    }

    pub fn with_scripts(mut self, scripts: impl IntoIterator<Item = TrialScript>) -> Self {
        self.scripts.extend(scripts);
        self
    }

    pub fn with_autopilot(mut self, autopilot: Autopilot) -> Self {
        self.autopilot = Some(autopilot);
        self
    }

    /// Simulated time to render each stimulus.
    pub fn with_presentation_time(mut self, presentation_time: Duration) -> Self {
        self.presentation_time = presentation_time;
        self
    }

    pub fn events(&self) -> &[PresenterEvent] {
        &self.events
    }

    pub fn presented(&self) -> impl Iterator<Item = TrialId> + '_ {
        self.events.iter().filter_map(|e| match e {
            PresenterEvent::Presented(id) => Some(*id),
            _ => None,
        })
    }

    fn schedule(&mut self, at: Instant, input: RawInput) {
        let slot = self
            .scheduled
            .iter()
            .position(|e| e.at > at)
            .unwrap_or(self.scheduled.len());
        self.scheduled.insert(slot, InputEvent { input, at });
    }

    /// Replaces any pending input with one proceed press after `page_dwell`.
    fn press_proceed_later(&mut self) {
        self.early.clear();
        self.scheduled.clear();
        let proceed = RawInput::Key(self.keys.proceed);
        self.schedule(Instant::now() + self.page_dwell, proceed);
    }

    fn next_script(&mut self) -> TrialScript {
        match (self.scripts.pop_front(), self.autopilot.as_mut()) {
            (Some(script), _) => script,
            (None, Some(autopilot)) => autopilot.script(),
            (None, None) => TrialScript::silent(),
        }
    }
}

#[async_trait]
impl PresentationAdapter for ScriptedPresenter {
    async fn present(&mut self, trial: &Trial) -> Result<(), PresentationError> {
        self.early.clear();
        self.scheduled.clear();
        let script = self.next_script();

        let started = Instant::now();
        self.early
            .extend(script.early.iter().map(|&input| InputEvent { input, at: started }));
        sleep(self.presentation_time).await;

        if script.fail_playback {
            self.events.push(PresenterEvent::PlaybackFailed(trial.id));
            return Err(PresentationError::Playback {
                path: trial.stimulus.path.clone(),
                reason: "scripted failure".into(),
            });
        }

        let complete = Instant::now();
        for (offset, input) in script.inputs {
            self.schedule(complete + offset, input);
        }
        self.events.push(PresenterEvent::Presented(trial.id));
        Ok(())
    }

    fn discard_pending_input(&mut self) {
        let now = Instant::now();
        self.early.clear();
        self.scheduled.retain(|e| e.at >= now);
    }

    async fn next_input(&mut self) -> Option<InputEvent> {
        if let Some(event) = self.early.pop_front() {
            return Some(event);
        }
        let due = self.scheduled.front()?.at;
        sleep_until(due).await;
        self.scheduled.pop_front()
    }

    async fn show_feedback(
        &mut self,
        feedback: Feedback,
        duration: Duration,
    ) -> Result<(), PresentationError> {
        self.events.push(PresenterEvent::Feedback(feedback));
        sleep(duration).await;
        Ok(())
    }

    async fn show_page(&mut self, page: usize, _total: usize) -> Result<(), PresentationError> {
        self.events.push(PresenterEvent::Page(page));
        self.press_proceed_later();
        Ok(())
    }

    async fn show_summary(&mut self, summary: &PhaseSummary) -> Result<(), PresentationError> {
        self.events
            .push(PresenterEvent::Summary(summary.phase, summary.tally));
        self.press_proceed_later();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use percept_core::{Modality, Stimulus};
    use rand::SeedableRng;
    use std::path::Path;

    fn trial(n: usize) -> Trial {
        Trial {
            id: TrialId(n),
            stimulus: Stimulus::numbered(Path::new("v"), n, Modality::Video),
            ground_truth: true,
            condition: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn inputs_arrive_at_their_offsets() {
        let mut presenter = ScriptedPresenter::new(KeyBindings::default(), Duration::ZERO)
            .with_scripts([TrialScript::respond(300, 'm').then(100, 'x')]);
        presenter.present(&trial(1)).await.unwrap();
        let start = Instant::now();

        let first = presenter.next_input().await.unwrap();
        assert_eq!(first.input, RawInput::Key('x'));
        assert_eq!(first.at, start + Duration::from_millis(100));
        let second = presenter.next_input().await.unwrap();
        assert_eq!(second.input, RawInput::Key('m'));
        assert!(presenter.next_input().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn early_presses_are_discardable() {
        let mut presenter = ScriptedPresenter::new(KeyBindings::default(), Duration::ZERO)
            .with_presentation_time(Duration::from_millis(500))
            .with_scripts([TrialScript::respond(200, 'v').early('m')]);
        presenter.present(&trial(1)).await.unwrap();
        presenter.discard_pending_input();

        let event = presenter.next_input().await.unwrap();
        assert_eq!(event.input, RawInput::Key('v'));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_script_reports_playback_error() {
        let mut presenter = ScriptedPresenter::new(KeyBindings::default(), Duration::ZERO)
            .with_scripts([TrialScript::failing()]);
        let err = presenter.present(&trial(4)).await.unwrap_err();
        assert!(matches!(err, PresentationError::Playback { .. }));
        assert_eq!(presenter.events(), &[PresenterEvent::PlaybackFailed(TrialId(4))]);
    }

    #[tokio::test(start_paused = true)]
    async fn autopilot_presses_a_response_key() {
        let keys = KeyBindings::default();
        let autopilot = Autopilot::new(StdRng::seed_from_u64(3), keys, Duration::from_millis(2000));
        let mut presenter =
            ScriptedPresenter::new(keys, Duration::ZERO).with_autopilot(autopilot);
        for n in 1..=10 {
            presenter.present(&trial(n)).await.unwrap();
            let event = presenter.next_input().await.unwrap();
            assert!(keys.action_for(event.input).is_some());
        }
    }
}
