//! Keyboard-and-terminal presenter for real sessions.

use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{self, Clear, ClearType},
};
use percept_core::{KeyBindings, Modality, Outcome, RawInput, Trial};
use percept_experiment::{Feedback, InputEvent, PhaseSummary, PresentationAdapter, PresentationError};
use tokio::sync::mpsc;

/// Raw mode for the lifetime of the value.
struct RawMode {
    was_raw: bool,
}

impl RawMode {
    fn enable() -> io::Result<Self> {
        let was_raw = terminal::is_raw_mode_enabled()?;
        if !was_raw {
            terminal::enable_raw_mode()?;
        }
        Ok(Self { was_raw })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if !self.was_raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Reads the participant identifier key by key until `terminator`.
/// Backspace edits; Esc aborts.
pub fn read_participant(terminator: char) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "Participant ID (end with '{terminator}'): ")?;
    stdout.flush()?;

    let _raw = RawMode::enable()?;
    let mut id = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char(c) if c == terminator => break,
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                id.push(c);
                write!(stdout, "{c}")?;
            }
            KeyCode::Backspace if id.pop().is_some() => write!(stdout, "\u{8} \u{8}")?,
            KeyCode::Esc => {
                write!(stdout, "\r\n")?;
                return Err(io::Error::new(io::ErrorKind::Interrupted, "aborted by operator"));
            }
            _ => {}
        }
        stdout.flush()?;
    }
    write!(stdout, "\r\n")?;
    stdout.flush()?;
    Ok(id)
}

/// Presents trials as text screens and forwards key presses from a reader
/// thread through a bounded channel.
pub struct TerminalPresenter {
    stdout: Stdout,
    keys: KeyBindings,
    instructions: PathBuf,
    input: mpsc::Receiver<InputEvent>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    _raw: RawMode,
}

impl TerminalPresenter {
    pub fn start(keys: KeyBindings, buffer: usize, instructions: PathBuf) -> io::Result<Self> {
        let raw = RawMode::enable()?;
        let (tx, input) = mpsc::channel(buffer.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let reader = {
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("percept-keys".into())
                .spawn(move || read_keys(tx, stop))?
        };

        let mut stdout = io::stdout();
        execute!(stdout, Hide, Clear(ClearType::All))?;
        Ok(Self {
            stdout,
            keys,
            instructions,
            input,
            stop,
            reader: Some(reader),
            _raw: raw,
        })
    }

    fn screen(&mut self, lines: &[String]) -> Result<(), PresentationError> {
        let draw = |out: &mut Stdout| -> io::Result<()> {
            execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
            for line in lines {
                write!(out, "{line}\r\n")?;
            }
            out.flush()
        };
        draw(&mut self.stdout).map_err(|e| PresentationError::Display(e.to_string()))
    }

    fn page_text(&self, page: usize, total: usize) -> Vec<String> {
        let path = self.instructions.join(format!("page{page}.txt"));
        let mut lines: Vec<String> = match std::fs::read_to_string(&path) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => vec![format!("Instructions, page {page} of {total}.")],
        };
        lines.push(String::new());
        lines.push(format!("Press {} to continue.", key_name(self.keys.proceed)));
        lines
    }
}

fn read_keys(tx: mpsc::Sender<InputEvent>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match event::poll(Duration::from_millis(20)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => {
                tracing::error!(error = %err, "Keyboard poll failed");
                break;
            }
        }
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(err) => {
                tracing::error!(error = %err, "Keyboard read failed");
                break;
            }
        };
        let Some(input) = raw_input(&key) else {
            continue;
        };
        if tx.blocking_send(InputEvent::now(input)).is_err() {
            break;
        }
    }
}

fn raw_input(key: &KeyEvent) -> Option<RawInput> {
    if key.kind != KeyEventKind::Press || key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match key.code {
        KeyCode::Char(c) => Some(RawInput::Key(c)),
        KeyCode::Enter => Some(RawInput::Key('\n')),
        _ => None,
    }
}

fn key_name(c: char) -> String {
    match c {
        ' ' => "SPACE".to_string(),
        '\n' => "ENTER".to_string(),
        other => other.to_ascii_uppercase().to_string(),
    }
}

fn feedback_text(feedback: Feedback) -> &'static str {
    match feedback {
        Feedback::Outcome(Outcome::Correct) => "✓  Correct",
        Feedback::Outcome(Outcome::Incorrect) => "✗  Incorrect",
        Feedback::Outcome(Outcome::Timeout) => "Too slow",
        Feedback::Blank => "",
    }
}

/// Checks that the stimulus can be shown and describes it.
fn load_stimulus(trial: &Trial) -> Result<String, PresentationError> {
    let path = &trial.stimulus.path;
    let playback = |reason: String| PresentationError::Playback {
        path: path.clone(),
        reason,
    };
    match trial.stimulus.modality {
        Modality::Image => {
            let image = image::open(path).map_err(|e| playback(e.to_string()))?;
            Ok(format!("[image {}x{}]", image.width(), image.height()))
        }
        Modality::Video => {
            let len = std::fs::metadata(path)
                .map_err(|e| playback(e.to_string()))?
                .len();
            if len == 0 {
                return Err(playback("empty clip".into()));
            }
            Ok(format!("[clip {}]", file_name(path)))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl PresentationAdapter for TerminalPresenter {
    async fn present(&mut self, trial: &Trial) -> Result<(), PresentationError> {
        let description = load_stimulus(trial)?;
        let prompt = format!(
            "{} / {}",
            key_name(self.keys.a),
            key_name(self.keys.b)
        );
        self.screen(&[
            format!("Item {}", trial.item_number()),
            String::new(),
            description,
            String::new(),
            prompt,
        ])
    }

    fn discard_pending_input(&mut self) {
        while self.input.try_recv().is_ok() {}
    }

    async fn next_input(&mut self) -> Option<InputEvent> {
        self.input.recv().await
    }

    async fn show_feedback(
        &mut self,
        feedback: Feedback,
        duration: Duration,
    ) -> Result<(), PresentationError> {
        self.screen(&[feedback_text(feedback).to_string()])?;
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn show_page(&mut self, page: usize, total: usize) -> Result<(), PresentationError> {
        let lines = self.page_text(page, total);
        self.screen(&lines)
    }

    async fn show_summary(&mut self, summary: &PhaseSummary) -> Result<(), PresentationError> {
        let mut lines = vec![
            format!("{} complete", summary.phase.label()),
            String::new(),
            format!("Accuracy: {:.2}%", summary.accuracy_percent),
        ];
        if let Some(coaching) = summary.coaching {
            lines.push(coaching.to_string());
        }
        lines.push(String::new());
        lines.push(format!("Press {} to continue.", key_name(self.keys.proceed)));
        self.screen(&lines)
    }
}

impl Drop for TerminalPresenter {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // Wakes a reader parked in `blocking_send` on a full channel.
        self.input.close();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        let _ = execute!(self.stdout, Clear(ClearType::All), MoveTo(0, 0), Show);
    }
}
