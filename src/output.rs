// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Prints progress, outcomes, and release listings as text or JSON lines.

use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an action.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Report a release the action deleted (pruned or rolled past).
    pub fn removed(&self, slug: &str) {
        match self.mode {
            OutputMode::Normal => println!("  → Removed {slug}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit(
                JsonEvent {
                    release: Some(slug),
                    ..JsonEvent::new("removed")
                },
                Stream::Stdout,
            ),
        }
    }

    /// One line of a release listing, `*` marking the current release.
    pub fn release(&self, slug: &str, current: bool) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                let marker = if current { '*' } else { ' ' };
                println!("{marker} {slug}");
            }
            OutputMode::Json => self.emit(
                JsonEvent {
                    release: Some(slug),
                    current: Some(current),
                    ..JsonEvent::new("release")
                },
                Stream::Stdout,
            ),
        }
    }

    /// Print a result line that quiet mode keeps.
    pub fn info(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit(
                JsonEvent {
                    message: Some(message),
                    ..JsonEvent::new("info")
                },
                Stream::Stdout,
            ),
        }
    }

    /// Print the final outcome, with timing when a timer was started.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => match self.duration() {
                Some(elapsed) if elapsed > 0.0 => println!("{message} ({elapsed:.1}s)"),
                _ => println!("{message}"),
            },
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit(
                JsonEvent {
                    message: Some(message),
                    duration_secs: self.duration(),
                    ..JsonEvent::new("success")
                },
                Stream::Stdout,
            ),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit(
                JsonEvent {
                    message: Some(message),
                    ..JsonEvent::new("warning")
                },
                Stream::Stderr,
            ),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.emit(
                JsonEvent {
                    message: Some(message),
                    duration_secs: self.duration(),
                    ..JsonEvent::new("error")
                },
                Stream::Stderr,
            ),
        }
    }

    fn emit(&self, event: JsonEvent<'_>, stream: Stream) {
        let Ok(json) = serde_json::to_string(&event) else {
            return;
        };
        match stream {
            Stream::Stdout => println!("{json}"),
            Stream::Stderr => eprintln!("{json}"),
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

impl<'a> JsonEvent<'a> {
    fn new(event: &'a str) -> Self {
        Self {
            event,
            message: None,
            release: None,
            current: None,
            duration_secs: None,
        }
    }
}
