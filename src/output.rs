// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Everything goes to stderr so remote stdout passes through untouched.

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Only warnings and errors
    Quiet,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Print a progress message (suppressed in quiet mode).
    pub fn progress(&self, message: &str) {
        if let Some(line) = self.render_progress(message) {
            eprintln!("{line}");
        }
    }

    /// Print a warning message.
    pub fn warning(&self, message: &str) {
        eprintln!("{}", render_warning(message));
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        eprintln!("{}", render_error(message));
    }

    fn render_progress(&self, message: &str) -> Option<String> {
        match self.mode {
            OutputMode::Normal => Some(message.to_string()),
            OutputMode::Quiet => None,
        }
    }
}

fn render_warning(message: &str) -> String {
    format!("Warning: {message}")
}

fn render_error(message: &str) -> String {
    format!("Error: {message}")
}
