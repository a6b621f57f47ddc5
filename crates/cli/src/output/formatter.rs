//! Human and JSON rendering shared by every command
//!
//! Results go to stdout. Errors, warnings and logs go to stderr so that
//! `--json` output can be piped without filtering.

use console::Style;
use omni_core::Error;
use serde::Serialize;

use super::OutputConfig;
use crate::exit_code::ExitCode;

/// What a piece of text represents; selects its style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Folder names
    Folder,
    /// Byte sizes and totals
    Size,
    /// Rendered datetimes
    Timestamp,
    /// Property labels in `info` output
    Label,
    /// Locations, endpoints and roots
    Location,
    /// Configured remote names
    Remote,
}

/// Styles for each role plus the status markers
#[derive(Debug, Clone)]
struct Palette {
    folder: Style,
    size: Style,
    timestamp: Style,
    label: Style,
    location: Style,
    remote: Style,
    ok: Style,
    fail: Style,
    warn: Style,
}

impl Palette {
    fn colored() -> Self {
        Self {
            folder: Style::new().blue().bold(),
            size: Style::new().green(),
            timestamp: Style::new().dim(),
            label: Style::new().cyan(),
            location: Style::new().cyan().underlined(),
            remote: Style::new().bold(),
            ok: Style::new().green(),
            fail: Style::new().red(),
            warn: Style::new().yellow(),
        }
    }

    fn monochrome() -> Self {
        let plain = Style::new();
        Self {
            folder: plain.clone(),
            size: plain.clone(),
            timestamp: plain.clone(),
            label: plain.clone(),
            location: plain.clone(),
            remote: plain.clone(),
            ok: plain.clone(),
            fail: plain.clone(),
            warn: plain,
        }
    }

    fn get(&self, role: Role) -> &Style {
        match role {
            Role::Folder => &self.folder,
            Role::Size => &self.size,
            Role::Timestamp => &self.timestamp,
            Role::Label => &self.label,
            Role::Location => &self.location,
            Role::Remote => &self.remote,
        }
    }
}

#[derive(Serialize)]
struct ErrorOutput<'a> {
    error: &'a str,
}

/// Writes command results in the selected output mode
///
/// In JSON mode stdout carries exactly one JSON document and nothing is
/// colored or animated.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
    palette: Palette,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        let palette = if config.json || config.no_color {
            Palette::monochrome()
        } else {
            Palette::colored()
        };
        Self { config, palette }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// Whether progress bars may be drawn
    pub fn show_progress(&self) -> bool {
        !(self.config.json || self.config.quiet)
    }

    fn human(&self) -> bool {
        !(self.config.json || self.config.quiet)
    }

    /// Style `text` for its role
    pub fn paint(&self, role: Role, text: &str) -> String {
        self.palette.get(role).apply_to(text).to_string()
    }

    /// `✓ message` on stdout, human mode only
    pub fn success(&self, message: &str) {
        if self.human() {
            println!("{} {message}", self.palette.ok.apply_to("✓"));
        }
    }

    /// Errors are printed in every mode; as `{"error": ...}` under `--json`
    pub fn error(&self, message: &str) {
        if !self.config.json {
            eprintln!("{} {message}", self.palette.fail.apply_to("✗"));
            return;
        }
        let rendered = serde_json::to_string_pretty(&ErrorOutput { error: message });
        eprintln!("{}", rendered.unwrap_or_else(|_| message.to_string()));
    }

    /// Print `context: error` and return the matching exit code
    pub fn fail(&self, context: &str, error: &Error) -> ExitCode {
        tracing::debug!(error = ?error, "{context}");
        self.error(&format!("{context}: {error}"));
        ExitCode::from_error(error)
    }

    pub fn warning(&self, message: &str) {
        if self.human() {
            eprintln!("{} {message}", self.palette.warn.apply_to("⚠"));
        }
    }

    /// Write `value` as pretty JSON on stdout
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(e) => self.error(&format!("cannot serialize output: {e}")),
        }
    }

    /// Plain stdout line; suppressed by `--quiet`
    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }

    /// `label value` with the label padded to `width`
    pub fn key_value(&self, label: &str, value: &str, width: usize) {
        let label = self.paint(Role::Label, &format!("{label:<width$}"));
        self.println(&format!("{label} {value}"));
    }
}
