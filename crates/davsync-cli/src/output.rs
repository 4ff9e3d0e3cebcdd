//! Terminal output of `davsync`
//!
//! Human output carries status marks and is silenced by `--quiet`, except
//! for errors. With `--json` only results and outcomes are printed, one JSON
//! document each. Errors always go to stderr.

use serde_json::{json, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

enum Message<'a> {
    Success(&'a str),
    Error(&'a str),
    Info(&'a str),
    Json(&'a Value),
}

/// Prints command results in the selected format
#[derive(Debug, Clone, Copy)]
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Outcome of a command
    pub fn success(&self, message: &str) {
        self.emit(Message::Success(message));
    }

    pub fn error(&self, message: &str) {
        self.emit(Message::Error(message));
    }

    /// Detail line, human format only
    pub fn info(&self, message: &str) {
        self.emit(Message::Info(message));
    }

    /// Structured result, JSON format only
    pub fn print_json(&self, value: &Value) {
        self.emit(Message::Json(value));
    }

    fn emit(&self, message: Message<'_>) {
        match self.render(message) {
            Some((Stream::Stdout, line)) => println!("{line}"),
            Some((Stream::Stderr, line)) => eprintln!("{line}"),
            None => {}
        }
    }

    fn render(&self, message: Message<'_>) -> Option<(Stream, String)> {
        match (self.format, message) {
            (OutputFormat::Human, Message::Error(text)) => {
                Some((Stream::Stderr, format!("\u{2717} Error: {text}")))
            }
            (OutputFormat::Human, _) if self.quiet => None,
            (OutputFormat::Human, Message::Success(text)) => {
                Some((Stream::Stdout, format!("\u{2713} {text}")))
            }
            (OutputFormat::Human, Message::Info(text)) => Some((Stream::Stdout, format!("  {text}"))),
            (OutputFormat::Json, Message::Success(text)) => Some((
                Stream::Stdout,
                json!({"success": true, "message": text}).to_string(),
            )),
            (OutputFormat::Json, Message::Error(text)) => Some((
                Stream::Stderr,
                json!({"success": false, "error": text}).to_string(),
            )),
            (OutputFormat::Json, Message::Json(value)) => serde_json::to_string_pretty(value)
                .ok()
                .map(|text| (Stream::Stdout, text)),
            (OutputFormat::Human, Message::Json(_)) | (OutputFormat::Json, Message::Info(_)) => None,
        }
    }
}
