use crate::compiler::{CompileError, STDIN_PLACEHOLDER};
use crate::file::SourceFile;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Stable plugin tag carried on every propagated error, across both
/// compiler API generations
pub const PLUGIN_NAME: &str = "sasspipe";

/// Decorated error handed to the stream's error channel, never thrown
///
/// `message_original` reproduces the compiler's diagnostic verbatim so
/// callers can substring-match against it; `message` is the ANSI-stripped
/// two-line composition used for default display.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SassError {
    pub plugin: &'static str,
    pub message: String,
    pub message_formatted: String,
    pub message_original: String,
    pub relative_path: String,
}

impl SassError {
    /// Rejection of a streaming input body
    pub(crate) fn streaming() -> Self {
        let message = "Streaming not supported".to_string();
        Self {
            plugin: PLUGIN_NAME,
            message_formatted: message.clone(),
            message_original: message.clone(),
            message,
            relative_path: String::new(),
        }
    }

    /// A failure internal to the stage itself, such as an unparseable
    /// legacy map payload
    pub(crate) fn plugin_message(message: impl Into<String>, file: &SourceFile) -> Self {
        let message = message.into();
        Self {
            plugin: PLUGIN_NAME,
            message_formatted: message.clone(),
            message_original: message.clone(),
            message,
            relative_path: relative_to_cwd(&file.path.display().to_string()),
        }
    }
}

/// Decision an error handler returns to the stage runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSignal {
    Continue,
    End,
}

/// Default error handler: print the formatted two-line message to stderr
/// and end the stream gracefully instead of crashing the host
pub fn log_error(error: &SassError) -> StageSignal {
    eprintln!("Error in plugin \"{}\"\n{}", error.plugin, error.message_formatted);
    StageSignal::End
}

fn ansi_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap())
}

/// Remove ANSI style escapes from a display string
pub fn strip_ansi(input: &str) -> String {
    ansi_regex().replace_all(input, "").into_owned()
}

fn underline(text: &str) -> String {
    format!("\x1b[4m{text}\x1b[24m")
}

fn relative_to_cwd(path: &str) -> String {
    let path = Path::new(path);
    match std::env::current_dir() {
        Ok(cwd) => path.strip_prefix(&cwd).unwrap_or(path).display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

/// Build the decorated error for a rejected compilation
///
/// The failing path comes from the error's own span unless that location is
/// the stdin placeholder, in which case the file being processed names the
/// failure.
pub(crate) fn normalize(error: CompileError, file: &SourceFile) -> SassError {
    let failing_path = error
        .span
        .as_ref()
        .and_then(|span| span.url.as_deref())
        .filter(|url| *url != STDIN_PLACEHOLDER)
        .map(|url| url.strip_prefix("file://").unwrap_or(url).to_string())
        .unwrap_or_else(|| file.path.display().to_string());

    let relative_path = relative_to_cwd(&failing_path);
    let message_formatted = format!("{}\n{}", underline(&relative_path), error.formatted);

    SassError {
        plugin: PLUGIN_NAME,
        message: strip_ansi(&message_formatted),
        message_formatted,
        message_original: error.message,
        relative_path,
    }
}
