// Result and error rendering for `canvas` commands.
//
// Results go to stdout, errors to stderr. A terminal gets text; a pipe or
// `--json` gets one JSON object per line.

use std::io::{self, IsTerminal, Write};

use canvas_common::types::DocumentId;
use canvas_sync::config::STORE_URL_ENV;
use canvas_sync::{StoreError, SyncError};
use serde::Serialize;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// JSON when `--json` is passed or stdout is not a terminal.
    pub fn detect(json_flag: bool) -> Self {
        Self::choose(json_flag, io::stdout().is_terminal())
    }

    fn choose(json_flag: bool, stdout_is_tty: bool) -> Self {
        if json_flag || !stdout_is_tty {
            Self::Json
        } else {
            Self::Human
        }
    }
}

pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => writeln!(writer, "{}", human_fn(value)),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    code: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorReport<'a>,
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let stderr = io::stderr();
    let color = stderr.is_terminal();
    let _ = write_error(&mut stderr.lock(), format, color, error);
}

fn write_error<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    color: bool,
    error: &anyhow::Error,
) -> io::Result<()> {
    let (code, message) = actionable_error(error);
    match format {
        OutputFormat::Human if color => {
            writeln!(writer, "{ANSI_RED}error{ANSI_RESET}: {message}")
        }
        OutputFormat::Human => writeln!(writer, "error: {message}"),
        OutputFormat::Json => {
            let body = ErrorBody { error: ErrorReport { code, message: &message } };
            serde_json::to_writer(&mut *writer, &body).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");

    for cause in error.chain() {
        let store_error = match cause.downcast_ref::<SyncError>() {
            Some(SyncError::NotFound(id)) => return document_not_found(id),
            Some(SyncError::StaleWrite(_)) => return ("STALE_WRITE", message),
            Some(SyncError::NetworkFailure(store_error)) => Some(store_error),
            Some(_) => None,
            None => cause.downcast_ref::<StoreError>(),
        };
        match store_error {
            Some(StoreError::NotFound(id)) => return document_not_found(id),
            Some(StoreError::Transport(_)) => {
                return (
                    "STORE_UNREACHABLE",
                    format!(
                        "Could not reach the document store ({message}). Check --store-url or \
                         {STORE_URL_ENV}."
                    ),
                );
            }
            Some(StoreError::InvalidUrl(_)) => return ("INVALID_STORE_URL", message),
            Some(_) => return ("STORE_ERROR", message),
            None => {}
        }
    }

    ("ERROR", message)
}

fn document_not_found(id: &DocumentId) -> (&'static str, String) {
    (
        "DOCUMENT_NOT_FOUND",
        format!("Document {id} not found. Run: canvas ls to see available documents"),
    )
}
