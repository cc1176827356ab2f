//! Error taxonomy for the pipeline stages.
//!
//! Every stage failure is classified through [`StageError::action`]: parse
//! failures skip the offending line, source and sink failures abort the
//! pipeline. Fatal errors travel a dedicated channel to the serve loop
//! instead of being handled ad hoc inside the worker that hit them.

use std::path::PathBuf;

use thiserror::Error;

/// Recoverable, per-line parse failures. The line is counted, logged and
/// dropped; the pipeline keeps running.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line is not valid UTF-8")]
    NonUtf8,

    #[error("line does not match the access-log pattern")]
    PatternMismatch,

    #[error("timestamp `{0}` does not match the expected format")]
    Timestamp(String),

    #[error("request `{0}` does not split into method, target and protocol")]
    RequestTokens(String),

    #[error("request target `{target}` is not a valid URL: {source}")]
    UrlParse {
        target: String,
        source: url::ParseError,
    },
}

/// Failures while opening or reading the tailed file. Always fatal.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("read error on {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures while connecting to or writing the metrics sink. Always fatal.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid sink DSN `{0}`, expected addr@username@password@database@precision")]
    Dsn(String),

    #[error("sink request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink rejected write with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Umbrella over every stage failure, used where a worker needs a single
/// error type to classify.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// What a worker does after a stage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Count, log and drop the offending line; keep consuming.
    SkipLine,
    /// Stop the pipeline; the process exits non-zero.
    Abort,
}

impl StageError {
    /// The policy table: which errors are survivable and which are not.
    pub fn action(&self) -> ErrorAction {
        match self {
            StageError::Parse(_) => ErrorAction::SkipLine,
            StageError::Source(_) | StageError::Sink(_) => ErrorAction::Abort,
        }
    }
}

/// Errors that travel the fatal channel from a worker to the serve loop.
///
/// Sink *connection* failures never reach this channel; they surface as boot
/// errors before the pipeline starts.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("sink write failed: {0}")]
    SinkWrite(#[from] SinkError),
}
