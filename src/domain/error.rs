use thiserror::Error;

/// Exit status for usage errors (missing or invalid flags).
pub const EXIT_USAGE: i32 = 2;

/// Exit status for every failure past argument validation.
pub const EXIT_FAILURE: i32 = 1;

/// ontapce unified error type
#[derive(Error, Debug)]
pub enum CeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("API error (HTTP {status}{}): {message}", code.as_deref().map(|c| format!(", code {}", c)).unwrap_or_default())]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Job failed{}: {message}", code.as_deref().map(|c| format!(" (code {})", c)).unwrap_or_default())]
    Job { code: Option<String>, message: String },

    #[error("Job {uuid} did not complete within {seconds}s")]
    JobTimeout { uuid: String, seconds: u64 },

    #[error("Missing {what} for op: {op}")]
    MissingArgument { what: &'static str, op: String },

    #[error("No operation type given.")]
    NoOperation,

    #[error("Invalid operation type: {0}")]
    InvalidOperation(String),

    #[error("Expected at most one record from {path}, found {count}")]
    AmbiguousRecord { path: String, count: usize },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid size '{0}'")]
    InvalidSize(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CeError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CeError::MissingArgument { .. }
            | CeError::NoOperation
            | CeError::InvalidOperation(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    /// Whether the error is a usage mistake, answered with the `-h` hint.
    pub fn is_usage_error(&self) -> bool {
        self.exit_code() == EXIT_USAGE
    }

    /// Output went to a reader that has gone away, e.g. `| head`.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, CeError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }

    /// Whether the error came back from the cluster itself.
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            CeError::Api { .. } | CeError::Job { .. } | CeError::JobTimeout { .. }
        )
    }
}

pub type CeResult<T> = Result<T, CeError>;
