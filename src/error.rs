use std::path::PathBuf;
use std::time::Duration;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for the lockstep crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to parse change-script {}: {source}", .path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Duplicate migration index {index}: '{first}' and '{second}'")]
    DuplicateIndex {
        index: i64,
        first: String,
        second: String,
    },

    #[error("Migration directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Validation failed: latest migration is {} but the database records {}",
        fmt_version(.expected),
        fmt_version(.recorded)
    )]
    ValidationFailed {
        expected: Option<i64>,
        recorded: Option<i64>,
    },

    #[error("Database records migration {0}, which is not in the migration catalog")]
    UnknownAppliedVersion(i64),

    #[error("Timed out after {timeout:?} waiting for advisory lock '{name}'")]
    LockTimeout { name: String, timeout: Duration },

    #[error("Recorded version '{0}' is not a valid migration index")]
    CorruptState(String),

    #[error("Migration {index} is not outstanding: the database already records {recorded}")]
    AlreadyApplied { index: i64, recorded: i64 },

    #[error("Cancelled after applying {applied} migration(s)")]
    Cancelled { applied: usize },

    #[error("Failed to apply migration {index} ({name}): {source}")]
    Apply {
        index: i64,
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a higher layer may retry the whole run after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }

    /// The parse failure behind this error, if any.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(e) | Error::Script { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

fn fmt_version(version: &Option<i64>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "nothing".to_string(),
    }
}

fn fmt_line(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" at line {}", line),
        None => String::new(),
    }
}

/// Structural violation category for change-script parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unknown keyword, bad argument, or argument on a keyword that takes none
    MalformedDirective,
    /// Name or Index never set
    MissingField,
    /// Input ended inside a block or after a dangling Up/Down header
    UnterminatedBlock,
    /// Directive legal in general but not in the current state
    OutOfOrderDirective,
    /// Directive other than EndBlock inside a block
    ForbiddenDirective,
    /// Script content outside any block
    StrayContent,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedDirective => "malformed directive",
            Self::MissingField => "missing required field",
            Self::UnterminatedBlock => "unterminated block",
            Self::OutOfOrderDirective => "out-of-order directive",
            Self::ForbiddenDirective => "forbidden directive in block",
            Self::StrayContent => "content outside block",
        }
    }
}

/// A change-script that could not be turned into a migration
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{}: {message}", .kind.as_str(), fmt_line(.line))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line number, absent for end-of-input errors
    pub line: Option<usize>,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }
}
