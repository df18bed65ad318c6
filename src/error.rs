use std::io;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure is fatal to the run; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("usage: {0}")]
    Usage(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{}no free {kind} left in {min}..={max} for '{name}'", at(.line))]
    AllocationExhausted {
        kind: &'static str,
        name: String,
        min: u32,
        max: u32,
        line: Option<usize>,
    },
    #[error("{0}")]
    MalformedField(String),
    #[error("{}failed to hash password for '{user}': {reason}", at(.line))]
    Delegation {
        user: String,
        reason: String,
        line: Option<usize>,
    },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn at(line: &Option<usize>) -> String {
    line.map(|line| format!("line {line}: ")).unwrap_or_default()
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the table line a row-level error came from.
    pub(crate) fn at_line(self, line: usize) -> Self {
        let prefixed = |message: String| {
            if message.starts_with("line ") {
                message
            } else {
                format!("line {line}: {message}")
            }
        };

        let mut err = match self {
            Error::Conflict(message) => Error::Conflict(prefixed(message)),
            Error::MalformedField(message) => Error::MalformedField(prefixed(message)),
            other => other,
        };
        if let Error::AllocationExhausted { line: slot, .. } | Error::Delegation { line: slot, .. } =
            &mut err
        {
            slot.get_or_insert(line);
        }
        err
    }
}
