use std::fmt;

#[derive(Debug)]
pub enum MatchError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (threshold out of range, bad pass ladder, etc.).
    ConfigValidation(String),
    /// Algorithm name does not name a supported variant.
    UnknownAlgorithm(String),
    /// Algorithm is supported but its backing capability is not present.
    Unavailable { algorithm: String, reason: String },
    /// Embedding provider failed while scoring.
    Embedding(String),
    /// Mapped column not present in the input table.
    MissingColumn { table: String, column: String },
    /// IO error (CSV read, etc.).
    Io(String),
    /// A post-match hook reported a failure.
    Hook { hook: String, message: String },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownAlgorithm(name) => write!(
                f,
                "unknown algorithm '{name}' (expected one of: {})",
                crate::config::Algorithm::ALL
                    .iter()
                    .map(|a| a.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Unavailable { algorithm, reason } => {
                write!(f, "algorithm '{algorithm}' is unavailable: {reason}")
            }
            Self::Embedding(msg) => write!(f, "embedding provider error: {msg}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Hook { hook, message } => write!(f, "hook '{hook}' failed: {message}"),
        }
    }
}

impl std::error::Error for MatchError {}
