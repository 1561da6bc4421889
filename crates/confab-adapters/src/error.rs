use std::fmt;

/// Result type for confab-adapters operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the adapter layer
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// JSON parsing failed
    Json(serde_json::Error),

    /// YAML parsing failed
    Yaml(serde_yaml::Error),

    /// SQLite query or connection failure
    Sql(rusqlite::Error),

    /// Filesystem watch could not be established
    Watch(notify::Error),

    /// Session parsing failed (missing required fields, invalid format, etc.)
    Parse(String),

    /// Adapter not found or detection failed
    Adapter(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Yaml(err) => write!(f, "YAML error: {}", err),
            Error::Sql(err) => write!(f, "SQLite error: {}", err),
            Error::Watch(err) => write!(f, "Watch error: {}", err),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::Adapter(msg) => write!(f, "Adapter error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Yaml(err) => Some(err),
            Error::Sql(err) => Some(err),
            Error::Watch(err) => Some(err),
            Error::Parse(_) | Error::Adapter(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Sql(err)
    }
}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err)
    }
}
