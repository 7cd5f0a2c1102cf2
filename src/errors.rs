use thiserror::Error;

// Everything that can abort a tracked request.
#[derive(Debug, Error)]
pub enum Error {
    // A context layer is not a plain mapping, so it cannot be merged.
    #[error("flatten error: {0}")]
    Flatten(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("config error: {0}")]
    Config(String),

    // Raised by a downstream handler in the chain.
    #[error("handler error: {0}")]
    Handler(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

// Type alias for results that use `Error` as the error type
pub type Result<T> = std::result::Result<T, Error>;
