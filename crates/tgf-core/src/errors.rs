/// Core error type.
///
/// The adapter crate maps its transport-specific errors into this type so the
/// engine can handle failures consistently (recoverable fetch vs terminal send).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
