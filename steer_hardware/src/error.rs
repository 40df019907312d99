use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("digitizer read timeout")]
    Timeout,
    #[error("device disconnected: {0}")]
    Disconnected(String),
    #[error("audio cue: {0}")]
    Audio(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
