use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render transport I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("render message encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;
