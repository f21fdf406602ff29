pub type ChatreelResult<T> = Result<T, ChatreelError>;

#[derive(thiserror::Error, Debug)]
pub enum ChatreelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("synthesis error: {0}")]
    Synthesis(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("export canceled")]
    Canceled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChatreelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
