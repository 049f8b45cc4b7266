use thiserror::Error;

#[derive(Error, Debug)]
pub enum DvdError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("structural parse error: {0}")]
    StructuralParse(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("resource error: {0}")]
    Resource(String),
}

pub type Result<T> = std::result::Result<T, DvdError>;
