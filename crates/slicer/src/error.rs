use cslice_syntax::SyntaxError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SliceError>;

#[derive(Error, Debug)]
pub enum SliceError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("Unknown target function: {0}")]
    UnknownTarget(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
