//! Error types for Dirauth configuration

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration: {0}")]
    ConfigRead(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::ConfigRead(_) => "ConfigRead",
            Error::ConfigParse(_) => "ConfigParse",
        }
    }
}
