use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(String),

    #[error("placeholder credential in config: {field} (set a real value before running)")]
    Placeholder { field: &'static str },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
