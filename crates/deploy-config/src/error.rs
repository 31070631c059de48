use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("environment variable {name} is not valid: {value}")]
    InvalidValue { name: &'static str, value: String },
}
