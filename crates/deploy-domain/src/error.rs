use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid uuid: {0}")]
    InvalidUuid(String),

    #[error("spec.name must not be empty")]
    EmptyName,

    #[error("spec.type must not be empty")]
    EmptyType,

    #[error("spec.containers must contain at least one container")]
    EmptyContainers,

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("unrecognized state: {0}")]
    UnrecognizedState(String),
}
