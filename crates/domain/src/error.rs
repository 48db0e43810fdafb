use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid role key: {0}")]
    InvalidRoleKey(String),

    #[error("Invalid device configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Endpoint already bound: {0}")]
    EndpointInUse(String),

    #[error("Endpoint unavailable: {0}")]
    EndpointUnavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
