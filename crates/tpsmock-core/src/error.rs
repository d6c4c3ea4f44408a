//! Shared error type across tpsmock crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Identifier does not resolve to an endpoint.
    NotFound,
    /// Reserved endpoint cannot be changed this way.
    Protected,
    /// Route path already belongs to another endpoint.
    DuplicatePath,
    /// Identifier already registered.
    DuplicateId,
    /// Malformed or out-of-range input.
    InvalidConfig,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Protected => "PROTECTED",
            ClientCode::DuplicatePath => "DUPLICATE_PATH",
            ClientCode::DuplicateId => "DUPLICATE_ID",
            ClientCode::InvalidConfig => "INVALID_CONFIG",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MockError>;

/// Unified error type used by core and server.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MockError {
    #[error("endpoint not found: {0}")]
    NotFound(String),
    #[error("endpoint is protected: {0}")]
    Protected(String),
    #[error("path already registered: {0}")]
    DuplicatePath(String),
    #[error("id already registered: {0}")]
    DuplicateId(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MockError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            MockError::NotFound(_) => ClientCode::NotFound,
            MockError::Protected(_) => ClientCode::Protected,
            MockError::DuplicatePath(_) => ClientCode::DuplicatePath,
            MockError::DuplicateId(_) => ClientCode::DuplicateId,
            MockError::InvalidConfig(_) => ClientCode::InvalidConfig,
            MockError::Internal(_) => ClientCode::Internal,
        }
    }
}
