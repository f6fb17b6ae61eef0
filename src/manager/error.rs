use crate::chooser::ChooserError;
use crate::pipeline::Status;
use thiserror::Error;

/// Failures talking to the list API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a failure status
    #[error("Request failed with status '{0}'")]
    Status(Status),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Manager failures
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("No manager registered for type '{0}'")]
    UnknownType(String),

    #[error("Field '{0}' has no target type to browse")]
    NoTargetType(String),

    #[error("Browsing is disabled for field '{0}'")]
    BrowseDisabled(String),

    /// Selection operations on a manager that was not opened by a chooser
    #[error("Manager is not choosing for a field")]
    NotChoosing,

    #[error("List request failed: {0}")]
    Client(#[from] ClientError),

    #[error("Chooser error: {0}")]
    Chooser(#[from] ChooserError),
}

pub type Result<T> = std::result::Result<T, ManagerError>;
