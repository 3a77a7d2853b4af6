use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No object is opened in inspector or a static type is opened")]
    NothingInspected,
}

impl InspectError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T, E = InspectError> = std::result::Result<T, E>;
