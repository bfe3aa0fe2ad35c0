use std::process::ExitCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("{0}")]
    Validation(String),

    #[error("No tunnel named '{0}' exists")]
    NotFound(String),

    #[error("Aborted")]
    Aborted,

    #[error("`{command}` failed: {detail}")]
    ExternalCommand { command: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TunnelError {
    pub fn external(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExternalCommand {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Process exit status reported for this error kind.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            TunnelError::Validation(_) => 2,
            TunnelError::NotFound(_) => 3,
            TunnelError::Aborted => 4,
            TunnelError::ExternalCommand { .. } => 5,
            TunnelError::Io(_) | TunnelError::Json(_) => 1,
        }
    }
}
