//! Error types and handling
//!
//! Common error types used across the application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::CaptureError;
use crate::export::ExportError;
use crate::settings::SettingsError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Device error: {0}")]
    Device(#[from] CaptureError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No cameras detected")]
    NoCameras,

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Machine-readable error summary, used in run reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        let code = match error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Settings(_) => "SETTINGS_ERROR",
            AppError::Device(_) => "DEVICE_ERROR",
            AppError::Export(_) => "EXPORT_ERROR",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::NoCameras => "NO_CAMERAS",
            AppError::InvalidState(_) => "INVALID_STATE",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
