//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use skymosaic::config::{ConfigFileError, API_KEY_ENV};
use skymosaic::service::ServiceError;
use skymosaic::{ErrorKind, MosaicError, ValidationError};
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to create the tokio runtime
    Runtime(std::io::Error),
    /// Failed to create service
    ServiceCreation(ServiceError),
    /// Failed to resolve a tile
    Tile(MosaicError),
    /// Failed to search for scenes
    Search(MosaicError),
    /// Failed to fetch a thumbnail
    Thumbnail(MosaicError),
    /// Failed to render command output
    Output(String),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let Some(hint) = self.hint() {
            eprintln!();
            eprintln!("{}", hint);
        }

        process::exit(self.exit_code())
    }

    /// Extra guidance for errors users can fix themselves.
    pub fn hint(&self) -> Option<String> {
        match self {
            CliError::ServiceCreation(ServiceError::MissingApiKey) => Some(format!(
                "Provide a Planet API key with one of:\n  \
                 1. --api-key <KEY>\n  \
                 2. export {}=<KEY>\n  \
                 3. api_key = <KEY> in the [planet] section of config.ini",
                API_KEY_ENV
            )),
            CliError::Tile(MosaicError::Validation(ValidationError::ZoomBelowFloor {
                min, ..
            })) => Some(format!(
                "Date mosaics need zoom {} or closer; zoom in and try again.",
                min
            )),
            CliError::Tile(e) | CliError::Search(e) | CliError::Thumbnail(e) => match e {
                MosaicError::UpstreamRejection { status: 401, .. }
                | MosaicError::UpstreamRejection { status: 403, .. } => {
                    Some("Planet rejected the API key; check that it is valid.".to_string())
                }
                MosaicError::Timeout(_) => Some(
                    "The Planet API did not answer in time; it may be busy. Try again shortly."
                        .to_string(),
                ),
                _ => None,
            },
            _ => None,
        }
    }

    /// 2 for invalid input, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Tile(e) | CliError::Search(e) | CliError::Thumbnail(e)
                if e.kind() == ErrorKind::Validation =>
            {
                2
            }
            CliError::Config(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::ServiceCreation(e) => write!(f, "Failed to create service: {}", e),
            CliError::Tile(e) => write!(f, "Failed to render tile: {}", e),
            CliError::Search(e) => write!(f, "Scene search failed: {}", e),
            CliError::Thumbnail(e) => write!(f, "Failed to fetch thumbnail: {}", e),
            CliError::Output(msg) => write!(f, "Failed to render output: {}", msg),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::ServiceCreation(e) => Some(e),
            CliError::Tile(e) | CliError::Search(e) | CliError::Thumbnail(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::ServiceCreation(e)
    }
}
