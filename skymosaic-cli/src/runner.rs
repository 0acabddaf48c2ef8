//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, runtime and service
//! creation, and file output so command handlers stay small.

use std::future::Future;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;
use skymosaic::config::ConfigFile;
use skymosaic::logging::{init_logging, LoggingGuard, LoggingOptions};
use skymosaic::service::{api_key_from_env, resolve_api_key, MosaicService, ServiceConfig};

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub api_key: Option<String>,
    pub config: Option<std::path::PathBuf>,
    pub verbose: bool,
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    runtime: Runtime,
    api_key_flag: Option<String>,
}

impl CliRunner {
    /// Loads config, initializes logging and starts the runtime.
    pub fn new(options: &GlobalOptions) -> Result<Self, CliError> {
        let config = match &options.config {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let logging = LoggingOptions::new(config.logging.file.clone())
            .verbose(options.verbose)
            .stdout(options.verbose);
        let logging_guard =
            init_logging(&logging).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            runtime,
            api_key_flag: options.api_key.clone(),
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!(version = skymosaic::VERSION, command, "skymosaic CLI starting");
    }

    /// Creates the service, resolving the API key from flag, environment and
    /// config file in that order.
    pub fn create_service(&self) -> Result<MosaicService, CliError> {
        let api_key = resolve_api_key(
            self.api_key_flag.as_deref(),
            api_key_from_env(),
            self.config.planet.api_key.as_deref(),
        );
        let config = ServiceConfig::from_config_file(&self.config).with_api_key(api_key);

        // reqwest needs a runtime context for its connection pool
        let _guard = self.runtime.enter();
        MosaicService::new(config).map_err(CliError::ServiceCreation)
    }

    /// Drives a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Writes command output to a file.
    pub fn write_output(&self, path: &Path, data: &[u8]) -> Result<(), CliError> {
        std::fs::write(path, data).map_err(|error| CliError::FileWrite {
            path: path.display().to_string(),
            error,
        })?;

        info!(path = %path.display(), bytes = data.len(), "Output written");
        println!("Saved {} ({} bytes)", path.display(), data.len());
        Ok(())
    }
}
