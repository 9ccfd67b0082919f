//! Purpose: Environment-driven settings for the binding and its logging.
//! Exports: `BindingConfig`, `init_tracing`, and the `ENV_*` variable names.
//! Role: Read once by the host; values are passed down explicitly afterwards.
//! Invariants: Missing or empty variables mean "unset"; nothing here panics.
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::core::error::{Error, ErrorKind};

pub const ENV_LOG: &str = "PRIVBRIDGE_LOG";
pub const ENV_CERTS_PATH: &str = "PRIVBRIDGE_CERTS_PATH";
pub const ENV_LIB_DIR: &str = "PRIVBRIDGE_LIB_DIR";

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BindingConfig {
    pub log_filter: String,
    /// CA bundle handed to the Connection module.
    pub certs_path: Option<PathBuf>,
    /// Directory the host loads the native library from.
    pub lib_dir: Option<PathBuf>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            certs_path: None,
            lib_dir: None,
        }
    }
}

impl BindingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            log_filter: read(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            certs_path: read(ENV_CERTS_PATH).map(PathBuf::from),
            lib_dir: read(ENV_LIB_DIR).map(PathBuf::from),
        }
    }

    /// Checks that configured paths exist before they are handed to native code.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(path) = &self.certs_path
            && !path.is_file()
        {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("{ENV_CERTS_PATH} is not a file: {}", path.display())));
        }
        if let Some(dir) = &self.lib_dir
            && !dir.is_dir()
        {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("{ENV_LIB_DIR} is not a directory: {}", dir.display())));
        }
        Ok(())
    }
}

/// Installs a fmt subscriber; a second call (or a host-installed subscriber) is left alone.
pub fn init_tracing(config: &BindingConfig) {
    let env_filter =
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
