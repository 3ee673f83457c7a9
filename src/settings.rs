//! Host settings.
//!
//! Loaded from an optional file, then overridden by `PNRSCRIPT_*`
//! environment variables (`PNRSCRIPT_LOG_FILTER=debug`).

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Module names are `<module_prefix>_<family>`.
    #[serde(default = "default_module_prefix")]
    pub module_prefix: String,

    /// `tracing-subscriber` filter directive used by [`crate::init_logging`].
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Put the working directory on the interpreter's search path.
    #[serde(default = "default_prepend_cwd")]
    pub prepend_cwd_to_path: bool,

    /// Extra directories searched for script files.
    #[serde(default)]
    pub script_dirs: Vec<PathBuf>,
}

fn default_module_prefix() -> String {
    "nextpnrpy".to_owned()
}

fn default_log_filter() -> String {
    "info".to_owned()
}

fn default_prepend_cwd() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            module_prefix: default_module_prefix(),
            log_filter: default_log_filter(),
            prepend_cwd_to_path: default_prepend_cwd(),
            script_dirs: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings; a missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder
            .add_source(Environment::with_prefix("PNRSCRIPT"))
            .build()?
            .try_deserialize()
    }

    pub fn module_name(&self, family: &str) -> String {
        format!("{}_{}", self.module_prefix, family)
    }
}
