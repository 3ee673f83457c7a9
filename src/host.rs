//! The seam between the bindings and a script interpreter.
//!
//! An interpreter implements [`ScriptHost`]; [`ScriptRunner`] drives it
//! through its lifecycle: initialize once with the registered module, run
//! script files, finalize when the runner is dropped.

use std::path::{Path, PathBuf};

use pnrscript_core::ScriptException;
use pnrscript_registry::Module;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("script file {} does not exist", path.display())]
    ScriptNotFound { path: PathBuf },

    #[error("the interpreter has not been initialized")]
    NotInitialized,

    #[error("failed to initialize the interpreter: {0}")]
    Initialization(String),

    #[error("uncaught exception in {}: {source}", path.display())]
    UncaughtException {
        path: PathBuf,
        #[source]
        source: ScriptException,
    },

    #[error("invalid log filter: {0}")]
    Logging(String),
}

impl HostError {
    /// Whether the host process should exit with a failure status.
    ///
    /// An uncaught script exception is reported and leaves the interpreter
    /// usable; everything else means the requested work cannot run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HostError::UncaughtException { .. })
    }
}

/// An embedded interpreter.
pub trait ScriptHost {
    /// Make `module` importable. Called exactly once.
    fn initialize(&mut self, module: Module, settings: &Settings) -> Result<(), HostError>;

    /// Execute the script at `path`, which is known to exist.
    fn run_file(&mut self, path: &Path) -> Result<(), ScriptException>;

    fn finalize(&mut self);
}

pub struct ScriptRunner<H: ScriptHost> {
    host: H,
    initialized: bool,
    search_path: Vec<PathBuf>,
}

impl<H: ScriptHost> ScriptRunner<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            initialized: false,
            search_path: Vec::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Hand `module` to the interpreter. Later calls are ignored.
    pub fn initialize(&mut self, module: Module, settings: &Settings) -> Result<(), HostError> {
        if self.initialized {
            warn!(module = module.name(), "interpreter already initialized");
            return Ok(());
        }
        let name = module.name().to_owned();
        self.host.initialize(module, settings)?;
        self.initialized = true;

        self.search_path.clear();
        if settings.prepend_cwd_to_path
            && let Ok(cwd) = std::env::current_dir()
        {
            self.search_path.push(cwd);
        }
        self.search_path.extend(settings.script_dirs.iter().cloned());
        info!(module = %name, "interpreter initialized");
        Ok(())
    }

    /// Run a script file.
    ///
    /// Relative paths that do not exist as given are looked up in the
    /// search path. An exception the script does not catch is logged and
    /// returned.
    ///
    /// A script that cannot be found, or a runner that was never
    /// initialized, is a fatal [`HostError`]: the host must stop instead of
    /// running further scripts (see [`HostError::is_fatal`]).
    pub fn run_file(&mut self, path: &Path) -> Result<(), HostError> {
        if !self.initialized {
            return Err(HostError::NotInitialized);
        }
        let script = self.resolve(path)?;
        debug!(script = %script.display(), "running script");
        self.host.run_file(&script).map_err(|source| {
            error!(script = %script.display(), kind = %source.kind, "{}", source.message);
            HostError::UncaughtException {
                path: script,
                source,
            }
        })
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, HostError> {
        if path.is_file() {
            return Ok(path.to_owned());
        }
        if path.is_relative()
            && let Some(found) = self
                .search_path
                .iter()
                .map(|dir| dir.join(path))
                .find(|candidate| candidate.is_file())
        {
            return Ok(found);
        }
        error!(script = %path.display(), "script file does not exist");
        Err(HostError::ScriptNotFound {
            path: path.to_owned(),
        })
    }
}

impl<H: ScriptHost> Drop for ScriptRunner<H> {
    fn drop(&mut self) {
        if self.initialized {
            self.host.finalize();
            debug!("interpreter finalized");
        }
    }
}

/// Install a global `tracing` subscriber filtered by `filter`.
pub fn init_logging(filter: &str) -> Result<(), HostError> {
    let filter = EnvFilter::try_new(filter).map_err(|e| HostError::Logging(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| HostError::Logging(e.to_string()))
}
