/// Galaxy3D Engine - process-wide state of the binding layer
///
/// Holds the global logger, the active configuration and the content-addressed
/// shader bytecode cache. Everything is stored in thread-safe statics behind RwLock.

use std::sync::{Arc, OnceLock, RwLock};
use std::time::SystemTime;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::pipeline::ShaderCache;

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure
struct EngineState {
    /// Active configuration
    config: RwLock<Config>,
    /// Shader bytecode cache (shared by every shader created while the engine is alive)
    shader_cache: Arc<ShaderCache>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            config: RwLock::new(Config::default()),
            shader_cache: Arc::new(ShaderCache::new()),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine state manager
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_binding::galaxy3d::{Config, Engine};
///
/// Engine::initialize()?;
/// Engine::set_config(Config { enable_validation: true, ..Config::default() })?;
///
/// let cache = Engine::shader_cache();
/// assert!(cache.is_empty());
///
/// Engine::shutdown();
/// # Ok::<(), galaxy_3d_binding::galaxy3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("galaxy3d::Engine", "Initialization failed: {}", msg);
            }
            _ => {
                crate::engine_error!("galaxy3d::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    /// Initialize the engine state. Idempotent.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Whether `initialize()` has been called
    pub fn is_initialized() -> bool {
        ENGINE_STATE.get().is_some()
    }

    /// Release process-wide caches
    ///
    /// Shader bytecode entries are dropped from the cache; shaders that still hold
    /// their bytecode keep it alive until they are destroyed.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            let released = state.shader_cache.len();
            state.shader_cache.clear();
            crate::engine_info!("galaxy3d::Engine", "Shutdown: released {} shader cache entries", released);
        }
    }

    // ===== CONFIGURATION API =====

    /// Replace the active configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or the config lock is poisoned.
    pub fn set_config(config: Config) -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let mut lock = state.config.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Config lock poisoned".to_string())
            ))?;

        *lock = config;
        Ok(())
    }

    /// Active configuration (defaults when the engine is not initialized)
    pub fn config() -> Config {
        ENGINE_STATE
            .get()
            .and_then(|state| state.config.read().ok().map(|config| config.clone()))
            .unwrap_or_default()
    }

    // ===== SHADER CACHE API =====

    /// The process-wide shader bytecode cache
    ///
    /// Initializes the engine state on first use.
    pub fn shader_cache() -> Arc<ShaderCache> {
        ENGINE_STATE.get_or_init(EngineState::new).shader_cache.clone()
    }

    /// Reset configuration and caches for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut config) = state.config.write() {
                *config = Config::default();
            }
            state.shader_cache.clear();
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use galaxy_3d_binding::galaxy3d::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
