//! Runtime configuration and one-time initialization.
//!
//! The configuration is installed exactly once, before the registry is
//! first used. [`init`] installs an explicit configuration; any other entry
//! point that needs it falls back to [`RuntimeConfig::from_env`].
//!
//! | Variable | Setting | Default |
//! |---|---|---|
//! | `CLASSLINK_MAX_DEPTH` | [`RuntimeConfig::max_depth`] | 64 |
//! | `CLASSLINK_NAME_CAPACITY` | [`RuntimeConfig::name_capacity`] | 16 |
//! | `CLASSLINK_LOG` | [`RuntimeConfig::log_level`] | unset |

use crate::error::{Error, Result};
use crate::runtime::Class;
use classlink_log::Level;
use std::sync::OnceLock;

/// Default bound on the length of an ancestor chain.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default name buffer capacity, terminator included.
pub const DEFAULT_NAME_CAPACITY: usize = 16;

const MIN_NAME_CAPACITY: usize = 2;

static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Settings that apply to the whole process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    max_depth: usize,
    name_capacity: usize,
    log_level: Option<Level>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            name_capacity: DEFAULT_NAME_CAPACITY,
            log_level: None,
        }
    }
}

impl RuntimeConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of classes in any ancestor chain (at least 1).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Sets the name buffer capacity. Names keep at most `capacity - 1`
    /// bytes.
    #[must_use]
    pub fn with_name_capacity(mut self, capacity: usize) -> Self {
        self.name_capacity = capacity.max(MIN_NAME_CAPACITY);
        self
    }

    /// Sets the log level applied when the configuration is installed.
    #[must_use]
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Maximum ancestor chain length, the class itself included.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Name buffer capacity, terminator included.
    #[must_use]
    pub fn name_capacity(&self) -> usize {
        self.name_capacity
    }

    /// Log level to install, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<Level> {
        self.log_level
    }

    /// Reads the configuration from `CLASSLINK_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for values that do not parse or are
    /// out of range.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for values that do not parse or are
    /// out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = RuntimeConfig::default();

        if let Some(raw) = lookup("CLASSLINK_MAX_DEPTH") {
            config.max_depth = parse_bounded("CLASSLINK_MAX_DEPTH", &raw, 1)?;
        }
        if let Some(raw) = lookup("CLASSLINK_NAME_CAPACITY") {
            config.name_capacity = parse_bounded(
                "CLASSLINK_NAME_CAPACITY",
                &raw,
                MIN_NAME_CAPACITY,
            )?;
        }
        if let Some(raw) = lookup("CLASSLINK_LOG") {
            if !raw.trim().is_empty() {
                let level =
                    raw.parse::<Level>().map_err(|_| Error::InvalidConfig {
                        key: "CLASSLINK_LOG",
                        value: raw.clone(),
                    })?;
                config.log_level = Some(level);
            }
        }

        Ok(config)
    }
}

fn parse_bounded(key: &'static str, raw: &str, min: usize) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value >= min => Ok(value),
        _ => Err(Error::InvalidConfig {
            key,
            value: raw.to_string(),
        }),
    }
}

fn install(config: &RuntimeConfig) {
    if let Some(level) = config.log_level {
        classlink_log::set_level(level);
    }
    classlink_log::debug!(
        "runtime configured: max_depth={}, name_capacity={}",
        config.max_depth,
        config.name_capacity
    );
}

/// Installs `config` and registers the built-in root class.
///
/// Must run before anything touches the registry.
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] if a configuration is already in
/// place, whether from an earlier `init` or from lazy initialization.
pub fn init(config: RuntimeConfig) -> Result<()> {
    let mut installed = false;
    CONFIG.get_or_init(|| {
        installed = true;
        install(&config);
        config
    });
    if !installed {
        return Err(Error::AlreadyInitialized);
    }

    // Ordered: configuration first, then the root class.
    let _ = Class::object();
    Ok(())
}

/// Returns the active configuration, initializing it from the environment
/// on first use.
pub fn config() -> &'static RuntimeConfig {
    CONFIG.get_or_init(|| {
        let config = RuntimeConfig::from_env().unwrap_or_else(|err| {
            classlink_log::warn!("{err}; falling back to default configuration");
            RuntimeConfig::default()
        });
        install(&config);
        config
    })
}
