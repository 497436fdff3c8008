//! Runtime tuning knobs.
//!
//! The runtime is single-threaded, so the active configuration lives in a
//! thread-local. Hosts call [`configure`] once before building scopes;
//! scopes capture the lookup-cache depth when their tree is created.

use std::cell::RefCell;

/// Environment variable overriding [`RuntimeConfig::lookup_cache_depth`].
pub const ENV_LOOKUP_CACHE_DEPTH: &str = "KUMA_LOOKUP_CACHE_DEPTH";
/// Environment variable overriding [`RuntimeConfig::max_call_depth`].
pub const ENV_MAX_CALL_DEPTH: &str = "KUMA_MAX_CALL_DEPTH";
/// Environment variable overriding [`RuntimeConfig::trace_depth`].
pub const ENV_TRACE_DEPTH: &str = "KUMA_TRACE_DEPTH";
/// Environment variable overriding [`RuntimeConfig::equivalence_warn_threshold`].
pub const ENV_EQUIVALENCE_WARN: &str = "KUMA_EQUIVALENCE_WARN";

/// Error reading a configuration override.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: expected a non-negative integer")]
    InvalidNumber { var: &'static str, value: String },
}

/// Tuning parameters shared by every engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Lookups resolved more than this many scopes above the requesting
    /// scope are cached on the requesting scope.
    pub lookup_cache_depth: usize,
    /// Maximum number of nested invocations, `None` for unbounded.
    pub max_call_depth: Option<usize>,
    /// Maximum number of frames captured into an error backtrace.
    pub trace_depth: usize,
    /// Equivalence checks over more atomic dependencies than this log a
    /// warning, since their cost doubles with every dependency.
    pub equivalence_warn_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            lookup_cache_depth: 3,
            max_call_depth: None,
            trace_depth: 16,
            equivalence_warn_threshold: 12,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by any `KUMA_*` environment variable that is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parse = |var: &'static str| -> Result<Option<usize>, ConfigError> {
            match lookup(var) {
                None => Ok(None),
                Some(raw) => raw
                    .trim()
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
            }
        };

        let mut config = Self::default();
        if let Some(depth) = parse(ENV_LOOKUP_CACHE_DEPTH)? {
            config.lookup_cache_depth = depth;
        }
        if let Some(depth) = parse(ENV_MAX_CALL_DEPTH)? {
            config.max_call_depth = Some(depth);
        }
        if let Some(depth) = parse(ENV_TRACE_DEPTH)? {
            config.trace_depth = depth;
        }
        if let Some(threshold) = parse(ENV_EQUIVALENCE_WARN)? {
            config.equivalence_warn_threshold = threshold;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_lookup_cache_depth(mut self, depth: usize) -> Self {
        self.lookup_cache_depth = depth;
        self
    }

    #[must_use]
    pub fn with_max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.max_call_depth = depth;
        self
    }

    #[must_use]
    pub fn with_trace_depth(mut self, depth: usize) -> Self {
        self.trace_depth = depth;
        self
    }

    #[must_use]
    pub fn with_equivalence_warn_threshold(mut self, threshold: usize) -> Self {
        self.equivalence_warn_threshold = threshold;
        self
    }

    /// Configuration active on the current thread.
    pub fn current() -> Self {
        CURRENT.with(|config| config.borrow().clone())
    }
}

thread_local! {
    static CURRENT: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Replace the configuration of the current thread.
///
/// Scope trees created earlier keep the cache depth they were created with.
pub fn configure(config: RuntimeConfig) {
    tracing::debug!(?config, "runtime configured");
    CURRENT.with(|current| *current.borrow_mut() = config);
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
