use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default wall-clock budget of a single search
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Default upper arity registered for variable-arity built-ins
pub const DEFAULT_MAX_VARIADIC_ARITY: usize = 20;

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// A search still running after this long reports a timeout
    pub search_timeout: Duration,
    /// Variable-arity built-ins (`add`, `mul`, `concat`, `max`, `min`,
    /// `eval`) are registered for every arity up to this bound
    pub max_variadic_arity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            max_variadic_arity: DEFAULT_MAX_VARIADIC_ARITY,
        }
    }
}

impl EngineConfig {
    /// Replaces the search timeout
    #[must_use]
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Replaces the variadic arity bound
    #[must_use]
    pub fn with_max_variadic_arity(mut self, arity: usize) -> Self {
        self.max_variadic_arity = arity;
        self
    }

    /// Reads a configuration from JSON; missing fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed JSON or mistyped fields.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
