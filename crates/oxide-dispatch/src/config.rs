//! Per-controller configuration.

use serde::{Deserialize, Serialize};

/// Settings a controller consults when registering routes.
///
/// Sub-controllers start from a copy of their parent's configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Compile `*` wildcards to their shortest match instead of the longest.
    ///
    /// Takes effect for routes registered after it is set.
    pub match_lazily: bool,
}

impl ControllerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets lazy wildcard matching.
    #[must_use]
    pub const fn match_lazily(mut self, lazy: bool) -> Self {
        self.match_lazily = lazy;
        self
    }

    /// Loads a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
