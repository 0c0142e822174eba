use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default upper bound on a history query, in days (10 years).
pub const DEFAULT_MAX_HISTORY_RANGE_DAYS: i64 = 3650;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Optional API keys for quote providers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    /// Longest date span a history query may cover.
    #[serde(default = "default_max_history_range_days")]
    pub max_history_range_days: i64,

    /// Write recomputed history rows back into the materialized cache.
    #[serde(default = "default_write_through")]
    pub write_through_cache: bool,
}

fn default_max_history_range_days() -> i64 {
    DEFAULT_MAX_HISTORY_RANGE_DAYS
}

fn default_write_through() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            max_history_range_days: DEFAULT_MAX_HISTORY_RANGE_DAYS,
            write_through_cache: true,
        }
    }
}
