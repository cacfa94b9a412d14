use serde::{Deserialize, Serialize};

/// User-configurable settings, stored inside the catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Currency assumed for positions opened without an explicit one
    /// (e.g., "EUR", "USD").
    pub default_currency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_currency: "EUR".to_string(),
        }
    }
}
