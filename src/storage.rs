/// Preference serialization for the host's sync storage

use serde::{Deserialize, Serialize};

/// Storage key of the pinned-tab preference.
pub const PINNED_TABS_KEY: &str = "pinned-tabs";

/// User preferences as stored in `storage.sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Leave pinned tabs where they are when sorting a window.
    #[serde(rename = "pinned-tabs", default = "keep_pinned_default")]
    pub keep_pinned: bool,
}

fn keep_pinned_default() -> bool {
    true
}

impl Preferences {
    pub fn new() -> Self {
        Preferences {
            keep_pinned: keep_pinned_default(),
        }
    }

    /// Storage keys to request from `storage.sync.get`.
    pub fn keys() -> Vec<&'static str> {
        vec![PINNED_TABS_KEY]
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self::new()
    }
}
