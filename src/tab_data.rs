/// Data structures for Tab Grouper
use serde::{Deserialize, Serialize};

pub type TabId = i32;
pub type WindowId = i32;

/// Snapshot of a browser tab as reported by the host.
///
/// Field names follow the host's tab objects so a `tabs.query` result
/// deserializes directly into `Vec<Tab>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub last_accessed: f64,
    pub window_id: WindowId,
    #[serde(default)]
    pub incognito: bool,
}

impl Tab {
    pub fn new(id: TabId, url: impl Into<String>, window_id: WindowId) -> Tab {
        Tab {
            id,
            url: url.into(),
            pinned: false,
            last_accessed: 0.0,
            window_id,
            incognito: false,
        }
    }

    pub fn pinned(mut self) -> Tab {
        self.pinned = true;
        self
    }

    pub fn incognito(mut self) -> Tab {
        self.incognito = true;
        self
    }

    pub fn accessed_at(mut self, last_accessed: f64) -> Tab {
        self.last_accessed = last_accessed;
        self
    }
}
