/// Capabilities the browser host provides to the grouping and sorting logic
use crate::storage::Preferences;
use crate::tab_data::{Tab, TabId, WindowId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("{operation} failed: {message}")]
    Call {
        operation: &'static str,
        message: String,
    },
    #[error("failed to convert {what}: {message}")]
    Convert { what: &'static str, message: String },
    #[error("no extension API namespace available")]
    Unavailable,
}

/// Filter passed to `tabs.query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_window: Option<bool>,
}

impl TabQuery {
    /// Unpinned tabs whose URL matches `pattern`.
    pub fn unpinned_matching(pattern: impl Into<String>) -> TabQuery {
        TabQuery {
            url: Some(pattern.into()),
            pinned: Some(false),
            current_window: None,
        }
    }

    pub fn current_window() -> TabQuery {
        TabQuery {
            current_window: Some(true),
            ..TabQuery::default()
        }
    }
}

/// Destination passed to `tabs.move`. An index of `-1` appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
    pub index: i32,
}

impl MoveProperties {
    pub fn to_index(index: i32) -> MoveProperties {
        MoveProperties {
            window_id: None,
            index,
        }
    }

    pub fn append_to(window_id: WindowId) -> MoveProperties {
        MoveProperties {
            window_id: Some(window_id),
            index: -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWindow {
    pub tab_id: TabId,
}

/// The part of a `windows.Window` we read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
}

// The host is single-threaded JS; futures are never sent across threads.
#[allow(async_fn_in_trait)]
pub trait TabInventory {
    async fn query_tabs(&self, query: &TabQuery) -> Result<Vec<Tab>, HostError>;
}

#[allow(async_fn_in_trait)]
pub trait TabMover {
    async fn move_tab(&self, tab_id: TabId, to: MoveProperties) -> Result<(), HostError>;

    /// Open a new window holding `seed` and return its id.
    async fn create_window(&self, seed: TabId) -> Result<WindowId, HostError>;
}

#[allow(async_fn_in_trait)]
pub trait PreferenceStore {
    async fn load_preferences(&self) -> Result<Preferences, HostError>;

    async fn save_preferences(&self, preferences: &Preferences) -> Result<(), HostError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_query_serialization() {
        let json = serde_json::to_value(TabQuery::unpinned_matching("*://*.example.com/*")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "url": "*://*.example.com/*", "pinned": false })
        );

        let json = serde_json::to_value(TabQuery::current_window()).unwrap();
        assert_eq!(json, serde_json::json!({ "currentWindow": true }));
    }

    #[test]
    fn test_move_properties_serialization() {
        let json = serde_json::to_value(MoveProperties::to_index(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "index": 3 }));

        let json = serde_json::to_value(MoveProperties::append_to(9)).unwrap();
        assert_eq!(json, serde_json::json!({ "windowId": 9, "index": -1 }));
    }

    #[test]
    fn test_create_window_serialization() {
        let json = serde_json::to_value(CreateWindow { tab_id: 5 }).unwrap();
        assert_eq!(json, serde_json::json!({ "tabId": 5 }));
    }

    #[test]
    fn test_window_info_ignores_extra_fields() {
        let info: WindowInfo =
            serde_json::from_str(r#"{"id": 4, "focused": true, "incognito": false}"#).unwrap();
        assert_eq!(info.id, 4);
    }
}
