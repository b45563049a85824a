/// Context menu model built from a grouping session
use crate::grouping::{GroupSession, Scope};
use serde::Serialize;

pub const ROOT_ID: &str = "group-tabs-window";
pub const ROOT_TITLE: &str = "Group Tabs to Window";

/// Show only in the tab strip's right-click menu.
pub const CONTEXTS: &[&str] = &["tab"];

/// Properties passed to `menus.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub title: String,
    pub contexts: &'static [&'static str],
}

pub fn root_item() -> MenuItem {
    MenuItem {
        id: ROOT_ID.to_string(),
        parent_id: None,
        title: ROOT_TITLE.to_string(),
        contexts: CONTEXTS,
    }
}

/// Items for every session entry, parents before children.
pub fn session_items(session: &GroupSession) -> Vec<MenuItem> {
    session
        .iter()
        .map(|(id, entry)| {
            let title = match id.scope {
                Scope::Level => format!("{} ({})", entry.label(), entry.len()),
                Scope::ThisWindow => format!("This Window Only ({})", entry.len()),
                Scope::AllWindows => format!("From All Windows ({})", entry.len()),
            };
            let parent_id = id
                .parent()
                .map_or_else(|| ROOT_ID.to_string(), |parent| parent.to_string());

            MenuItem {
                id: id.to_string(),
                parent_id: Some(parent_id),
                title,
                contexts: CONTEXTS,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{GroupSession, Reference, group};
    use crate::host::fake::FakeHost;
    use crate::tab_data::Tab;

    #[test]
    fn test_root_item_serialization() {
        let json = serde_json::to_value(root_item()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": "group-tabs-window",
                "title": "Group Tabs to Window",
                "contexts": ["tab"]
            })
        );
    }

    #[test]
    fn test_session_items() {
        let host = FakeHost::with_tabs(
            1,
            vec![
                Tab::new(1, "https://mail.example.com/", 1),
                Tab::new(2, "https://example.com/", 2),
                Tab::new(3, "https://www.example.com/", 1),
            ],
        );
        let reference = Reference::new("mail.example.com", 1, false);
        let session = pollster::block_on(group(&reference, GroupSession::new(), &host)).unwrap();

        let items = session_items(&session);
        let rendered: Vec<(&str, &str, &str)> = items
            .iter()
            .map(|item| {
                (
                    item.id.as_str(),
                    item.parent_id.as_deref().unwrap_or_default(),
                    item.title.as_str(),
                )
            })
            .collect();

        assert_eq!(
            rendered,
            vec![
                ("group-0", "group-tabs-window", "mail.example.com (1)"),
                ("group-1", "group-tabs-window", "*.example.com (3)"),
                ("group-1-cur", "group-1", "This Window Only (2)"),
                ("group-1-all", "group-1", "From All Windows (3)"),
                ("group-2", "group-tabs-window", "*.com (3)"),
                ("group-2-cur", "group-2", "This Window Only (2)"),
                ("group-2-all", "group-2", "From All Windows (3)"),
            ]
        );
    }

    #[test]
    fn test_empty_session_has_no_items() {
        assert!(session_items(&GroupSession::new()).is_empty());
    }
}
