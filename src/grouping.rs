/// Domain hierarchy grouping: naked domain down to the full host
use crate::host::{HostError, TabInventory, TabQuery};
use crate::tab_data::{Tab, WindowId};
use crate::uri::{HostPattern, UriError, is_ip_literal, normalize_host, reference_host};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("reference tab has no usable host: {0}")]
    NoHost(#[from] UriError),
    #[error(transparent)]
    Host(#[from] HostError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized group id {0:?}")]
pub struct GroupIdError(String);

/// The tab a grouping is built around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub host: String,
    pub window_id: WindowId,
    pub incognito: bool,
}

impl Reference {
    pub fn new(host: &str, window_id: WindowId, incognito: bool) -> Reference {
        Reference {
            host: normalize_host(host),
            window_id,
            incognito,
        }
    }

    pub fn from_tab(tab: &Tab) -> Result<Reference, UriError> {
        Ok(Reference {
            host: reference_host(&tab.url)?,
            window_id: tab.window_id,
            incognito: tab.incognito,
        })
    }

    /// `a.b.com` -> `["a.b.com", "b.com", "com"]`; an IP literal is a
    /// single level.
    pub fn levels(&self) -> Vec<String> {
        if is_ip_literal(&self.host) {
            return vec![self.host.clone()];
        }
        let labels: Vec<&str> = self.host.split('.').filter(|l| !l.is_empty()).collect();
        (0..labels.len()).map(|i| labels[i..].join(".")).collect()
    }
}

/// Which slice of a level's tabs an entry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Level,
    ThisWindow,
    AllWindows,
}

/// Identifies one entry of a session: `group-<level>`, `group-<level>-cur`
/// or `group-<level>-all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId {
    pub level: usize,
    pub scope: Scope,
}

impl GroupId {
    pub fn level(level: usize) -> GroupId {
        GroupId {
            level,
            scope: Scope::Level,
        }
    }

    pub fn this_window(level: usize) -> GroupId {
        GroupId {
            level,
            scope: Scope::ThisWindow,
        }
    }

    pub fn all_windows(level: usize) -> GroupId {
        GroupId {
            level,
            scope: Scope::AllWindows,
        }
    }

    /// The level entry a sub-entry hangs under.
    pub fn parent(&self) -> Option<GroupId> {
        match self.scope {
            Scope::Level => None,
            Scope::ThisWindow | Scope::AllWindows => Some(GroupId::level(self.level)),
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Level => write!(f, "group-{}", self.level),
            Scope::ThisWindow => write!(f, "group-{}-cur", self.level),
            Scope::AllWindows => write!(f, "group-{}-all", self.level),
        }
    }
}

impl FromStr for GroupId {
    type Err = GroupIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GroupIdError(s.to_string());
        let rest = s.strip_prefix("group-").ok_or_else(invalid)?;
        let (level, scope) = match rest.split_once('-') {
            None => (rest, Scope::Level),
            Some((level, "cur")) => (level, Scope::ThisWindow),
            Some((level, "all")) => (level, Scope::AllWindows),
            Some(_) => return Err(invalid()),
        };
        let level = level.parse::<usize>().map_err(|_| invalid())?;
        Ok(GroupId { level, scope })
    }
}

/// Tabs matching one domain level, relative to the reference window.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry {
    label: String,
    tabs: Vec<Tab>,
    reference_window: WindowId,
}

impl GroupEntry {
    pub fn new(label: impl Into<String>, tabs: Vec<Tab>, reference_window: WindowId) -> GroupEntry {
        GroupEntry {
            label: label.into(),
            tabs,
            reference_window,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn reference_window(&self) -> WindowId {
        self.reference_window
    }

    pub fn current_window(&self) -> Vec<&Tab> {
        self.tabs
            .iter()
            .filter(|t| t.window_id == self.reference_window)
            .collect()
    }

    pub fn other_windows(&self) -> Vec<&Tab> {
        self.tabs
            .iter()
            .filter(|t| t.window_id != self.reference_window)
            .collect()
    }

    /// Every tab already lives in the reference window.
    pub fn recycle(&self) -> bool {
        self.tabs.iter().all(|t| t.window_id == self.reference_window)
    }

    fn this_window_only(&self) -> GroupEntry {
        GroupEntry {
            label: self.label.clone(),
            tabs: self.current_window().into_iter().cloned().collect(),
            reference_window: self.reference_window,
        }
    }
}

/// Result of one grouping pass, keyed by `GroupId` in display order.
///
/// The token identifies the pass; a session is never edited after it has
/// been handed out, a rebuild produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSession {
    token: Uuid,
    entries: BTreeMap<GroupId, GroupEntry>,
}

impl GroupSession {
    pub fn new() -> GroupSession {
        GroupSession {
            token: Uuid::new_v4(),
            entries: BTreeMap::new(),
        }
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn get(&self, id: &GroupId) -> Option<&GroupEntry> {
        self.entries.get(id)
    }

    /// Look up an entry by its rendered id, e.g. a menu item id.
    pub fn resolve(&self, id: &str) -> Option<&GroupEntry> {
        id.parse::<GroupId>().ok().and_then(|id| self.entries.get(&id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &GroupEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for GroupSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Group tabs by every domain suffix of the reference host.
///
/// Levels are queried one at a time from the full host down to the
/// top-level label. A level with no matching tabs is skipped; the others
/// are labeled with the bare domain (full host) or `*.domain`. A level
/// whose tabs span several windows also gets a "this window" and an
/// "all windows" sub-entry.
pub async fn group<I: TabInventory>(
    reference: &Reference,
    mut session: GroupSession,
    inventory: &I,
) -> Result<GroupSession, HostError> {
    session.entries.clear();

    for (level, domain) in reference.levels().into_iter().enumerate() {
        let pattern = HostPattern::for_host(&domain);
        let tabs: Vec<Tab> = inventory
            .query_tabs(&TabQuery::unpinned_matching(pattern.to_string()))
            .await?
            .into_iter()
            .filter(|t| t.incognito == reference.incognito)
            .collect();

        if tabs.is_empty() {
            debug!("no tabs under {}", pattern);
            continue;
        }

        let label = if level == 0 {
            domain
        } else {
            format!("*.{}", domain)
        };
        let entry = GroupEntry::new(label, tabs, reference.window_id);

        if !entry.recycle() {
            session
                .entries
                .insert(GroupId::this_window(level), entry.this_window_only());
            session
                .entries
                .insert(GroupId::all_windows(level), entry.clone());
        }
        session.entries.insert(GroupId::level(level), entry);
    }

    info!(
        "grouped {} by domain into {} entries",
        reference.host,
        session.len()
    );
    Ok(session)
}

/// Derive the reference from `tab` and group around it.
pub async fn build_session<I: TabInventory>(
    tab: &Tab,
    session: GroupSession,
    inventory: &I,
) -> Result<GroupSession, GroupError> {
    let reference = Reference::from_tab(tab)?;
    Ok(group(&reference, session, inventory).await?)
}

/// Holds the session the menu currently shows.
///
/// Starting a build drops the previous session immediately, and only the
/// most recently started build may install its result.
#[derive(Debug, Default)]
pub struct SessionSlot {
    pending: Option<Uuid>,
    current: Option<GroupSession>,
}

impl SessionSlot {
    pub fn new() -> SessionSlot {
        SessionSlot::default()
    }

    pub fn begin(&mut self) -> GroupSession {
        let session = GroupSession::new();
        self.current = None;
        self.pending = Some(session.token());
        session
    }

    /// Returns `false` if a newer build has started since `session` began.
    pub fn install(&mut self, session: GroupSession) -> bool {
        if self.pending != Some(session.token()) {
            debug!("discarding stale grouping session {}", session.token());
            return false;
        }
        self.pending = None;
        self.current = Some(session);
        true
    }

    /// Whether the build that produced `token` is still the latest one.
    pub fn is_pending(&self, token: Uuid) -> bool {
        self.pending == Some(token)
    }

    pub fn current(&self) -> Option<&GroupSession> {
        self.current.as_ref()
    }

    pub fn resolve(&self, id: &str) -> Option<&GroupEntry> {
        self.current.as_ref().and_then(|session| session.resolve(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;

    fn tab(id: i32, url: &str, window_id: WindowId) -> Tab {
        Tab::new(id, url, window_id)
    }

    fn ids(session: &GroupSession) -> Vec<String> {
        session.iter().map(|(id, _)| id.to_string()).collect()
    }

    fn tab_ids(tabs: &[&Tab]) -> Vec<i32> {
        tabs.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_reference_levels() {
        let reference = Reference::new("www.A.b.Example.com", 1, false);

        assert_eq!(reference.host, "a.b.example.com");
        assert_eq!(
            reference.levels(),
            vec!["a.b.example.com", "b.example.com", "example.com", "com"]
        );
    }

    #[test]
    fn test_reference_levels_odd_hosts() {
        assert_eq!(
            Reference::new("example.com.", 1, false).levels(),
            vec!["example.com", "com"]
        );
        assert_eq!(Reference::new("[::1]", 1, false).levels(), vec!["[::1]"]);
        assert_eq!(Reference::new("10.0.0.1", 1, false).levels(), vec!["10.0.0.1"]);
    }

    #[test]
    fn test_group_ip_and_root_dot_references() {
        let host = FakeHost::with_tabs(
            1,
            vec![
                tab(1, "http://[::1]:8000/", 1),
                tab(2, "http://[::1]/admin", 2),
                tab(3, "https://example.com./", 1),
                tab(4, "https://mail.example.com/", 1),
            ],
        );

        let reference = Reference::from_tab(&tab(1, "http://[::1]:8000/", 1)).unwrap();
        let session = pollster::block_on(group(&reference, GroupSession::new(), &host)).unwrap();
        assert_eq!(host.queries(), vec!["*://[::1]/*"]);
        assert_eq!(ids(&session), vec!["group-0", "group-0-cur", "group-0-all"]);
        assert_eq!(session.get(&GroupId::level(0)).unwrap().label(), "[::1]");

        let reference = Reference::from_tab(&tab(3, "https://example.com./", 1)).unwrap();
        let session = pollster::block_on(group(&reference, GroupSession::new(), &host)).unwrap();
        assert_eq!(
            host.queries(),
            vec!["*://[::1]/*", "*://*.example.com/*", "*://*.com/*"]
        );
        assert_eq!(session.get(&GroupId::level(0)).unwrap().len(), 2);
    }

    #[test]
    fn test_reference_from_tab() {
        let reference = Reference::from_tab(&tab(1, "https://www2.mail.example.com/x", 3).incognito()).unwrap();

        assert_eq!(reference.host, "mail.example.com");
        assert_eq!(reference.window_id, 3);
        assert!(reference.incognito);

        assert!(Reference::from_tab(&tab(1, "about:blank", 3)).is_err());
        assert!(Reference::from_tab(&tab(1, "not a url", 3)).is_err());
    }

    #[test]
    fn test_group_id_display_and_parse() {
        for (id, text) in [
            (GroupId::level(0), "group-0"),
            (GroupId::this_window(2), "group-2-cur"),
            (GroupId::all_windows(11), "group-11-all"),
        ] {
            assert_eq!(id.to_string(), text);
            assert_eq!(text.parse::<GroupId>(), Ok(id));
        }

        assert!("group-tabs-window".parse::<GroupId>().is_err());
        assert!("group-1-other".parse::<GroupId>().is_err());
        assert!("grp-1".parse::<GroupId>().is_err());
        assert!("group-".parse::<GroupId>().is_err());
    }

    #[test]
    fn test_group_id_parent() {
        assert_eq!(GroupId::level(1).parent(), None);
        assert_eq!(GroupId::this_window(1).parent(), Some(GroupId::level(1)));
        assert_eq!(GroupId::all_windows(1).parent(), Some(GroupId::level(1)));
    }

    #[test]
    fn test_entry_partition() {
        let entry = GroupEntry::new(
            "example.com",
            vec![tab(1, "https://example.com/", 1), tab(2, "https://example.com/", 2), tab(3, "https://example.com/", 1)],
            1,
        );

        assert_eq!(tab_ids(&entry.current_window()), vec![1, 3]);
        assert_eq!(tab_ids(&entry.other_windows()), vec![2]);
        assert_eq!(entry.current_window().len() + entry.other_windows().len(), entry.len());
        assert!(!entry.recycle());
    }

    #[test]
    fn test_only_non_empty_levels_are_emitted() {
        let host = FakeHost::with_tabs(1, vec![])
            .script("*://*.a.b.example.com/*", vec![tab(1, "https://a.b.example.com/", 1)])
            .script("*://*.b.example.com/*", vec![])
            .script(
                "*://*.example.com/*",
                vec![tab(1, "https://a.b.example.com/", 1), tab(2, "https://example.com/", 1)],
            )
            .script("*://*.com/*", vec![]);
        let reference = Reference::new("a.b.example.com", 1, false);

        let session = pollster::block_on(group(&reference, GroupSession::new(), &host)).unwrap();

        assert_eq!(ids(&session), vec!["group-0", "group-2"]);
        assert_eq!(session.get(&GroupId::level(0)).unwrap().label(), "a.b.example.com");
        assert_eq!(session.get(&GroupId::level(2)).unwrap().label(), "*.example.com");
        assert_eq!(
            host.queries(),
            vec![
                "*://*.a.b.example.com/*",
                "*://*.b.example.com/*",
                "*://*.example.com/*",
                "*://*.com/*",
            ]
        );
    }

    #[test]
    fn test_recycle_and_sub_entries() {
        let host = FakeHost::with_tabs(
            1,
            vec![
                tab(1, "https://mail.example.com/a", 1),
                tab(2, "https://example.com/", 2),
                tab(3, "https://other.org/", 1),
                tab(4, "https://www.example.com/b", 1),
            ],
        );
        let reference = Reference::new("mail.example.com", 1, false);

        let session = pollster::block_on(group(&reference, GroupSession::new(), &host)).unwrap();

        assert_eq!(
            ids(&session),
            vec![
                "group-0",
                "group-1",
                "group-1-cur",
                "group-1-all",
                "group-2",
                "group-2-cur",
                "group-2-all",
            ]
        );

        let exact = session.get(&GroupId::level(0)).unwrap();
        assert_eq!(exact.label(), "mail.example.com");
        assert!(exact.recycle());
        assert_eq!(exact.len(), 1);

        let level = session.get(&GroupId::level(1)).unwrap();
        assert_eq!(level.label(), "*.example.com");
        assert!(!level.recycle());
        assert_eq!(level.len(), 3);

        let this_window = session.get(&GroupId::this_window(1)).unwrap();
        assert!(this_window.recycle());
        assert_eq!(this_window.len(), level.current_window().len());
        assert_eq!(this_window.len(), 2);

        let all_windows = session.get(&GroupId::all_windows(1)).unwrap();
        assert!(!all_windows.recycle());
        assert_eq!(all_windows.len(), 3);

        let com = session.get(&GroupId::level(2)).unwrap();
        assert_eq!(com.label(), "*.com");
        assert_eq!(com.len(), 3);
    }

    #[test]
    fn test_incognito_isolation() {
        let tabs = vec![
            tab(1, "https://example.com/", 1),
            tab(2, "https://example.com/private", 5).incognito(),
            tab(3, "https://docs.example.com/", 1),
        ];
        let host = FakeHost::with_tabs(1, tabs);

        let normal = pollster::block_on(group(&Reference::new("example.com", 1, false), GroupSession::new(), &host)).unwrap();
        assert!(
            normal
                .iter()
                .all(|(_, entry)| entry.tabs().iter().all(|t| !t.incognito))
        );
        assert_eq!(normal.get(&GroupId::level(0)).unwrap().len(), 2);

        let private = pollster::block_on(group(&Reference::new("example.com", 5, true), GroupSession::new(), &host)).unwrap();
        assert!(
            private
                .iter()
                .all(|(_, entry)| entry.tabs().iter().all(|t| t.incognito))
        );
        assert_eq!(ids(&private), vec!["group-0", "group-1"]);
    }

    #[test]
    fn test_pinned_tabs_are_not_grouped() {
        let host = FakeHost::with_tabs(
            1,
            vec![tab(1, "https://example.com/", 1).pinned(), tab(2, "https://example.com/x", 1)],
        );

        let session = pollster::block_on(group(&Reference::new("example.com", 1, false), GroupSession::new(), &host)).unwrap();

        assert_eq!(session.get(&GroupId::level(0)).unwrap().tabs()[0].id, 2);
        assert_eq!(session.get(&GroupId::level(0)).unwrap().len(), 1);
    }

    #[test]
    fn test_no_matches_gives_empty_session() {
        let host = FakeHost::with_tabs(1, vec![tab(1, "https://other.org/", 1)]);

        let session = pollster::block_on(group(&Reference::new("example.com", 1, false), GroupSession::new(), &host)).unwrap();

        assert!(session.is_empty());
    }

    #[test]
    fn test_build_session_reports_no_host() {
        let host = FakeHost::with_tabs(1, vec![]);

        let result = pollster::block_on(build_session(&tab(1, "about:blank", 1), GroupSession::new(), &host));

        assert!(matches!(result, Err(GroupError::NoHost(_))));
        assert!(host.queries().is_empty());
    }

    #[test]
    fn test_build_session_from_tab() {
        let host = FakeHost::with_tabs(1, vec![tab(1, "https://www.example.com/", 1)]);

        let session = pollster::block_on(build_session(&tab(1, "https://www.example.com/", 1), GroupSession::new(), &host)).unwrap();

        assert_eq!(ids(&session), vec!["group-0", "group-1"]);
        assert_eq!(host.queries(), vec!["*://*.example.com/*", "*://*.com/*"]);
    }

    #[test]
    fn test_session_resolve() {
        let host = FakeHost::with_tabs(1, vec![tab(1, "https://example.com/", 1), tab(2, "https://example.com/", 2)]);

        let session = pollster::block_on(group(&Reference::new("example.com", 1, false), GroupSession::new(), &host)).unwrap();

        assert_eq!(session.resolve("group-0-cur").unwrap().len(), 1);
        assert_eq!(session.resolve("group-0-all").unwrap().len(), 2);
        assert!(session.resolve("group-7").is_none());
        assert!(session.resolve("group-tabs-window").is_none());
    }

    #[test]
    fn test_session_slot_replaces_atomically() {
        let mut slot = SessionSlot::new();
        let mut first = slot.begin();
        first.entries.insert(GroupId::level(0), GroupEntry::new("a.com", vec![tab(1, "https://a.com/", 1)], 1));
        assert!(slot.install(first));
        assert!(slot.resolve("group-0").is_some());

        let second = slot.begin();
        assert!(slot.current().is_none());
        assert!(slot.resolve("group-0").is_none());

        let third = slot.begin();
        assert!(!slot.is_pending(second.token()));
        assert!(slot.is_pending(third.token()));
        assert!(!slot.install(second));
        assert!(slot.current().is_none());

        let token = third.token();
        assert!(slot.install(third));
        assert_eq!(slot.current().map(GroupSession::token), Some(token));
    }

    #[test]
    fn test_sessions_have_distinct_tokens() {
        assert_ne!(GroupSession::new().token(), GroupSession::new().token());
    }
}
