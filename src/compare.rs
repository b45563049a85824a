/// Total ordering of tabs by URL
use crate::tab_data::{Tab, TabId};
use crate::uri::ParsedUri;
use std::cmp::Ordering;

/// Scheme priority buckets, in sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemeClass {
    Web,
    File,
    Ftp,
    About,
    Other,
}

impl SchemeClass {
    pub fn of(scheme: &str) -> SchemeClass {
        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => SchemeClass::Web,
            "file" => SchemeClass::File,
            "ftp" | "sftp" => SchemeClass::Ftp,
            "about" => SchemeClass::About,
            _ => SchemeClass::Other,
        }
    }
}

/// Element-wise label comparison; a missing label compares as `""`.
fn compare_labels(a: &[String], b: &[String]) -> Ordering {
    (0..a.len().max(b.len()))
        .map(|i| {
            let la = a.get(i).map_or("", String::as_str);
            let lb = b.get(i).map_or("", String::as_str);
            la.cmp(lb)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Precomputed URL sort key.
#[derive(Debug, Clone)]
enum UriKey {
    Parsed {
        class: SchemeClass,
        scheme: String,
        labels: Vec<String>,
        local: String,
    },
    Malformed(String),
}

impl UriKey {
    fn new(url: &str) -> UriKey {
        match ParsedUri::parse(url) {
            Ok(uri) => UriKey::Parsed {
                class: SchemeClass::of(&uri.scheme),
                scheme: uri.scheme.to_lowercase(),
                labels: uri.domain_labels(),
                local: uri.local_part(),
            },
            Err(e) => {
                log::debug!("sorting malformed URL last: {}", e);
                UriKey::Malformed(url.to_string())
            }
        }
    }

    fn compare(&self, other: &UriKey) -> Ordering {
        match (self, other) {
            (
                UriKey::Parsed {
                    class: ca,
                    scheme: sa,
                    labels: la,
                    local: pa,
                },
                UriKey::Parsed {
                    class: cb,
                    scheme: sb,
                    labels: lb,
                    local: pb,
                },
            ) => ca
                .cmp(cb)
                .then_with(|| sa.cmp(sb))
                .then_with(|| compare_labels(la, lb))
                .then_with(|| pa.cmp(pb)),
            (UriKey::Parsed { .. }, UriKey::Malformed(_)) => Ordering::Less,
            (UriKey::Malformed(_), UriKey::Parsed { .. }) => Ordering::Greater,
            (UriKey::Malformed(a), UriKey::Malformed(b)) => a.cmp(b),
        }
    }
}

/// Compare two URLs on scheme, domain and local part only.
pub fn compare_uris(a: &str, b: &str) -> Ordering {
    UriKey::new(a).compare(&UriKey::new(b))
}

struct TabKey {
    pinned: bool,
    uri: UriKey,
    last_accessed: f64,
    id: TabId,
}

impl TabKey {
    fn new(tab: &Tab) -> TabKey {
        TabKey {
            pinned: tab.pinned,
            uri: UriKey::new(&tab.url),
            last_accessed: tab.last_accessed,
            id: tab.id,
        }
    }

    fn compare(&self, other: &TabKey) -> Ordering {
        // `true > false`, so compare in reverse to put pinned first.
        other
            .pinned
            .cmp(&self.pinned)
            .then_with(|| self.uri.compare(&other.uri))
            .then_with(|| other.last_accessed.total_cmp(&self.last_accessed))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Tabs compare by, in order:
/// 1. pinned before unpinned
/// 2. scheme class (`http(s)`, `file`, `(s)ftp`, `about`, anything else),
///    then scheme name
/// 3. hostname labels from the top-level label down, `www` stripped
/// 4. path + query + fragment
/// 5. most recently accessed first
///
/// URLs that fail to parse rank after every parseable URL within the same
/// pinned rank and are ordered by their raw text. The tab id breaks any
/// remaining tie so distinct tabs never compare equal.
pub fn compare_tabs(a: &Tab, b: &Tab) -> Ordering {
    TabKey::new(a).compare(&TabKey::new(b))
}

/// Sort tabs (precompute the key for each tab)
pub fn sorted_tabs(tabs: &[Tab]) -> Vec<Tab> {
    let mut keyed: Vec<(TabKey, &Tab)> = tabs.iter().map(|tab| (TabKey::new(tab), tab)).collect();

    keyed.sort_by(|a, b| a.0.compare(&b.0));

    keyed.into_iter().map(|(_, tab)| tab.clone()).collect()
}
