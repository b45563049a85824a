/// URL parsing and hostname handling for Tab Grouper
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use url::{Host, Url};

/// `www`, `www2`, `www3`, ... followed by a dot.
static WWW_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^www\d*\.").expect("www prefix pattern is valid"));

/// Schemes covered by the `*` scheme wildcard of a match pattern.
const WILDCARD_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("invalid URL {input:?}: {source}")]
    Invalid {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL {0:?} has no host")]
    NoHost(String),
}

/// The parts of an absolute URL used for ordering and grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub scheme: String,
    pub hostname: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

impl ParsedUri {
    pub fn parse(input: &str) -> Result<ParsedUri, UriError> {
        let url = Url::parse(input).map_err(|source| UriError::Invalid {
            input: input.to_string(),
            source,
        })?;

        Ok(ParsedUri {
            scheme: url.scheme().to_string(),
            hostname: url.host_str().unwrap_or_default().to_string(),
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
            fragment: url.fragment().unwrap_or_default().to_string(),
        })
    }

    /// Path, query and fragment concatenated as they appear in the URL.
    ///
    /// An empty query or fragment contributes nothing, not even its
    /// delimiter.
    pub fn local_part(&self) -> String {
        let mut local = self.path.clone();
        if !self.query.is_empty() {
            local.push('?');
            local.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            local.push('#');
            local.push_str(&self.fragment);
        }
        local
    }

    /// Hostname labels, `www` stripped, from top-level label down.
    pub fn domain_labels(&self) -> Vec<String> {
        reversed_labels(&self.hostname)
    }
}

impl FromStr for ParsedUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParsedUri::parse(s)
    }
}

/// Remove one leading `www` label variant (`www.`, `www2.`, ...).
pub fn strip_www(host: &str) -> &str {
    match WWW_PREFIX.find(host) {
        Some(prefix) => &host[prefix.end()..],
        None => host,
    }
}

/// Case-fold a hostname, drop a trailing root dot and strip its `www`
/// prefix.
pub fn normalize_host(host: &str) -> String {
    let host = host.to_lowercase();
    let host = host.strip_suffix('.').unwrap_or(&host);
    strip_www(host).to_string()
}

/// `127.0.0.1` or `[::1]`: a host with no domain hierarchy.
pub fn is_ip_literal(host: &str) -> bool {
    matches!(Host::parse(host), Ok(Host::Ipv4(_) | Host::Ipv6(_)))
}

/// `mail.example.com` -> `["com", "example", "mail"]`
pub fn reversed_labels(host: &str) -> Vec<String> {
    normalize_host(host)
        .split('.')
        .rev()
        .map(str::to_string)
        .collect()
}

/// Derive the normalized hostname used as the basis for grouping.
pub fn reference_host(url: &str) -> Result<String, UriError> {
    let parsed = ParsedUri::parse(url)?;
    let host = normalize_host(&parsed.hostname);
    if host.is_empty() {
        return Err(UriError::NoHost(url.to_string()));
    }
    Ok(host)
}

/// A host-scoped match pattern, `*://*.domain/*` or `*://host/*`.
///
/// The wildcard form matches `domain` itself and every subdomain of it.
/// IP literals have no subdomains and only match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPattern {
    domain: String,
    subdomains: bool,
}

impl HostPattern {
    pub fn subdomains_of(domain: impl Into<String>) -> HostPattern {
        HostPattern {
            domain: domain.into().to_lowercase(),
            subdomains: true,
        }
    }

    pub fn exact(host: impl Into<String>) -> HostPattern {
        HostPattern {
            domain: host.into().to_lowercase(),
            subdomains: false,
        }
    }

    /// Wildcard pattern for a domain, exact pattern for an IP literal.
    pub fn for_host(host: &str) -> HostPattern {
        if is_ip_literal(host) {
            HostPattern::exact(host)
        } else {
            HostPattern::subdomains_of(host)
        }
    }

    /// Read back a pattern rendered by `Display`.
    pub fn from_match_pattern(pattern: &str) -> Option<HostPattern> {
        let host = pattern.strip_prefix("*://")?.strip_suffix("/*")?;
        match host.strip_prefix("*.") {
            Some(domain) => Some(HostPattern::subdomains_of(domain)),
            None => Some(HostPattern::exact(host)),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let host = host.strip_suffix('.').unwrap_or(&host);
        host == self.domain
            || (self.subdomains
                && host
                    .strip_suffix(self.domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    }

    pub fn matches_url(&self, url: &str) -> bool {
        match ParsedUri::parse(url) {
            Ok(parsed) => {
                WILDCARD_SCHEMES.contains(&parsed.scheme.as_str())
                    && self.matches_host(&parsed.hostname)
            }
            Err(_) => false,
        }
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subdomains {
            write!(f, "*://*.{}/*", self.domain)
        } else {
            write!(f, "*://{}/*", self.domain)
        }
    }
}
