use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{detect, RegistrationError};

/// Chat identifier as handed out by the messenger.
pub type ChatId = i64;

/// Stable per-listing identifier extracted from a result page.
pub type ItemId = String;

/// Which input the chat expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Init,
    AwaitingUrl,
    AwaitingRemovalChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteType {
    Mobile,
    AutoScout24,
    Unknown,
}

impl SiteType {
    /// Upper-case label used in chat messages.
    pub fn label(self) -> &'static str {
        match self {
            SiteType::Mobile => "MOBILE",
            SiteType::AutoScout24 => "AUTOSCOUT24",
            SiteType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One registered search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchQuery {
    pub source_url: String,
    pub site_type: SiteType,
    /// Every identifier ever observed. Only grows.
    pub seen_items: BTreeSet<ItemId>,
    /// Detail pages from the latest successful poll.
    pub detail_links: BTreeMap<ItemId, String>,
    /// Size of the latest successful fetch.
    pub current_count: usize,
}

impl WatchQuery {
    pub fn new(source_url: impl Into<String>, site_type: SiteType) -> Self {
        Self {
            source_url: source_url.into(),
            site_type,
            seen_items: BTreeSet::new(),
            detail_links: BTreeMap::new(),
            current_count: 0,
        }
    }

    /// Merges a freshly fetched result set and returns the items not seen before.
    ///
    /// The seen set is unioned even when nothing is new, and detail links are
    /// replaced wholesale.
    pub fn absorb(
        &mut self,
        fetched: BTreeSet<ItemId>,
        detail_links: BTreeMap<ItemId, String>,
    ) -> BTreeSet<ItemId> {
        let detection = detect(&self.seen_items, &fetched);
        self.current_count = fetched.len();
        self.seen_items = detection.updated_seen;
        self.detail_links = detail_links;
        detection.new_items
    }
}

/// Conversation state and watch list for one chat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSession {
    state: ChatState,
    queries: Vec<WatchQuery>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a session from persisted parts. Later duplicates of a URL are
    /// dropped; the second value counts them.
    pub fn restore(state: ChatState, queries: Vec<WatchQuery>) -> (Self, usize) {
        let mut session = Self {
            state,
            queries: Vec::with_capacity(queries.len()),
        };
        let mut dropped = 0;
        for query in queries {
            if session.push_query(query).is_err() {
                dropped += 1;
            }
        }
        (session, dropped)
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn set_state(&mut self, state: ChatState) {
        self.state = state;
    }

    pub fn queries(&self) -> &[WatchQuery] {
        &self.queries
    }

    /// Mutable access to existing queries; adding goes through [`ChatSession::push_query`].
    pub fn queries_mut(&mut self) -> &mut [WatchQuery] {
        &mut self.queries
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.queries.iter().any(|q| q.source_url == url)
    }

    /// Checks the preconditions of a registration: the URL must be new to this
    /// chat and belong to a supported site.
    pub fn check_registration(&self, url: &str, site_type: SiteType) -> Result<(), RegistrationError> {
        if self.contains_url(url) {
            return Err(RegistrationError::DuplicateUrl {
                url: url.to_string(),
            });
        }
        if site_type == SiteType::Unknown {
            return Err(RegistrationError::UnsupportedSite {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Appends a query and returns its index.
    pub fn push_query(&mut self, query: WatchQuery) -> Result<usize, RegistrationError> {
        if self.contains_url(&query.source_url) {
            return Err(RegistrationError::DuplicateUrl {
                url: query.source_url,
            });
        }
        self.queries.push(query);
        Ok(self.queries.len() - 1)
    }

    pub fn remove_query(&mut self, index: usize) -> Option<WatchQuery> {
        if index < self.queries.len() {
            Some(self.queries.remove(index))
        } else {
            None
        }
    }
}
