//! RON file store: every chat's session in one file, rewritten atomically on
//! each save.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use carscout_core::{ChatId, ChatSession, ChatState, SiteType, WatchQuery};
use carscout_engine::{AtomicFileWriter, Store, StoreError};
use scout_logging::{scout_debug, scout_info, scout_warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum PersistedChatState {
    Init,
    AwaitingUrl,
    AwaitingRemovalChoice,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum PersistedSite {
    Mobile,
    AutoScout24,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedQuery {
    url: String,
    site: PersistedSite,
    #[serde(default)]
    seen: BTreeSet<String>,
    #[serde(default)]
    links: BTreeMap<String, String>,
    #[serde(default)]
    current_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    state: PersistedChatState,
    queries: Vec<PersistedQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    chats: BTreeMap<ChatId, PersistedSession>,
}

impl From<ChatState> for PersistedChatState {
    fn from(state: ChatState) -> Self {
        match state {
            ChatState::Init => Self::Init,
            ChatState::AwaitingUrl => Self::AwaitingUrl,
            ChatState::AwaitingRemovalChoice => Self::AwaitingRemovalChoice,
        }
    }
}

impl From<PersistedChatState> for ChatState {
    fn from(state: PersistedChatState) -> Self {
        match state {
            PersistedChatState::Init => Self::Init,
            PersistedChatState::AwaitingUrl => Self::AwaitingUrl,
            PersistedChatState::AwaitingRemovalChoice => Self::AwaitingRemovalChoice,
        }
    }
}

impl From<SiteType> for PersistedSite {
    fn from(site: SiteType) -> Self {
        match site {
            SiteType::Mobile => Self::Mobile,
            SiteType::AutoScout24 => Self::AutoScout24,
            SiteType::Unknown => Self::Unknown,
        }
    }
}

impl From<PersistedSite> for SiteType {
    fn from(site: PersistedSite) -> Self {
        match site {
            PersistedSite::Mobile => Self::Mobile,
            PersistedSite::AutoScout24 => Self::AutoScout24,
            PersistedSite::Unknown => Self::Unknown,
        }
    }
}

impl From<&ChatSession> for PersistedSession {
    fn from(session: &ChatSession) -> Self {
        Self {
            state: session.state().into(),
            queries: session
                .queries()
                .iter()
                .map(|query| PersistedQuery {
                    url: query.source_url.clone(),
                    site: query.site_type.into(),
                    seen: query.seen_items.clone(),
                    links: query.detail_links.clone(),
                    current_count: query.current_count,
                })
                .collect(),
        }
    }
}

impl PersistedSession {
    fn into_session(self, chat_id: ChatId) -> ChatSession {
        let queries = self
            .queries
            .into_iter()
            .map(|query| WatchQuery {
                source_url: query.url,
                site_type: query.site.into(),
                seen_items: query.seen,
                detail_links: query.links,
                current_count: query.current_count,
            })
            .collect();
        let (session, dropped) = ChatSession::restore(self.state.into(), queries);
        if dropped > 0 {
            scout_warn!(
                "Chat {}: dropped {} duplicate queries from the state file",
                chat_id,
                dropped
            );
        }
        session
    }
}

#[derive(Debug, Default)]
struct Cache {
    sessions: BTreeMap<ChatId, ChatSession>,
    /// Bumped on every save.
    version: u64,
}

/// [`Store`] backed by a single RON file.
///
/// Sessions are cached in memory; a save rewrites the whole file on the
/// blocking pool. Saves racing each other are coalesced: whoever writes
/// takes the newest cache, and a save whose change is already on disk
/// returns without writing.
#[derive(Debug)]
pub struct RonFileStore {
    writer: AtomicFileWriter,
    filename: String,
    cache: Mutex<Cache>,
    /// Cache version last written to disk. Held across a write.
    written: tokio::sync::Mutex<u64>,
}

impl RonFileStore {
    /// Opens the store at `path`. A missing file is an empty store; a file
    /// that cannot be read or parsed is an error.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StoreError::Decode(format!("{} is not a file path", path.display())))?
            .to_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let sessions = match fs::read_to_string(path) {
            Ok(content) => decode(&content)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                scout_info!("No state file at {:?}, starting empty", path);
                BTreeMap::new()
            }
            Err(err) => return Err(StoreError::Persist(err.into())),
        };
        scout_debug!("Loaded {} chat sessions from {:?}", sessions.len(), path);

        Ok(Self {
            writer: AtomicFileWriter::new(dir),
            filename,
            cache: Mutex::new(Cache {
                sessions,
                version: 0,
            }),
            written: tokio::sync::Mutex::new(0),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(&self.filename)
    }

    fn cache(&self) -> Result<MutexGuard<'_, Cache>, StoreError> {
        self.cache.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait::async_trait]
impl Store for RonFileStore {
    fn load_all_sessions(&self) -> Result<BTreeMap<ChatId, ChatSession>, StoreError> {
        Ok(self.cache()?.sessions.clone())
    }

    async fn save(&self, chat_id: ChatId, session: &ChatSession) -> Result<(), StoreError> {
        let version = {
            let mut cache = self.cache()?;
            cache.sessions.insert(chat_id, session.clone());
            cache.version += 1;
            cache.version
        };

        let mut written = self.written.lock().await;
        if *written >= version {
            scout_debug!("Chat {}: save {} already on disk", chat_id, version);
            return Ok(());
        }
        let (snapshot, latest) = {
            let cache = self.cache()?;
            (cache.sessions.clone(), cache.version)
        };

        let writer = self.writer.clone();
        let filename = self.filename.clone();
        tokio::task::spawn_blocking(move || {
            let content = encode(&snapshot)?;
            writer.write(&filename, content.as_bytes())?;
            Ok::<_, StoreError>(())
        })
        .await
        .map_err(|err| StoreError::Writer(format!("join: {err}")))??;

        *written = latest;
        Ok(())
    }
}

fn encode(sessions: &BTreeMap<ChatId, ChatSession>) -> Result<String, StoreError> {
    let state = PersistedState {
        chats: sessions
            .iter()
            .map(|(chat_id, session)| (*chat_id, session.into()))
            .collect(),
    };
    let pretty = ron::ser::PrettyConfig::new();
    ron::ser::to_string_pretty(&state, pretty).map_err(|err| StoreError::Encode(err.to_string()))
}

fn decode(content: &str) -> Result<BTreeMap<ChatId, ChatSession>, StoreError> {
    let state: PersistedState =
        ron::from_str(content).map_err(|err| StoreError::Decode(err.to_string()))?;
    Ok(state
        .chats
        .into_iter()
        .map(|(chat_id, session)| (chat_id, session.into_session(chat_id)))
        .collect())
}
