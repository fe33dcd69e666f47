use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use carscout_core::render;
use carscout_core::{ChatId, ChatSession, RegistrationError, TextOptions, WatchQuery};
use scout_logging::{scout_debug, scout_error, scout_info, scout_warn};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::{
    ExtractorRegistry, FailureKind, FetchError, FetchOutput, Fetcher, Messenger, Store, StoreError,
};

/// Shared, per-chat lock around a session. Held for a whole tick or a whole
/// inbound message, which serializes everything that touches one chat.
pub type SessionHandle = Arc<tokio::sync::Mutex<ChatSession>>;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Time between two ticks of the same chat.
    pub interval: Duration,
    /// Hard bound on one fetch, on top of whatever the fetcher enforces.
    pub fetch_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(45),
        }
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    pub index: usize,
    /// Items on the baseline fetch.
    pub item_count: usize,
}

struct PollJob {
    generation: u64,
    token: CancellationToken,
}

struct Inner {
    settings: SchedulerSettings,
    fetcher: Arc<dyn Fetcher>,
    registry: ExtractorRegistry,
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    sessions: Mutex<HashMap<ChatId, SessionHandle>>,
    jobs: Mutex<HashMap<ChatId, PollJob>>,
    next_generation: AtomicU64,
    tracker: TaskTracker,
}

/// Owns every chat session and exactly one recurring poll job per chat.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        settings: SchedulerSettings,
        fetcher: Arc<dyn Fetcher>,
        registry: ExtractorRegistry,
        store: Arc<dyn Store>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                fetcher,
                registry,
                store,
                messenger,
                sessions: Mutex::new(HashMap::new()),
                jobs: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                tracker: TaskTracker::new(),
            }),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.inner.settings
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.inner.registry
    }

    pub fn messenger(&self) -> &dyn Messenger {
        self.inner.messenger.as_ref()
    }

    /// Session of `chat_id`, created empty on first use.
    pub fn session(&self, chat_id: ChatId) -> SessionHandle {
        lock(&self.inner.sessions)
            .entry(chat_id)
            .or_default()
            .clone()
    }

    /// Loads every persisted session and re-arms one job per chat that has queries.
    /// Returns the number of jobs started.
    pub fn restore(&self) -> Result<usize, StoreError> {
        let loaded = self.inner.store.load_all_sessions()?;
        let mut armed = 0;
        for (chat_id, session) in loaded {
            let has_queries = !session.is_empty();
            lock(&self.inner.sessions).insert(chat_id, Arc::new(tokio::sync::Mutex::new(session)));
            if has_queries {
                self.start_job(chat_id);
                armed += 1;
            }
        }
        scout_info!("Restored sessions, {} poll jobs armed", armed);
        Ok(armed)
    }

    /// Adds `url` to the chat's watch list.
    ///
    /// The first fetch only seeds the seen set, nothing is announced. On
    /// success the chat's poll job is restarted.
    pub async fn register_query(
        &self,
        chat_id: ChatId,
        session: &mut ChatSession,
        url: &str,
    ) -> Result<Registered, RegistrationError> {
        let site_type = self.inner.registry.detect_site_type(url);
        session.check_registration(url, site_type)?;

        let page = self.fetch(url).await.map_err(|err| RegistrationError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        let extraction = self.inner.registry.extract(site_type, &page);

        let mut query = WatchQuery::new(url, site_type);
        query.absorb(extraction.item_ids, extraction.detail_links);
        let item_count = query.current_count;
        let index = session.push_query(query)?;

        scout_info!(
            "Chat {} watches {} query #{} with {} items",
            chat_id,
            site_type,
            index + 1,
            item_count
        );
        self.persist(chat_id, session).await;
        self.start_job(chat_id);
        Ok(Registered { index, item_count })
    }

    /// One fetch + diff + notify pass over every query of the chat, in order.
    ///
    /// A failing query is logged and skipped; the others still run. The seen
    /// set is persisted before the notification goes out. Returns whether any
    /// query had new items.
    pub async fn run_cycle(&self, chat_id: ChatId, session: &mut ChatSession) -> bool {
        let registry = &self.inner.registry;
        let mut any_updates = false;

        for index in 0..session.queries().len() {
            let (url, site_type) = {
                let query = &session.queries()[index];
                (query.source_url.clone(), query.site_type)
            };
            scout_debug!("Chat {}: checking query #{} ({})", chat_id, index + 1, site_type);

            let page = match self.fetch(&url).await {
                Ok(page) => page,
                Err(err) => {
                    if err.is_transient() {
                        scout_info!("Chat {}: query #{} skipped this tick: {}", chat_id, index + 1, err);
                    } else {
                        scout_warn!("Chat {}: query #{} failed: {}", chat_id, index + 1, err);
                    }
                    continue;
                }
            };
            let extraction = registry.extract(site_type, &page);
            let new_items = session.queries_mut()[index]
                .absorb(extraction.item_ids, extraction.detail_links);

            let notification = (!new_items.is_empty()).then(|| {
                let query = &session.queries()[index];
                render::new_items_notification(index, query, &new_items, |item| {
                    registry.link_for(site_type, &query.source_url, &query.detail_links, item)
                })
            });

            self.persist(chat_id, session).await;

            if let Some(text) = notification {
                scout_info!(
                    "Chat {}: query #{} has {} new items",
                    chat_id,
                    index + 1,
                    new_items.len()
                );
                any_updates = true;
                self.notify(chat_id, &text, TextOptions::RICH).await;
            }
        }

        any_updates
    }

    /// Runs one cycle for `chat_id` under its session lock.
    pub async fn on_tick(&self, chat_id: ChatId) -> bool {
        let handle = self.session(chat_id);
        let mut session = handle.lock().await;
        if session.is_empty() {
            scout_debug!("Chat {}: nothing to poll", chat_id);
            return false;
        }
        self.run_cycle(chat_id, &mut session).await
    }

    /// Starts a fresh poll job for `chat_id`, cancelling the previous one.
    pub fn start_job(&self, chat_id: ChatId) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = lock(&self.inner.jobs).insert(
            chat_id,
            PollJob {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
            scout_debug!("Chat {}: replaced poll job {}", chat_id, previous.generation);
        }

        let scheduler = self.clone();
        self.inner
            .tracker
            .spawn(async move { scheduler.poll_loop(chat_id, generation, token).await });
        scout_info!(
            "Chat {}: poll job {} every {:?}",
            chat_id,
            generation,
            self.inner.settings.interval
        );
    }

    /// Stops scheduling further ticks for `chat_id`. An in-flight tick completes.
    pub fn cancel_job(&self, chat_id: ChatId) -> bool {
        match lock(&self.inner.jobs).remove(&chat_id) {
            Some(job) => {
                job.token.cancel();
                scout_info!("Chat {}: poll job {} cancelled", chat_id, job.generation);
                true
            }
            None => false,
        }
    }

    pub fn has_job(&self, chat_id: ChatId) -> bool {
        lock(&self.inner.jobs).contains_key(&chat_id)
    }

    /// Chats with an active poll job, ascending.
    pub fn active_jobs(&self) -> Vec<ChatId> {
        let mut chats: Vec<_> = lock(&self.inner.jobs).keys().copied().collect();
        chats.sort_unstable();
        chats
    }

    /// Cancels every job and waits for in-flight ticks to finish.
    pub async fn shutdown(&self) {
        let jobs: Vec<_> = lock(&self.inner.jobs).drain().collect();
        for (_, job) in &jobs {
            job.token.cancel();
        }
        self.inner.tracker.close();
        scout_info!("Waiting for {} poll jobs to stop", jobs.len());
        self.inner.tracker.wait().await;
    }

    /// Saves the session, logging instead of failing. Returns once the store
    /// has the write.
    pub async fn persist(&self, chat_id: ChatId, session: &ChatSession) {
        if let Err(err) = self.inner.store.save(chat_id, session).await {
            scout_error!("Chat {}: failed to persist session: {}", chat_id, err);
        }
    }

    /// Sends a message, logging instead of failing.
    pub async fn notify(&self, chat_id: ChatId, text: &str, options: TextOptions) {
        if let Err(err) = self.inner.messenger.send_text(chat_id, text, options).await {
            scout_warn!("Chat {}: failed to send message: {}", chat_id, err);
        }
    }

    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let timeout = self.inner.settings.fetch_timeout;
        match tokio::time::timeout(timeout, self.inner.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                FailureKind::Timeout,
                format!("no response within {timeout:?}"),
            )),
        }
    }

    async fn poll_loop(&self, chat_id: ChatId, generation: u64, token: CancellationToken) {
        let period = self.inner.settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let handle = self.session(chat_id);
            let mut session = handle.lock().await;
            // Replaced while waiting for the lock, e.g. by a registration.
            if token.is_cancelled() {
                break;
            }
            if session.is_empty() {
                continue;
            }
            self.run_cycle(chat_id, &mut session).await;
        }

        scout_debug!("Chat {}: poll job {} stopped", chat_id, generation);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
