#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carscout_core::{ChatId, Choice, TextOptions};
use carscout_engine::{
    ExtractorRegistry, FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher, MemoryStore,
    Messenger, MessengerError, Scheduler, SchedulerSettings,
};

pub const INTERVAL: Duration = Duration::from_secs(60);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum Reply {
    Page(String),
    Fail(FailureKind),
    /// Never answers.
    Hang,
}

/// Serves canned replies per URL and records every request.
#[derive(Default)]
pub struct FakeFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn set(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(Reply::Page(html)) => Ok(FetchOutput {
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    redirect_count: 0,
                    content_type: Some("text/html; charset=utf-8".to_string()),
                    byte_len: html.len() as u64,
                },
                bytes: html.into_bytes(),
            }),
            Some(Reply::Fail(kind)) => Err(FetchError::new(kind, "scripted failure")),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(FetchError::new(FailureKind::HttpStatus(404), "no reply scripted")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub chat_id: ChatId,
    pub text: String,
    pub options: TextOptions,
}

/// Keeps every outbound message.
#[derive(Default)]
pub struct RecordingMessenger {
    texts: Mutex<Vec<SentText>>,
    choices: Mutex<Vec<(ChatId, String, Vec<Choice>)>>,
}

impl RecordingMessenger {
    pub fn texts(&self) -> Vec<SentText> {
        self.texts.lock().unwrap().clone()
    }

    pub fn texts_for(&self, chat_id: ChatId) -> Vec<String> {
        self.texts()
            .into_iter()
            .filter(|sent| sent.chat_id == chat_id)
            .map(|sent| sent.text)
            .collect()
    }

    pub fn choices(&self) -> Vec<(ChatId, String, Vec<Choice>)> {
        self.choices.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.texts.lock().unwrap().clear();
        self.choices.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        options: TextOptions,
    ) -> Result<(), MessengerError> {
        self.texts.lock().unwrap().push(SentText {
            chat_id,
            text: text.to_string(),
            options,
        });
        Ok(())
    }

    async fn send_choice(
        &self,
        chat_id: ChatId,
        prompt: &str,
        choices: &[Choice],
    ) -> Result<(), MessengerError> {
        self.choices
            .lock()
            .unwrap()
            .push((chat_id, prompt.to_string(), choices.to_vec()));
        Ok(())
    }
}

pub struct Harness {
    pub scheduler: Scheduler,
    pub fetcher: Arc<FakeFetcher>,
    pub messenger: Arc<RecordingMessenger>,
    pub store: Arc<MemoryStore>,
}

pub fn harness() -> Harness {
    harness_with_store(MemoryStore::new())
}

pub fn harness_with_store(store: MemoryStore) -> Harness {
    scout_logging::initialize_for_tests();
    let fetcher = Arc::new(FakeFetcher::default());
    let messenger = Arc::new(RecordingMessenger::default());
    let store = Arc::new(store);
    let scheduler = Scheduler::new(
        SchedulerSettings {
            interval: INTERVAL,
            fetch_timeout: FETCH_TIMEOUT,
        },
        fetcher.clone(),
        ExtractorRegistry::default(),
        store.clone(),
        messenger.clone(),
    );
    Harness {
        scheduler,
        fetcher,
        messenger,
        store,
    }
}

/// AutoScout24 result page with one result container per id, plus a spacer
/// container without an id.
pub fn autoscout_page(ids: &[&str]) -> String {
    let mut html = String::from("<html><head><title>Results</title></head><body><main>");
    for id in ids {
        html.push_str(&format!(
            r#"<div class="cl-list-element cl-list-element-gap" data-guid="{id}"><h2>Car {id}</h2></div>"#
        ));
    }
    html.push_str(r#"<div class="cl-list-element-gap"></div></main></body></html>"#);
    html
}

/// mobile.de result page; each ad links to a relative detail page.
pub fn mobile_page(ids: &[&str]) -> String {
    let mut html = String::from("<html><body><div class=\"result-list\">");
    for id in ids {
        html.push_str(&format!(
            r#"<div class="cBox-body cBox-body--resultitem"><a class="link--muted result-item" data-ad-id="{id}" href="/fahrzeuge/details.html?id={id}">Ad {id}</a></div>"#
        ));
    }
    html.push_str("</div></body></html>");
    html
}
