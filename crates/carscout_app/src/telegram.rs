//! Telegram Bot API transport: outbound messages and long-polled updates.
//!
//! See <https://core.telegram.org/bots/api>.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carscout_core::{ChatId, Choice, InboundEvent, Msg, TextOptions};
use carscout_engine::{Messenger, MessengerError};
use reqwest::Client;
use scout_logging::{scout_debug, scout_warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Seconds the server may hold a `getUpdates` call open.
const LONG_POLL_SECS: u64 = 30;

pub struct TelegramClient {
    client: Client,
    api_base: String,
    bot_token: String,
}

impl TelegramClient {
    pub fn new(bot_token: impl Into<String>) -> Result<Self, MessengerError> {
        Self::with_api_base(bot_token, TELEGRAM_API_BASE)
    }

    pub fn with_api_base(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, MessengerError> {
        // Must outlast a long poll.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(LONG_POLL_SECS + 15))
            .build()
            .map_err(|err| MessengerError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, MessengerError> {
        let resp: TelegramResponse<T> = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;

        if !resp.ok {
            return Err(MessengerError::Rejected(format!(
                "{method}: {}",
                resp.description.unwrap_or_else(|| "unknown".into())
            )));
        }
        resp.result
            .ok_or_else(|| MessengerError::Rejected(format!("{method}: empty result")))
    }

    /// Name of the bot, as a token check at startup.
    pub async fn validate(&self) -> Result<String, MessengerError> {
        let bot: TgUser = self.call("getMe", &json!({})).await?;
        Ok(bot.username.or(bot.first_name).unwrap_or_default())
    }

    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<TgUpdate>, MessengerError> {
        let mut body = json!({
            "timeout": LONG_POLL_SECS,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", &body).await
    }

    async fn answer_callback_query(&self, id: &str) -> Result<(), MessengerError> {
        let _: bool = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": id }))
            .await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> MessengerError {
    MessengerError::Transport(err.to_string())
}

/// Body of `sendMessage` for plain or HTML text.
fn text_body(chat_id: ChatId, text: &str, options: TextOptions) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": text,
        "disable_web_page_preview": options.disable_preview,
    });
    if options.rich {
        body["parse_mode"] = json!("HTML");
    }
    body
}

/// Body of `sendMessage` with one inline button per row.
fn choice_body(chat_id: ChatId, prompt: &str, choices: &[Choice]) -> Value {
    let keyboard: Vec<Value> = choices
        .iter()
        .map(|choice| json!([{ "text": choice.label, "callback_data": choice.token }]))
        .collect();
    json!({
        "chat_id": chat_id,
        "text": prompt,
        "reply_markup": { "inline_keyboard": keyboard },
    })
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        options: TextOptions,
    ) -> Result<(), MessengerError> {
        let sent: SentMessage = self
            .call("sendMessage", &text_body(chat_id, text, options))
            .await?;
        scout_debug!("Chat {}: sent message {}", chat_id, sent.message_id);
        Ok(())
    }

    async fn send_choice(
        &self,
        chat_id: ChatId,
        prompt: &str,
        choices: &[Choice],
    ) -> Result<(), MessengerError> {
        let sent: SentMessage = self
            .call("sendMessage", &choice_body(chat_id, prompt, choices))
            .await?;
        scout_debug!("Chat {}: sent menu {}", chat_id, sent.message_id);
        Ok(())
    }
}

// -- Telegram API response types --

#[derive(Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    username: Option<String>,
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    message: Option<TgMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Turns an update into a chat event. Updates without text or button data are
/// ignored.
fn to_event(update: &TgUpdate) -> Option<InboundEvent> {
    if let Some(message) = &update.message {
        let text = message.text.as_deref()?;
        return Some(InboundEvent {
            chat_id: message.chat.id,
            msg: Msg::from_text(text),
        });
    }
    let query = update.callback_query.as_ref()?;
    Some(InboundEvent {
        chat_id: query.message.as_ref()?.chat.id,
        msg: Msg::ChoiceSelected(query.data.clone()?),
    })
}

/// Long-polls `getUpdates` and tracks the confirmed offset.
pub struct UpdatePoller {
    client: Arc<TelegramClient>,
    offset: Option<i64>,
}

impl UpdatePoller {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self {
            client,
            offset: None,
        }
    }

    /// Waits for the next batch of updates. Button presses are acknowledged
    /// so the client stops showing a spinner.
    pub async fn next_batch(&mut self) -> Result<Vec<InboundEvent>, MessengerError> {
        let updates = self.client.get_updates(self.offset).await?;
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset = Some(last + 1);
        }

        let mut events = Vec::with_capacity(updates.len());
        for update in &updates {
            if let Some(query) = &update.callback_query {
                if let Err(err) = self.client.answer_callback_query(&query.id).await {
                    scout_warn!("Failed to answer callback query {}: {}", query.id, err);
                }
            }
            match to_event(update) {
                Some(event) => events.push(event),
                None => scout_debug!("Ignoring update {}", update.update_id),
            }
        }
        Ok(events)
    }
}
