use carscout_core::{ChatId, Choice, TextOptions};

#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rejected by chat service: {0}")]
    Rejected(String),
}

/// Outbound side of the chat transport.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        options: TextOptions,
    ) -> Result<(), MessengerError>;

    /// Sends `prompt` with one button per choice, in order.
    async fn send_choice(
        &self,
        chat_id: ChatId,
        prompt: &str,
        choices: &[Choice],
    ) -> Result<(), MessengerError>;
}
