use crate::ConversationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendText { text: String, options: TextOptions },
    SendChoice { prompt: String, choices: Vec<Choice> },
    /// Fetch a baseline for `url` and append it to the chat's watch list.
    RegisterQuery { url: String },
    /// Run one poll cycle now.
    RunCycle,
    /// Input was rejected; the chat has already been reset to `Init`.
    Reject(ConversationError),
}

impl Effect {
    pub fn plain(text: impl Into<String>) -> Self {
        Effect::SendText {
            text: text.into(),
            options: TextOptions::PLAIN,
        }
    }

    pub fn rich(text: impl Into<String>) -> Self {
        Effect::SendText {
            text: text.into(),
            options: TextOptions::RICH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextOptions {
    /// Text carries HTML markup.
    pub rich: bool,
    pub disable_preview: bool,
}

impl TextOptions {
    pub const PLAIN: TextOptions = TextOptions {
        rich: false,
        disable_preview: false,
    };
    pub const RICH: TextOptions = TextOptions {
        rich: true,
        disable_preview: true,
    };
}

/// One selectable button: what the user sees and what comes back when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub token: String,
}
