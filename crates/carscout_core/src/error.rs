use crate::ChatState;

/// Reasons a `watch` request does not produce a new query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("url is already watched: {url}")]
    DuplicateUrl { url: String },
    #[error("no adapter for url: {url}")]
    UnsupportedSite { url: String },
    #[error("baseline fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },
}

/// Input that does not fit the chat's current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("removal choice received in state {state:?}")]
    InvalidState { state: ChatState },
    #[error("removal choice {token:?} does not name a query")]
    InvalidChoice { token: String },
    #[error("free text received while waiting for a removal choice")]
    ExpectedChoice,
}
