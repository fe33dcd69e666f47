use crate::ChatId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Watch,
    Remove,
    List,
    Update,
    Unknown(String),
}

impl Command {
    /// Parses `/name` or `/name@botname`, ignoring any arguments.
    /// Returns `None` for text that is not command-like.
    pub fn parse(text: &str) -> Option<Command> {
        let word = text.trim().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "watch" => Command::Watch,
            "remove" => Command::Remove,
            "list" => Command::List,
            "update" => Command::Update,
            _ => Command::Unknown(name.to_string()),
        };
        Some(command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Slash command from the user.
    Command(Command),
    /// Free text that is not a command.
    Text(String),
    /// Opaque token of a pressed choice button.
    ChoiceSelected(String),
}

impl Msg {
    /// Classifies a typed message as command or free text.
    pub fn from_text(text: &str) -> Msg {
        match Command::parse(text) {
            Some(command) => Msg::Command(command),
            None => Msg::Text(text.to_string()),
        }
    }
}

/// A message addressed to one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub msg: Msg,
}
