use crate::render;
use crate::{ChatSession, ChatState, Command, ConversationError, Effect, Msg};

/// Pure update function: applies an inbound message to a chat and returns the
/// effects the runtime has to carry out.
///
/// Every path that consumes the expected input, or rejects it, leaves the chat
/// in `Init` so a confused user is never stuck in a waiting state.
pub fn update(mut session: ChatSession, msg: Msg) -> (ChatSession, Vec<Effect>) {
    let effects = match msg {
        Msg::Command(Command::Watch) => {
            session.set_state(ChatState::AwaitingUrl);
            vec![Effect::plain(render::WATCH_PROMPT)]
        }
        Msg::Command(Command::Remove) => {
            if session.is_empty() {
                session.set_state(ChatState::Init);
                vec![Effect::plain(render::NO_QUERIES_TO_REMOVE)]
            } else {
                session.set_state(ChatState::AwaitingRemovalChoice);
                vec![Effect::SendChoice {
                    prompt: render::REMOVAL_PROMPT.to_string(),
                    choices: render::removal_choices(&session),
                }]
            }
        }
        Msg::Command(Command::List) => {
            session.set_state(ChatState::Init);
            vec![render::query_list(&session)]
        }
        Msg::Command(Command::Update) => {
            session.set_state(ChatState::Init);
            if session.is_empty() {
                vec![Effect::plain(render::NO_QUERIES_REGISTERED)]
            } else {
                vec![Effect::RunCycle]
            }
        }
        Msg::Command(Command::Start | Command::Help) => vec![Effect::plain(render::HELP)],
        Msg::Command(Command::Unknown(_)) => {
            session.set_state(ChatState::Init);
            vec![
                Effect::plain(render::UNKNOWN_COMMAND),
                Effect::plain(render::HELP),
            ]
        }
        Msg::Text(text) => match session.state() {
            ChatState::Init => vec![Effect::plain(render::HELP)],
            ChatState::AwaitingUrl => {
                session.set_state(ChatState::Init);
                vec![Effect::RegisterQuery {
                    url: text.trim().to_string(),
                }]
            }
            ChatState::AwaitingRemovalChoice => {
                session.set_state(ChatState::Init);
                vec![Effect::Reject(ConversationError::ExpectedChoice)]
            }
        },
        Msg::ChoiceSelected(token) => {
            let state = session.state();
            session.set_state(ChatState::Init);
            if state != ChatState::AwaitingRemovalChoice {
                vec![Effect::Reject(ConversationError::InvalidState { state })]
            } else {
                let removed = token
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| session.remove_query(index));
                match removed {
                    Some(_) => vec![
                        Effect::plain(render::QUERY_REMOVED),
                        render::query_list(&session),
                    ],
                    None => vec![Effect::Reject(ConversationError::InvalidChoice { token })],
                }
            }
        }
    };

    (session, effects)
}
