use std::sync::Once;

use carscout_core::render;
use carscout_core::{
    update, ChatSession, ChatState, Choice, Command, ConversationError, Effect, Msg, SiteType,
    TextOptions, WatchQuery,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

fn session_with(urls: &[&str]) -> ChatSession {
    let queries = urls
        .iter()
        .map(|url| WatchQuery::new(*url, SiteType::AutoScout24))
        .collect();
    ChatSession::restore(ChatState::Init, queries).0
}

fn urls(session: &ChatSession) -> Vec<String> {
    session
        .queries()
        .iter()
        .map(|q| q.source_url.clone())
        .collect()
}

#[test]
fn watch_then_text_requests_registration_and_returns_to_init() {
    init_logging();
    let (session, effects) = update(ChatSession::new(), Msg::Command(Command::Watch));
    assert_eq!(session.state(), ChatState::AwaitingUrl);
    assert_eq!(effects, vec![Effect::plain(render::WATCH_PROMPT)]);

    let (session, effects) = update(
        session,
        Msg::Text("  https://www.autoscout24.de/lst?q=1 \n".to_string()),
    );
    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(
        effects,
        vec![Effect::RegisterQuery {
            url: "https://www.autoscout24.de/lst?q=1".to_string()
        }]
    );
}

#[test]
fn watch_is_accepted_from_any_state() {
    init_logging();
    let mut session = session_with(&["https://a.autoscout24.de/"]);
    session.set_state(ChatState::AwaitingRemovalChoice);

    let (session, _) = update(session, Msg::Command(Command::Watch));
    assert_eq!(session.state(), ChatState::AwaitingUrl);
}

#[test]
fn free_text_in_init_answers_with_help() {
    init_logging();
    let (session, effects) = update(ChatSession::new(), Msg::Text("hello".to_string()));
    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(effects, vec![Effect::plain(render::HELP)]);
}

#[test]
fn unknown_command_is_reported_before_help() {
    init_logging();
    let (_, effects) = update(ChatSession::new(), Msg::from_text("/frobnicate"));
    assert_eq!(
        effects,
        vec![
            Effect::plain(render::UNKNOWN_COMMAND),
            Effect::plain(render::HELP)
        ]
    );
}

#[test]
fn unknown_command_abandons_a_pending_conversation() {
    init_logging();
    let (session, _) = update(ChatSession::new(), Msg::Command(Command::Watch));
    assert_eq!(session.state(), ChatState::AwaitingUrl);
    let (session, _) = update(session, Msg::from_text("/frobnicate"));
    assert_eq!(session.state(), ChatState::Init);

    // Stray text afterwards is not taken as a URL.
    let (session, effects) = update(session, Msg::Text("https://a.autoscout24.de/".to_string()));
    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(effects, vec![Effect::plain(render::HELP)]);

    let mut session = session_with(&["https://a.autoscout24.de/"]);
    session.set_state(ChatState::AwaitingRemovalChoice);
    let (session, _) = update(session, Msg::from_text("/frobnicate"));
    assert_eq!(session.state(), ChatState::Init);
}

#[test]
fn help_keeps_a_pending_conversation() {
    init_logging();
    let (session, _) = update(ChatSession::new(), Msg::Command(Command::Watch));
    let (session, effects) = update(session, Msg::Command(Command::Help));
    assert_eq!(session.state(), ChatState::AwaitingUrl);
    assert_eq!(effects, vec![Effect::plain(render::HELP)]);
}

#[test]
fn remove_without_queries_stays_idle() {
    init_logging();
    let (session, effects) = update(ChatSession::new(), Msg::Command(Command::Remove));
    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(effects, vec![Effect::plain(render::NO_QUERIES_TO_REMOVE)]);
}

#[test]
fn remove_offers_one_choice_per_query() {
    init_logging();
    let mut session = session_with(&["https://a.autoscout24.de/", "https://b.autoscout24.de/"]);
    session.queries_mut()[1].current_count = 7;

    let (session, effects) = update(session, Msg::Command(Command::Remove));
    assert_eq!(session.state(), ChatState::AwaitingRemovalChoice);
    assert_eq!(
        effects,
        vec![Effect::SendChoice {
            prompt: render::REMOVAL_PROMPT.to_string(),
            choices: vec![
                Choice {
                    label: "1 : AUTOSCOUT24 (0 cars)".to_string(),
                    token: "0".to_string(),
                },
                Choice {
                    label: "2 : AUTOSCOUT24 (7 cars)".to_string(),
                    token: "1".to_string(),
                },
            ],
        }]
    );
}

#[test]
fn removing_middle_query_keeps_relative_order() {
    init_logging();
    let session = session_with(&[
        "https://a.autoscout24.de/",
        "https://b.autoscout24.de/",
        "https://c.autoscout24.de/",
    ]);
    let (session, _) = update(session, Msg::Command(Command::Remove));
    let (session, effects) = update(session, Msg::ChoiceSelected("1".to_string()));

    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(
        urls(&session),
        vec!["https://a.autoscout24.de/", "https://c.autoscout24.de/"]
    );
    assert_eq!(effects.len(), 2);
    assert_eq!(effects[0], Effect::plain(render::QUERY_REMOVED));
    match &effects[1] {
        Effect::SendText { text, options } => {
            assert_eq!(*options, TextOptions::RICH);
            assert!(text.contains("1: <b>AUTOSCOUT24</b>"));
            assert!(text.contains("2: <b>AUTOSCOUT24</b>"));
            assert!(!text.contains("b.autoscout24.de"));
        }
        other => panic!("expected list, got {other:?}"),
    }
}

#[test]
fn out_of_range_choice_is_rejected_without_removal() {
    init_logging();
    let session = session_with(&["https://a.autoscout24.de/"]);
    let (session, _) = update(session, Msg::Command(Command::Remove));
    let (session, effects) = update(session, Msg::ChoiceSelected("5".to_string()));

    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(session.queries().len(), 1);
    assert_eq!(
        effects,
        vec![Effect::Reject(ConversationError::InvalidChoice {
            token: "5".to_string()
        })]
    );
}

#[test]
fn choice_outside_removal_state_is_invalid_state() {
    init_logging();
    let session = session_with(&["https://a.autoscout24.de/"]);
    let (session, effects) = update(session, Msg::ChoiceSelected("0".to_string()));

    assert_eq!(session.queries().len(), 1);
    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(
        effects,
        vec![Effect::Reject(ConversationError::InvalidState {
            state: ChatState::Init
        })]
    );
}

#[test]
fn stray_text_during_removal_resets_to_init() {
    init_logging();
    let session = session_with(&["https://a.autoscout24.de/"]);
    let (session, _) = update(session, Msg::Command(Command::Remove));
    let (session, effects) = update(session, Msg::Text("the first one".to_string()));

    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(session.queries().len(), 1);
    assert_eq!(
        effects,
        vec![Effect::Reject(ConversationError::ExpectedChoice)]
    );
}

#[test]
fn list_renders_every_query_or_asks_to_watch() {
    init_logging();
    let (_, effects) = update(ChatSession::new(), Msg::Command(Command::List));
    assert_eq!(effects, vec![Effect::plain(render::NO_QUERIES_REGISTERED)]);

    let mut session = session_with(&["https://www.autoscout24.de/lst?a=1&b=2"]);
    session.queries_mut()[0].current_count = 3;
    session.set_state(ChatState::AwaitingUrl);
    let (session, effects) = update(session, Msg::Command(Command::List));

    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(
        effects,
        vec![Effect::rich(
            "You have registered these search queries:\n\
             1: <b>AUTOSCOUT24</b> — 3 cars found — \
             <a href=\"https://www.autoscout24.de/lst?a=1&amp;b=2\">link</a>\n"
        )]
    );
}

#[test]
fn update_without_queries_does_not_request_a_cycle() {
    init_logging();
    let (session, effects) = update(ChatSession::new(), Msg::Command(Command::Update));
    assert_eq!(session.state(), ChatState::Init);
    assert_eq!(effects, vec![Effect::plain(render::NO_QUERIES_REGISTERED)]);

    let session = session_with(&["https://a.autoscout24.de/"]);
    let (_, effects) = update(session, Msg::Command(Command::Update));
    assert_eq!(effects, vec![Effect::RunCycle]);
}
