mod common;

use std::time::Duration;

use carscout_core::render;
use carscout_core::{ChatId, InboundEvent, Msg};
use carscout_engine::{ChatController, ChatRouter};
use common::{harness, Reply};
use pretty_assertions::assert_eq;

const AS24: &str = "https://www.autoscout24.de/lst";

fn event(chat_id: ChatId, text: &str) -> InboundEvent {
    InboundEvent {
        chat_id,
        msg: Msg::from_text(text),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_registration_does_not_delay_other_chats() {
    let h = harness();
    h.fetcher.set(AS24, Reply::Hang);
    let router = ChatRouter::new(ChatController::new(h.scheduler.clone()));

    router.route(event(1, "/watch"));
    router.route(event(1, AS24));
    router.route(event(2, "/list"));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.messenger.texts_for(2), vec![render::NO_QUERIES_REGISTERED]);
    assert_eq!(h.messenger.texts_for(1), vec![render::WATCH_PROMPT]);
    assert_eq!(router.active_chats(), 2);

    // Chat 1 gets its answer once the fetch bound expires.
    tokio::time::sleep(common::FETCH_TIMEOUT).await;
    let chat_1 = h.messenger.texts_for(1);
    assert_eq!(chat_1.len(), 2);
    assert!(chat_1[1].starts_with("I could not load that page"));

    router.shutdown().await;
    h.scheduler.shutdown().await;
}

#[tokio::test]
async fn events_of_one_chat_are_handled_in_order() {
    let h = harness();
    h.fetcher.set(AS24, Reply::Page(common::autoscout_page(&["A"])));
    let router = ChatRouter::new(ChatController::new(h.scheduler.clone()));

    for text in ["/watch", AS24, "/list", "/help"] {
        router.route(event(7, text));
    }
    router.shutdown().await;

    let texts = h.messenger.texts_for(7);
    assert_eq!(texts.len(), 4);
    assert_eq!(texts[0], render::WATCH_PROMPT);
    assert_eq!(texts[1], render::registration_confirmed(1));
    assert!(texts[2].contains("1: <b>AUTOSCOUT24</b>"));
    assert_eq!(texts[3], render::HELP);
    h.scheduler.shutdown().await;
}

#[tokio::test]
async fn shutdown_handles_queued_events_and_stops_workers() {
    let h = harness();
    let router = ChatRouter::new(ChatController::new(h.scheduler.clone()));

    router.route(event(3, "/help"));
    router.route(event(4, "/update"));
    router.shutdown().await;

    assert_eq!(router.active_chats(), 0);
    assert_eq!(h.messenger.texts_for(3), vec![render::HELP]);
    assert_eq!(h.messenger.texts_for(4), vec![render::NO_QUERIES_REGISTERED]);
}
