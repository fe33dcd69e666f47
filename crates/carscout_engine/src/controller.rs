use carscout_core::render;
use carscout_core::{update, ChatId, ChatSession, Effect, InboundEvent, TextOptions};
use scout_logging::{scout_debug, scout_info, scout_warn};

use crate::Scheduler;

/// Runs the chat state machine for inbound events and carries out its effects.
///
/// The chat's session lock is held from `update` until the session is saved,
/// so a poll tick for the same chat can never interleave with a command.
#[derive(Clone)]
pub struct ChatController {
    scheduler: Scheduler,
}

impl ChatController {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub async fn handle(&self, event: InboundEvent) {
        let InboundEvent { chat_id, msg } = event;
        scout_debug!("Chat {}: {:?}", chat_id, msg);

        let handle = self.scheduler.session(chat_id);
        let mut session = handle.lock().await;
        let (next, effects) = update(std::mem::take(&mut *session), msg);
        *session = next;

        for effect in effects {
            self.apply(chat_id, &mut session, effect).await;
        }

        if session.is_empty() && self.scheduler.has_job(chat_id) {
            self.scheduler.cancel_job(chat_id);
        }
        self.scheduler.persist(chat_id, &session).await;
    }

    async fn apply(&self, chat_id: ChatId, session: &mut ChatSession, effect: Effect) {
        match effect {
            Effect::SendText { text, options } => {
                self.scheduler.notify(chat_id, &text, options).await;
            }
            Effect::SendChoice { prompt, choices } => {
                if let Err(err) = self
                    .scheduler
                    .messenger()
                    .send_choice(chat_id, &prompt, &choices)
                    .await
                {
                    scout_warn!("Chat {}: failed to send choices: {}", chat_id, err);
                }
            }
            Effect::RegisterQuery { url } => {
                let reply = match self.scheduler.register_query(chat_id, session, &url).await {
                    Ok(registered) => render::registration_confirmed(registered.item_count),
                    Err(err) => {
                        scout_info!("Chat {}: registration rejected: {}", chat_id, err);
                        render::registration_rejected(&err)
                    }
                };
                self.scheduler
                    .notify(chat_id, &reply, TextOptions::PLAIN)
                    .await;
            }
            Effect::RunCycle => {
                if !self.scheduler.run_cycle(chat_id, session).await {
                    self.scheduler
                        .notify(chat_id, render::NO_UPDATES, TextOptions::PLAIN)
                        .await;
                }
            }
            Effect::Reject(err) => {
                scout_warn!("Chat {}: {}; resetting to idle", chat_id, err);
                self.scheduler
                    .notify(chat_id, &render::rejection(&err), TextOptions::PLAIN)
                    .await;
            }
        }
    }
}
