use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use carscout_core::{ChatId, InboundEvent};
use scout_logging::{scout_debug, scout_info};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::task::TaskTracker;

use crate::ChatController;

/// Hands inbound events to one worker per chat.
///
/// Each chat's events are handled in arrival order; a slow chat never holds
/// up another one. `route` never waits on handling.
pub struct ChatRouter {
    controller: ChatController,
    queues: Mutex<HashMap<ChatId, UnboundedSender<InboundEvent>>>,
    tracker: TaskTracker,
}

impl ChatRouter {
    pub fn new(controller: ChatController) -> Self {
        Self {
            controller,
            queues: Mutex::new(HashMap::new()),
            tracker: TaskTracker::new(),
        }
    }

    /// Queues `event` on its chat's worker, starting the worker on first use.
    pub fn route(&self, event: InboundEvent) {
        let chat_id = event.chat_id;
        let mut queues = lock(&self.queues);
        let event = match queues.get(&chat_id) {
            Some(queue) => match queue.send(event) {
                Ok(()) => return,
                // Worker gone; the event comes back and a new worker takes it.
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let (queue, mut events) = mpsc::unbounded_channel();
        // Fresh receiver, cannot be closed yet.
        let _ = queue.send(event);
        queues.insert(chat_id, queue);

        let controller = self.controller.clone();
        self.tracker.spawn(async move {
            while let Some(event) = events.recv().await {
                controller.handle(event).await;
            }
            scout_debug!("Chat {}: inbound worker stopped", chat_id);
        });
    }

    /// Chats with a running worker.
    pub fn active_chats(&self) -> usize {
        lock(&self.queues).len()
    }

    /// Stops accepting events and waits until every queued event is handled.
    pub async fn shutdown(&self) {
        let queues: Vec<_> = lock(&self.queues).drain().collect();
        scout_info!("Draining {} chat queues", queues.len());
        drop(queues);
        self.tracker.close();
        self.tracker.wait().await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
