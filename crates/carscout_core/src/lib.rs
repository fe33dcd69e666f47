//! CarScout core: pure chat state machine, watch-list model and change detection.
mod detect;
mod effect;
mod error;
mod model;
mod msg;
pub mod render;
mod update;

pub use detect::{detect, Detection};
pub use effect::{Choice, Effect, TextOptions};
pub use error::{ConversationError, RegistrationError};
pub use model::{ChatId, ChatSession, ChatState, ItemId, SiteType, WatchQuery};
pub use msg::{Command, InboundEvent, Msg};
pub use update::update;
