//! Chat-facing text. Rich messages use Telegram's HTML subset.
use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::{ChatSession, Choice, ConversationError, Effect, ItemId, RegistrationError, WatchQuery};

pub const HELP: &str = "I'm your CarScout Bot!\n\
Commands:\n \
- /watch: Register a new search query\n \
- /remove: Remove an existing search query\n \
- /list: List registered queries\n \
- /update: Check all queries right now\n";

pub const WATCH_PROMPT: &str = "Please specify a search URL to watch!";
pub const UNKNOWN_COMMAND: &str = "Sorry, I didn't understand that command.";
pub const NO_QUERIES_TO_REMOVE: &str = "No queries to remove.";
pub const REMOVAL_PROMPT: &str = "Choose the query to remove:";
pub const QUERY_REMOVED: &str = "Search query removed.";
pub const NO_QUERIES_REGISTERED: &str =
    "No queries registered. Use /watch to register a new query.";
pub const NO_UPDATES: &str = "No updates, all listings were already known.";

/// One line per query: position, site, item count and a link to the search.
pub fn query_list(session: &ChatSession) -> Effect {
    if session.is_empty() {
        return Effect::plain(NO_QUERIES_REGISTERED);
    }
    let mut text = String::from("You have registered these search queries:\n");
    for (index, query) in session.queries().iter().enumerate() {
        let _ = writeln!(
            text,
            "{}: <b>{}</b> — {} cars found — <a href=\"{}\">link</a>",
            index + 1,
            query.site_type,
            query.current_count,
            escape_html(&query.source_url)
        );
    }
    Effect::rich(text)
}

/// Buttons for the removal menu. Tokens are 0-based positions.
pub fn removal_choices(session: &ChatSession) -> Vec<Choice> {
    session
        .queries()
        .iter()
        .enumerate()
        .map(|(index, query)| Choice {
            label: format!(
                "{:<2}: {} ({} cars)",
                index + 1,
                query.site_type,
                query.current_count
            ),
            token: index.to_string(),
        })
        .collect()
}

pub fn registration_confirmed(item_count: usize) -> String {
    format!(
        "Successfully registered. You will get notified when new cars are available! \
         Currently, your query shows {item_count} vehicles. Checking for updates..."
    )
}

pub fn registration_rejected(err: &RegistrationError) -> String {
    match err {
        RegistrationError::DuplicateUrl { .. } => {
            "Url already exists. Going back to idle!".to_string()
        }
        RegistrationError::UnsupportedSite { .. } => {
            "Sorry, I can only watch mobile.de and AutoScout24 search pages. Going back to idle!"
                .to_string()
        }
        RegistrationError::Fetch { .. } => {
            "I could not load that page right now. Please try /watch again later.".to_string()
        }
    }
}

/// User-facing explanation of a rejected input, followed by the help text.
pub fn rejection(err: &ConversationError) -> String {
    let reason = match err {
        ConversationError::InvalidState { .. } => "That menu has expired.",
        ConversationError::InvalidChoice { .. } => "That query does not exist anymore.",
        ConversationError::ExpectedChoice => "Please pick one of the buttons to remove a query.",
    };
    format!("{reason} Going back to idle!\n\n{HELP}")
}

/// Announces the new listings of the query at `index`.
///
/// Items are enumerated in identifier order; `link_for` supplies the URL of
/// each item.
pub fn new_items_notification(
    index: usize,
    query: &WatchQuery,
    new_items: &BTreeSet<ItemId>,
    link_for: impl Fn(&ItemId) -> String,
) -> String {
    let noun = if new_items.len() == 1 { "car" } else { "cars" };
    let mut text = format!(
        "<b>{}</b> query {} has {} new {noun}:\n",
        query.site_type,
        index + 1,
        new_items.len()
    );
    for item in new_items {
        let _ = writeln!(
            text,
            " • <a href=\"{}\">{}</a>",
            escape_html(&link_for(item)),
            escape_html(item)
        );
    }
    let _ = write!(
        text,
        "Open the <a href=\"{}\">search</a>.",
        escape_html(&query.source_url)
    );
    text
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
