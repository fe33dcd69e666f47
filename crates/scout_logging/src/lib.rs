#![deny(missing_docs)]
//! Shared logging utilities for the CarScout workspace.
//!
//! This crate provides the `scout_*` logging macros used by the engine and the
//! bot binary, the level policy shared by both, and a terminal initializer for
//! tests.

use log::LevelFilter;

/// Log target used by every `scout_*` macro, so the bot's own records can be
/// filtered apart from those of reqwest, hyper and friends.
pub const TARGET: &str = "carscout";

/// Logs a trace-level message under the CarScout target.
#[macro_export]
macro_rules! scout_trace {
    ($($arg:tt)*) => {{
        log::trace!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message under the CarScout target.
#[macro_export]
macro_rules! scout_debug {
    ($($arg:tt)*) => {{
        log::debug!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an info-level message under the CarScout target.
#[macro_export]
macro_rules! scout_info {
    ($($arg:tt)*) => {{
        log::info!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message under the CarScout target.
#[macro_export]
macro_rules! scout_warn {
    ($($arg:tt)*) => {{
        log::warn!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an error-level message under the CarScout target.
#[macro_export]
macro_rules! scout_error {
    ($($arg:tt)*) => {{
        log::error!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Level used by the bot: `Debug` when verbose output was requested or in
/// debug builds, `Info` otherwise.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose || cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        default_level(false),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
