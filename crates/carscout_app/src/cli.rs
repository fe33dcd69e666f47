//! Command line of the bot.

use std::path::PathBuf;
use std::time::Duration;

use carscout_engine::{FetchSettings, SchedulerSettings};
use clap::{Parser, ValueEnum};

use crate::logging::LogDestination;

/// Extra time the scheduler grants a fetch beyond the HTTP request timeout.
const FETCH_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(
    name = "carscout",
    about = "Telegram bot that reports new listings on car search pages",
    version
)]
pub struct Cli {
    /// Telegram bot token
    pub token: String,

    /// Seconds between two polls of the same chat
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_seconds: u64,

    /// File holding every chat's watch list
    #[arg(long, default_value = "carscout_state.ron")]
    pub state_file: PathBuf,

    /// Where pages that could not be parsed are kept
    #[arg(long, default_value = "diagnostics")]
    pub diagnostics_dir: PathBuf,

    /// HTTP timeout for one listing page, in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub fetch_timeout: u64,

    /// Contact address sent to the listing sites in the `From` header
    #[arg(long)]
    pub contact: Option<String>,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

impl Cli {
    pub fn fetch_settings(&self) -> FetchSettings {
        let mut settings = FetchSettings {
            request_timeout: Duration::from_secs(self.fetch_timeout),
            ..FetchSettings::default()
        };
        if let Some(contact) = &self.contact {
            settings.headers.push(("From".to_string(), contact.clone()));
        }
        settings
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            interval: Duration::from_secs(self.interval_seconds),
            fetch_timeout: Duration::from_secs(self.fetch_timeout) + FETCH_GRACE,
        }
    }
}
