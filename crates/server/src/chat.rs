//! Chat command dispatch.
//!
//! Incoming message text such as `!sonarr search wire` is turned into a list
//! of outbound messages. Each search chunk becomes one message; delivering
//! them is the chat transport's job.

use std::sync::Arc;

use tracing::{debug, warn};

use arrmate_core::{CatalogSync, SeriesSearch, SyncOutcome};

const SONARR_PREFIX: &str = "!sonarr";

const HELP: &str = "\
!sonarr search <title>  search the local Sonarr mirror
!sonarr sync            refresh the mirror now
!sonarr help            show this message";

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    SonarrSearch(String),
    SonarrSync,
    SonarrHelp,
}

/// Parse a message. Messages not addressed to the bot yield `None`.
pub fn parse_command(text: &str) -> Option<ChatCommand> {
    let rest = text.trim().strip_prefix(SONARR_PREFIX)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let rest = rest.trim_start();
    let (verb, args) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));

    Some(match verb {
        "search" => ChatCommand::SonarrSearch(args.trim().to_string()),
        "sync" => ChatCommand::SonarrSync,
        _ => ChatCommand::SonarrHelp,
    })
}

/// Executes chat commands against the mirror and the synchronizer.
#[derive(Clone)]
pub struct ChatResponder {
    search: SeriesSearch,
    sync: Arc<CatalogSync>,
}

impl ChatResponder {
    pub fn new(search: SeriesSearch, sync: Arc<CatalogSync>) -> Self {
        Self { search, sync }
    }

    /// Outbound messages for `text`, or `None` when it is not a command.
    ///
    /// Failures come back as a short message rather than an error.
    pub async fn respond(&self, text: &str) -> Option<Vec<String>> {
        let command = parse_command(text)?;
        debug!(?command, "Handling chat command");

        let messages = match command {
            ChatCommand::SonarrHelp => vec![HELP.to_string()],
            ChatCommand::SonarrSearch(term) => {
                let search = self.search.clone();
                match tokio::task::spawn_blocking(move || search.collect(&term)).await {
                    Ok(Ok(chunks)) => chunks,
                    Ok(Err(e)) => {
                        warn!("Chat search failed: {}", e);
                        vec![format!("search failed: {}", e)]
                    }
                    Err(e) => {
                        warn!("Chat search task failed: {}", e);
                        vec!["search failed".to_string()]
                    }
                }
            }
            ChatCommand::SonarrSync => match self.sync.run_once().await {
                Ok(SyncOutcome::Replaced(count)) => {
                    vec![format!("sonarr sync finished: {} series", count)]
                }
                Ok(SyncOutcome::Skipped) => vec!["sonarr sync already running".to_string()],
                Err(e) => vec![format!("sonarr sync failed: {}", e)],
            },
        };
        Some(messages)
    }
}
