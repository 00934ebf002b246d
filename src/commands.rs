//! # Command surface
//! Free text in, reply text out. Input is case-folded and trimmed, then maps
//! to help, the club list, a cache refresh, or a club alias.
//!
//! Group chats only react to messages that start with the command prefix;
//! anything else gets no reply at all. Direct chats accept both forms.

use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregate::{RankedResult, ResultKind};
use crate::registry::{Club, Registry};
use crate::service::InjuryService;

const HELP_ALIASES: &[&str] = &["help", "pomoc", "pomoć", "?"];
const LIST_ALIASES: &[&str] = &["list-clubs", "clubs", "klubovi"];
const REFRESH_ALIASES: &[&str] = &["refresh", "osvjezi", "osvježi"];

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y. %H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    ListClubs,
    Refresh,
    /// Anything else is treated as a club alias (already folded).
    Club(String),
}

impl Command {
    /// Parses folded text. Empty input means help.
    pub fn parse(text: &str) -> Command {
        let folded = fold(text);
        let word = folded.as_str();
        if word.is_empty() || HELP_ALIASES.contains(&word) {
            Command::Help
        } else if LIST_ALIASES.contains(&word) {
            Command::ListClubs
        } else if REFRESH_ALIASES.contains(&word) {
            Command::Refresh
        } else {
            Command::Club(folded)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Direct,
    Group,
}

impl ChatKind {
    pub fn from_group_flag(group: bool) -> Self {
        if group {
            ChatKind::Group
        } else {
            ChatKind::Direct
        }
    }
}

fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub struct Dispatcher {
    service: Arc<InjuryService>,
    prefix: String,
}

impl Dispatcher {
    pub fn new(service: Arc<InjuryService>, prefix: impl Into<String>) -> Self {
        Self {
            service,
            prefix: fold(&prefix.into()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The command text with the prefix removed, or `None` when a group
    /// message does not carry the prefix.
    pub fn command_text(&self, input: &str, kind: ChatKind) -> Option<String> {
        let folded = fold(input);
        let rest = if self.prefix.is_empty() {
            Some(folded.as_str())
        } else {
            folded
                .strip_prefix(self.prefix.as_str())
                .filter(|rest| rest.is_empty() || rest.starts_with(' '))
        };
        match (rest, kind) {
            (Some(rest), _) => Some(rest.trim().to_string()),
            (None, ChatKind::Direct) => Some(folded),
            (None, ChatKind::Group) => None,
        }
    }

    /// Reply for one inbound message; `None` means stay silent.
    pub async fn handle(&self, input: &str, kind: ChatKind) -> Option<String> {
        let Some(text) = self.command_text(input, kind) else {
            debug!("group message without prefix ignored");
            return None;
        };
        let command = Command::parse(&text);
        info!(?command, ?kind, "command received");

        let reply = match command {
            Command::Help => help_text(&self.prefix),
            Command::ListClubs => club_list(self.service.registry()),
            Command::Refresh => {
                self.service.refresh();
                "🔄 Cache cleared. The next query fetches fresh news.".to_string()
            }
            Command::Club(alias) => self.club_reply(&alias).await,
        };
        Some(reply)
    }

    async fn club_reply(&self, alias: &str) -> String {
        let registry = self.service.registry();
        let Some(club) = registry.resolve(alias) else {
            return not_found(registry, alias, &self.prefix);
        };
        let (result, status) = self.service.lookup(&club).await;
        debug!(club = %club.id, cache = status.as_str(), "club query served");
        format_result(&club, &result)
    }
}

pub fn help_text(prefix: &str) -> String {
    let p = if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix} ")
    };
    format!(
        "⚽ HNL injury news\n\
         \n\
         {p}<club>      injury and absence news for a club (e.g. {p}hajduk)\n\
         {p}list-clubs  all supported clubs\n\
         {p}refresh     drop cached results\n\
         {p}help        this message"
    )
}

pub fn club_list(registry: &Registry) -> String {
    let mut out = String::from("📋 Supported clubs:\n");
    for club in registry.list_canonical() {
        out.push_str(&format!("• {}\n", club.display_name));
    }
    out.trim_end().to_string()
}

fn not_found(registry: &Registry, alias: &str, prefix: &str) -> String {
    let list_cmd = format!("{prefix} list-clubs").trim().to_string();
    match registry.suggest(alias) {
        Some((suggestion, _)) => format!(
            "❌ Club \"{alias}\" not found. Did you mean \"{suggestion}\"? Send \"{list_cmd}\" for the full list."
        ),
        None => format!("❌ Club \"{alias}\" not found. Send \"{list_cmd}\" for the full list."),
    }
}

/// Numbered list with a trailing count and timestamp.
pub fn format_result(club: &Club, result: &RankedResult) -> String {
    if result.is_empty() {
        return format!("ℹ️ No injury news found for {} right now.", club.display_name);
    }

    let mut out = format!("🏥 {} – injury news\n", club.display_name);
    if result.kind == ResultKind::Latest {
        out.push_str("⚠️ Nothing confirmed yet; showing the latest items from the sources.\n");
    }
    out.push('\n');
    for (i, c) in result.items.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} – {}\n{}\n\n",
            i + 1,
            c.source_label,
            c.title,
            c.link
        ));
    }
    out.push_str(&format!(
        "Total: {} · {} UTC",
        result.len(),
        result.generated_at.format(TIMESTAMP_FORMAT)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Candidate;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parse_aliases_and_fallthrough() {
        assert_eq!(Command::parse("  HELP "), Command::Help);
        assert_eq!(Command::parse("pomoć"), Command::Help);
        assert_eq!(Command::parse(""), Command::Help);
        assert_eq!(Command::parse("Klubovi"), Command::ListClubs);
        assert_eq!(Command::parse("osvježi"), Command::Refresh);
        assert_eq!(
            Command::parse("  Istra   1961 "),
            Command::Club("istra 1961".into())
        );
    }

    #[test]
    fn formats_numbered_list_with_count_and_time() {
        let club = Club::new("istra", "NK Istra 1961", ["istra"], None).unwrap();
        let result = RankedResult {
            items: vec![
                Candidate::new("Istra: ozljeda", "https://x/1", "Index.hr"),
                Candidate::new("Istra bez stopera", "https://x/2", "24sata"),
            ],
            kind: ResultKind::Confirmed,
            generated_at: Utc.with_ymd_and_hms(2025, 10, 14, 9, 5, 0).unwrap(),
        };
        let text = format_result(&club, &result);
        assert!(text.starts_with("🏥 NK Istra 1961"));
        assert!(text.contains("1. Index.hr – Istra: ozljeda\nhttps://x/1"));
        assert!(text.contains("2. 24sata – Istra bez stopera\nhttps://x/2"));
        assert!(text.ends_with("Total: 2 · 14.10.2025. 09:05 UTC"));
        assert!(!text.contains("Nothing confirmed"));
    }

    #[test]
    fn latest_results_are_marked() {
        let club = Club::new("istra", "NK Istra 1961", ["istra"], None).unwrap();
        let result = RankedResult {
            items: vec![Candidate::new("Istra slavi", "https://x/3", "Index.hr")],
            kind: ResultKind::Latest,
            generated_at: Utc.with_ymd_and_hms(2025, 10, 14, 9, 5, 0).unwrap(),
        };
        assert!(format_result(&club, &result).contains("Nothing confirmed"));
    }

    #[test]
    fn empty_result_is_nothing_found() {
        let club = Club::new("istra", "NK Istra 1961", ["istra"], None).unwrap();
        let empty = RankedResult::empty(Utc::now());
        assert_eq!(
            format_result(&club, &empty),
            "ℹ️ No injury news found for NK Istra 1961 right now."
        );
    }

    #[test]
    fn help_mentions_prefixed_commands() {
        let h = help_text("!hnl");
        assert!(h.contains("!hnl list-clubs"));
        assert!(h.contains("!hnl refresh"));
        assert!(help_text("").contains("\nlist-clubs"));
    }
}
