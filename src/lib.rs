// src/lib.rs
// Library surface shared by the binary and the integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod clock;
pub mod commands;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod rank;
pub mod registry;
pub mod relevance;
pub mod service;

use std::sync::Arc;

pub use crate::api::{router, AppState};
pub use crate::config::{BotTable, Settings};
pub use crate::service::InjuryService;

/// Production state from a loaded table and settings.
pub fn build_state(table: &BotTable, settings: &Settings) -> anyhow::Result<AppState> {
    let service = Arc::new(InjuryService::from_config(table, settings)?);
    Ok(AppState::new(service, settings.command_prefix.clone()))
}
