// src/ingest/providers/mod.rs
pub mod article_body;
pub mod google_news;
pub mod news_site;
pub mod transfermarkt;

use std::sync::Arc;

use crate::config::{BotTable, Settings};
use crate::ingest::engine::EngineHandle;
use crate::ingest::types::{CandidateSource, SourceError};

/// Fast adapters in declaration order: Transfermarkt table, Google News
/// search, then every configured listing site.
pub fn build_sources(
    table: &BotTable,
    settings: &Settings,
    engine: Arc<EngineHandle>,
) -> Result<Vec<Arc<dyn CandidateSource>>, SourceError> {
    let mut out: Vec<Arc<dyn CandidateSource>> = vec![
        Arc::new(transfermarkt::Transfermarkt::new(
            engine.clone(),
            settings.transfermarkt_base_url.clone(),
        )),
        Arc::new(google_news::GoogleNewsRss::new(
            engine.clone(),
            settings.google_news_base_url.clone(),
        )),
    ];
    for site in &table.sites {
        out.push(Arc::new(news_site::NewsSiteListing::new(site, engine.clone())?));
    }
    Ok(out)
}
