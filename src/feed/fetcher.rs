use std::time::Duration;

use feed_rs::parser;
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::config::SourceConfig;
use crate::error::Result;
use crate::models::RawRecord;

/// Newest entries considered per feed; older ones are the store's problem.
const ENTRIES_PER_FEED: usize = 15;

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    pub async fn fetch_source(&self, source: &SourceConfig) -> Result<Vec<RawRecord>> {
        let response = self.client.get(&source.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        let feed = parser::parse(&bytes[..])?;

        let records: Vec<RawRecord> = feed
            .entries
            .into_iter()
            .take(ENTRIES_PER_FEED)
            .map(|entry| {
                let summary_html = entry
                    .summary
                    .as_ref()
                    .map(|s| s.content.clone())
                    .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()));
                let summary = summary_html
                    .and_then(|html| html2text::from_read(html.as_bytes(), 80).ok())
                    .unwrap_or_default();

                RawRecord {
                    url: entry
                        .links
                        .first()
                        .map(|l| l.href.clone())
                        .unwrap_or_default(),
                    title: entry.title.map(|t| t.content).unwrap_or_default(),
                    summary,
                    source: source.name.clone(),
                    source_id: entry.id,
                    published_at: entry.published.or(entry.updated),
                    deadline_at: None,
                    tags: source.tags.clone(),
                    prep: None,
                    tier: source.tier,
                }
            })
            .collect();

        Ok(records)
    }

    /// Fetch all sources concurrently with bounded fan-out. A failing source
    /// is logged and skipped; it never aborts the others. Ordering of the
    /// combined batch is left to the dedup step's stable sort.
    pub async fn fetch_all(&self, sources: &[SourceConfig]) -> Vec<RawRecord> {
        let results: Vec<Vec<RawRecord>> = stream::iter(sources)
            .map(|source| async move {
                match self.fetch_source(source).await {
                    Ok(records) => {
                        tracing::debug!("Fetched {} entries from {}", records.len(), source.name);
                        records
                    }
                    Err(e) => {
                        tracing::warn!("Failed to fetch {}: {}", source.name, e);
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(5) // Max 5 concurrent fetches
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }
}
