use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::FeedFetcher;
use crate::models::{RawRecord, ScanStats, ScoredItem, StoredItem};
use crate::pipeline::{collapse_batch, digest, normalize_record, render_digest, Scorer};
use crate::services::{LinkSummarizer, TelegramClient};

pub struct App {
    config: Config,
    pub repository: Repository,
    fetcher: FeedFetcher,
    scorer: Scorer,
    telegram: Option<TelegramClient>,
    summarizer: LinkSummarizer,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let fetcher = FeedFetcher::new(&config.user_agent);
        let scorer = Scorer::new(&config.scoring);
        let telegram = TelegramClient::from_env(&config.user_agent);
        let summarizer = LinkSummarizer::new(&config.user_agent, config.summary_timeout_secs);

        if telegram.is_none() {
            tracing::warn!("TG_TOKEN/TG_CHAT_ID not set; digests will be printed, not sent");
        }

        Ok(Self {
            config,
            repository,
            fetcher,
            scorer,
            telegram,
            summarizer,
        })
    }

    /// Fetch all sources and merge the batch into the store.
    pub async fn run_scan(&self, now: DateTime<Utc>) -> Result<ScanStats> {
        let raw = self.fetcher.fetch_all(&self.config.sources).await;
        self.ingest_batch(raw, now).await
    }

    /// Normalize, collapse, score, and upsert one raw batch. Re-running the
    /// same batch only refreshes last_seen_at.
    pub async fn ingest_batch(
        &self,
        raw: Vec<RawRecord>,
        now: DateTime<Utc>,
    ) -> Result<ScanStats> {
        let raw_count = raw.len();
        let mut dropped = 0usize;
        let mut normalized = Vec::with_capacity(raw_count);
        for record in raw {
            match normalize_record(record) {
                Ok(item) => normalized.push(item),
                Err(AppError::MalformedRecord { feed, reason }) => {
                    dropped += 1;
                    tracing::warn!("dropping malformed record from {}: {}", feed, reason);
                }
                Err(e) => return Err(e),
            }
        }

        let collapsed = collapse_batch(normalized);
        let scored: Vec<ScoredItem> = collapsed
            .into_iter()
            .map(|item| self.scorer.score_item(item, now))
            .collect();

        let stats = self
            .repository
            .apply_scan(
                &scored,
                raw_count,
                dropped,
                self.config.selection.relevance_floor,
                now,
            )
            .await?;

        tracing::info!(
            raw = stats.raw_count,
            dropped = stats.dropped_count,
            new = stats.new_count,
            updated = stats.updated_count,
            unchanged = stats.unchanged_count,
            fresh = stats.fresh_count,
            "scan complete"
        );
        Ok(stats)
    }

    pub async fn run_daily(&self, now: DateTime<Utc>) -> Result<()> {
        self.run_scan(now).await?;

        let mut items = digest::select_daily(&self.repository, &self.config.selection, now).await?;
        if items.is_empty() {
            tracing::info!("no daily digest candidates");
            return Ok(());
        }
        self.attach_summaries(&mut items, now).await;

        let text = render_digest("Daily AI digest", &items, !self.config.plain_text);
        self.deliver(&text, &items, now).await
    }

    pub async fn run_priority(&self, now: DateTime<Utc>, force: bool) -> Result<()> {
        self.run_scan(now).await?;

        let items = digest::select_priority(
            &self.repository,
            &self.config.selection,
            &self.config.quiet_hours,
            now,
            force,
        )
        .await?;
        if items.is_empty() {
            tracing::info!("no priority alerts");
            return Ok(());
        }

        let text = render_digest("Priority alerts", &items, !self.config.plain_text);
        self.deliver(&text, &items, now).await
    }

    pub async fn print_status(&self) -> Result<()> {
        let runs = self.repository.scan_count().await?;
        match self.repository.last_scan().await? {
            Some(entry) => println!(
                "{} runs; last at {}: raw={} dedup={} fresh={}",
                runs, entry.scanned_at, entry.raw_count, entry.dedup_count, entry.fresh_count
            ),
            None => println!("no scans recorded"),
        }
        Ok(())
    }

    /// Send one digest and stamp the whole batch, or stamp nothing at all.
    /// With no Telegram credentials the digest goes to stdout and stays
    /// unstamped so a configured run can still announce it.
    async fn deliver(&self, text: &str, items: &[StoredItem], now: DateTime<Utc>) -> Result<()> {
        match &self.telegram {
            Some(telegram) => {
                telegram
                    .send_message(text, !self.config.plain_text)
                    .await?;
                let urls = items.iter().map(|i| i.canonical_url.clone()).collect();
                self.repository.mark_notified(urls, now).await?;
                tracing::info!(count = items.len(), "digest delivered");
                Ok(())
            }
            None => {
                println!("{text}");
                Ok(())
            }
        }
    }

    /// Best-effort link summaries for the selected items. Failures and
    /// timeouts only cost the summary, never the digest.
    async fn attach_summaries(&self, items: &mut [StoredItem], now: DateTime<Utc>) {
        if !self.config.summarize_links {
            return;
        }
        for item in items.iter_mut() {
            if item.link_summary.as_deref().is_some_and(|s| !s.is_empty()) {
                continue;
            }
            let url = item
                .content_url
                .clone()
                .unwrap_or_else(|| item.canonical_url.clone());
            match self.summarizer.summarize(&url).await {
                Ok(summary) => {
                    if let Err(e) = self
                        .repository
                        .save_link_summary(&item.canonical_url, &summary.summary, &summary.why_read, now)
                        .await
                    {
                        tracing::warn!("failed to cache summary for {}: {}", item.canonical_url, e);
                    }
                    item.link_summary = Some(summary.summary);
                    item.why_read = Some(summary.why_read);
                }
                Err(AppError::SummaryTimeout(url)) => {
                    tracing::warn!("summary fetch timed out for {}", url);
                }
                Err(e) => {
                    tracing::warn!("summary fetch failed for {}: {}", url, e);
                }
            }
        }
    }
}
