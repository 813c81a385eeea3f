use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Category, ScanLogEntry, ScanStats, ScoredItem, StoredItem};

use super::schema::SCHEMA;

const ITEM_COLUMNS: &str = "canonical_url, title, summary, content_url, source, source_id, \
     published_at, deadline_at, category, score, urgent, limited_time, \
     tags_json, prep_json, first_seen_at, last_seen_at, notified_at, \
     link_summary, why_read";

pub struct Repository {
    conn: Connection,
}

/// Pre-serialized item row. Built outside the connection closure so JSON
/// encoding errors surface before the transaction starts.
struct ItemRow {
    canonical_url: String,
    title: String,
    title_norm: String,
    summary: String,
    summary_norm: String,
    content_url: Option<String>,
    source: String,
    source_id: String,
    published_at: Option<String>,
    deadline_at: Option<String>,
    category: String,
    score: f64,
    urgent: bool,
    limited_time: bool,
    tags_json: String,
    prep_json: Option<String>,
}

impl ItemRow {
    fn from_scored(scored: &ScoredItem) -> Result<Self> {
        let item = &scored.item;
        Ok(Self {
            canonical_url: item.canonical_url.clone(),
            title: item.title.clone(),
            title_norm: item.title_norm.clone(),
            summary: item.summary.clone(),
            summary_norm: item.summary_norm.clone(),
            content_url: item.content_url.clone(),
            source: item.source.clone(),
            source_id: item.source_id.clone(),
            published_at: item.published_at.map(|dt| dt.to_rfc3339()),
            deadline_at: item.deadline_at.map(|dt| dt.to_rfc3339()),
            category: scored.category.as_str().to_string(),
            score: scored.score,
            urgent: scored.urgent,
            limited_time: scored.limited_time,
            tags_json: serde_json::to_string(&item.tags)?,
            prep_json: scored.prep.as_ref().map(serde_json::to_string).transpose()?,
        })
    }
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Merge one scan's batch into the store and append its scan_log row, all
    /// in a single transaction so a crash never leaves a half-applied run.
    ///
    /// Per-item classification:
    ///   - absent: insert with first_seen = last_seen = now, counted new
    ///   - present with changed title_norm/summary_norm/deadline/tags: counted
    ///     updated; otherwise counted unchanged
    ///
    /// `first_seen_at` and `notified_at` are always preserved on update.
    pub async fn apply_scan(
        &self,
        items: &[ScoredItem],
        raw_count: usize,
        dropped_count: usize,
        relevance_floor: f64,
        now: DateTime<Utc>,
    ) -> Result<ScanStats> {
        let rows = items
            .iter()
            .map(ItemRow::from_scored)
            .collect::<Result<Vec<_>>>()?;
        let now_iso = now.to_rfc3339();

        let stats = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut stats = ScanStats {
                    raw_count,
                    dropped_count,
                    ..ScanStats::default()
                };

                for row in &rows {
                    let existing = tx
                        .query_row(
                            "SELECT first_seen_at, notified_at, title_norm, summary_norm, deadline_at, tags_json
                             FROM items WHERE canonical_url = ?1",
                            params![row.canonical_url],
                            |r| {
                                Ok((
                                    r.get::<_, String>(0)?,
                                    r.get::<_, Option<String>>(1)?,
                                    r.get::<_, String>(2)?,
                                    r.get::<_, String>(3)?,
                                    r.get::<_, Option<String>>(4)?,
                                    r.get::<_, Option<String>>(5)?,
                                ))
                            },
                        )
                        .optional()?;

                    let (first_seen, notified_at, fresh_eligible) = match &existing {
                        None => {
                            stats.new_count += 1;
                            (now_iso.clone(), None, true)
                        }
                        Some((first_seen, notified, title_norm, summary_norm, deadline, tags)) => {
                            let changed = *title_norm != row.title_norm
                                || *summary_norm != row.summary_norm
                                || *deadline != row.deadline_at
                                || tags.as_deref() != Some(row.tags_json.as_str());
                            if changed {
                                stats.updated_count += 1;
                            } else {
                                stats.unchanged_count += 1;
                            }
                            (first_seen.clone(), notified.clone(), changed)
                        }
                    };

                    if fresh_eligible && row.score >= relevance_floor {
                        stats.fresh_count += 1;
                    }

                    tx.execute(
                        r#"INSERT INTO items (
                               canonical_url, title, title_norm, summary, summary_norm,
                               content_url, source, source_id, published_at, deadline_at,
                               category, score, urgent, limited_time, tags_json, prep_json,
                               first_seen_at, last_seen_at, notified_at
                           ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)
                           ON CONFLICT(canonical_url) DO UPDATE SET
                               title = excluded.title,
                               title_norm = excluded.title_norm,
                               summary = excluded.summary,
                               summary_norm = excluded.summary_norm,
                               content_url = excluded.content_url,
                               source = excluded.source,
                               source_id = excluded.source_id,
                               published_at = excluded.published_at,
                               deadline_at = excluded.deadline_at,
                               category = excluded.category,
                               score = excluded.score,
                               urgent = excluded.urgent,
                               limited_time = excluded.limited_time,
                               tags_json = excluded.tags_json,
                               prep_json = excluded.prep_json,
                               last_seen_at = excluded.last_seen_at,
                               first_seen_at = excluded.first_seen_at,
                               notified_at = excluded.notified_at"#,
                        params![
                            row.canonical_url,
                            row.title,
                            row.title_norm,
                            row.summary,
                            row.summary_norm,
                            row.content_url,
                            row.source,
                            row.source_id,
                            row.published_at,
                            row.deadline_at,
                            row.category,
                            row.score,
                            row.urgent,
                            row.limited_time,
                            row.tags_json,
                            row.prep_json,
                            first_seen,
                            now_iso,
                            notified_at,
                        ],
                    )?;
                }

                tx.execute(
                    "INSERT INTO scan_log (scanned_at, raw_count, dedup_count, fresh_count)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        now_iso,
                        stats.raw_count as i64,
                        stats.dedup_count() as i64,
                        stats.fresh_count as i64,
                    ],
                )?;

                tx.commit()?;
                Ok(stats)
            })
            .await?;

        Ok(stats)
    }

    /// Daily digest candidates: seen within the lookback window and above the
    /// relevance floor, best first. Independent of notified_at by design.
    pub async fn select_daily(
        &self,
        since: DateTime<Utc>,
        relevance_floor: f64,
        limit: usize,
    ) -> Result<Vec<StoredItem>> {
        let since_iso = since.to_rfc3339();
        let items = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items
                     WHERE last_seen_at >= ?1 AND score >= ?2
                     ORDER BY score DESC, published_at DESC NULLS LAST
                     LIMIT ?3"
                ))?;
                let items = stmt
                    .query_map(params![since_iso, relevance_floor, limit as i64], |row| {
                        Ok(item_from_row(row))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    /// Priority alert candidates: urgent and never announced.
    pub async fn select_priority(&self, limit: usize) -> Result<Vec<StoredItem>> {
        let items = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items
                     WHERE notified_at IS NULL AND urgent = 1
                     ORDER BY score DESC, published_at DESC NULLS LAST
                     LIMIT ?1"
                ))?;
                let items = stmt
                    .query_map(params![limit as i64], |row| Ok(item_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    /// Stamp a delivered batch. Called only after the delivery collaborator
    /// confirmed success; never called on a partial failure.
    pub async fn mark_notified(
        &self,
        canonical_urls: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let now_iso = now.to_rfc3339();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for url in &canonical_urls {
                    tx.execute(
                        "UPDATE items SET notified_at = ?1 WHERE canonical_url = ?2",
                        params![now_iso, url],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_item(&self, canonical_url: &str) -> Result<Option<StoredItem>> {
        let url = canonical_url.to_string();
        let item = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items WHERE canonical_url = ?1"
                ))?;
                let item = stmt
                    .query_row(params![url], |row| Ok(item_from_row(row)))
                    .optional()?;
                Ok(item)
            })
            .await?;
        Ok(item)
    }

    pub async fn save_link_summary(
        &self,
        canonical_url: &str,
        summary: &str,
        why_read: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let url = canonical_url.to_string();
        let summary = summary.to_string();
        let why_read = why_read.to_string();
        let now_iso = now.to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE items SET link_summary = ?1, why_read = ?2, summary_fetched_at = ?3
                     WHERE canonical_url = ?4",
                    params![summary, why_read, now_iso, url],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn last_scan(&self) -> Result<Option<ScanLogEntry>> {
        let entry = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, scanned_at, raw_count, dedup_count, fresh_count
                     FROM scan_log ORDER BY id DESC LIMIT 1",
                )?;
                let entry = stmt
                    .query_row([], |row| {
                        Ok(ScanLogEntry {
                            id: row.get(0)?,
                            scanned_at: row
                                .get::<_, String>(1)
                                .ok()
                                .and_then(|s| parse_datetime(&s))
                                .unwrap_or_else(Utc::now),
                            raw_count: row.get(2)?,
                            dedup_count: row.get(3)?,
                            fresh_count: row.get(4)?,
                        })
                    })
                    .optional()?;
                Ok(entry)
            })
            .await?;
        Ok(entry)
    }

    pub async fn scan_count(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM scan_log", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn item_from_row(row: &Row) -> StoredItem {
    let tags: Vec<String> = row
        .get::<_, Option<String>>(12)
        .unwrap()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();
    let prep: Option<Vec<String>> = row
        .get::<_, Option<String>>(13)
        .unwrap()
        .and_then(|s| serde_json::from_str(&s).ok());

    StoredItem {
        canonical_url: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        summary: row.get(2).unwrap(),
        content_url: row.get(3).unwrap(),
        source: row.get(4).unwrap(),
        source_id: row.get(5).unwrap(),
        published_at: row
            .get::<_, Option<String>>(6)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        deadline_at: row
            .get::<_, Option<String>>(7)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        category: Category::from_str_or_other(&row.get::<_, String>(8).unwrap()),
        score: row.get(9).unwrap(),
        urgent: row.get::<_, i64>(10).unwrap() != 0,
        limited_time: row.get::<_, i64>(11).unwrap() != 0,
        tags,
        prep,
        first_seen_at: row
            .get::<_, String>(14)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        last_seen_at: row
            .get::<_, String>(15)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        notified_at: row
            .get::<_, Option<String>>(16)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        link_summary: row.get(17).unwrap(),
        why_read: row.get(18).unwrap(),
    }
}
