pub const SCHEMA: &str = r#"
-- items table: one row per canonical URL, never deleted by the pipeline
CREATE TABLE IF NOT EXISTS items (
    canonical_url TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    title_norm TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    summary_norm TEXT NOT NULL DEFAULT '',
    content_url TEXT,
    source TEXT NOT NULL,
    source_id TEXT NOT NULL,
    published_at TEXT,
    deadline_at TEXT,
    category TEXT NOT NULL DEFAULT 'other',
    score REAL NOT NULL DEFAULT 0,
    urgent INTEGER NOT NULL DEFAULT 0,
    limited_time INTEGER NOT NULL DEFAULT 0,
    tags_json TEXT,
    prep_json TEXT,
    first_seen_at TEXT NOT NULL,
    last_seen_at TEXT NOT NULL,
    notified_at TEXT,
    link_summary TEXT,
    why_read TEXT,
    summary_fetched_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_items_score ON items(score DESC);
CREATE INDEX IF NOT EXISTS idx_items_last_seen ON items(last_seen_at);
CREATE INDEX IF NOT EXISTS idx_items_notified ON items(notified_at);

-- scan_log table: one append-only row per pipeline run
CREATE TABLE IF NOT EXISTS scan_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scanned_at TEXT NOT NULL,
    raw_count INTEGER NOT NULL,
    dedup_count INTEGER NOT NULL,
    fresh_count INTEGER NOT NULL
);
"#;
