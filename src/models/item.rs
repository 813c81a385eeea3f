use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trust tier of the feed a record came from. Top-tier company blogs get a
/// higher base score and are the only sources eligible for urgent alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Top,
    #[default]
    Standard,
    Aggregator,
}

/// Category assigned by the scorer from keyword tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    CompanyRelease,
    DevTool,
    ResearchPaper,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CompanyRelease => "company-release",
            Category::DevTool => "dev-tool",
            Category::ResearchPaper => "research-paper",
            Category::Other => "other",
        }
    }

    pub fn from_str_or_other(s: &str) -> Self {
        match s {
            "company-release" => Category::CompanyRelease,
            "dev-tool" => Category::DevTool,
            "research-paper" => Category::ResearchPaper,
            _ => Category::Other,
        }
    }
}

/// Item as produced by a feed connector, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub source_id: String,
    pub published_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// Preparation notes carried through untouched.
    pub prep: Option<Vec<String>>,
    pub tier: SourceTier,
}

/// Item after URL canonicalization and text normalization.
#[derive(Debug, Clone)]
pub struct NormalizedItem {
    pub canonical_url: String,
    pub title: String,
    pub title_norm: String,
    pub summary: String,
    pub summary_norm: String,
    pub content_url: Option<String>,
    pub source: String,
    pub source_id: String,
    pub published_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub prep: Option<Vec<String>>,
    pub tier: SourceTier,
}

/// Normalized item plus the scorer's verdict; the unit the store upserts.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: NormalizedItem,
    pub category: Category,
    pub score: f64,
    pub urgent: bool,
    pub limited_time: bool,
    pub prep: Option<Vec<String>>,
}

/// Full persisted row from the items table.
#[derive(Debug, Clone)]
pub struct StoredItem {
    pub canonical_url: String,
    pub title: String,
    pub summary: String,
    pub content_url: Option<String>,
    pub source: String,
    pub source_id: String,
    pub published_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub category: Category,
    pub score: f64,
    pub urgent: bool,
    pub limited_time: bool,
    pub tags: Vec<String>,
    pub prep: Option<Vec<String>>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    pub link_summary: Option<String>,
    pub why_read: Option<String>,
}
