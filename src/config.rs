use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::models::SourceTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Fetch and attach a page summary to digest bullets.
    #[serde(default)]
    pub summarize_links: bool,

    /// Send digests without Markdown formatting.
    #[serde(default)]
    pub plain_text: bool,

    #[serde(default = "default_summary_timeout")]
    pub summary_timeout_secs: u64,

    #[serde(default = "default_quiet")]
    pub quiet_hours: QuietHours,

    #[serde(default = "default_selection")]
    pub selection: SelectionConfig,

    #[serde(default = "default_scoring")]
    pub scoring: ScoringConfig,

    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

/// Local-time window during which priority alerts are suppressed. Hours are
/// in the configured offset from UTC, and the window may wrap midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHours {
    pub start_hour: u32,
    pub end_hour: u32,
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Minimum score for digest eligibility and fresh-count accounting.
    pub relevance_floor: f64,
    pub daily_max_bullets: usize,
    pub priority_max_bullets: usize,
    pub daily_lookback_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tier: SourceTier,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Weighted keyword tables. Weights are data so they can be tuned (and
/// tested) without touching the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub company_release: Vec<KeywordWeight>,
    pub dev_tool: Vec<KeywordWeight>,
    pub research_paper: Vec<KeywordWeight>,
    pub urgency_keywords: Vec<String>,
    pub limited_time_keywords: Vec<String>,

    pub tier_base_top: f64,
    pub tier_base_standard: f64,
    pub tier_base_aggregator: f64,

    /// Score at or above which a top-tier item becomes an urgent alert.
    pub urgent_threshold: f64,
    /// Deadlines at most this many days out set limited_time.
    pub limited_time_lookahead_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub keyword: String,
    pub weight: f64,
}

fn kw(keyword: &str, weight: f64) -> KeywordWeight {
    KeywordWeight {
        keyword: keyword.to_string(),
        weight,
    }
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("news-radar");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("news_radar.db").to_string_lossy().to_string()
}

fn default_user_agent() -> String {
    "news-radar/0.3".to_string()
}

fn default_summary_timeout() -> u64 {
    10
}

fn default_quiet() -> QuietHours {
    // 22:00-07:00 NPT (UTC+05:45).
    QuietHours {
        start_hour: 22,
        end_hour: 7,
        utc_offset_minutes: 345,
    }
}

fn default_selection() -> SelectionConfig {
    SelectionConfig {
        relevance_floor: 2.0,
        daily_max_bullets: 7,
        priority_max_bullets: 3,
        daily_lookback_hours: 24,
    }
}

fn default_scoring() -> ScoringConfig {
    ScoringConfig {
        company_release: vec![
            kw("introducing", 2.0),
            kw("announcing", 2.0),
            kw("launch", 2.0),
            kw("launches", 2.0),
            kw("release", 1.5),
            kw("general availability", 2.0),
            kw("ga", 1.0),
            kw("preview", 1.0),
            kw("model", 1.0),
            kw("api", 1.0),
        ],
        dev_tool: vec![
            kw("sdk", 2.0),
            kw("library", 1.5),
            kw("tool", 1.0),
            kw("agent", 1.5),
            kw("workflow", 1.0),
            kw("rag", 1.5),
            kw("cli", 1.0),
            kw("framework", 1.0),
            kw("release notes", 1.5),
            kw("changelog", 1.5),
        ],
        research_paper: vec![
            kw("sota", 2.0),
            kw("state of the art", 2.0),
            kw("benchmark", 1.5),
            kw("code available", 2.0),
            kw("paper", 1.0),
            kw("dataset", 1.0),
            kw("arxiv", 1.0),
        ],
        urgency_keywords: vec![
            "deadline".to_string(),
            "last chance".to_string(),
            "closing soon".to_string(),
            "applications close".to_string(),
            "ends today".to_string(),
        ],
        limited_time_keywords: vec![
            "limited time".to_string(),
            "early bird".to_string(),
            "voucher".to_string(),
            "scholarship".to_string(),
            "register by".to_string(),
            "apply by".to_string(),
        ],
        tier_base_top: 3.0,
        tier_base_standard: 1.0,
        tier_base_aggregator: 0.5,
        urgent_threshold: 6.0,
        limited_time_lookahead_days: 14,
    }
}

fn default_sources() -> Vec<SourceConfig> {
    let top = |name: &str, url: &str| SourceConfig {
        name: name.to_string(),
        url: url.to_string(),
        tier: SourceTier::Top,
        tags: vec![],
    };
    let standard = |name: &str, url: &str| SourceConfig {
        name: name.to_string(),
        url: url.to_string(),
        tier: SourceTier::Standard,
        tags: vec![],
    };
    vec![
        top("Google AI Blog", "https://blog.google/technology/ai/rss/"),
        top("DeepMind", "https://deepmind.google/blog/feed/"),
        top("OpenAI News", "https://openai.com/news/rss.xml"),
        top("Microsoft Research", "https://www.microsoft.com/en-us/research/feed/"),
        top("Meta Engineering", "https://engineering.fb.com/feed"),
        top("Anthropic News", "https://www.anthropic.com/news/rss.xml"),
        standard("Hugging Face Blog", "https://huggingface.co/blog/feed.xml"),
        standard("LangChain", "https://blog.langchain.dev/rss/"),
        standard(
            "Transformers Releases",
            "https://github.com/huggingface/transformers/releases.atom",
        ),
        standard(
            "vLLM Releases",
            "https://github.com/vllm-project/vllm/releases.atom",
        ),
        standard(
            "Ollama Releases",
            "https://github.com/ollama/ollama/releases.atom",
        ),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            summarize_links: false,
            plain_text: false,
            summary_timeout_secs: default_summary_timeout(),
            quiet_hours: default_quiet(),
            selection: default_selection(),
            scoring: default_scoring(),
            sources: default_sources(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config: Config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment beats the config file for operational knobs, so a
    /// scheduled runner can flip them without editing the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NEWS_RADAR_DB") {
            self.db_path = v;
        }
        if let Ok(v) = std::env::var("NEWS_RADAR_USER_AGENT") {
            self.user_agent = v;
        }
        if let Some(v) = env_bool("NEWS_RADAR_SUMMARIZE_LINKS") {
            self.summarize_links = v;
        }
        if let Some(v) = env_bool("NEWS_RADAR_PLAIN_TEXT") {
            self.plain_text = v;
        }
        if let Ok(v) = std::env::var("NEWS_RADAR_RELEVANCE_FLOOR") {
            if let Ok(f) = v.parse() {
                self.selection.relevance_floor = f;
            }
        }
        if let Ok(v) = std::env::var("NEWS_RADAR_MAX_BULLETS") {
            if let Ok(n) = v.parse() {
                self.selection.daily_max_bullets = n;
            }
        }
        // "22-7" style window in local hours.
        if let Ok(v) = std::env::var("NEWS_RADAR_QUIET_HOURS") {
            if let Some((start, end)) = v.split_once('-') {
                if let (Ok(s), Ok(e)) = (start.trim().parse(), end.trim().parse()) {
                    self.quiet_hours.start_hour = s;
                    self.quiet_hours.end_hour = e;
                }
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("news-radar")
            .join("config.toml")
    }
}

fn env_bool(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.trim() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
