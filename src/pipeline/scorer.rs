use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::ScoringConfig;
use crate::models::{Category, NormalizedItem, ScoredItem, SourceTier};

const URGENCY_KEYWORD_WEIGHT: f64 = 1.0;
const LIMITED_KEYWORD_WEIGHT: f64 = 0.5;

/// Compiled keyword with its weight. Single words match on word boundaries so
/// "ga" does not fire inside "gamma"; phrases match as substrings.
struct CompiledKeyword {
    keyword: String,
    weight: f64,
    pattern: Option<Regex>,
}

impl CompiledKeyword {
    fn new(keyword: &str, weight: f64) -> Self {
        let keyword = keyword.to_lowercase();
        let pattern = if keyword.chars().all(|c| c.is_ascii_alphanumeric()) {
            Regex::new(&format!(r"\b{}\b", regex::escape(&keyword))).ok()
        } else {
            None
        };
        Self {
            keyword,
            weight,
            pattern,
        }
    }

    fn matches(&self, text: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(text),
            None => text.contains(&self.keyword),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub category: Category,
    pub score: f64,
    pub urgent: bool,
    pub limited_time: bool,
}

/// Keyword/recency scorer. All clock-dependent parts take `now` explicitly,
/// so identical inputs and an identical `now` give identical verdicts.
pub struct Scorer {
    tables: Vec<(Category, Vec<CompiledKeyword>)>,
    urgency: Vec<CompiledKeyword>,
    limited: Vec<CompiledKeyword>,
    tier_base_top: f64,
    tier_base_standard: f64,
    tier_base_aggregator: f64,
    urgent_threshold: f64,
    limited_time_lookahead_days: i64,
}

impl Scorer {
    pub fn new(cfg: &ScoringConfig) -> Self {
        let compile = |kws: &[crate::config::KeywordWeight]| {
            kws.iter()
                .map(|k| CompiledKeyword::new(&k.keyword, k.weight))
                .collect::<Vec<_>>()
        };
        Self {
            tables: vec![
                (Category::CompanyRelease, compile(&cfg.company_release)),
                (Category::DevTool, compile(&cfg.dev_tool)),
                (Category::ResearchPaper, compile(&cfg.research_paper)),
            ],
            urgency: cfg
                .urgency_keywords
                .iter()
                .map(|k| CompiledKeyword::new(k, URGENCY_KEYWORD_WEIGHT))
                .collect(),
            limited: cfg
                .limited_time_keywords
                .iter()
                .map(|k| CompiledKeyword::new(k, LIMITED_KEYWORD_WEIGHT))
                .collect(),
            tier_base_top: cfg.tier_base_top,
            tier_base_standard: cfg.tier_base_standard,
            tier_base_aggregator: cfg.tier_base_aggregator,
            urgent_threshold: cfg.urgent_threshold,
            limited_time_lookahead_days: cfg.limited_time_lookahead_days,
        }
    }

    pub fn evaluate(&self, item: &NormalizedItem, now: DateTime<Utc>) -> Verdict {
        let text = format!("{} {}", item.title_norm, item.summary_norm);

        let base = match item.tier {
            SourceTier::Top => self.tier_base_top,
            SourceTier::Standard => self.tier_base_standard,
            SourceTier::Aggregator => self.tier_base_aggregator,
        };

        let mut category = Category::Other;
        let mut best_table = 0.0;
        let mut keyword_score = 0.0;
        for (cat, table) in &self.tables {
            let table_score: f64 = table
                .iter()
                .filter(|k| k.matches(&text))
                .map(|k| k.weight)
                .sum();
            keyword_score += table_score;
            // Strictly greater keeps the earlier table on ties.
            if table_score > best_table {
                best_table = table_score;
                category = *cat;
            }
        }
        for k in self.urgency.iter().chain(self.limited.iter()) {
            if k.matches(&text) {
                keyword_score += k.weight;
            }
        }

        let recency = item
            .published_at
            .map(|published| {
                let age_days = (now - published).num_seconds() as f64 / 86_400.0;
                if age_days <= 2.0 {
                    2.0
                } else if age_days <= 7.0 {
                    1.0
                } else if age_days <= 30.0 {
                    0.5
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0);

        let deadline_bonus = item
            .deadline_at
            .map(|deadline| {
                let days_left = (deadline - now).num_seconds() as f64 / 86_400.0;
                if days_left < 0.0 {
                    -2.0
                } else if days_left <= 3.0 {
                    2.0
                } else if days_left <= 7.0 {
                    1.0
                } else if days_left <= 14.0 {
                    0.5
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0);

        let score = base + keyword_score + recency + deadline_bonus;

        let urgent = score >= self.urgent_threshold && item.tier == SourceTier::Top;

        let limited_time = item
            .deadline_at
            .map(|deadline| {
                let days_left = (deadline - now).num_seconds() as f64 / 86_400.0;
                days_left >= 0.0 && days_left <= self.limited_time_lookahead_days as f64
            })
            .unwrap_or(false);

        Verdict {
            category,
            score,
            urgent,
            limited_time,
        }
    }

    pub fn score_item(&self, item: NormalizedItem, now: DateTime<Utc>) -> ScoredItem {
        let verdict = self.evaluate(&item, now);
        let prep = item.prep.clone();
        ScoredItem {
            item,
            category: verdict.category,
            score: verdict.score,
            urgent: verdict.urgent,
            limited_time: verdict.limited_time,
            prep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::RawRecord;
    use crate::pipeline::normalize::normalize_record;
    use chrono::{Duration, TimeZone};

    fn scorer() -> Scorer {
        Scorer::new(&Config::default().scoring)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap()
    }

    fn item(title: &str, tier: SourceTier) -> NormalizedItem {
        normalize_record(RawRecord {
            url: "https://a.com/x".to_string(),
            title: title.to_string(),
            tier,
            ..RawRecord::default()
        })
        .unwrap()
    }

    #[test]
    fn identical_input_and_clock_give_identical_verdicts() {
        let s = scorer();
        let mut i = item("OpenAI launches X with new API", SourceTier::Top);
        i.published_at = Some(now() - Duration::days(1));
        let a = s.evaluate(&i, now());
        let b = s.evaluate(&i, now());
        assert_eq!(a, b);
    }

    #[test]
    fn launch_from_top_source_is_urgent_company_release() {
        let s = scorer();
        let mut i = item("OpenAI launches X", SourceTier::Top);
        i.published_at = Some(now() - Duration::hours(6));
        let v = s.evaluate(&i, now());
        // base 3.0 + "launches" 2.0 + recency 2.0
        assert_eq!(v.category, Category::CompanyRelease);
        assert!(v.score >= 6.0);
        assert!(v.urgent);
    }

    #[test]
    fn same_text_from_standard_source_is_never_urgent() {
        let s = scorer();
        let mut i = item("OpenAI launches X", SourceTier::Standard);
        i.published_at = Some(now() - Duration::hours(6));
        let v = s.evaluate(&i, now());
        assert!(!v.urgent);
    }

    #[test]
    fn research_keywords_classify_as_research_paper() {
        let s = scorer();
        let i = item("New SOTA benchmark results, code available", SourceTier::Standard);
        let v = s.evaluate(&i, now());
        assert_eq!(v.category, Category::ResearchPaper);
    }

    #[test]
    fn no_keyword_hits_fall_back_to_other() {
        let s = scorer();
        let v = s.evaluate(&item("Quarterly financial report", SourceTier::Standard), now());
        assert_eq!(v.category, Category::Other);
    }

    #[test]
    fn word_boundary_matching_ignores_substrings() {
        let s = scorer();
        // "ga" must not fire inside "gamma", "api" not inside "rapid".
        let quiet = s.evaluate(&item("Gamma rapid iteration", SourceTier::Standard), now());
        let hit = s.evaluate(&item("GA for the new API", SourceTier::Standard), now());
        assert!(hit.score > quiet.score);
    }

    #[test]
    fn deadline_within_lookahead_sets_limited_time() {
        let s = scorer();
        let mut i = item("Workshop registration", SourceTier::Standard);

        i.deadline_at = Some(now() + Duration::days(5));
        assert!(s.evaluate(&i, now()).limited_time);

        i.deadline_at = Some(now() + Duration::days(60));
        assert!(!s.evaluate(&i, now()).limited_time);

        i.deadline_at = Some(now() - Duration::days(1));
        assert!(!s.evaluate(&i, now()).limited_time);
    }

    #[test]
    fn recency_decays_with_age() {
        let s = scorer();
        let mut fresh = item("Release notes", SourceTier::Standard);
        let mut stale = fresh.clone();
        fresh.published_at = Some(now() - Duration::days(1));
        stale.published_at = Some(now() - Duration::days(45));
        assert!(s.evaluate(&fresh, now()).score > s.evaluate(&stale, now()).score);
    }
}
