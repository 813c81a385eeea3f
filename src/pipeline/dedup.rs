use std::collections::HashMap;

use crate::models::{NormalizedItem, SourceTier};

fn trust_rank(tier: SourceTier) -> u8 {
    match tier {
        SourceTier::Top => 2,
        SourceTier::Standard => 1,
        SourceTier::Aggregator => 0,
    }
}

/// Collapse a batch to at most one item per story.
///
/// The batch is sorted by (canonical_url, source, source_id) first so the
/// result does not depend on fetch completion order. Two passes: exact
/// canonical URL, then exact normalized title, which catches the same story
/// carried by two feeds under different URLs. Within a collision the later
/// item's text wins, but the first item's source/source_id pair is retained
/// and the later provenance is recorded in tags.
pub fn collapse_batch(mut items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    items.sort_by(|a, b| {
        (&a.canonical_url, &a.source, &a.source_id)
            .cmp(&(&b.canonical_url, &b.source, &b.source_id))
    });

    let by_url = collapse_by_key(items, |item| Some(item.canonical_url.clone()));
    collapse_by_key(by_url, |item| {
        if item.title_norm.is_empty() {
            None
        } else {
            Some(item.title_norm.clone())
        }
    })
}

fn collapse_by_key<F>(items: Vec<NormalizedItem>, key: F) -> Vec<NormalizedItem>
where
    F: Fn(&NormalizedItem) -> Option<String>,
{
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, NormalizedItem> = HashMap::new();
    // Items with no usable key pass through unmerged, in input order.
    let mut passthrough: Vec<NormalizedItem> = Vec::new();

    for item in items {
        let Some(key) = key(&item) else {
            passthrough.push(item);
            continue;
        };
        match merged.get_mut(&key) {
            None => {
                order.push(key.clone());
                merged.insert(key, item);
            }
            Some(existing) => merge_into(existing, item),
        }
    }

    order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .chain(passthrough)
        .collect()
}

fn merge_into(existing: &mut NormalizedItem, later: NormalizedItem) {
    let provenance = format!("via:{}/{}", later.source, later.source_id);

    existing.title = later.title;
    existing.title_norm = later.title_norm;
    existing.summary = later.summary;
    existing.summary_norm = later.summary_norm;
    if later.content_url.is_some() {
        existing.content_url = later.content_url;
    }

    // Earliest known publish date; a deadline from either side is kept.
    existing.published_at = match (existing.published_at, later.published_at) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    existing.deadline_at = existing.deadline_at.or(later.deadline_at);

    if trust_rank(later.tier) > trust_rank(existing.tier) {
        existing.tier = later.tier;
    }
    if existing.prep.is_none() {
        existing.prep = later.prep;
    }

    for tag in later.tags {
        if !existing.tags.contains(&tag) {
            existing.tags.push(tag);
        }
    }
    if !existing.tags.contains(&provenance) {
        existing.tags.push(provenance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRecord;
    use crate::pipeline::normalize::normalize_record;
    use chrono::{TimeZone, Utc};

    fn item(url: &str, title: &str, source: &str) -> NormalizedItem {
        normalize_record(RawRecord {
            url: url.to_string(),
            title: title.to_string(),
            summary: format!("{title} summary"),
            source: source.to_string(),
            source_id: format!("{source}-id"),
            ..RawRecord::default()
        })
        .unwrap()
    }

    #[test]
    fn distinct_urls_pass_through() {
        let out = collapse_batch(vec![
            item("https://a.com/x", "X", "Feed A"),
            item("https://a.com/y", "Y", "Feed A"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn same_story_from_two_feeds_collapses_to_one() {
        let out = collapse_batch(vec![
            item("https://a.com/x?utm_source=rss", "Story", "Feed B"),
            item("https://a.com/x", "Story (updated)", "Feed A"),
        ]);
        assert_eq!(out.len(), 1);
        let merged = &out[0];
        assert_eq!(merged.canonical_url, "https://a.com/x");
        // Sorted order puts Feed A first; Feed B is processed later and its
        // text wins while Feed A's provenance pair survives.
        assert_eq!(merged.source, "Feed A");
        assert_eq!(merged.source_id, "Feed A-id");
        assert_eq!(merged.title, "Story");
        assert!(merged.tags.contains(&"via:Feed B/Feed B-id".to_string()));
    }

    #[test]
    fn same_title_under_different_urls_collapses_to_one() {
        let out = collapse_batch(vec![
            item("https://a.com/story", "Big  Launch", "Feed A"),
            item("https://mirror.example.com/2026/big-launch", "big launch", "Feed B"),
        ]);
        assert_eq!(out.len(), 1);
        let merged = &out[0];
        // The first row in sorted order keeps its identity and provenance.
        assert_eq!(merged.canonical_url, "https://a.com/story");
        assert_eq!(merged.source, "Feed A");
        assert!(merged.tags.contains(&"via:Feed B/Feed B-id".to_string()));
    }

    #[test]
    fn distinct_titles_and_urls_stay_separate() {
        let out = collapse_batch(vec![
            item("https://a.com/x", "First story", "Feed A"),
            item("https://b.com/y", "Second story", "Feed B"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn collapse_is_order_independent() {
        let a = item("https://a.com/x", "One", "Feed A");
        let b = item("https://a.com/x", "Two", "Feed B");
        let forward = collapse_batch(vec![a.clone(), b.clone()]);
        let reverse = collapse_batch(vec![b, a]);
        assert_eq!(forward[0].title, reverse[0].title);
        assert_eq!(forward[0].source, reverse[0].source);
        assert_eq!(forward[0].tags, reverse[0].tags);
    }

    #[test]
    fn keeps_earliest_publish_date_and_any_deadline() {
        let mut a = item("https://a.com/x", "One", "Feed A");
        let mut b = item("https://a.com/x", "Two", "Feed B");
        a.published_at = Some(Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
        b.published_at = Some(Utc.with_ymd_and_hms(2026, 8, 3, 0, 0, 0).unwrap());
        b.deadline_at = Some(Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap());

        let out = collapse_batch(vec![a.clone(), b]);
        assert_eq!(out[0].published_at, a.published_at);
        assert!(out[0].deadline_at.is_some());
    }
}
