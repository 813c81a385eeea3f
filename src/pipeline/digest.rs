use chrono::{DateTime, Duration, Timelike, Utc};

use crate::config::{QuietHours, SelectionConfig};
use crate::db::Repository;
use crate::error::Result;
use crate::models::StoredItem;

/// True when `now` falls inside the configured quiet window, evaluated in the
/// configured UTC offset. The window may wrap midnight (22-7).
pub fn in_quiet_hours(now: DateTime<Utc>, quiet: &QuietHours) -> bool {
    let local_minutes =
        (now.hour() as i32 * 60 + now.minute() as i32 + quiet.utc_offset_minutes).rem_euclid(1440);
    let start = (quiet.start_hour as i32 * 60) % 1440;
    let end = (quiet.end_hour as i32 * 60) % 1440;

    if start == end {
        false
    } else if start < end {
        local_minutes >= start && local_minutes < end
    } else {
        local_minutes >= start || local_minutes < end
    }
}

/// Daily digest: everything seen in the lookback window above the relevance
/// floor, best first, capped. Re-lists already-notified items by design.
pub async fn select_daily(
    repo: &Repository,
    selection: &SelectionConfig,
    now: DateTime<Utc>,
) -> Result<Vec<StoredItem>> {
    let since = now - Duration::hours(selection.daily_lookback_hours);
    repo.select_daily(since, selection.relevance_floor, selection.daily_max_bullets)
        .await
}

/// Priority alerts: unnotified urgent items, suppressed during quiet hours
/// unless forced.
pub async fn select_priority(
    repo: &Repository,
    selection: &SelectionConfig,
    quiet: &QuietHours,
    now: DateTime<Utc>,
    force: bool,
) -> Result<Vec<StoredItem>> {
    if in_quiet_hours(now, quiet) && !force {
        tracing::info!("quiet hours; suppressing priority alerts");
        return Ok(Vec::new());
    }
    repo.select_priority(selection.priority_max_bullets).await
}

/// Render a digest as Telegram bullets. With `markdown` off the same layout
/// is emitted without formatting characters.
pub fn render_digest(heading: &str, items: &[StoredItem], markdown: bool) -> String {
    let bullets: Vec<String> = items
        .iter()
        .map(|item| {
            let date = item
                .published_at
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let line = match item.link_summary.as_deref().filter(|s| !s.is_empty()) {
                Some(summary) => match item.why_read.as_deref().filter(|s| !s.is_empty()) {
                    Some(why) => format!("{summary}\nWhy read: {why}"),
                    None => summary.to_string(),
                },
                None if !item.summary.is_empty() => truncate(&item.summary, 200),
                None => "(see link)".to_string(),
            };
            let url = item.content_url.as_deref().unwrap_or(&item.canonical_url);

            if markdown {
                format!(
                    "• *{}*\n_{} — {}_\n{}\n{}",
                    item.title, item.source, date, line, url
                )
            } else {
                format!("• {}\n{} — {}\n{}\n{}", item.title, item.source, date, line, url)
            }
        })
        .collect();

    if markdown {
        format!("*{heading}*\n\n{}", bullets.join("\n\n"))
    } else {
        format!("{heading}\n\n{}", bullets.join("\n\n"))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quiet_npt() -> QuietHours {
        QuietHours {
            start_hour: 22,
            end_hour: 7,
            utc_offset_minutes: 345,
        }
    }

    #[test]
    fn quiet_window_wraps_midnight() {
        let quiet = quiet_npt();
        // 17:00 UTC = 22:45 NPT, inside.
        let inside = Utc.with_ymd_and_hms(2026, 8, 20, 17, 0, 0).unwrap();
        assert!(in_quiet_hours(inside, &quiet));
        // 23:00 UTC = 04:45 NPT, still inside.
        let inside_late = Utc.with_ymd_and_hms(2026, 8, 20, 23, 0, 0).unwrap();
        assert!(in_quiet_hours(inside_late, &quiet));
        // 09:00 UTC = 14:45 NPT, outside.
        let outside = Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap();
        assert!(!in_quiet_hours(outside, &quiet));
    }

    #[test]
    fn degenerate_window_is_never_quiet() {
        let quiet = QuietHours {
            start_hour: 7,
            end_hour: 7,
            utc_offset_minutes: 0,
        };
        let now = Utc.with_ymd_and_hms(2026, 8, 20, 7, 30, 0).unwrap();
        assert!(!in_quiet_hours(now, &quiet));
    }

    #[test]
    fn plain_text_rendering_drops_markdown() {
        let item = StoredItem {
            canonical_url: "https://a.com/x".to_string(),
            title: "Story".to_string(),
            summary: "A thing happened".to_string(),
            content_url: None,
            source: "Feed".to_string(),
            source_id: "Feed".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2026, 8, 20, 0, 0, 0).unwrap()),
            deadline_at: None,
            category: crate::models::Category::Other,
            score: 1.0,
            urgent: false,
            limited_time: false,
            tags: vec![],
            prep: None,
            first_seen_at: Utc::now(),
            last_seen_at: Utc::now(),
            notified_at: None,
            link_summary: None,
            why_read: None,
        };

        let rich = render_digest("Daily digest", std::slice::from_ref(&item), true);
        assert!(rich.contains("*Story*"));
        assert!(rich.contains("_Feed — 2026-08-20_"));

        let plain = render_digest("Daily digest", &[item], false);
        assert!(!plain.contains('*'));
        assert!(!plain.contains('_'));
        assert!(plain.contains("Story"));
        assert!(plain.contains("https://a.com/x"));
    }
}
