use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;

use crate::error::{AppError, Result};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "our", "that", "the", "their", "them", "they", "this",
    "to", "was", "were", "what", "when", "where", "which", "will", "with", "you", "your",
];

#[derive(Debug, Clone)]
pub struct LinkSummary {
    pub summary: String,
    pub why_read: String,
}

/// Best-effort page summarizer. Fetches the linked page under a hard
/// deadline and extracts lead text heuristically; any failure leaves the
/// item without a summary, never affecting the rest of the pipeline.
pub struct LinkSummarizer {
    client: Client,
    deadline: Duration,
}

impl LinkSummarizer {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .user_agent(user_agent)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            deadline: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub async fn summarize(&self, url: &str) -> Result<LinkSummary> {
        let fetch = async {
            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(anyhow::anyhow!(
                    "summary fetch failed: HTTP {}",
                    response.status()
                )
                .into());
            }
            let html = response.text().await?;
            Ok::<_, AppError>(html)
        };

        let html = tokio::time::timeout(self.deadline, fetch)
            .await
            .map_err(|_| AppError::SummaryTimeout(url.to_string()))??;

        let text = html2text::from_read(html.as_bytes(), 200)
            .map_err(|e| AppError::Other(anyhow::anyhow!("html extraction failed: {e}")))?;

        Ok(summarize_text(&text))
    }
}

/// Lead-text summary plus a "why read" line from the most frequent
/// non-stopword terms.
fn summarize_text(text: &str) -> LinkSummary {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            // Skip navigation debris: bare links, image refs, one-word lines.
            !line.is_empty()
                && !line.starts_with('[')
                && !line.starts_with('#')
                && line.split_whitespace().count() >= 5
        })
        .collect();

    let mut summary = String::new();
    for line in &lines {
        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(line);
        if summary.chars().count() >= 300 {
            break;
        }
    }
    if summary.chars().count() > 400 {
        summary = summary.chars().take(400).collect::<String>().trim_end().to_string() + "…";
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in lines.join(" ").split_whitespace() {
        let word: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if word.len() < 4 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let terms: Vec<String> = ranked.into_iter().take(3).map(|(w, _)| w).collect();

    let why_read = if terms.is_empty() {
        String::new()
    } else {
        format!("covers {}", terms.join(", "))
    };

    LinkSummary { summary, why_read }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_text_skips_navigation_debris() {
        let text = "[Home]\n# Heading\nMenu\nThe quick brown fox jumps over the lazy dog today.\nAnother sentence with enough words to count here.";
        let out = summarize_text(text);
        assert!(out.summary.starts_with("The quick brown fox"));
        assert!(!out.summary.contains("[Home]"));
    }

    #[test]
    fn why_read_names_frequent_terms() {
        let text = "Transformers improve benchmark results. Transformers scale. \
                    Benchmark scores rise with transformers across every benchmark suite.";
        let out = summarize_text(text);
        assert!(out.why_read.contains("transformers"));
        assert!(out.why_read.contains("benchmark"));
    }

    #[test]
    fn empty_page_produces_empty_summary() {
        let out = summarize_text("");
        assert!(out.summary.is_empty());
        assert!(out.why_read.is_empty());
    }
}
