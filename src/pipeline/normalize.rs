use url::Url;

use crate::error::{AppError, Result};
use crate::models::{NormalizedItem, RawRecord};

/// Query parameters that never contribute to item identity.
const TRACKING_PARAMS: &[&str] = &["gclid", "fbclid", "mc_cid", "mc_eid", "ref", "source"];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Deterministic identity key for an item: lowercased scheme/host, tracking
/// parameters and fragment removed, trailing slashes stripped. Idempotent.
pub fn canonicalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let mut url = match Url::parse(raw) {
        Ok(u) => u,
        // Not parseable as an absolute URL; identity falls back to the raw
        // string so provenance is still traceable.
        Err(_) => return raw.to_string(),
    };

    url.set_fragment(None);

    // Collapse duplicate slashes and strip trailing ones in the path itself,
    // so a query string after the path cannot shield them.
    let path = {
        let mut path = url.path().to_string();
        while path.contains("//") {
            path = path.replace("//", "/");
        }
        path.trim_end_matches('/').to_string()
    };
    url.set_path(&path);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(kept);
        url.set_query(Some(&serializer.finish()));
    }

    let mut out = url.to_string();
    while out.ends_with('/') {
        out.pop();
    }
    out
}

/// Lowercase and collapse runs of whitespace; the form used for fuzzy
/// comparison against near-duplicate titles from different sources.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonicalize a raw record. Records with no usable url or title are
/// rejected so the pipeline can drop and count them.
pub fn normalize_record(raw: RawRecord) -> Result<NormalizedItem> {
    let url = raw.url.trim().to_string();
    let title = raw.title.trim().to_string();

    if url.is_empty() {
        return Err(AppError::MalformedRecord {
            feed: raw.source,
            reason: "empty url".to_string(),
        });
    }
    if title.is_empty() {
        return Err(AppError::MalformedRecord {
            feed: raw.source,
            reason: "empty title".to_string(),
        });
    }

    let canonical_url = canonicalize_url(&url);
    let summary = raw.summary.trim().to_string();
    let source = raw.source.trim().to_string();
    let source_id = {
        let id = raw.source_id.trim();
        if id.is_empty() {
            source.clone()
        } else {
            id.to_string()
        }
    };
    let content_url = if url != canonical_url { Some(url) } else { None };

    Ok(NormalizedItem {
        title_norm: normalize_text(&title),
        summary_norm: normalize_text(&summary),
        canonical_url,
        title,
        summary,
        content_url,
        source,
        source_id,
        published_at: raw.published_at,
        deadline_at: raw.deadline_at,
        tags: raw.tags,
        prep: raw.prep,
        tier: raw.tier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, title: &str) -> RawRecord {
        RawRecord {
            url: url.to_string(),
            title: title.to_string(),
            source: "Test Feed".to_string(),
            ..RawRecord::default()
        }
    }

    #[test]
    fn strips_tracking_params_and_fragment() {
        assert_eq!(
            canonicalize_url("https://a.com/x?utm_source=tw&utm_medium=social#section"),
            "https://a.com/x"
        );
        assert_eq!(
            canonicalize_url("https://a.com/x?gclid=123&page=2"),
            "https://a.com/x?page=2"
        );
    }

    #[test]
    fn lowercases_scheme_and_host() {
        assert_eq!(
            canonicalize_url("HTTPS://Blog.Example.COM/Post"),
            "https://blog.example.com/Post"
        );
    }

    #[test]
    fn strips_trailing_slashes() {
        assert_eq!(canonicalize_url("https://a.com/x/"), "https://a.com/x");
        assert_eq!(canonicalize_url("https://a.com/"), "https://a.com");
    }

    #[test]
    fn trailing_slash_before_query_is_stripped() {
        assert_eq!(
            canonicalize_url("https://a.com/x/?p=1"),
            canonicalize_url("https://a.com/x?p=1")
        );
        assert_eq!(canonicalize_url("https://a.com/x/?p=1"), "https://a.com/x?p=1");
    }

    #[test]
    fn duplicate_path_slashes_collapse() {
        assert_eq!(
            canonicalize_url("http://B.com/path//double/"),
            "http://b.com/path/double"
        );
        assert_eq!(
            canonicalize_url("https://a.com/x///y?p=1"),
            "https://a.com/x/y?p=1"
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let inputs = [
            "https://a.com/x?utm_source=tw&q=1#top",
            "https://a.com",
            "http://B.com/path//double/",
            "not a url at all",
            "  https://a.com/x  ",
        ];
        for input in inputs {
            let once = canonicalize_url(input);
            assert_eq!(canonicalize_url(&once), once, "input: {input}");
        }
    }

    #[test]
    fn collapses_whitespace_and_lowercases() {
        assert_eq!(normalize_text("  OpenAI\t launches\n X "), "openai launches x");
    }

    #[test]
    fn rejects_empty_url_and_title() {
        let err = normalize_record(record("", "Title")).unwrap_err();
        match &err {
            AppError::MalformedRecord { feed, reason } => {
                assert_eq!(feed, "Test Feed");
                assert_eq!(reason, "empty url");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.to_string(), "malformed record from Test Feed: empty url");

        assert!(matches!(
            normalize_record(record("https://a.com/x", "   ")),
            Err(AppError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn keeps_original_url_when_canonical_differs() {
        let item = normalize_record(record("https://a.com/x?utm_source=tw", "T")).unwrap();
        assert_eq!(item.canonical_url, "https://a.com/x");
        assert_eq!(item.content_url.as_deref(), Some("https://a.com/x?utm_source=tw"));

        let item = normalize_record(record("https://a.com/x", "T")).unwrap();
        assert_eq!(item.content_url, None);
    }

    #[test]
    fn source_id_defaults_to_source() {
        let item = normalize_record(record("https://a.com/x", "T")).unwrap();
        assert_eq!(item.source_id, "Test Feed");
    }
}
