//! Picks the display URL for a report out of the several fields the backend
//! has used for it over time.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;
use crate::model::ReportRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedUrl {
    Resolved(String),
    /// No candidate qualified. A normal outcome; the UI disables the image
    /// affordance.
    Unresolved,
}

impl ResolvedUrl {
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            ResolvedUrl::Resolved(url) => Some(url),
            ResolvedUrl::Unresolved => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedUrl::Resolved(_))
    }
}

/// Candidates in priority order: `file_url`, `file`, the supplied fallback,
/// `image_url`, `url`. The first usable one wins and is returned trimmed.
#[must_use]
pub fn resolve_file_url(record: &ReportRecord, fallback: Option<&str>) -> ResolvedUrl {
    [
        record.file_url.as_deref(),
        record.file.as_deref(),
        fallback,
        record.image_url.as_deref(),
        record.url.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find_map(usable)
    .map_or(ResolvedUrl::Unresolved, ResolvedUrl::Resolved)
}

/// Resolves with the fallback derived from the record's `original_file`.
#[must_use]
pub fn resolve_with_config(record: &ReportRecord, config: &ClientConfig) -> ResolvedUrl {
    let fallback = fallback_for(record, config);
    resolve_file_url(record, fallback.as_deref())
}

/// `original_file` is normally a server-relative upload path; it becomes
/// absolute against the media base. An already absolute value passes through.
#[must_use]
pub fn fallback_for(record: &ReportRecord, config: &ClientConfig) -> Option<String> {
    let path = record.original_file.as_deref()?.trim();
    if path.is_empty() {
        return None;
    }
    if has_http_scheme(path) {
        Some(path.to_string())
    } else {
        Some(config.media_url(path))
    }
}

fn usable(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || trimmed == "undefined" || trimmed.contains("/undefined") {
        return None;
    }
    if !has_http_scheme(trimmed) {
        return None;
    }
    Url::parse(trimmed).ok()?;
    Some(trimmed.to_string())
}

fn has_http_scheme(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReportId, ReportType};
    use proptest::prelude::*;

    fn record() -> ReportRecord {
        ReportRecord::new(ReportId::new("1"), ReportType::Lab)
    }

    #[test]
    fn empty_record_is_unresolved() {
        assert_eq!(resolve_file_url(&record(), None), ResolvedUrl::Unresolved);
    }

    #[test]
    fn priority_order() {
        let mut r = record();
        r.url = Some("https://e/url.png".into());
        assert_eq!(resolve_file_url(&r, None).as_deref(), Some("https://e/url.png"));

        r.image_url = Some("https://e/image.png".into());
        assert_eq!(resolve_file_url(&r, None).as_deref(), Some("https://e/image.png"));

        assert_eq!(
            resolve_file_url(&r, Some("https://e/fallback.png")).as_deref(),
            Some("https://e/fallback.png")
        );

        r.file = Some("https://e/file.png".into());
        assert_eq!(
            resolve_file_url(&r, Some("https://e/fallback.png")).as_deref(),
            Some("https://e/file.png")
        );

        r.file_url = Some("https://e/file_url.png".into());
        assert_eq!(
            resolve_file_url(&r, Some("https://e/fallback.png")).as_deref(),
            Some("https://e/file_url.png")
        );
    }

    #[test]
    fn literal_undefined_falls_through() {
        let mut r = record();
        r.file_url = Some("undefined".into());
        r.image_url = Some("https://e/x.png".into());
        assert_eq!(resolve_file_url(&r, None).as_deref(), Some("https://e/x.png"));
    }

    #[test]
    fn undefined_file_url_yields_next_field() {
        let r: ReportRecord = serde_json::from_value(serde_json::json!({
            "id": 1,
            "fileUrl": "undefined",
            "file": "http://y/b.png"
        }))
        .unwrap();
        assert_eq!(resolve_file_url(&r, None).as_deref(), Some("http://y/b.png"));
    }

    #[test]
    fn rejects_unusable_values() {
        for bad in [
            "",
            "   ",
            "undefined",
            "https://e/media/undefined",
            "/undefined",
            "/media/reports/a.png",
            "ftp://e/a.png",
            "data:image/png;base64,AAAA",
            "https://",
        ] {
            let mut r = record();
            r.file_url = Some(bad.to_string());
            assert_eq!(resolve_file_url(&r, None), ResolvedUrl::Unresolved, "{bad:?}");
        }
    }

    #[test]
    fn scheme_check_is_case_insensitive_and_value_trimmed() {
        let mut r = record();
        r.file = Some("  HTTPS://e/a.png \n".into());
        assert_eq!(resolve_file_url(&r, None).as_deref(), Some("HTTPS://e/a.png"));
    }

    #[test]
    fn fallback_from_original_file() {
        let config = ClientConfig {
            api_base_url: "https://api.example.com".into(),
            ..ClientConfig::default()
        };
        let mut r = record();
        assert_eq!(fallback_for(&r, &config), None);

        r.original_file = Some("/media/reports/scan.png".into());
        assert_eq!(
            resolve_with_config(&r, &config).as_deref(),
            Some("https://api.example.com/media/reports/scan.png")
        );

        r.original_file = Some("https://cdn.example.com/scan.png".into());
        assert_eq!(
            fallback_for(&r, &config).as_deref(),
            Some("https://cdn.example.com/scan.png")
        );

        r.original_file = Some("   ".into());
        assert_eq!(fallback_for(&r, &config), None);
    }

    proptest! {
        #[test]
        fn never_resolves_without_http_scheme(path in "[a-z/._-]{0,40}") {
            let mut r = record();
            r.file_url = Some(path.clone());
            r.file = Some(format!("/{path}"));
            r.image_url = Some(format!("ftp://host/{path}"));
            prop_assert_eq!(resolve_file_url(&r, Some(path.as_str())), ResolvedUrl::Unresolved);
        }

        #[test]
        fn resolved_urls_never_mention_undefined(segment in "[a-z]{1,12}", poison in any::<bool>()) {
            let mut r = record();
            let candidate = if poison {
                format!("https://e/{segment}/undefined")
            } else {
                format!("https://e/{segment}.png")
            };
            r.file_url = Some(candidate.clone());
            let resolved = resolve_file_url(&r, None);
            if poison {
                prop_assert_eq!(resolved, ResolvedUrl::Unresolved);
            } else {
                prop_assert_eq!(resolved.as_deref(), Some(candidate.as_str()));
            }
        }
    }
}
