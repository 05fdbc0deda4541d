// src/ingest/adapters/release.rs
//! Software release feeds (GitHub-style Atom).
//!
//! Keyword heuristics here use word boundaries so that e.g. "rc" does not
//! fire on "source" and "dev" does not fire on "developers".

use once_cell::sync::OnceCell;
use regex::Regex;

use super::AdapterSettings;
use crate::ingest::text::{markup_to_lines, normalize_text, truncate_chars};
use crate::ingest::types::{
    AdapterMeta, NormalizedArticle, RawEntry, Rejection, ReleaseKind, ReleaseMeta, RepoContext,
};
use crate::sources::SourceDescriptor;

pub const MAX_BODY_CHARS: usize = 2_000;
pub const MAX_HIGHLIGHTS: usize = 5;

const MIN_NOTES_CHARS: usize = 50;
const MIN_LINE_CHARS: usize = 5;

const CHROME_PHRASES: &[&str] = &[
    "full changelog:",
    "compare/",
    "commits",
    "sha-",
    "**download:**",
    "assets",
    "checksum",
];

fn re(pattern: &'static str, cell: &'static OnceCell<Regex>) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

fn re_bare_version() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(r"^v?\d+\.\d+", &RE)
}

fn re_repository() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(r"github\.com/([^/]+/[^/]+)", &RE)
}

fn re_versions() -> &'static [Regex; 3] {
    static RE: OnceCell<[Regex; 3]> = OnceCell::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"(?i)v?(\d+\.\d+\.\d+(?:-[a-zA-Z0-9.-]+)?)").unwrap(),
            Regex::new(r"(?i)version\s+([0-9.]+)").unwrap(),
            Regex::new(r"(?i)release\s+([0-9.]+)").unwrap(),
        ]
    })
}

fn re_kinds() -> &'static [(ReleaseKind, Regex); 4] {
    static RE: OnceCell<[(ReleaseKind, Regex); 4]> = OnceCell::new();
    RE.get_or_init(|| {
        [
            (
                ReleaseKind::Prerelease,
                Regex::new(r"(?i)(?:\b|\d)(?:alpha|beta|rc|preview)(?:\d|\b)").unwrap(),
            ),
            (
                ReleaseKind::Patch,
                Regex::new(r"(?i)\b(?:patch|hotfix|bugfix)\b").unwrap(),
            ),
            (
                ReleaseKind::Major,
                Regex::new(r"(?i)\b(?:major|breaking)\b").unwrap(),
            ),
            (
                ReleaseKind::Minor,
                Regex::new(r"(?i)\b(?:minor|feature)\b").unwrap(),
            ),
        ]
    })
}

fn re_prerelease() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(
        r"(?i)(?:\b|\d)(?:alpha|beta|rc|preview|dev|nightly|pre-release|prerelease)(?:\d|\b)",
        &RE,
    )
}

fn re_breaking() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(r"(?i)breaking|incompatible|migration|upgrade guide", &RE)
}

fn re_markdown() -> &'static [(Regex, &'static str); 4] {
    static RE: OnceCell<[(Regex, &'static str); 4]> = OnceCell::new();
    RE.get_or_init(|| {
        [
            (Regex::new(r"^#+\s*").unwrap(), ""),
            (Regex::new(r"\*\*(.*?)\*\*").unwrap(), "$1"),
            (Regex::new(r"\*(.*?)\*").unwrap(), "$1"),
            (Regex::new(r"`(.*?)`").unwrap(), "$1"),
        ]
    })
}

fn re_bullet() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(r"^[+\-*•]\s*", &RE)
}

fn re_feature_prefix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(r"(?i)^(?:new|added|feature|enhancement|feat):\s*", &RE)
}

fn re_fix_prefix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(r"(?i)^(?:fixed|fix|bug|resolved|patch):\s*", &RE)
}

pub fn normalize(
    entry: RawEntry,
    source: &SourceDescriptor,
    settings: &AdapterSettings,
) -> Result<NormalizedArticle, Rejection> {
    let title = clean_title(&entry.title);
    let body = clean_notes(&entry.body);
    let text = format!("{title} {body}");

    let repository = entry.link.as_deref().and_then(extract_repository);
    let features = extract_lines(&body, FEATURE_MARKERS, re_feature_prefix());
    let meta = ReleaseMeta {
        version: extract_version(&text),
        kind: classify_release(&text),
        prerelease: re_prerelease().is_match(&text),
        breaking: re_breaking().is_match(&body),
        bug_fixes: extract_lines(&body, FIX_MARKERS, re_fix_prefix()),
        context: repo_context(repository.as_deref()),
        features,
        repository,
    };

    quality_gate(&meta, &body, &settings.release_allowlist)?;

    Ok(NormalizedArticle::from_source(
        source,
        title,
        body,
        entry.link,
        entry.published_at,
        AdapterMeta::Release(meta),
    ))
}

/// Bare version titles ("v1.2.0") read better as "Release v1.2.0".
pub fn clean_title(raw: &str) -> String {
    let t = normalize_text(raw);
    if re_bare_version().is_match(&t) {
        format!("Release {t}")
    } else {
        t
    }
}

fn clean_notes(raw: &str) -> String {
    let mut kept = Vec::new();
    for line in markup_to_lines(raw) {
        let lower = line.to_lowercase();
        if CHROME_PHRASES.iter().any(|p| lower.contains(p)) {
            continue;
        }
        let mut line = line;
        for (pat, rep) in re_markdown() {
            line = pat.replace_all(&line, *rep).into_owned();
        }
        let line = line.trim();
        if line.chars().count() > MIN_LINE_CHARS {
            kept.push(line.to_string());
        }
    }
    truncate_chars(&kept.join("\n"), MAX_BODY_CHARS)
}

/// `owner/repo` from a github.com link.
pub fn extract_repository(link: &str) -> Option<String> {
    re_repository().captures(link).map(|c| c[1].to_string())
}

/// First match of `vX.Y.Z[-suffix]`, then "version N", then "release N".
pub fn extract_version(text: &str) -> Option<String> {
    re_versions()
        .iter()
        .find_map(|re| re.captures(text).map(|c| c[1].to_string()))
}

pub fn classify_release(text: &str) -> ReleaseKind {
    re_kinds()
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(kind, _)| *kind)
        .unwrap_or(ReleaseKind::Release)
}

const FEATURE_MARKERS: &[&str] = &["new:", "added:", "feature:", "enhancement:", "feat:", "+ "];
const FIX_MARKERS: &[&str] = &["fixed:", "fix:", "bug:", "resolved:", "patch:"];

fn extract_lines(body: &str, markers: &[&str], prefix: &Regex) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            markers.iter().any(|m| lower.contains(m))
        })
        .filter_map(|line| {
            let item = re_bullet().replace(line, "");
            let item = prefix.replace(&item, "");
            let item = item.trim();
            let n = item.chars().count();
            (n > 10 && n < 200).then(|| item.to_string())
        })
        .take(MAX_HIGHLIGHTS)
        .collect()
}

pub fn quality_gate(meta: &ReleaseMeta, body: &str, allowlist: &[String]) -> Result<(), Rejection> {
    let Some(repo) = meta.repository.as_deref() else {
        return Err(Rejection::NoRepository);
    };
    if meta.prerelease && !allowlist.iter().any(|r| r.eq_ignore_ascii_case(repo)) {
        return Err(Rejection::UnlistedPrerelease);
    }
    if meta.kind == ReleaseKind::Patch && meta.features.is_empty() {
        return Err(Rejection::FeaturelessPatch);
    }
    if body.chars().count() < MIN_NOTES_CHARS {
        return Err(Rejection::ThinNotes);
    }
    Ok(())
}

/// Static per-repository context; unknown repositories rank low.
pub fn repo_context(repository: Option<&str>) -> RepoContext {
    let (org, focus, importance) = match repository.map(|r| r.to_ascii_lowercase()).as_deref() {
        Some("microsoft/semantic-kernel") => ("Microsoft", "AI orchestration", "high"),
        Some("openai/openai-python") => ("OpenAI", "AI API client", "high"),
        Some("langchain-ai/langchain") => ("LangChain", "AI application framework", "high"),
        Some("google/generative-ai-python") => ("Google", "AI API client", "medium"),
        _ => ("Unknown", "general", "low"),
    };
    RepoContext {
        organization: org.to_string(),
        focus: focus.to_string(),
        importance: importance.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{SourceCategory, TrustTier};
    use chrono::Utc;

    fn src() -> SourceDescriptor {
        SourceDescriptor::new(
            "OpenAI Python SDK",
            "https://github.com/openai/openai-python/releases.atom",
            SourceCategory::Release,
            TrustTier::High,
        )
        .organization("OpenAI")
    }

    fn entry(title: &str, body: &str, link: Option<&str>) -> RawEntry {
        RawEntry {
            title: title.into(),
            body: body.into(),
            link: link.map(str::to_string),
            published_at: Utc::now(),
            author: None,
            categories: vec![],
        }
    }

    #[test]
    fn version_patterns_in_order() {
        assert_eq!(extract_version("Release v1.2.3").as_deref(), Some("1.2.3"));
        assert_eq!(extract_version("SK v2.0.0-alpha.1 notes").as_deref(), Some("2.0.0-alpha.1"));
        assert_eq!(extract_version("This is Version 4.1 of it").as_deref(), Some("4.1"));
        assert_eq!(extract_version("release 7.0 is out").as_deref(), Some("7.0"));
        assert_eq!(extract_version("nothing here"), None);
    }

    #[test]
    fn kind_heuristics_are_ordered() {
        assert_eq!(classify_release("v2.0.0-alpha with breaking changes"), ReleaseKind::Prerelease);
        assert_eq!(classify_release("Hotfix for retries"), ReleaseKind::Patch);
        assert_eq!(classify_release("Major rewrite"), ReleaseKind::Major);
        assert_eq!(classify_release("New feature set"), ReleaseKind::Minor);
        assert_eq!(classify_release("Open source release notes"), ReleaseKind::Release);
    }

    #[test]
    fn bare_version_titles_are_prefixed() {
        assert_eq!(clean_title("v1.40.0"), "Release v1.40.0");
        assert_eq!(clean_title("Python SDK 1.4"), "Python SDK 1.4");
    }

    #[test]
    fn notes_cleanup_and_highlights() {
        let body = "## What's Changed\n\
                    * Added: **streaming** support for `responses`\n\
                    * Fixed: retry loop on connection reset\n\
                    * feat: typed errors for rate limiting\n\
                    Full Changelog: https://github.com/o/r/compare/v1...v2\n\
                    ok";
        let notes = clean_notes(body);
        assert!(!notes.contains("Full Changelog"));
        assert!(!notes.contains("**"));
        assert!(!notes.lines().any(|l| l == "ok"));
        assert!(notes.starts_with("What's Changed"));

        let feats = extract_lines(&notes, FEATURE_MARKERS, re_feature_prefix());
        assert_eq!(
            feats,
            vec![
                "streaming support for responses".to_string(),
                "typed errors for rate limiting".to_string()
            ]
        );
        let fixes = extract_lines(&notes, FIX_MARKERS, re_fix_prefix());
        assert_eq!(fixes, vec!["retry loop on connection reset".to_string()]);
    }

    #[test]
    fn highlights_are_capped() {
        let body: String = (0..8)
            .map(|i| format!("- Added: capability number {i} for agents\n"))
            .collect();
        assert_eq!(
            extract_lines(&body, FEATURE_MARKERS, re_feature_prefix()).len(),
            MAX_HIGHLIGHTS
        );
    }

    #[test]
    fn accepted_release_carries_metadata() {
        let body = "<h2>Highlights</h2><ul><li>Added: structured outputs for the responses API</li>\
                    <li>Fixed: connection pool exhaustion under load</li></ul>";
        let e = entry(
            "v1.40.0",
            body,
            Some("https://github.com/openai/openai-python/releases/tag/v1.40.0"),
        );
        let a = normalize(e, &src(), &AdapterSettings::default()).expect("release accepted");
        assert_eq!(a.title, "Release v1.40.0");
        let r = a.release().unwrap();
        assert_eq!(r.repository.as_deref(), Some("openai/openai-python"));
        assert_eq!(r.version.as_deref(), Some("1.40.0"));
        assert!(!r.prerelease);
        assert_eq!(r.features.len(), 1);
        assert_eq!(r.bug_fixes.len(), 1);
        assert_eq!(r.context.importance, "high");
    }

    #[test]
    fn featureless_patch_is_rejected() {
        let e = entry(
            "Release v1.2.3",
            "Fixed several bugs in this patch",
            Some("https://github.com/acme/tool/releases/tag/v1.2.3"),
        );
        assert_eq!(
            normalize(e, &src(), &AdapterSettings::default()).unwrap_err(),
            Rejection::FeaturelessPatch
        );
    }

    #[test]
    fn gate_order() {
        let settings = AdapterSettings::default();
        let long = "Added: a long enough release note line for the gate to pass here";

        let no_repo = entry("v1.0.0", long, Some("https://example.test/releases/1"));
        assert_eq!(
            normalize(no_repo, &src(), &settings).unwrap_err(),
            Rejection::NoRepository
        );

        let beta = entry(
            "v2.0.0-beta.1",
            long,
            Some("https://github.com/acme/tool/releases/tag/v2.0.0-beta.1"),
        );
        assert_eq!(
            normalize(beta, &src(), &settings).unwrap_err(),
            Rejection::UnlistedPrerelease
        );

        let listed_beta = entry(
            "v2.0.0-beta.1",
            long,
            Some("https://github.com/langchain-ai/langchain/releases/tag/v2.0.0-beta.1"),
        );
        assert!(normalize(listed_beta, &src(), &settings).is_ok());

        let thin = entry(
            "v1.0.1",
            "Docs tweaks only",
            Some("https://github.com/acme/tool/releases/tag/v1.0.1"),
        );
        assert_eq!(normalize(thin, &src(), &settings).unwrap_err(), Rejection::ThinNotes);
    }

    #[test]
    fn glued_prerelease_suffixes_are_caught() {
        let settings = AdapterSettings::default();
        let long = "Added: a long enough release note line for the gate to pass here";
        for tag in ["v2.0.0-beta1", "v1.4.0-alpha2", "v0.3.0rc1", "v0.3.0.dev5"] {
            let link = format!("https://github.com/acme/tool/releases/tag/{tag}");
            let e = entry(tag, long, Some(link.as_str()));
            assert_eq!(
                normalize(e, &src(), &settings).unwrap_err(),
                Rejection::UnlistedPrerelease,
                "{tag}"
            );
        }
        assert_eq!(classify_release("v0.3.0rc1"), ReleaseKind::Prerelease);
        assert!(!re_prerelease().is_match("Open source tooling for developers"));
    }

    #[test]
    fn unknown_repo_context_is_low() {
        assert_eq!(repo_context(Some("acme/tool")).importance, "low");
        assert_eq!(repo_context(Some("Microsoft/Semantic-Kernel")).organization, "Microsoft");
    }
}
