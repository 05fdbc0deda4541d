// tests/adapters_fixtures.rs
use feed_sieve::ingest::{adapt_document, AdapterSettings, PostType, ReleaseKind};
use feed_sieve::{SourceCategory, SourceDescriptor, TrustTier};

const GENERAL: &str = include_str!("fixtures/general_rss.xml");
const REDDIT: &str = include_str!("fixtures/reddit_atom.xml");
const RELEASES: &str = include_str!("fixtures/github_releases.xml");
const HN: &str = include_str!("fixtures/hn_rss.xml");

fn general() -> SourceDescriptor {
    SourceDescriptor::new(
        "AI News Daily",
        "https://news.example.test/feed",
        SourceCategory::GeneralFeed,
        TrustTier::High,
    )
}

fn reddit() -> SourceDescriptor {
    SourceDescriptor::new(
        "Reddit MachineLearning",
        "https://www.reddit.com/r/MachineLearning/.rss",
        SourceCategory::Discussion,
        TrustTier::Community,
    )
}

fn releases() -> SourceDescriptor {
    SourceDescriptor::new(
        "OpenAI Python SDK",
        "https://github.com/openai/openai-python/releases.atom",
        SourceCategory::Release,
        TrustTier::High,
    )
    .organization("OpenAI")
}

fn hn() -> SourceDescriptor {
    SourceDescriptor::new(
        "Hacker News AI",
        "https://hnrss.org/newest?q=AI",
        SourceCategory::Discussion,
        TrustTier::Medium,
    )
}

#[test]
fn general_feed_keeps_titled_entries_and_prefers_full_content() {
    let out = adapt_document(GENERAL, &general(), &AdapterSettings::default());
    assert!(out.error.is_none());
    assert_eq!(out.articles.len(), 4);
    assert_eq!(out.skipped, 1);
    assert_eq!(out.rejected, 0);

    let gpt = &out.articles[0];
    assert_eq!(gpt.title, "OpenAI Announces GPT-5 with Advanced Reasoning");
    assert!(gpt.body.contains("artificial intelligence reasoning capabilities"));
    assert_eq!(gpt.source, "AI News Daily");
    assert_eq!(gpt.trust, TrustTier::High);
    assert_eq!(gpt.category, SourceCategory::GeneralFeed);

    assert_eq!(out.articles[3].title, "10 Amazing AI Tricks You Won't Believe!");
}

#[test]
fn general_feed_respects_max_items() {
    let settings = AdapterSettings {
        max_items: 2,
        ..AdapterSettings::default()
    };
    let out = adapt_document(GENERAL, &general(), &settings);
    assert_eq!(out.articles.len(), 2);
    assert_eq!(out.skipped, 0);
}

#[test]
fn reddit_feed_cleans_titles_and_gates_questions() {
    let out = adapt_document(REDDIT, &reddit(), &AdapterSettings::default());
    assert!(out.error.is_none());
    assert_eq!(out.articles.len(), 2);
    assert_eq!(out.rejected, 2);

    let first = &out.articles[0];
    assert_eq!(
        first.title,
        "Thoughts on scaling laws for large language model training"
    );
    assert!(!first.body.contains("submitted by"));
    assert!(!first.body.contains("[comments]"));
    let meta = first.discussion().expect("discussion metadata");
    assert_eq!(meta.post_type, PostType::Discussion);
    assert_eq!(meta.venue.as_deref(), Some("r/MachineLearning"));
    assert_eq!(meta.author.as_deref(), Some("/u/alice_ml"));
    assert_eq!(meta.context.technical_level, "high");

    let second = out.articles[1].discussion().expect("discussion metadata");
    assert_eq!(out.articles[1].title, "New paper: retrieval-augmented generation benchmark");
    assert_eq!(second.post_type, PostType::News);
}

#[test]
fn hn_feed_items_are_external_links_without_chrome() {
    let out = adapt_document(HN, &hn(), &AdapterSettings::default());
    assert_eq!(out.articles.len(), 3);
    for a in &out.articles {
        let meta = a.discussion().expect("discussion metadata");
        assert_eq!(meta.post_type, PostType::ExternalLink);
        assert!(!a.body.to_lowercase().contains("comments"));
    }
    assert_eq!(out.articles[0].body.lines().count(), 2);
    assert_eq!(
        out.articles[0].discussion().and_then(|m| m.author.as_deref()),
        Some("jl")
    );
}

#[test]
fn release_feed_extracts_metadata_and_drops_featureless_patch() {
    let out = adapt_document(RELEASES, &releases(), &AdapterSettings::default());
    assert!(out.error.is_none());
    assert_eq!(out.articles.len(), 2);
    assert_eq!(out.rejected, 1);

    let stable = &out.articles[0];
    assert_eq!(stable.title, "Release v1.40.0");
    assert!(!stable.body.contains("Full Changelog"));
    let meta = stable.release().expect("release metadata");
    assert_eq!(meta.repository.as_deref(), Some("openai/openai-python"));
    assert_eq!(meta.version.as_deref(), Some("1.40.0"));
    assert_eq!(meta.kind, ReleaseKind::Release);
    assert!(!meta.prerelease);
    assert_eq!(meta.features.len(), 2);
    assert_eq!(meta.features[0], "add structured response support for gpt-4o models");
    assert_eq!(meta.bug_fixes, vec!["retry on connection reset while streaming".to_string()]);
    assert_eq!(meta.context.importance, "high");

    let beta = out.articles[1].release().expect("release metadata");
    assert_eq!(beta.kind, ReleaseKind::Prerelease);
    assert!(beta.prerelease);
    assert_eq!(beta.version.as_deref(), Some("2.0.0-beta.1"));
}

#[test]
fn prereleases_need_an_allowlisted_repository() {
    let settings = AdapterSettings {
        release_allowlist: vec![],
        ..AdapterSettings::default()
    };
    let out = adapt_document(RELEASES, &releases(), &settings);
    assert_eq!(out.articles.len(), 1);
    assert_eq!(out.rejected, 2);
    assert_eq!(out.articles[0].title, "Release v1.40.0");
}

#[test]
fn garbage_document_fails_the_whole_source() {
    let out = adapt_document("<html><body>not a feed</body></html>", &general(), &AdapterSettings::default());
    assert!(out.articles.is_empty());
    assert!(out.error.is_some());
}
