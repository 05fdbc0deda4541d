//! # Source Registry
//!
//! Static catalog of feed sources (endpoint, category, trust tier, owning
//! organization, industry tags, weight).
//!
//! - Built once at process start, either from a catalog file (TOML or JSON)
//!   or from the built-in `default_catalog()`.
//! - Read-only for the lifetime of a pipeline run; lookups never panic.
//! - Case-insensitive filters for industry tags and organizations.
//!
//! Adding a source means adding a descriptor; adapters are chosen by
//! `SourceCategory`, never by source name.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_SOURCES_PATH: &str = "SOURCES_PATH";
pub const DEFAULT_SOURCES_TOML: &str = "config/sources.toml";
pub const DEFAULT_SOURCES_JSON: &str = "config/sources.json";

/// Document family served by a source; selects the fetch adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceCategory {
    GeneralFeed,
    Discussion,
    Release,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::GeneralFeed => "general-feed",
            SourceCategory::Discussion => "discussion",
            SourceCategory::Release => "release",
        }
    }
}

/// Coarse reliability class of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustTier {
    High,
    Medium,
    Community,
    #[serde(other)]
    Unknown,
}

impl TrustTier {
    /// Multiplicative bias applied to the relevance score.
    pub fn multiplier(&self) -> f32 {
        match self {
            TrustTier::High => 1.0,
            TrustTier::Medium => 0.8,
            TrustTier::Community => 0.6,
            TrustTier::Unknown => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustTier::High => "high",
            TrustTier::Medium => "medium",
            TrustTier::Community => "community",
            TrustTier::Unknown => "unknown",
        }
    }
}

/// One catalog entry. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub endpoint: String,
    pub category: SourceCategory,
    pub trust: TrustTier,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl SourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        category: SourceCategory,
        trust: TrustTier,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            category,
            trust,
            organization: None,
            industries: Vec::new(),
            weight: default_weight(),
        }
    }

    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    pub fn industries(mut self, tags: &[&str]) -> Self {
        self.industries = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn weight(mut self, w: f32) -> Self {
        self.weight = w;
        self
    }

    pub fn has_industry(&self, tag: &str) -> bool {
        let t = normalize(tag);
        self.industries.iter().any(|i| normalize(i) == t)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("source not found: {0}")]
    NotFound(String),
    #[error("duplicate source name: {0}")]
    DuplicateSource(String),
    #[error("source `{name}` has an invalid endpoint: {endpoint}")]
    InvalidEndpoint { name: String, endpoint: String },
}

/// Counts over the catalog, keyed by the string form of each dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStatistics {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_trust: BTreeMap<String, usize>,
    pub by_organization: BTreeMap<String, usize>,
}

/// Ordered, name-indexed source catalog.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    /// Build a registry, rejecting duplicate names and unparsable endpoints.
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, RegistryError> {
        let mut reg = Self::default();
        for s in sources {
            reg.push(s)?;
        }
        Ok(reg)
    }

    /// Append one more descriptor at construction time.
    pub fn with_source(mut self, source: SourceDescriptor) -> Result<Self, RegistryError> {
        self.push(source)?;
        Ok(self)
    }

    fn push(&mut self, source: SourceDescriptor) -> Result<(), RegistryError> {
        if url::Url::parse(&source.endpoint).is_err() {
            return Err(RegistryError::InvalidEndpoint {
                name: source.name,
                endpoint: source.endpoint,
            });
        }
        if self.index.contains_key(&source.name) {
            return Err(RegistryError::DuplicateSource(source.name));
        }
        self.index.insert(source.name.clone(), self.sources.len());
        self.sources.push(source);
        Ok(())
    }

    /// All sources in catalog order.
    pub fn list_sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Exact-name lookup. Callers treat `NotFound` as a skip condition.
    pub fn get(&self, name: &str) -> Result<&SourceDescriptor, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.sources[i])
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn filter_by_industry(&self, tag: &str) -> Vec<&SourceDescriptor> {
        self.sources.iter().filter(|s| s.has_industry(tag)).collect()
    }

    pub fn filter_by_trust_tier(&self, tier: TrustTier) -> Vec<&SourceDescriptor> {
        self.sources.iter().filter(|s| s.trust == tier).collect()
    }

    pub fn filter_by_category(&self, category: SourceCategory) -> Vec<&SourceDescriptor> {
        self.sources
            .iter()
            .filter(|s| s.category == category)
            .collect()
    }

    pub fn filter_by_organization(&self, org: &str) -> Vec<&SourceDescriptor> {
        let o = normalize(org);
        self.sources
            .iter()
            .filter(|s| s.organization.as_deref().map(normalize).as_deref() == Some(o.as_str()))
            .collect()
    }

    pub fn statistics(&self) -> SourceStatistics {
        let mut stats = SourceStatistics {
            total: self.sources.len(),
            ..Default::default()
        };
        for s in &self.sources {
            *stats
                .by_category
                .entry(s.category.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_trust
                .entry(s.trust.as_str().to_string())
                .or_insert(0) += 1;
            if let Some(org) = &s.organization {
                *stats.by_organization.entry(org.clone()).or_insert(0) += 1;
            }
        }
        stats
    }

    /* ----------------------------
    Loading
    ---------------------------- */

    /// Load a catalog file. TOML uses `[[sources]]` tables; JSON is either a
    /// bare array or `{"sources": [...]}`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading source catalog from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let sources = parse_catalog(&content, &ext)?;
        Self::new(sources).with_context(|| format!("validating catalog {}", path.display()))
    }

    /// Resolution order:
    /// 1) $SOURCES_PATH
    /// 2) config/sources.toml
    /// 3) config/sources.json
    /// 4) built-in default catalog
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("SOURCES_PATH points to non-existent path"));
        }
        for candidate in [DEFAULT_SOURCES_TOML, DEFAULT_SOURCES_JSON] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Self::new(default_catalog()).map_err(|e| anyhow!("built-in catalog invalid: {e}"))
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    sources: Vec<SourceDescriptor>,
}

fn parse_catalog(s: &str, hint_ext: &str) -> Result<Vec<SourceDescriptor>> {
    if hint_ext == "toml" {
        let v: CatalogFile = toml::from_str(s).context("parsing TOML source catalog")?;
        return Ok(v.sources);
    }
    if let Ok(v) = serde_json::from_str::<Vec<SourceDescriptor>>(s) {
        return Ok(v);
    }
    if let Ok(v) = serde_json::from_str::<CatalogFile>(s) {
        return Ok(v.sources);
    }
    let v: CatalogFile = toml::from_str(s).map_err(|_| anyhow!("unsupported catalog format"))?;
    Ok(v.sources)
}

/// Built-in catalog: news sites, official vendor blogs, discussion venues
/// and SDK release feeds.
pub fn default_catalog() -> Vec<SourceDescriptor> {
    use SourceCategory::{Discussion, GeneralFeed, Release};
    use TrustTier::{Community, High, Medium};

    vec![
        SourceDescriptor::new(
            "TechCrunch AI",
            "https://techcrunch.com/category/artificial-intelligence/feed/",
            GeneralFeed,
            Medium,
        )
        .industries(&["technology", "financial", "utilities"]),
        SourceDescriptor::new(
            "VentureBeat AI",
            "https://venturebeat.com/ai/feed/",
            GeneralFeed,
            Medium,
        )
        .industries(&["technology", "financial"]),
        SourceDescriptor::new(
            "MIT Tech Review AI",
            "https://www.technologyreview.com/topic/artificial-intelligence/feed/",
            GeneralFeed,
            High,
        )
        .industries(&["technology", "healthcare", "utilities"]),
        SourceDescriptor::new(
            "AI News",
            "https://artificialintelligence-news.com/feed/",
            GeneralFeed,
            Medium,
        ),
        SourceDescriptor::new(
            "Google AI Blog",
            "https://blog.google/technology/ai/rss/",
            GeneralFeed,
            High,
        )
        .organization("Google")
        .industries(&["technology", "healthcare", "utilities"])
        .weight(1.5),
        SourceDescriptor::new(
            "Google Cloud Blog",
            "https://cloud.google.com/blog/rss/",
            GeneralFeed,
            High,
        )
        .organization("Google")
        .industries(&["utilities", "financial", "healthcare"])
        .weight(1.5),
        SourceDescriptor::new(
            "Microsoft Blog",
            "https://blogs.microsoft.com/feed/",
            GeneralFeed,
            High,
        )
        .organization("Microsoft")
        .industries(&["technology", "financial", "utilities"])
        .weight(1.5),
        SourceDescriptor::new(
            "AWS News Blog",
            "https://aws.amazon.com/blogs/aws/feed/",
            GeneralFeed,
            High,
        )
        .organization("Amazon")
        .industries(&["utilities", "financial", "technology"])
        .weight(1.5),
        SourceDescriptor::new("Meta AI Blog", "https://ai.meta.com/feed.xml", GeneralFeed, High)
            .organization("Meta")
            .industries(&["technology"])
            .weight(1.3),
        SourceDescriptor::new("NVIDIA Blog", "https://blogs.nvidia.com/feed/", GeneralFeed, High)
            .organization("NVIDIA")
            .industries(&["utilities", "healthcare", "manufacturing"])
            .weight(1.4),
        SourceDescriptor::new(
            "Anthropic News",
            "https://www.anthropic.com/news/rss.xml",
            GeneralFeed,
            High,
        )
        .organization("Anthropic")
        .industries(&["technology", "financial"])
        .weight(1.3),
        SourceDescriptor::new("OpenAI Blog", "https://openai.com/blog/rss.xml", GeneralFeed, High)
            .organization("OpenAI")
            .industries(&["technology", "financial", "healthcare"])
            .weight(1.5),
        SourceDescriptor::new(
            "Reddit MachineLearning",
            "https://www.reddit.com/r/MachineLearning/.rss",
            Discussion,
            Community,
        )
        .industries(&["technology"])
        .weight(0.8),
        SourceDescriptor::new(
            "Reddit OpenAI",
            "https://www.reddit.com/r/OpenAI/.rss",
            Discussion,
            Community,
        )
        .industries(&["technology"])
        .weight(0.7),
        SourceDescriptor::new(
            "Reddit LocalLLaMA",
            "https://www.reddit.com/r/LocalLLaMA/.rss",
            Discussion,
            Community,
        )
        .industries(&["technology", "utilities"])
        .weight(0.9),
        SourceDescriptor::new(
            "Reddit Artificial",
            "https://www.reddit.com/r/artificial/.rss",
            Discussion,
            Community,
        )
        .weight(0.6),
        SourceDescriptor::new(
            "Microsoft Semantic Kernel",
            "https://github.com/microsoft/semantic-kernel/releases.atom",
            Release,
            High,
        )
        .organization("Microsoft")
        .industries(&["technology", "financial"]),
        SourceDescriptor::new(
            "OpenAI Python SDK",
            "https://github.com/openai/openai-python/releases.atom",
            Release,
            High,
        )
        .organization("OpenAI")
        .industries(&["technology"]),
        SourceDescriptor::new(
            "LangChain",
            "https://github.com/langchain-ai/langchain/releases.atom",
            Release,
            High,
        )
        .industries(&["technology"]),
        SourceDescriptor::new(
            "Google Generative AI",
            "https://github.com/google/generative-ai-python/releases.atom",
            Release,
            High,
        )
        .organization("Google")
        .industries(&["technology"]),
        SourceDescriptor::new(
            "Hacker News AI",
            "https://hnrss.org/newest?q=AI+OR+artificial+intelligence+OR+machine+learning",
            Discussion,
            Community,
        )
        .weight(0.7),
    ]
}

/// Lowercase, fold separators to spaces, collapse whitespace.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_lowercase();
    for ch in ['—', '–', '-', '_', '/'] {
        out = out.replace(ch, " ");
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg() -> SourceRegistry {
        SourceRegistry::new(default_catalog()).expect("default catalog is valid")
    }

    #[test]
    fn default_catalog_loads_in_order() {
        let r = reg();
        assert_eq!(r.len(), 21);
        assert_eq!(r.list_sources()[0].name, "TechCrunch AI");
        assert_eq!(r.list_sources()[20].name, "Hacker News AI");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let r = reg();
        assert_eq!(
            r.get("Nope Daily"),
            Err(RegistryError::NotFound("Nope Daily".into()))
        );
        assert!(r.get("LangChain").is_ok());
    }

    #[test]
    fn duplicate_names_rejected() {
        let a = SourceDescriptor::new(
            "X",
            "https://x.test/feed",
            SourceCategory::GeneralFeed,
            TrustTier::High,
        );
        let err = SourceRegistry::new(vec![a.clone(), a]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSource("X".into()));
    }

    #[test]
    fn invalid_endpoint_rejected() {
        let a = SourceDescriptor::new(
            "Broken",
            "not a url",
            SourceCategory::GeneralFeed,
            TrustTier::High,
        );
        assert!(matches!(
            SourceRegistry::new(vec![a]),
            Err(RegistryError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn industry_and_org_filters_are_case_insensitive() {
        let r = reg();
        let health = r.filter_by_industry("Healthcare");
        assert!(health.iter().any(|s| s.name == "NVIDIA Blog"));
        assert!(health.iter().all(|s| s.has_industry("healthcare")));

        let google = r.filter_by_organization("GOOGLE");
        assert_eq!(google.len(), 3);
    }

    #[test]
    fn trust_and_category_filters() {
        let r = reg();
        assert_eq!(r.filter_by_trust_tier(TrustTier::Community).len(), 5);
        assert_eq!(r.filter_by_category(SourceCategory::Release).len(), 4);
    }

    #[test]
    fn statistics_count_every_dimension() {
        let st = reg().statistics();
        assert_eq!(st.total, 21);
        assert_eq!(st.by_category.get("discussion"), Some(&5));
        assert_eq!(st.by_trust.get("high"), Some(&13));
        assert_eq!(st.by_organization.get("Microsoft"), Some(&2));
    }

    #[test]
    fn unknown_trust_tier_deserializes_to_unknown() {
        let toml = r#"
[[sources]]
name = "Odd Blog"
endpoint = "https://odd.test/rss"
category = "general-feed"
trust = "experimental"
"#;
        let v = parse_catalog(toml, "toml").unwrap();
        assert_eq!(v[0].trust, TrustTier::Unknown);
        assert!((v[0].weight - 1.0).abs() < 1e-6);
        assert!((v[0].trust.multiplier() - 0.5).abs() < 1e-6);
    }
}
