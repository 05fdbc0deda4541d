// src/relevance.rs
//! AI-topic and industry relevance scoring.
//!
//! Scoring is a pure function of title, body, trust tier and (optionally)
//! the source category: the keyword tables are constants, nothing is cached
//! between calls, and identical input yields an identical `ScoreResult`.

use once_cell::sync::OnceCell;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ingest::types::NormalizedArticle;
use crate::sources::{SourceCategory, TrustTier};

pub const DEFAULT_MIN_SCORE: f32 = 0.3;

/// Overall score multiplier applied to noisy content.
pub const NOISE_PENALTY: f32 = 0.1;

const AI_WEIGHT: f32 = 0.6;
const INDUSTRY_WEIGHT: f32 = 0.4;

/// One weighted family of AI-topic terms.
pub struct KeywordCategory {
    pub name: &'static str,
    pub weight: f32,
    pub terms: &'static [&'static str],
}

pub const AI_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        name: "core_ai",
        weight: 3.0,
        terms: &[
            "artificial intelligence",
            "machine learning",
            "deep learning",
            "neural network",
            "natural language processing",
            "computer vision",
            "large language model",
            "llm",
            "generative ai",
            "foundation model",
        ],
    },
    KeywordCategory {
        name: "ai_products",
        weight: 2.5,
        terms: &[
            "gpt",
            "claude",
            "gemini",
            "chatgpt",
            "copilot",
            "bard",
            "dall-e",
            "midjourney",
            "stable diffusion",
            "openai",
            "anthropic",
            "hugging face",
            "langchain",
        ],
    },
    KeywordCategory {
        name: "ai_techniques",
        weight: 2.0,
        terms: &[
            "transformer",
            "attention mechanism",
            "fine-tuning",
            "rlhf",
            "prompt engineering",
            "few-shot learning",
            "zero-shot",
            "reinforcement learning",
            "supervised learning",
            "unsupervised learning",
        ],
    },
    KeywordCategory {
        name: "ai_applications",
        weight: 1.5,
        terms: &[
            "chatbot",
            "virtual assistant",
            "automation",
            "predictive analytics",
            "recommendation system",
            "fraud detection",
            "sentiment analysis",
            "image recognition",
            "speech recognition",
            "text generation",
        ],
    },
    KeywordCategory {
        name: "ai_infrastructure",
        weight: 1.0,
        terms: &[
            "gpu",
            "tpu",
            "cuda",
            "pytorch",
            "tensorflow",
            "mlops",
            "model deployment",
            "inference",
            "training",
            "vector database",
        ],
    },
];

pub const INDUSTRIES: &[(&str, &[&str])] = &[
    (
        "utilities",
        &[
            "smart grid",
            "energy management",
            "demand response",
            "load balancing",
            "renewable energy",
            "power generation",
            "grid optimization",
            "electric vehicle",
            "charging infrastructure",
            "outage prediction",
        ],
    ),
    (
        "financial",
        &[
            "fintech",
            "fraud detection",
            "risk management",
            "algorithmic trading",
            "credit scoring",
            "compliance",
            "regulatory",
            "blockchain",
            "cryptocurrency",
            "payment processing",
            "robo-advisor",
        ],
    ),
    (
        "healthcare",
        &[
            "medical diagnosis",
            "drug discovery",
            "clinical trial",
            "medical imaging",
            "electronic health record",
            "telemedicine",
            "genomics",
            "precision medicine",
            "patient monitoring",
        ],
    ),
    (
        "manufacturing",
        &[
            "industrial automation",
            "predictive maintenance",
            "quality control",
            "supply chain",
            "robotics",
            "digital twin",
            "iot sensors",
            "production optimization",
            "defect detection",
        ],
    ),
];

const ANNOUNCEMENT_CUES: &[&str] = &[
    "announce",
    "launch",
    "introduce",
    "unveil",
    "release",
    "available now",
    "coming soon",
    "new feature",
];
const RESEARCH_CUES: &[&str] = &[
    "research",
    "study",
    "paper",
    "findings",
    "methodology",
    "experiment",
    "analysis",
    "survey",
];
const OPINION_CUES: &[&str] = &[
    "opinion",
    "analysis",
    "perspective",
    "think",
    "believe",
    "future of",
    "trend",
    "prediction",
];

const NOISE_PATTERNS: &[&str] = &[
    r"click here",
    r"subscribe now",
    r"limited time",
    r"you won't believe",
    r"shocking",
    r"amazing trick",
    r"[0-9]+ ways to",
    r"ultimate guide",
    r"secret",
    r"deleted.*comment",
    r"removed.*moderator",
];

const MAX_TITLE_MARKS: usize = 2;
const MAX_TITLE_UPPER_RATIO: f32 = 0.3;
const MIN_NOISE_BODY_CHARS: usize = 50;

fn noise_set() -> &'static RegexSet {
    static SET: OnceCell<RegexSet> = OnceCell::new();
    SET.get_or_init(|| RegexSet::new(NOISE_PATTERNS).unwrap())
}

pub fn known_industries() -> impl Iterator<Item = &'static str> {
    INDUSTRIES.iter().map(|(name, _)| *name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceTier {
    None,
    Low,
    Medium,
    High,
}

impl RelevanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelevanceTier::None => "none",
            RelevanceTier::Low => "low",
            RelevanceTier::Medium => "medium",
            RelevanceTier::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    ProductAnnouncement,
    ResearchPaper,
    CompanyNews,
    TechnicalUpdate,
    OpinionAnalysis,
    CommunityDiscussion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub relevance: RelevanceTier,
    /// Confidence in `relevance`, in [0,1]; 0 when the tier is `None`.
    pub confidence: f32,
    /// Length-normalized weighted keyword score.
    pub raw_score: f32,
    pub industries: BTreeMap<String, f32>,
    pub content_type: ContentType,
    pub noise: bool,
    /// Overall score before the noise penalty.
    pub base_score: f32,
    pub overall: f32,
}

impl ScoreResult {
    pub fn max_industry(&self) -> f32 {
        self.industries.values().copied().fold(0.0, f32::max)
    }
}

/// Inclusion decision: not noise, tier above `None`, overall at least
/// `min_score`.
pub fn should_include(result: &ScoreResult, min_score: f32) -> bool {
    !result.noise && result.relevance != RelevanceTier::None && result.overall >= min_score
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceScorer {
    pub min_score: f32,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

impl RelevanceScorer {
    pub fn new(min_score: f32) -> Self {
        Self {
            min_score: min_score.clamp(0.0, 1.0),
        }
    }

    /// Score free text. `targets` empty or `None` means every known industry.
    pub fn score(
        &self,
        title: &str,
        body: &str,
        trust: TrustTier,
        targets: Option<&[String]>,
    ) -> ScoreResult {
        score_text(title, body, trust, None, targets)
    }

    /// Score an adapter output; the source category feeds content typing.
    pub fn score_article(&self, article: &NormalizedArticle, targets: Option<&[String]>) -> ScoreResult {
        score_text(
            &article.title,
            &article.body,
            article.trust,
            Some(article.category),
            targets,
        )
    }

    pub fn should_include(&self, result: &ScoreResult) -> bool {
        should_include(result, self.min_score)
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count().max(1)
}

fn distinct_hits(text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|t| text.contains(*t)).count()
}

/// (tier, confidence, normalized score)
pub fn assess_ai_relevance(text: &str) -> (RelevanceTier, f32, f32) {
    let weighted: f32 = AI_CATEGORIES
        .iter()
        .map(|c| distinct_hits(text, c.terms) as f32 * c.weight)
        .sum();
    let s = weighted / (word_count(text) as f32 / 100.0).max(1.0);

    if s >= 2.0 {
        (RelevanceTier::High, (s / 5.0).min(1.0), s)
    } else if s >= 1.0 {
        (RelevanceTier::Medium, (s / 3.0).min(1.0), s)
    } else if s >= 0.3 {
        (RelevanceTier::Low, (s / 1.5).min(1.0), s)
    } else {
        (RelevanceTier::None, 0.0, s)
    }
}

/// Per-industry relevance in [0,1]. Unknown industry names are ignored.
pub fn assess_industries(text: &str, targets: Option<&[String]>) -> BTreeMap<String, f32> {
    let length_factor = (word_count(text) as f32 / 200.0).max(1.0);
    let wanted = |name: &str| match targets {
        Some(t) if !t.is_empty() => t.iter().any(|x| x.eq_ignore_ascii_case(name)),
        _ => true,
    };
    INDUSTRIES
        .iter()
        .filter(|(name, _)| wanted(*name))
        .map(|(name, terms)| {
            let hits = distinct_hits(text, terms) as f32;
            let v = hits / (terms.len() as f32 * length_factor);
            (name.to_string(), v.clamp(0.0, 1.0))
        })
        .collect()
}

/// Ordered precedence: source category first, then text cues.
pub fn classify_content(text: &str, category: Option<SourceCategory>) -> ContentType {
    match category {
        Some(SourceCategory::Release) => return ContentType::TechnicalUpdate,
        Some(SourceCategory::Discussion) => return ContentType::CommunityDiscussion,
        _ => {}
    }
    let any = |cues: &[&str]| cues.iter().any(|c| text.contains(c));
    if any(ANNOUNCEMENT_CUES) {
        ContentType::ProductAnnouncement
    } else if any(RESEARCH_CUES) {
        ContentType::ResearchPaper
    } else if any(OPINION_CUES) {
        ContentType::OpinionAnalysis
    } else {
        ContentType::CompanyNews
    }
}

pub fn is_noise(title: &str, body: &str, lowered: &str) -> bool {
    if noise_set().is_match(lowered) {
        return true;
    }
    if title.matches('!').count() > MAX_TITLE_MARKS || title.matches('?').count() > MAX_TITLE_MARKS {
        return true;
    }
    let total = title.chars().count().max(1);
    let upper = title.chars().filter(|c| c.is_uppercase()).count();
    if upper as f32 / total as f32 > MAX_TITLE_UPPER_RATIO {
        return true;
    }
    body.trim().chars().count() < MIN_NOISE_BODY_CHARS
}

fn score_text(
    title: &str,
    body: &str,
    trust: TrustTier,
    category: Option<SourceCategory>,
    targets: Option<&[String]>,
) -> ScoreResult {
    let text = format!("{title} {body}").to_lowercase();

    let (relevance, confidence, raw_score) = assess_ai_relevance(&text);
    let industries = assess_industries(&text, targets);
    let content_type = classify_content(&text, category);
    let noise = is_noise(title, body, &text);

    let max_industry = industries.values().copied().fold(0.0, f32::max);
    let base_score = (confidence * AI_WEIGHT + max_industry * INDUSTRY_WEIGHT) * trust.multiplier();
    let overall = if noise {
        base_score * NOISE_PENALTY
    } else {
        base_score
    };

    ScoreResult {
        relevance,
        confidence,
        raw_score,
        industries,
        content_type,
        noise,
        base_score,
        overall,
    }
}
