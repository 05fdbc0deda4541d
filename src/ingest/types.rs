// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::sources::{SourceCategory, SourceDescriptor, TrustTier};

/// One item as delivered by a feed, after date parsing but before any
/// adapter-specific cleanup. `body` still carries markup.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author: Option<String>,
    pub categories: Vec<String>,
}

/// Post classification for discussion venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Question,
    Discussion,
    News,
    ExternalLink,
    Tutorial,
    General,
}

/// Release classification for release feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseKind {
    Prerelease,
    Patch,
    Major,
    Minor,
    Release,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueContext {
    pub focus: String,
    pub technical_level: String,
    pub industries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoContext {
    pub organization: String,
    pub focus: String,
    pub importance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionMeta {
    pub venue: Option<String>,
    pub author: Option<String>,
    pub post_type: PostType,
    pub comment_count: Option<u32>,
    pub context: VenueContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseMeta {
    pub repository: Option<String>,
    pub version: Option<String>,
    pub kind: ReleaseKind,
    pub prerelease: bool,
    pub breaking: bool,
    pub features: Vec<String>,
    pub bug_fixes: Vec<String>,
    pub context: RepoContext,
}

/// Adapter-specific metadata carried alongside the common article shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "adapter", rename_all = "snake_case")]
pub enum AdapterMeta {
    General,
    Discussion(DiscussionMeta),
    Release(ReleaseMeta),
}

/// Common article shape produced by every adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedArticle {
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub trust: TrustTier,
    pub weight: f32,
    pub category: SourceCategory,
    pub organization: Option<String>,
    pub meta: AdapterMeta,
}

impl NormalizedArticle {
    /// Attach source descriptor fields to cleaned entry fields.
    pub fn from_source(
        source: &SourceDescriptor,
        title: String,
        body: String,
        link: Option<String>,
        published_at: DateTime<Utc>,
        meta: AdapterMeta,
    ) -> Self {
        Self {
            title,
            body,
            link,
            published_at,
            source: source.name.clone(),
            trust: source.trust,
            weight: source.weight,
            category: source.category,
            organization: source.organization.clone(),
            meta,
        }
    }

    pub fn discussion(&self) -> Option<&DiscussionMeta> {
        match &self.meta {
            AdapterMeta::Discussion(d) => Some(d),
            _ => None,
        }
    }

    pub fn release(&self) -> Option<&ReleaseMeta> {
        match &self.meta {
            AdapterMeta::Release(r) => Some(r),
            _ => None,
        }
    }
}

/// Transient failures at the fetch boundary. Never escapes an adapter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Http(String),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed feed document: {0}")]
    Parse(String),
    #[error("document is neither RSS nor Atom")]
    UnsupportedFormat,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err.to_string())
    }
}

/// Adapter-local reasons for dropping an entry before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    TooShort,
    Question,
    NoiseMarker,
    ThinContent,
    NoRepository,
    UnlistedPrerelease,
    FeaturelessPatch,
    ThinNotes,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::TooShort => "too_short",
            Rejection::Question => "question",
            Rejection::NoiseMarker => "noise_marker",
            Rejection::ThinContent => "thin_content",
            Rejection::NoRepository => "no_repository",
            Rejection::UnlistedPrerelease => "unlisted_prerelease",
            Rejection::FeaturelessPatch => "featureless_patch",
            Rejection::ThinNotes => "thin_notes",
        }
    }
}
