// src/ingest/mod.rs
//! Feed retrieval and per-category normalization.

pub mod adapters;
pub mod feed;
pub mod text;
pub mod transport;
pub mod types;

pub use adapters::{adapt_document, fetch, AdapterSettings, FetchOutcome};
pub use text::normalize_text;
pub use transport::{FeedTransport, FixtureTransport, HttpTransport};
pub use types::{
    AdapterMeta, DiscussionMeta, FetchError, NormalizedArticle, PostType, RawEntry, Rejection,
    ReleaseKind, ReleaseMeta,
};
