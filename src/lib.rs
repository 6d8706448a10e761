/// Manga Notifier
///
/// Watches a community discussion feed and turns free-text post titles into
/// structured "new chapter released" events.
///
/// A submission flows one way: feed -> `SubmissionFilter` -> `TitleParser` -> `EpisodeSink`.
/// Nothing is remembered between submissions.

pub mod config;
pub mod feed;
pub mod filter;
pub mod models;
pub mod parser;
pub mod processor;
pub mod sink;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::feed::{JsonLinesFeed, MemoryFeed, Pull, RedditFeed, SubmissionFeed};
pub use crate::filter::{FilterVerdict, RejectReason, SubmissionFilter};
pub use crate::models::{Episode, Submission};
pub use crate::parser::{ParsedTitle, RuleKind, TitleParser};
pub use crate::processor::{ProcessorStats, StreamProcessor};
pub use crate::sink::{ConsoleSink, EpisodeSink, OutputFormat};

/// Result type for notifier operations
pub type Result<T> = std::result::Result<T, NotifierError>;

/// Error types for notifier operations
#[derive(thiserror::Error, Debug)]
pub enum NotifierError {
    #[error("Invalid title pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Rule {rule:?} matched without a `{group}` capture")]
    MissingCapture { rule: RuleKind, group: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid feed URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Sink error: {0}")]
    Sink(String),
}
