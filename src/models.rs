//! Submission and episode records

use serde::{Deserialize, Serialize};
use std::fmt;

/// One incoming post record from the monitored feed
///
/// Feeds normalize whatever their upstream returns into this shape; the filter and
/// parser never look at anything else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    /// Free-text post title, the only field that gets parsed
    pub title: String,

    /// Link target, carried through untouched
    pub url: String,

    /// True if the post has no external link
    #[serde(default)]
    pub is_self_post: bool,

    /// Categorical tag; `None` when the post is unlabeled
    #[serde(default)]
    pub flair_label: Option<String>,

    /// True if the link resolves to the platform's own media host
    #[serde(default)]
    pub is_hosted_media_domain: bool,
}

impl Submission {
    /// Create a plain link submission with no flair
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            is_self_post: false,
            flair_label: None,
            is_hosted_media_domain: false,
        }
    }

    pub fn with_flair(mut self, flair: impl Into<String>) -> Self {
        self.flair_label = Some(flair.into());
        self
    }

    pub fn with_self_post(mut self, is_self_post: bool) -> Self {
        self.is_self_post = is_self_post;
        self
    }

    pub fn with_hosted_media(mut self, is_hosted_media_domain: bool) -> Self {
        self.is_hosted_media_domain = is_hosted_media_domain;
        self
    }
}

/// A detected chapter release
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Episode {
    /// Work name, trimmed and never blank
    pub title: String,

    /// Chapter number exactly as written in the post title (e.g. "142", "10.5")
    pub chapter: String,

    /// Copied verbatim from the source submission
    pub url: String,
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - Chapter {} <{}>", self.title, self.chapter, self.url)
    }
}
