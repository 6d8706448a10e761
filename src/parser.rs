/// Title parsing: turns a free-text post title into a work title and chapter number
///
/// Most posts put the work title first ("Some Manga Ch. 12"), a few put the chapter first
/// ("Chapter 12 Some Manga"). Both shapes are tried in that order; a title-first match whose
/// title capture is blank is treated as a misread chapter-first post.
use crate::models::Episode;
use crate::{NotifierError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TITLE_GROUP: &str = "title";
const CHAPTER_GROUP: &str = "chapter";

/// Characters allowed between the work title and the chapter marker:
/// space, colon, pipe, bullet, middle dot, hyphen, en dash, em dash.
const SEPARATOR_CLASS: &str = r"[ :|•·\-–—]";

/// Optional leading discussion tag, e.g. "[DISC] "
const DISCUSSION_TAG: &str = r"(?:\[disc\] ?)?";

/// "ch", "ch." or "chapter", optionally followed by a space
const CHAPTER_MARKER: &str = r"(?:ch(?:\.?|apter)) ?";

/// Digits with an optional fractional part, kept as text
const CHAPTER_NUMBER: &str = r"(?P<chapter>\d+(?:\.\d+)?)";

/// Which title shape a rule recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// "Some Manga - Vol. 2 Ch. 14"
    TitleFirst,
    /// "Chapter 14 Some Manga"
    ChapterFirst,
}

/// Successful parse of a post title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    /// Work title, trimmed and non-blank
    pub title: String,
    /// Chapter number exactly as captured
    pub chapter: String,
    /// Rule that produced this result
    pub rule: RuleKind,
}

impl ParsedTitle {
    pub fn into_episode(self, url: impl Into<String>) -> Episode {
        Episode {
            title: self.title,
            chapter: self.chapter,
            url: url.into(),
        }
    }
}

/// A single compiled extraction rule
#[derive(Debug, Clone)]
struct TitleRule {
    kind: RuleKind,
    pattern: Regex,
}

impl TitleRule {
    fn new(kind: RuleKind, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)?;

        for group in [TITLE_GROUP, CHAPTER_GROUP] {
            if !pattern.capture_names().flatten().any(|name| name == group) {
                return Err(NotifierError::MissingCapture { rule: kind, group });
            }
        }

        Ok(Self { kind, pattern })
    }

    /// Apply the rule; a match with a blank title counts as no match.
    fn apply(&self, text: &str) -> Result<Option<ParsedTitle>> {
        let Some(captures) = self.pattern.captures(text) else {
            return Ok(None);
        };

        let title = captures
            .name(TITLE_GROUP)
            .ok_or(NotifierError::MissingCapture { rule: self.kind, group: TITLE_GROUP })?
            .as_str();
        let chapter = captures
            .name(CHAPTER_GROUP)
            .ok_or(NotifierError::MissingCapture { rule: self.kind, group: CHAPTER_GROUP })?
            .as_str();

        let title = title.trim();
        if title.is_empty() {
            debug!("{:?} matched '{}' with a blank title, discarding", self.kind, text);
            return Ok(None);
        }

        Ok(Some(ParsedTitle {
            title: title.to_string(),
            chapter: chapter.to_string(),
            rule: self.kind,
        }))
    }
}

/// Ordered rule table for extracting `(title, chapter)` from post titles
#[derive(Debug, Clone)]
pub struct TitleParser {
    rules: Vec<TitleRule>,
}

impl TitleParser {
    /// Compile the rule table
    pub fn new() -> Result<Self> {
        let title_first = format!(
            r"(?i)^{tag}(?P<title>.+?)(?: ?\(?|{sep}*| ?vol\..*?){marker}{number}.*",
            tag = DISCUSSION_TAG,
            sep = SEPARATOR_CLASS,
            marker = CHAPTER_MARKER,
            number = CHAPTER_NUMBER,
        );
        let chapter_first = format!(
            r"(?i)^{tag}{marker}{number} (?P<title>.+)",
            tag = DISCUSSION_TAG,
            marker = CHAPTER_MARKER,
            number = CHAPTER_NUMBER,
        );

        Ok(Self {
            rules: vec![
                TitleRule::new(RuleKind::TitleFirst, &title_first)?,
                TitleRule::new(RuleKind::ChapterFirst, &chapter_first)?,
            ],
        })
    }

    /// Build a parser from a custom rule table, tried in the given order. Every pattern
    /// must declare both the `title` and `chapter` groups.
    pub fn from_patterns(patterns: &[(RuleKind, &str)]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|&(kind, pattern)| TitleRule::new(kind, pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Rule kinds in evaluation order
    pub fn rules(&self) -> Vec<RuleKind> {
        self.rules.iter().map(|rule| rule.kind).collect()
    }

    /// Parse a post title.
    ///
    /// Returns `Ok(None)` when no rule yields a non-blank title. Errors only signal a
    /// broken rule table, never bad input.
    pub fn parse(&self, text: &str) -> Result<Option<ParsedTitle>> {
        for rule in &self.rules {
            if let Some(parsed) = rule.apply(text)? {
                debug!("Parsed '{}' with {:?}: {:?}", text, rule.kind, parsed);
                return Ok(Some(parsed));
            }
        }

        Ok(None)
    }
}
