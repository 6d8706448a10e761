/// Submission feeds
///
/// A feed hands out submissions one at a time in arrival order. Connection handling,
/// retries and normalization of upstream data all live here, so the filter and parser
/// only ever see well-formed `Submission` values.

pub mod json_lines;
pub mod reddit;

pub use json_lines::JsonLinesFeed;
pub use reddit::RedditFeed;

use crate::models::Submission;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;

/// Result of asking a feed for its next element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    /// A well-formed submission
    Item(Submission),
    /// A null or malformed element; skip it and ask again
    Absent,
    /// The feed has no more elements (finite feeds only)
    Closed,
}

/// Pull-based source of submissions
#[async_trait]
pub trait SubmissionFeed: Send {
    /// Wait for the next element. Live feeds may block for a long time.
    async fn next_submission(&mut self) -> Result<Pull>;
}

#[async_trait]
impl<F: SubmissionFeed + ?Sized> SubmissionFeed for Box<F> {
    async fn next_submission(&mut self) -> Result<Pull> {
        (**self).next_submission().await
    }
}

/// Finite in-memory feed; `None` entries stand for absent elements
#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    items: VecDeque<Option<Submission>>,
}

impl MemoryFeed {
    pub fn new(items: impl IntoIterator<Item = Option<Submission>>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn from_submissions(submissions: impl IntoIterator<Item = Submission>) -> Self {
        Self::new(submissions.into_iter().map(Some))
    }

    pub fn push(&mut self, item: Option<Submission>) {
        self.items.push_back(item);
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl SubmissionFeed for MemoryFeed {
    async fn next_submission(&mut self) -> Result<Pull> {
        Ok(match self.items.pop_front() {
            Some(Some(submission)) => Pull::Item(submission),
            Some(None) => Pull::Absent,
            None => Pull::Closed,
        })
    }
}
