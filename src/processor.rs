use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::feed::{Pull, SubmissionFeed};
use crate::filter::{FilterVerdict, RejectReason, SubmissionFilter};
use crate::models::{Episode, Submission};
use crate::parser::TitleParser;
use crate::sink::EpisodeSink;
use crate::Result;

/// Counters for one processing run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessorStats {
    /// Well-formed submissions pulled from the feed
    pub received: usize,
    /// Null or malformed feed elements
    pub absent: usize,
    /// Rejected by the submission filter
    pub filtered: usize,
    /// Passed the filter but no title rule matched
    pub unparsed: usize,
    /// Dropped because of an internal parser fault
    pub faults: usize,
    /// Episodes produced
    pub emitted: usize,
    pub started_at: DateTime<Utc>,
}

impl ProcessorStats {
    pub fn new() -> Self {
        Self {
            received: 0,
            absent: 0,
            filtered: 0,
            unparsed: 0,
            faults: 0,
            emitted: 0,
            started_at: Utc::now(),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn summary(&self) -> String {
        format!(
            "received {}, emitted {}, filtered {}, unparsed {}, absent {}, faults {} in {:.1}s",
            self.received,
            self.emitted,
            self.filtered,
            self.unparsed,
            self.absent,
            self.faults,
            self.elapsed_seconds()
        )
    }
}

impl Default for ProcessorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to a single submission
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Episode(Episode),
    Filtered(RejectReason),
    Unparsed,
}

/// Pulls submissions from a feed and turns the chapter discussion posts into episodes
pub struct StreamProcessor<F> {
    feed: F,
    filter: SubmissionFilter,
    parser: TitleParser,
    stats: ProcessorStats,
}

impl<F: SubmissionFeed> StreamProcessor<F> {
    /// Processor with the default filter markers
    pub fn new(feed: F) -> Result<Self> {
        Self::with_filter(feed, SubmissionFilter::default())
    }

    pub fn with_filter(feed: F, filter: SubmissionFilter) -> Result<Self> {
        Ok(Self::with_parser(feed, filter, TitleParser::new()?))
    }

    /// Processor with a caller-supplied rule table
    pub fn with_parser(feed: F, filter: SubmissionFilter, parser: TitleParser) -> Self {
        Self {
            feed,
            filter,
            parser,
            stats: ProcessorStats::new(),
        }
    }

    pub fn from_config(feed: F, config: &Config) -> Result<Self> {
        Self::with_filter(feed, SubmissionFilter::from_config(&config.filter))
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    fn classify(&self, submission: &Submission) -> Result<Outcome> {
        if let FilterVerdict::Rejected(reason) = self.filter.evaluate(submission) {
            return Ok(Outcome::Filtered(reason));
        }

        Ok(match self.parser.parse(&submission.title)? {
            Some(parsed) => Outcome::Episode(parsed.into_episode(submission.url.as_str())),
            None => Outcome::Unparsed,
        })
    }

    /// Filter and parse one submission without touching the feed
    pub fn process(&self, submission: &Submission) -> Result<Option<Episode>> {
        Ok(match self.classify(submission)? {
            Outcome::Episode(episode) => Some(episode),
            Outcome::Filtered(_) | Outcome::Unparsed => None,
        })
    }

    /// Pull until a submission yields an episode. `None` once the feed is closed.
    pub async fn next_episode(&mut self) -> Result<Option<Episode>> {
        loop {
            let submission = match self.feed.next_submission().await? {
                Pull::Item(submission) => submission,
                Pull::Absent => {
                    self.stats.absent += 1;
                    debug!("Skipping absent feed element");
                    continue;
                }
                Pull::Closed => {
                    debug!("Feed closed");
                    return Ok(None);
                }
            };
            self.stats.received += 1;

            match self.classify(&submission) {
                Ok(Outcome::Episode(episode)) => {
                    self.stats.emitted += 1;
                    info!("📖 {} - chapter {}", episode.title, episode.chapter);
                    return Ok(Some(episode));
                }
                Ok(Outcome::Filtered(reason)) => {
                    self.stats.filtered += 1;
                    debug!("Filtered '{}': {:?}", submission.title, reason);
                }
                Ok(Outcome::Unparsed) => {
                    self.stats.unparsed += 1;
                    debug!("No chapter found in '{}'", submission.title);
                }
                Err(e) => {
                    self.stats.faults += 1;
                    error!("❌ Failed to process '{}': {}", submission.title, e);
                }
            }
        }
    }

    /// Deliver episodes to `sink` until the feed closes or `limit` episodes were delivered
    pub async fn run<S: EpisodeSink>(&mut self, sink: &mut S, limit: Option<usize>) -> Result<ProcessorStats> {
        let mut delivered = 0;

        while limit.map_or(true, |limit| delivered < limit) {
            match self.next_episode().await? {
                Some(episode) => {
                    sink.deliver(&episode)?;
                    delivered += 1;
                }
                None => break,
            }
        }

        Ok(self.stats.clone())
    }

    /// Lazy stream of episodes; ends when the feed closes or after the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<Episode>> {
        stream::unfold(Some(self), |state| async move {
            let mut processor = state?;
            match processor.next_episode().await {
                Ok(Some(episode)) => Some((Ok(episode), Some(processor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
