/// Live feed that polls a subreddit's newest-posts listing
use super::{Pull, SubmissionFeed};
use crate::config::FeedConfig;
use crate::models::Submission;
use crate::{NotifierError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// How many recently yielded post ids are remembered between polls
const SEEN_CAPACITY: usize = 301;

/// First wait after an empty poll; doubles up to the configured interval
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    #[serde(default)]
    data: Option<RawPost>,
}

/// Post fields as the listing API returns them
#[derive(Debug, Default, Deserialize)]
struct RawPost {
    name: Option<String>,
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    is_self: Option<bool>,
    link_flair_text: Option<String>,
    is_reddit_media_domain: Option<bool>,
}

impl RawPost {
    fn key(&self) -> Option<String> {
        self.name.clone().or_else(|| self.id.clone())
    }

    /// Normalize into a submission; posts without a title or link are absent
    fn into_pull(self) -> Pull {
        match (self.title, self.url) {
            (Some(title), Some(url)) => Pull::Item(Submission {
                title,
                url,
                is_self_post: self.is_self.unwrap_or(false),
                flair_label: self.link_flair_text,
                is_hosted_media_domain: self.is_reddit_media_domain.unwrap_or(false),
            }),
            _ => Pull::Absent,
        }
    }
}

/// Bounded set of recently seen post ids, oldest evicted first
#[derive(Debug, Clone)]
struct SeenSet {
    capacity: usize,
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenSet {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
        }
    }

    /// Returns true if the id was not already present
    fn insert(&mut self, id: String) -> bool {
        if self.ids.contains(&id) {
            return false;
        }

        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }

        self.ids.insert(id.clone());
        self.order.push_back(id);
        true
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Polls `{base_url}/r/{subreddit}/new.json` and yields unseen posts oldest-first
pub struct RedditFeed {
    client: Client,
    listing_url: Url,
    seen: SeenSet,
    pending: VecDeque<Pull>,
    backoff: Duration,
    max_backoff: Duration,
    max_retries: u32,
    failures: u32,
}

impl RedditFeed {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .build()?;

        let listing_url = Self::listing_url(config)?;
        info!("🌐 Watching {}", listing_url);

        Ok(Self {
            client,
            listing_url,
            seen: SeenSet::new(SEEN_CAPACITY),
            pending: VecDeque::new(),
            backoff: INITIAL_BACKOFF,
            max_backoff: Duration::from_secs(config.poll_interval_seconds).max(INITIAL_BACKOFF),
            max_retries: config.max_retries,
            failures: 0,
        })
    }

    fn listing_url(config: &FeedConfig) -> Result<Url> {
        let subreddit = config.subreddit.trim().trim_start_matches("r/");
        let mut url = Url::parse(&config.base_url)?.join(&format!("r/{}/new.json", subreddit))?;
        url.query_pairs_mut()
            .append_pair("limit", &config.listing_limit.to_string())
            .append_pair("raw_json", "1");
        Ok(url)
    }

    /// Queue unseen posts from a listing body, oldest first. Returns how many were queued.
    fn enqueue_listing(&mut self, body: &str) -> Result<usize> {
        let listing: Listing = serde_json::from_str(body)?;
        let mut queued = 0;

        // The listing is newest-first
        for child in listing.data.children.into_iter().rev() {
            let Some(post) = child.data else {
                self.pending.push_back(Pull::Absent);
                continue;
            };

            let Some(key) = post.key() else {
                debug!("Ignoring listing entry without an id");
                continue;
            };

            if self.seen.insert(key) {
                self.pending.push_back(post.into_pull());
                queued += 1;
            }
        }

        Ok(queued)
    }

    async fn poll(&mut self) -> Result<usize> {
        debug!("Polling {}", self.listing_url);
        let response = self
            .client
            .get(self.listing_url.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let queued = self.enqueue_listing(&body)?;
        debug!("Queued {} new posts ({} remembered)", queued, self.seen.len());
        Ok(queued)
    }

    fn grow_backoff(&mut self) {
        self.backoff = (self.backoff * 2).min(self.max_backoff);
    }
}

#[async_trait]
impl SubmissionFeed for RedditFeed {
    async fn next_submission(&mut self) -> Result<Pull> {
        loop {
            if let Some(pull) = self.pending.pop_front() {
                return Ok(pull);
            }

            match self.poll().await {
                Ok(0) => {
                    self.failures = 0;
                    tokio::time::sleep(self.backoff).await;
                    self.grow_backoff();
                }
                Ok(_) => {
                    self.failures = 0;
                    self.backoff = INITIAL_BACKOFF;
                }
                Err(e) => {
                    self.failures += 1;
                    if self.failures > self.max_retries {
                        return Err(NotifierError::Feed(format!(
                            "giving up after {} failed polls: {}",
                            self.failures, e
                        )));
                    }
                    warn!(
                        "⚠️ Poll failed ({}/{}): {}, retrying in {:?}",
                        self.failures, self.max_retries, e, self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                    self.grow_backoff();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(children: &[&str]) -> String {
        format!(r#"{{"kind": "Listing", "data": {{"children": [{}]}}}}"#, children.join(","))
    }

    fn post(id: &str, title: &str) -> String {
        format!(
            r#"{{"kind": "t3", "data": {{"name": "t3_{id}", "title": "{title}", "url": "https://example.com/{id}", "is_self": false, "link_flair_text": null, "is_reddit_media_domain": false}}}}"#,
            id = id,
            title = title
        )
    }

    #[test]
    fn test_listing_url() {
        let url = RedditFeed::listing_url(&FeedConfig::default()).unwrap();
        assert_eq!(url.as_str(), "https://www.reddit.com/r/manga/new.json?limit=100&raw_json=1");
    }

    #[test]
    fn test_listing_url_strips_prefix() {
        let config = FeedConfig {
            subreddit: "r/manhwa".to_string(),
            listing_limit: 25,
            ..FeedConfig::default()
        };
        let url = RedditFeed::listing_url(&config).unwrap();
        assert_eq!(url.as_str(), "https://www.reddit.com/r/manhwa/new.json?limit=25&raw_json=1");
    }

    #[test]
    fn test_enqueue_oldest_first_and_dedupes() {
        let mut feed = RedditFeed::new(&FeedConfig::default()).unwrap();

        let body = listing(&[&post("b", "Newer Ch. 2"), &post("a", "Older Ch. 1")]);
        assert_eq!(feed.enqueue_listing(&body).unwrap(), 2);

        match feed.pending.pop_front() {
            Some(Pull::Item(submission)) => assert_eq!(submission.title, "Older Ch. 1"),
            other => panic!("unexpected pull: {:?}", other),
        }

        let body = listing(&[&post("c", "Newest Ch. 3"), &post("b", "Newer Ch. 2")]);
        assert_eq!(feed.enqueue_listing(&body).unwrap(), 1);
        assert_eq!(feed.pending.len(), 2);
    }

    #[test]
    fn test_post_fields_map_to_submission() {
        let raw: RawPost = serde_json::from_str(
            r#"{"name": "t3_x", "title": "Art", "url": "https://i.redd.it/x.png", "is_self": false, "link_flair_text": "ART", "is_reddit_media_domain": true}"#,
        )
        .unwrap();

        assert_eq!(
            raw.into_pull(),
            Pull::Item(
                Submission::new("Art", "https://i.redd.it/x.png")
                    .with_flair("ART")
                    .with_hosted_media(true)
            )
        );
    }

    #[test]
    fn test_post_without_url_is_absent() {
        let mut feed = RedditFeed::new(&FeedConfig::default()).unwrap();
        let body = listing(&[r#"{"kind": "t3", "data": {"name": "t3_z", "title": "No link"}}"#]);

        assert_eq!(feed.enqueue_listing(&body).unwrap(), 1);
        assert_eq!(feed.pending.pop_front(), Some(Pull::Absent));
    }

    #[test]
    fn test_malformed_listing_is_error() {
        let mut feed = RedditFeed::new(&FeedConfig::default()).unwrap();
        assert!(matches!(
            feed.enqueue_listing("<html>rate limited</html>"),
            Err(NotifierError::Json(_))
        ));
    }

    #[test]
    fn test_seen_set_evicts_oldest() {
        let mut seen = SeenSet::new(2);
        assert!(seen.insert("a".to_string()));
        assert!(seen.insert("b".to_string()));
        assert!(!seen.insert("a".to_string()));
        assert!(seen.insert("c".to_string()));
        assert_eq!(seen.len(), 2);
        assert!(seen.insert("a".to_string()));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = FeedConfig {
            poll_interval_seconds: 3,
            ..FeedConfig::default()
        };
        let mut feed = RedditFeed::new(&config).unwrap();

        feed.grow_backoff();
        assert_eq!(feed.backoff, Duration::from_secs(2));
        feed.grow_backoff();
        assert_eq!(feed.backoff, Duration::from_secs(3));
        feed.grow_backoff();
        assert_eq!(feed.backoff, Duration::from_secs(3));
    }
}
