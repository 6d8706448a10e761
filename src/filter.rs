/// Cheap metadata checks that run before any title parsing
use crate::config::FilterConfig;
use crate::models::Submission;

/// Flair carried by genuine chapter discussion threads
pub const DISCUSSION_FLAIR: &str = "DISC";

/// Title marker for untranslated source releases
pub const RAW_MARKER: &str = "RAW";

/// Why a submission was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Text post with no external link
    SelfPost,
    /// Labeled with a flair other than the discussion flair
    Flair(String),
    /// Image or video hosted on the platform itself
    HostedMedia,
    /// Untranslated release
    RawRelease,
}

/// Outcome of running the filter on one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    Candidate,
    Rejected(RejectReason),
}

impl FilterVerdict {
    pub fn is_candidate(&self) -> bool {
        matches!(self, FilterVerdict::Candidate)
    }
}

/// Decides whether a submission is plausibly a chapter discussion post
#[derive(Debug, Clone)]
pub struct SubmissionFilter {
    discussion_flair: String,
    raw_marker: String,
}

impl Default for SubmissionFilter {
    fn default() -> Self {
        Self::new(DISCUSSION_FLAIR, RAW_MARKER)
    }
}

impl SubmissionFilter {
    pub fn new(discussion_flair: impl Into<String>, raw_marker: impl Into<String>) -> Self {
        Self {
            discussion_flair: discussion_flair.into(),
            raw_marker: raw_marker.into(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.discussion_flair.clone(), config.raw_marker.clone())
    }

    /// True if the submission should go on to title parsing
    pub fn is_candidate(&self, submission: &Submission) -> bool {
        self.evaluate(submission).is_candidate()
    }

    /// Run the checks in priority order; the first failing check decides.
    pub fn evaluate(&self, submission: &Submission) -> FilterVerdict {
        if submission.is_self_post {
            return FilterVerdict::Rejected(RejectReason::SelfPost);
        }

        // An absent flair is fine, only a different label disqualifies
        if let Some(flair) = submission.flair_label.as_deref() {
            if flair != self.discussion_flair {
                return FilterVerdict::Rejected(RejectReason::Flair(flair.to_string()));
            }
        }

        if submission.is_hosted_media_domain {
            return FilterVerdict::Rejected(RejectReason::HostedMedia);
        }

        if submission.title.contains(self.raw_marker.as_str()) {
            return FilterVerdict::Rejected(RejectReason::RawRelease);
        }

        FilterVerdict::Candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(title: &str) -> Submission {
        Submission::new(title, "https://example.com/chapter")
    }

    #[test]
    fn test_unlabeled_link_is_candidate() {
        let filter = SubmissionFilter::default();
        assert!(filter.is_candidate(&link("Some Manga Ch. 5")));
    }

    #[test]
    fn test_discussion_flair_is_candidate() {
        let filter = SubmissionFilter::default();
        assert!(filter.is_candidate(&link("Some Manga Ch. 5").with_flair("DISC")));
    }

    #[test]
    fn test_self_post_rejected_regardless_of_other_fields() {
        let filter = SubmissionFilter::default();
        let submission = link("Some Manga Ch. 5")
            .with_self_post(true)
            .with_flair("ART")
            .with_hosted_media(true);

        assert_eq!(
            filter.evaluate(&submission),
            FilterVerdict::Rejected(RejectReason::SelfPost)
        );
    }

    #[test]
    fn test_other_flair_rejected() {
        let filter = SubmissionFilter::default();
        let submission = link("Some Manga Ch. 5").with_flair("NEWS");

        assert_eq!(
            filter.evaluate(&submission),
            FilterVerdict::Rejected(RejectReason::Flair("NEWS".to_string()))
        );
    }

    #[test]
    fn test_flair_comparison_is_case_sensitive() {
        let filter = SubmissionFilter::default();
        assert!(!filter.is_candidate(&link("Some Manga Ch. 5").with_flair("disc")));
    }

    #[test]
    fn test_flair_checked_before_media() {
        let filter = SubmissionFilter::default();
        let submission = link("Some Manga RAW Ch. 5")
            .with_flair("ART")
            .with_hosted_media(true);

        assert_eq!(
            filter.evaluate(&submission),
            FilterVerdict::Rejected(RejectReason::Flair("ART".to_string()))
        );
    }

    #[test]
    fn test_hosted_media_rejected() {
        let filter = SubmissionFilter::default();
        let submission = link("Some Manga RAW Ch. 5").with_hosted_media(true);

        assert_eq!(
            filter.evaluate(&submission),
            FilterVerdict::Rejected(RejectReason::HostedMedia)
        );
    }

    #[test]
    fn test_raw_marker_rejected() {
        let filter = SubmissionFilter::default();
        assert_eq!(
            filter.evaluate(&link("Some Manga RAW Ch.5")),
            FilterVerdict::Rejected(RejectReason::RawRelease)
        );
    }

    #[test]
    fn test_raw_marker_is_case_sensitive() {
        let filter = SubmissionFilter::default();
        assert!(filter.is_candidate(&link("Drawing Lessons Ch. 2")));
        assert!(filter.is_candidate(&link("Some Manga raw Ch. 2")));
    }

    #[test]
    fn test_custom_markers() {
        let filter = SubmissionFilter::new("Discussion", "[JP]");

        assert!(filter.is_candidate(&link("Some Manga Ch. 5").with_flair("Discussion")));
        assert!(!filter.is_candidate(&link("Some Manga Ch. 5").with_flair("DISC")));
        assert!(!filter.is_candidate(&link("Some Manga [JP] Ch. 5")));
        assert!(filter.is_candidate(&link("Some Manga RAW Ch. 5")));
    }
}
