use std::fmt::{self, Display, Formatter};
use url::Url;

use crate::model::ExtractionResult;

/// URLs visited in one session, starting with the one the user gave.
///
/// Stored without fragments, so `/book#top` and `/book` are the same hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopChain {
    urls: Vec<Url>,
}

impl HopChain {
    pub fn new(start: &Url) -> Self {
        Self {
            urls: vec![without_fragment(start)],
        }
    }

    pub fn contains(&self, url: &Url) -> bool {
        let url = without_fragment(url);
        self.urls.contains(&url)
    }

    pub fn push(&mut self, url: &Url) {
        self.urls.push(without_fragment(url));
    }

    /// Links followed so far. The start URL is not a hop.
    pub fn hops(&self) -> u32 {
        (self.urls.len() - 1) as u32
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Why the extraction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model returned a tee time or nothing at all.
    Answered,
    FollowDisabled,
    CycleDetected,
    HopBoundReached,
    /// The booking link could not be resolved to an http(s) URL.
    UnfollowableLink,
    /// The page reduced to no text; inference was skipped.
    NoContent,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Answered => "answered",
            Self::FollowDisabled => "link following disabled",
            Self::CycleDetected => "link points back to a visited page",
            Self::HopBoundReached => "hop limit reached",
            Self::UnfollowableLink => "link is not a followable http(s) URL",
            Self::NoContent => "page had no readable content",
        };
        f.write_str(reason)
    }
}

/// Terminal result of a session plus how it was reached.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub result: ExtractionResult,
    pub chain: HopChain,
    pub stop: StopReason,
}
