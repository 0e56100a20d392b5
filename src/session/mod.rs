//! The bounded fetch → reduce → infer loop.
//!
//! A [`Session`] starts at one URL and keeps following booking links the
//! model points at until it gets a tee time, runs out of content, revisits a
//! page, or uses up its hop allowance. Each step is a [`State`]; the loop in
//! [`Session::extract`] drives one transition per iteration.

pub mod chain;
pub mod errors;

#[cfg(test)]
mod tests;

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::Config;
use crate::fetcher::{Fetch, FetchError, RawPage};
use crate::inference::{Infer, InferenceError, prompt::current_time_hint};
use crate::model::{BookingLink, ExtractionResult};
use crate::reducer::Reducer;

pub use chain::{HopChain, Outcome, StopReason};
pub use errors::SessionError;

pub const DEFAULT_MAX_HOPS: u32 = 1;

enum State {
    Fetching(Url),
    Reducing(RawPage),
    Inferring { page_url: Url, text: String },
    Done { result: ExtractionResult, stop: StopReason },
    Failed(SessionError),
}

/// Borrowed collaborators plus the per-session settings.
pub struct Session<'a, F: Fetch + ?Sized, I: Infer + ?Sized> {
    fetcher: &'a F,
    inferer: &'a I,
    reducer: Reducer,
    fetch_timeout: Duration,
    inference_timeout: Duration,
    time_hint: Option<String>,
}

impl<'a, F: Fetch + ?Sized, I: Infer + ?Sized> Session<'a, F, I> {
    pub fn new(fetcher: &'a F, inferer: &'a I) -> Self {
        let defaults = Config::default();
        Self {
            fetcher,
            inferer,
            reducer: Reducer::default(),
            fetch_timeout: defaults.fetch_timeout(),
            inference_timeout: defaults.inference_timeout(),
            time_hint: None,
        }
    }

    pub fn from_config(fetcher: &'a F, inferer: &'a I, config: &Config) -> Self {
        Self::new(fetcher, inferer)
            .with_reducer(Reducer::new(
                config.rules().clone(),
                config.reduction_budget(),
            ))
            .with_timeouts(config.fetch_timeout(), config.inference_timeout())
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_timeouts(mut self, fetch: Duration, inference: Duration) -> Self {
        self.fetch_timeout = fetch;
        self.inference_timeout = inference;
        self
    }

    /// Pin the "current time" the model is told. Defaults to the local clock.
    pub fn with_time_hint(mut self, hint: impl Into<String>) -> Self {
        self.time_hint = Some(hint.into());
        self
    }

    /// Run the loop to completion.
    ///
    /// Cycles and the hop bound end the session normally; only fetch and
    /// inference failures are errors.
    #[instrument(skip_all, fields(url = %url, follow_links = follow_links, max_hops = max_hops))]
    pub async fn extract(
        &self,
        url: &Url,
        follow_links: bool,
        max_hops: u32,
    ) -> Result<Outcome, SessionError> {
        let mut chain = HopChain::new(url);
        let mut state = State::Fetching(url.clone());

        loop {
            state = match state {
                State::Fetching(url) => {
                    info!(url = %url, hop = chain.hops(), "fetching page");
                    match self.fetch(&url).await {
                        Ok(page) => State::Reducing(page),
                        Err(source) => State::Failed(SessionError::Fetch { url, source }),
                    }
                }
                State::Reducing(page) => {
                    let reduction = self.reducer.reduce(&page.markup, &page.url_final);
                    if reduction.is_empty() {
                        info!(url = %page.url_final, "page reduced to nothing");
                        State::Done {
                            result: ExtractionResult::Empty,
                            stop: StopReason::NoContent,
                        }
                    } else {
                        State::Inferring {
                            page_url: page.url_final,
                            text: reduction.text,
                        }
                    }
                }
                State::Inferring { page_url, text } => {
                    info!(url = %page_url, chars = text.len(), "asking model");
                    match self.infer(&text).await {
                        Ok(result) => {
                            next_state(result, &page_url, &mut chain, follow_links, max_hops)
                        }
                        Err(source) => State::Failed(SessionError::Inference {
                            url: page_url,
                            source,
                        }),
                    }
                }
                State::Done { result, stop } => {
                    info!(stop = %stop, hops = chain.hops(), "session finished");
                    return Ok(Outcome {
                        result,
                        chain,
                        stop,
                    });
                }
                State::Failed(err) => return Err(err),
            };
        }
    }

    /// [`Session::extract`], abandoned as soon as `token` is cancelled.
    ///
    /// Dropping the loop drops any in-flight fetch or inference with it.
    pub async fn extract_with_cancel(
        &self,
        url: &Url,
        follow_links: bool,
        max_hops: u32,
        token: &CancellationToken,
    ) -> Result<Outcome, SessionError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!(url = %url, "session cancelled");
                Err(SessionError::Cancelled)
            }
            outcome = self.extract(url, follow_links, max_hops) => outcome,
        }
    }

    async fn fetch(&self, url: &Url) -> Result<RawPage, FetchError> {
        let deadline = self.fetcher.deadline(self.fetch_timeout);
        tokio::time::timeout(deadline, self.fetcher.fetch(url, self.fetch_timeout))
            .await
            .map_err(|_| FetchError::Timeout(deadline))?
    }

    async fn infer(&self, text: &str) -> Result<ExtractionResult, InferenceError> {
        let hint = match &self.time_hint {
            Some(hint) => hint.clone(),
            None => current_time_hint(chrono::Local::now()),
        };

        tokio::time::timeout(self.inference_timeout, self.inferer.infer(text, &hint))
            .await
            .map_err(|_| InferenceError::Timeout(self.inference_timeout))?
    }
}

/// Decide what an inference result means for the loop.
fn next_state(
    result: ExtractionResult,
    page_url: &Url,
    chain: &mut HopChain,
    follow_links: bool,
    max_hops: u32,
) -> State {
    let link = match result {
        ExtractionResult::BookingLink(link) => link,
        answered => {
            return State::Done {
                result: answered,
                stop: StopReason::Answered,
            };
        }
    };

    let target = resolve_link(page_url, &link.url);
    // Report the absolute URL when we have one.
    let link = match &target {
        Some(url) => BookingLink {
            url: url.to_string(),
            ..link
        },
        None => link,
    };
    let done = |link, stop| State::Done {
        result: ExtractionResult::BookingLink(link),
        stop,
    };

    if !follow_links {
        return done(link, StopReason::FollowDisabled);
    }
    let Some(target) = target else {
        debug!(href = %link.url, "booking link is not followable");
        return done(link, StopReason::UnfollowableLink);
    };
    if chain.contains(&target) {
        debug!(url = %target, "booking link revisits a page");
        return done(link, StopReason::CycleDetected);
    }
    if chain.hops() >= max_hops {
        debug!(url = %target, max_hops, "hop limit reached");
        return done(link, StopReason::HopBoundReached);
    }

    info!(url = %target, text = %link.link_text, "following booking link");
    chain.push(&target);
    State::Fetching(target)
}

/// Resolve `href` against the page it came from; `None` unless http(s).
pub fn resolve_link(page_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let url = page_url.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
