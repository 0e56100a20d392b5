use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::fetcher::{Fetch, FetchError, RawPage};
use crate::inference::{Infer, InferenceError, parse_answer};
use crate::model::{BookingLink, ExtractionResult, TeeTime};
use crate::session::{Session, SessionError, StopReason};

const BASE: &str = "https://course.example";

struct FakeFetcher {
    pages: HashMap<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(path, markup)| (format!("{}{}", BASE, path), markup.to_string()))
                .collect(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(&[("/p0", "<p>page p0</p>")])
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for FakeFetcher {
    async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<RawPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.pages.get(url.as_str()) {
            Some(markup) => Ok(RawPage::new(
                url.clone(),
                Some(StatusCode::OK),
                markup.clone(),
                "UTF-8",
            )),
            None => Err(FetchError::Http {
                status: StatusCode::NOT_FOUND,
                retriable: false,
            }),
        }
    }
}

type Answer = Box<dyn Fn(&str) -> Result<ExtractionResult, InferenceError> + Send + Sync>;

struct FakeInferer {
    answer: Answer,
    calls: AtomicUsize,
    hints: Mutex<Vec<String>>,
}

impl FakeInferer {
    fn new(
        answer: impl Fn(&str) -> Result<ExtractionResult, InferenceError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            answer: Box::new(answer),
            calls: AtomicUsize::new(0),
            hints: Mutex::new(Vec::new()),
        }
    }

    /// Every page points at the next one: `page pN` links to `/pN+1`.
    fn chain() -> Self {
        Self::new(|text| {
            let n: u32 = text
                .split("page p")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            Ok(link(&format!("/p{}", n + 1)))
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Infer for FakeInferer {
    async fn infer(
        &self,
        text: &str,
        current_time_hint: &str,
    ) -> Result<ExtractionResult, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hints.lock().unwrap().push(current_time_hint.to_string());
        (self.answer)(text)
    }
}

fn link(href: &str) -> ExtractionResult {
    ExtractionResult::BookingLink(BookingLink {
        url: href.to_string(),
        link_text: "Book a Tee Time".to_string(),
        reason: "main booking button".to_string(),
    })
}

fn tee_time() -> ExtractionResult {
    ExtractionResult::TeeTime(TeeTime {
        time: "7:30 AM".to_string(),
        players: 4,
        price: Some("$45".to_string()),
        notes: None,
    })
}

fn url(path: &str) -> Url {
    Url::parse(&format!("{}{}", BASE, path)).unwrap()
}

fn session<'a>(
    fetcher: &'a FakeFetcher,
    inferer: &'a FakeInferer,
) -> Session<'a, FakeFetcher, FakeInferer> {
    Session::new(fetcher, inferer).with_time_hint("06:00 AM")
}

#[tokio::test]
async fn test_tee_time_on_first_page() {
    let fetcher = FakeFetcher::new(&[("/p0", "<p>7:30 AM 4 players $45</p>")]);
    let inferer = FakeInferer::new(|_| Ok(tee_time()));

    let outcome = session(&fetcher, &inferer)
        .extract(&url("/p0"), true, 1)
        .await
        .unwrap();

    assert_eq!(outcome.result, tee_time());
    assert_eq!(outcome.stop, StopReason::Answered);
    assert_eq!(outcome.chain.hops(), 0);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(inferer.calls(), 1);
    assert_eq!(inferer.hints.lock().unwrap().as_slice(), &["06:00 AM"]);
}

#[tokio::test]
async fn test_follows_booking_link_to_tee_time() {
    let fetcher = FakeFetcher::new(&[
        ("/p0", "<p>page p0</p>"),
        ("/p1", "<p>7:30 AM available</p>"),
    ]);
    let inferer = FakeInferer::new(|text| {
        if text.contains("7:30 AM") {
            Ok(tee_time())
        } else {
            Ok(link("p1"))
        }
    });

    let outcome = session(&fetcher, &inferer)
        .extract(&url("/p0"), true, 1)
        .await
        .unwrap();

    assert_eq!(outcome.result, tee_time());
    assert_eq!(outcome.stop, StopReason::Answered);
    assert_eq!(outcome.chain.urls(), &[url("/p0"), url("/p1")]);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_self_link_stops_as_cycle() {
    let fetcher = FakeFetcher::new(&[("/p0", "<p>page p0</p>")]);
    let inferer = FakeInferer::new(|_| Ok(link("/p0#book")));

    let outcome = session(&fetcher, &inferer)
        .extract(&url("/p0"), true, 5)
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::CycleDetected);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        outcome.result.as_booking_link().unwrap().url,
        "https://course.example/p0#book"
    );
}

#[tokio::test]
async fn test_two_page_cycle_terminates() {
    let fetcher = FakeFetcher::new(&[("/a", "<p>page a</p>"), ("/b", "<p>page b</p>")]);
    let inferer = FakeInferer::new(|text| {
        if text.contains("page a") {
            Ok(link("/b"))
        } else {
            Ok(link("/a"))
        }
    });

    let outcome = session(&fetcher, &inferer)
        .extract(&url("/a"), true, 10)
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::CycleDetected);
    assert_eq!(outcome.chain.hops(), 1);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_hop_bound_is_exact() {
    let pages: Vec<(String, String)> = (0..10)
        .map(|n| (format!("/p{}", n), format!("<p>page p{} </p>", n)))
        .collect();
    let pages: Vec<(&str, &str)> = pages
        .iter()
        .map(|(p, m)| (p.as_str(), m.as_str()))
        .collect();
    let fetcher = FakeFetcher::new(&pages);
    let inferer = FakeInferer::chain();

    let outcome = session(&fetcher, &inferer)
        .extract(&url("/p0"), true, 3)
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::HopBoundReached);
    assert_eq!(outcome.chain.hops(), 3);
    assert_eq!(fetcher.calls(), 4);
    assert_eq!(inferer.calls(), 4);
    assert_eq!(
        outcome.result.as_booking_link().unwrap().url,
        "https://course.example/p4"
    );
}

#[tokio::test]
async fn test_follow_disabled_returns_resolved_link() {
    let fetcher = FakeFetcher::new(&[("/p0", "<p>page p0</p>")]);
    let inferer = FakeInferer::chain();

    let outcome = session(&fetcher, &inferer)
        .extract(&url("/p0"), false, 3)
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::FollowDisabled);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        outcome.result.as_booking_link().unwrap().url,
        "https://course.example/p1"
    );
}

#[tokio::test]
async fn test_unfollowable_links_are_terminal() {
    for href in ["javascript:void(0)", "mailto:pro@course.example", "   "] {
        let fetcher = FakeFetcher::new(&[("/p0", "<p>page p0</p>")]);
        let target = href.to_string();
        let inferer = FakeInferer::new(move |_| Ok(link(&target)));

        let outcome = session(&fetcher, &inferer)
            .extract(&url("/p0"), true, 3)
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::UnfollowableLink, "href {:?}", href);
        assert_eq!(fetcher.calls(), 1);
    }
}

#[tokio::test]
async fn test_empty_page_skips_inference() {
    let fetcher = FakeFetcher::new(&[(
        "/p0",
        r#"<html><body><div id="root"></div><script>render()</script></body></html>"#,
    )]);
    let inferer = FakeInferer::new(|_| Ok(tee_time()));

    let outcome = session(&fetcher, &inferer)
        .extract(&url("/p0"), true, 1)
        .await
        .unwrap();

    assert_eq!(outcome.result, ExtractionResult::Empty);
    assert_eq!(outcome.stop, StopReason::NoContent);
    assert_eq!(inferer.calls(), 0);
}

#[tokio::test]
async fn test_blank_fetch_skips_inference() {
    let fetcher = FakeFetcher::new(&[("/p0", "")]);
    let inferer = FakeInferer::new(|_| Ok(tee_time()));

    let outcome = session(&fetcher, &inferer)
        .extract(&url("/p0"), true, 1)
        .await
        .unwrap();

    assert_eq!(outcome.result, ExtractionResult::Empty);
    assert_eq!(outcome.stop, StopReason::NoContent);
    assert_eq!(outcome.chain.hops(), 0);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(inferer.calls(), 0);
}

#[tokio::test]
async fn test_schema_violation_fails_without_retry() {
    let fetcher = FakeFetcher::new(&[("/p0", "<p>page p0</p>")]);
    let inferer = FakeInferer::new(|_| parse_answer(r#"{"kind": "tee_time", "players": 4}"#));

    let err = session(&fetcher, &inferer)
        .extract(&url("/p0"), true, 1)
        .await
        .unwrap_err();

    match err {
        SessionError::Inference {
            url: failed,
            source: InferenceError::Schema { field, .. },
        } => {
            assert_eq!(field, "time");
            assert_eq!(failed, url("/p0"));
        }
        other => panic!("expected schema failure, got {:?}", other),
    }
    assert_eq!(inferer.calls(), 1);
}

#[tokio::test]
async fn test_fetch_failure_on_followed_link() {
    let fetcher = FakeFetcher::new(&[("/p0", "<p>page p0</p>")]);
    let inferer = FakeInferer::chain();

    let err = session(&fetcher, &inferer)
        .extract(&url("/p0"), true, 2)
        .await
        .unwrap_err();

    match &err {
        SessionError::Fetch { source, .. } => {
            assert_eq!(source.status(), Some(StatusCode::NOT_FOUND));
        }
        other => panic!("expected fetch failure, got {:?}", other),
    }
    assert_eq!(err.url(), Some(&url("/p1")));
    assert_eq!(inferer.calls(), 1);
}

#[tokio::test]
async fn test_fetch_timeout() {
    let fetcher = FakeFetcher::slow(Duration::from_secs(5));
    let inferer = FakeInferer::new(|_| Ok(tee_time()));

    let err = session(&fetcher, &inferer)
        .with_timeouts(Duration::from_millis(20), Duration::from_secs(1))
        .extract(&url("/p0"), true, 1)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Fetch {
            source: FetchError::Timeout(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_cancellation() {
    let fetcher = FakeFetcher::slow(Duration::from_secs(5));
    let inferer = FakeInferer::new(|_| Ok(tee_time()));
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = session(&fetcher, &inferer)
        .extract_with_cancel(&url("/p0"), true, 1, &token)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Cancelled));
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(inferer.calls(), 0);
}
