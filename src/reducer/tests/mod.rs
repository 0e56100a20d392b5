use std::fs;
use url::Url;

use crate::reducer::{Reducer, RuleTables, normalize, project, prune};

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("src/reducer/tests/fixtures/{}", name))
        .expect("Failed to read test fixture")
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_reduce_course_home_page() {
    let html = fixture("course_home.html");
    let reduction = Reducer::default().reduce(&html, &url("https://pinehollow.example/"));
    let text = &reduction.text;

    assert!(text.starts_with("# Welcome to Pine Hollow"));
    assert!(text.contains("Eighteen holes of **championship** golf"));
    assert!(text.contains("Book a Tee Time (https://pinehollow.example/tee-times/)"));
    assert!(text.contains("## Green Fees"));
    assert!(text.contains("18 holes | $45 | $60"));

    // Scaffolding, tracking and hidden content are gone.
    assert!(!text.contains("Membership"));
    assert!(!text.contains("cookies"));
    assert!(!text.contains("Sponsored"));
    assert!(!text.contains("newsletter"));
    assert!(!text.contains("2024 Pine Hollow"));
    assert!(!text.contains("gtag"));
    assert!(!text.contains('<'));

    assert!(!reduction.truncated);
    assert!(reduction.text.len() < reduction.raw_len / 2);
}

#[test]
fn test_reduce_tee_sheet_uses_base_href() {
    let html = fixture("tee_sheet.html");
    let reduction = Reducer::default().reduce(&html, &url("https://pinehollow.example/tee-times/"));
    let text = &reduction.text;

    assert!(text.contains("## Saturday, June 8"));
    assert!(text.contains("6:50 AM Full"));
    assert!(text.contains(
        "7:00 AM 4 players *$45.00* Reserve (https://booking.pinehollow.example/app/reserve?slot=2)"
    ));
    assert!(text.contains("Cart fee   $18\nRange      $10"));
    assert!(text.contains("[Next Day]"));
    assert!(!text.contains("wEPDw"));
    assert!(!text.contains("Powered by"));
}

#[test]
fn test_reduce_client_rendered_shell_is_empty() {
    let html = fixture("empty.html");
    let reduction = Reducer::default().reduce(&html, &url("https://pinehollow.example/"));

    assert!(reduction.is_empty());
    assert!(reduction.prune.removed > 0);
}

#[test]
fn test_reduction_respects_budget() {
    let html = fixture("course_home.html");
    let reducer = Reducer::new(RuleTables::default(), 80);
    let reduction = reducer.reduce(&html, &url("https://pinehollow.example/"));

    assert!(reduction.truncated);
    assert!(reduction.text.len() <= 80);
    assert!(reduction.projected_len > 80);
    // Cut landed between words.
    let full = Reducer::default()
        .reduce(&html, &url("https://pinehollow.example/"))
        .text;
    let next = full[reduction.text.len()..].chars().next().unwrap();
    assert!(next.is_whitespace());
}

#[test]
fn test_pipeline_is_deterministic() {
    let html = fixture("tee_sheet.html");
    let page = url("https://pinehollow.example/tee-times/");
    let first = Reducer::default().reduce(&html, &page).text;
    for _ in 0..5 {
        assert_eq!(Reducer::default().reduce(&html, &page).text, first);
    }
}

#[test]
fn test_prune_idempotent_on_fixtures() {
    for name in ["course_home.html", "tee_sheet.html", "empty.html"] {
        let doc = normalize(&fixture(name));
        prune(&doc);
        let before = project(&doc, &url("https://pinehollow.example/"));
        let second = prune(&doc);

        assert!(second.is_noop(), "second prune changed {}", name);
        assert_eq!(project(&doc, &url("https://pinehollow.example/")), before);
    }
}

#[test]
fn test_custom_rule_tables_change_classification() {
    let html = r#"<div class="promo-strip">Members save 10%</div><p>Open 6 AM</p>"#;
    let page = url("https://pinehollow.example/");

    let default_text = Reducer::default().reduce(html, &page).text;
    assert!(default_text.contains("Members save"));

    let mut rules = RuleTables::default();
    rules.ad_terms.push("promo".to_string());
    let tuned = Reducer::new(rules, 1_000).reduce(html, &page).text;
    assert_eq!(tuned, "Open 6 AM");
}

#[test]
fn test_malformed_html() {
    let html = "<html><head><title>Broken</title><body><p>Unclosed tags<div>More content";
    let reduction = Reducer::default().reduce(html, &url("https://pinehollow.example/broken"));

    assert!(reduction.text.contains("Unclosed tags"));
    assert!(reduction.text.contains("More content"));
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_reduce_never_panics(
            html in ".*",
            path in "[a-z/]{0,20}"
        ) {
            let page = url(&format!("https://course.example/{}", path));
            let _ = Reducer::default().reduce(&html, &page);
        }

        #[test]
        fn test_prune_is_idempotent(
            html in "(<(div|p|span|a|b) (class|id|style|href)=\"[a-z: ;/?0-9-]{0,12}\">[a-z0-9 ]{0,8}){0,12}",
        ) {
            let doc = normalize(&html);
            prune(&doc);
            prop_assert!(prune(&doc).is_noop());
        }

        #[test]
        fn test_budget_is_respected(
            html in ".{0,400}",
            budget in 0usize..200,
        ) {
            let reducer = Reducer::new(RuleTables::default(), budget);
            let reduction = reducer.reduce(&html, &url("https://course.example/"));
            prop_assert!(reduction.text.len() <= budget);
        }
    }
}
