use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;
use regex::Regex;
use std::sync::LazyLock;

use crate::reducer::document::{Document, attr, tag_name};
use crate::reducer::rules::RuleTables;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Parse and canonicalize with the default rule tables.
pub fn normalize(raw_markup: &str) -> Document {
    normalize_with(raw_markup, &RuleTables::default())
}

/// Parse `raw_markup` into a tree, drop comments and non-content tags, and
/// collapse whitespace outside preformatted elements.
///
/// Parsing is tolerant: unclosed tags and stray text degrade to whatever
/// structure html5ever recovers. Blank input yields an empty tree.
pub fn normalize_with(raw_markup: &str, rules: &RuleTables) -> Document {
    if raw_markup.trim().is_empty() {
        return Document::empty();
    }

    let root = kuchiki::parse_html().one(raw_markup);
    let base_href = find_base_href(&root);

    remove_non_content(&root, rules);
    collapse_whitespace(&root, rules);

    Document::new(root, base_href)
}

fn find_base_href(root: &NodeRef) -> Option<String> {
    root.descendants()
        .find(|node| tag_name(node).as_deref() == Some("base"))
        .and_then(|base| attr(&base, "href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn remove_non_content(root: &NodeRef, rules: &RuleTables) {
    let doomed: Vec<NodeRef> = root
        .descendants()
        .filter(|node| {
            node.as_comment().is_some()
                || node.as_doctype().is_some()
                || matches!(node.data(), kuchiki::NodeData::ProcessingInstruction(_))
                || tag_name(node).is_some_and(|tag| rules.is_non_content_tag(&tag))
        })
        .collect();

    for node in doomed {
        node.detach();
    }
}

fn collapse_whitespace(root: &NodeRef, rules: &RuleTables) {
    for node in root.descendants() {
        let Some(text) = node.as_text() else {
            continue;
        };
        let preformatted = node
            .ancestors()
            .any(|ancestor| tag_name(&ancestor).is_some_and(|tag| rules.is_preformatted(&tag)));
        if preformatted {
            continue;
        }

        let collapsed = WHITESPACE_RUN.replace_all(&text.borrow(), " ").into_owned();
        *text.borrow_mut() = collapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_comments_and_non_content_tags() {
        let doc = normalize(
            r#"<html><head><title>T</title><script>var x = 1;</script></head>
            <body><!-- promo --><p>Tee times</p><svg><path d="M0"/></svg>
            <img src="a.png"><noscript>enable js</noscript></body></html>"#,
        );

        let text = doc.text();
        assert!(text.contains("Tee times"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("enable js"));
        assert!(!text.contains("promo"));
        assert!(doc.root().descendants().all(|n| n.as_comment().is_none()));
        assert!(
            doc.root()
                .descendants()
                .all(|n| !matches!(tag_name(&n).as_deref(), Some("svg" | "path" | "img" | "head")))
        );
    }

    #[test]
    fn test_collapses_whitespace_except_in_pre() {
        let doc = normalize("<p>  7:30\n\n   AM  </p><pre>a\n   b</pre>");
        let text = doc.text();
        assert!(text.contains(" 7:30 AM "));
        assert!(text.contains("a\n   b"));
    }

    #[test]
    fn test_blank_input_is_empty_tree() {
        assert!(normalize("").is_empty());
        assert!(normalize("   \n\t ").is_empty());
    }

    #[test]
    fn test_malformed_input_degrades() {
        let doc = normalize("<div><p>Unclosed <b>bold<div>stray</p></span>");
        let text = doc.text();
        assert!(text.contains("Unclosed"));
        assert!(text.contains("stray"));
    }

    #[test]
    fn test_base_href_captured_before_head_removed() {
        let doc = normalize(
            r#"<html><head><base href="https://tee.example/app/"></head><body>x</body></html>"#,
        );
        assert_eq!(doc.base_href(), Some("https://tee.example/app/"));
        assert!(doc.root().descendants().all(|n| tag_name(&n).as_deref() != Some("head")));
    }
}
