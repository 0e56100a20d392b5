//! Linear structured-text rendering of a pruned [`Document`].
//!
//! The output is markdown-flavoured: `#` headings, `*` list items, ` | `
//! between table cells, `**bold**` and `*italic*`, and every followable link
//! as `text (absolute-url)`. It is meant for a language model to read, not
//! for round-tripping back to HTML.

use kuchiki::{NodeData, NodeRef};
use url::Url;

use crate::reducer::document::{Document, attr, tag_name};

/// Past this depth children are flattened to plain text.
const MAX_DEPTH: usize = 256;

const PARAGRAPH_TAGS: &[&str] = &[
    "p", "blockquote", "table", "ul", "ol", "dl", "section", "article", "form", "figure",
    "fieldset", "details",
];

const LINE_TAGS: &[&str] = &[
    "div", "main", "header", "footer", "nav", "aside", "address", "figcaption", "summary",
    "legend", "caption", "center", "dt", "dd", "tbody", "thead", "tfoot", "label",
];

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "title", "iframe", "svg",
];

pub fn project(doc: &Document, page_url: &Url) -> String {
    let mut projector = Projector::new(doc.base_url(page_url));
    projector.render_children(doc.root(), 0);
    projector.finish()
}

struct Projector {
    base: Url,
    out: String,
    pending_space: bool,
    suppress_space: bool,
    preformatted: usize,
    row_cells: Vec<usize>,
}

impl Projector {
    fn new(base: Url) -> Self {
        Self {
            base,
            out: String::new(),
            pending_space: false,
            suppress_space: false,
            preformatted: 0,
            row_cells: Vec::new(),
        }
    }

    fn render_children(&mut self, node: &NodeRef, depth: usize) {
        for child in node.children() {
            self.render(&child, depth + 1);
        }
    }

    fn render(&mut self, node: &NodeRef, depth: usize) {
        match node.data() {
            NodeData::Text(text) => {
                let text = text.borrow();
                if self.preformatted > 0 {
                    self.out.push_str(&text);
                } else {
                    self.push_text(&text);
                }
            }
            NodeData::Element(_) => {
                if depth > MAX_DEPTH {
                    self.push_text(&node.text_contents());
                } else {
                    self.render_element(node, depth);
                }
            }
            NodeData::Document(_) | NodeData::DocumentFragment => {
                self.render_children(node, depth);
            }
            _ => {}
        }
    }

    fn render_element(&mut self, node: &NodeRef, depth: usize) {
        let Some(tag) = tag_name(node) else {
            return;
        };
        let tag = tag.as_str();

        match tag {
            _ if SKIPPED_TAGS.contains(&tag) => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                self.paragraph_break();
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
                self.render_children(node, depth);
                self.paragraph_break();
            }
            "li" => {
                self.line_break();
                self.out.push_str("* ");
                self.render_children(node, depth);
                self.line_break();
            }
            "option" => {
                self.line_break();
                self.out.push_str("- ");
                self.render_children(node, depth);
                self.line_break();
            }
            "select" => {
                self.line_break();
                self.render_children(node, depth);
                self.line_break();
            }
            "tr" => {
                self.line_break();
                self.row_cells.push(0);
                self.render_children(node, depth);
                self.row_cells.pop();
                self.line_break();
            }
            "td" | "th" => {
                if let Some(cells) = self.row_cells.last_mut() {
                    if *cells > 0 {
                        self.pending_space = false;
                        self.out.push_str(" | ");
                    }
                    *cells += 1;
                }
                self.render_children(node, depth);
            }
            "br" => {
                self.pending_space = false;
                self.trim_trailing_spaces();
                self.out.push('\n');
            }
            "hr" => {
                self.paragraph_break();
                self.out.push_str("---");
                self.paragraph_break();
            }
            "pre" => {
                self.paragraph_break();
                self.out.push_str("```\n");
                self.preformatted += 1;
                self.render_children(node, depth);
                self.preformatted -= 1;
                self.line_break();
                self.out.push_str("```");
                self.paragraph_break();
            }
            "code" if self.preformatted == 0 => self.wrap_inline(node, depth, "`"),
            "strong" | "b" => self.wrap_inline(node, depth, "**"),
            "em" | "i" => self.wrap_inline(node, depth, "*"),
            "a" => self.render_link(node, depth),
            "input" => {
                let hidden = attr(node, "type").is_some_and(|t| t.eq_ignore_ascii_case("hidden"));
                if let Some(value) = attr(node, "value").filter(|v| !v.trim().is_empty())
                    && !hidden
                {
                    self.flush_space();
                    self.out.push('[');
                    self.out.push_str(value.trim());
                    self.out.push(']');
                    self.pending_space = true;
                }
            }
            "button" => {
                if node.text_contents().trim().is_empty() {
                    return;
                }
                self.flush_space();
                self.out.push('[');
                self.suppress_space = true;
                self.render_children(node, depth);
                self.pending_space = false;
                self.out.push(']');
                self.pending_space = true;
            }
            _ if PARAGRAPH_TAGS.contains(&tag) => {
                self.paragraph_break();
                self.render_children(node, depth);
                self.paragraph_break();
            }
            _ if LINE_TAGS.contains(&tag) => {
                self.line_break();
                self.render_children(node, depth);
                self.line_break();
            }
            _ => self.render_children(node, depth),
        }
    }

    fn wrap_inline(&mut self, node: &NodeRef, depth: usize, marker: &str) {
        if node.text_contents().trim().is_empty() {
            self.render_children(node, depth);
            return;
        }
        self.flush_space();
        self.out.push_str(marker);
        self.suppress_space = true;
        self.render_children(node, depth);
        let trailing = self.pending_space;
        self.pending_space = false;
        self.out.push_str(marker);
        self.pending_space = trailing;
    }

    fn render_link(&mut self, node: &NodeRef, depth: usize) {
        let target = attr(node, "href").and_then(|href| self.resolve(&href));
        let label = node.text_contents().split_whitespace().collect::<Vec<_>>().join(" ");

        let Some(target) = target else {
            self.render_children(node, depth);
            return;
        };

        if label.is_empty() {
            self.flush_space();
            self.out.push_str(target.as_str());
            self.pending_space = true;
            return;
        }

        self.render_children(node, depth);
        if label != target.as_str() {
            let trailing = self.pending_space;
            self.pending_space = false;
            self.out.push_str(" (");
            self.out.push_str(target.as_str());
            self.out.push(')');
            self.pending_space = trailing;
        }
    }

    fn resolve(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.to_ascii_lowercase().starts_with("javascript:")
        {
            return None;
        }
        self.base.join(href).ok()
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }

        let mut words = text.split_whitespace().peekable();
        while let Some(word) = words.next() {
            self.flush_space();
            self.out.push_str(word);
            if words.peek().is_some() {
                self.pending_space = true;
            }
        }

        if text.ends_with(char::is_whitespace) {
            self.pending_space = true;
        }
    }

    fn flush_space(&mut self) {
        if self.pending_space
            && !self.suppress_space
            && !self.out.is_empty()
            && !self.out.ends_with([' ', '\n'])
        {
            self.out.push(' ');
        }
        self.pending_space = false;
        self.suppress_space = false;
    }

    fn trim_trailing_spaces(&mut self) {
        let kept = self.out.trim_end_matches(' ').len();
        self.out.truncate(kept);
    }

    fn line_break(&mut self) {
        self.pending_space = false;
        self.suppress_space = false;
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn paragraph_break(&mut self) {
        self.line_break();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn finish(self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        let mut blank = false;

        for line in self.out.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                if !blank && !lines.is_empty() {
                    lines.push("");
                }
                blank = true;
            } else {
                lines.push(line);
                blank = false;
            }
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::normalize::normalize;
    use crate::reducer::prune::prune;

    fn render(html: &str, url: &str) -> String {
        let doc = normalize(html);
        prune(&doc);
        project(&doc, &Url::parse(url).unwrap())
    }

    #[test]
    fn test_relative_link_resolves_against_page_url() {
        let text = render(
            r#"<p><a href="/book">Book Now</a></p>"#,
            "https://course.example/page",
        );
        assert_eq!(text, "Book Now (https://course.example/book)");
    }

    #[test]
    fn test_base_href_wins_over_page_url() {
        let text = render(
            r#"<html><head><base href="https://tee.example/app/"></head>
            <body><a href="slots?day=2">Saturday</a></body></html>"#,
            "https://course.example/page",
        );
        assert!(text.contains("Saturday (https://tee.example/app/slots?day=2)"));
    }

    #[test]
    fn test_fragment_and_script_links_project_as_text() {
        let text = render(
            r##"<p><a href="#top">Top</a> and <a href="javascript:void(0)">Open</a></p>"##,
            "https://course.example/",
        );
        assert_eq!(text, "Top and Open");
    }

    #[test]
    fn test_blocks_never_share_a_line() {
        let text = render(
            "<h1>Pine Valley</h1><p>Open daily</p><ul><li>Front nine</li><li>Back nine</li></ul>",
            "https://course.example/",
        );
        assert_eq!(text, "# Pine Valley\n\nOpen daily\n\n* Front nine\n* Back nine");
    }

    #[test]
    fn test_table_rows_and_cells() {
        let text = render(
            "<table><tr><th>Time</th><th>Price</th></tr><tr><td>7:30 AM</td><td>$45</td></tr></table>",
            "https://course.example/",
        );
        assert_eq!(text, "Time | Price\n7:30 AM | $45");
    }

    #[test]
    fn test_emphasis_markers() {
        let text = render(
            "<p>Next: <strong> 8:10 AM </strong> for <em>two</em>.</p>",
            "https://course.example/",
        );
        assert_eq!(text, "Next: **8:10 AM** for *two*.");
    }

    #[test]
    fn test_form_controls_survive() {
        let text = render(
            r#"<form><select name="players"><option>2</option><option>4</option></select>
            <input type="submit" value="Book Tee Time"><button>Search</button></form>"#,
            "https://course.example/",
        );
        assert!(text.contains("- 2\n- 4"));
        assert!(text.contains("[Book Tee Time]"));
        assert!(text.contains("[Search]"));
    }

    #[test]
    fn test_collapses_blank_lines_and_trims() {
        let text = render(
            "<div>\n\n<p>One</p><br><br><br><p>Two</p>\n\n</div>",
            "https://course.example/",
        );
        assert_eq!(text, "One\n\nTwo");
    }

    #[test]
    fn test_preformatted_kept_verbatim() {
        let text = render("<pre>07:00  open\n07:10  full</pre>", "https://course.example/");
        assert_eq!(text, "```\n07:00  open\n07:10  full\n```");
    }

    #[test]
    fn test_empty_document_projects_empty_string() {
        let doc = Document::empty();
        assert_eq!(project(&doc, &Url::parse("https://course.example/").unwrap()), "");
    }

    #[test]
    fn test_projection_is_deterministic() {
        let html = r#"<div><h2>Tee sheet</h2><a href="t?d=1">Mon</a> <a href="t?d=2">Tue</a></div>"#;
        let first = render(html, "https://course.example/x/");
        let second = render(html, "https://course.example/x/");
        assert_eq!(first, second);
    }
}
