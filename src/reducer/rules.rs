//! Classification tables for the normalizer and the noise pruner.
//!
//! Every term list lives in [`RuleTables`] so the rules can be tuned (or
//! loaded from a JSON file) without touching the tree-walking code. The
//! predicates here only see a flattened [`NodeFacts`] view of an element.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Why a subtree was removed by the pruner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Removal {
    Template,
    AssetPath,
    Advertising,
    Hidden,
    FormState,
}

/// Tag name plus attributes of a single element, lowercased names.
#[derive(Debug, Clone, Default)]
pub struct NodeFacts {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl NodeFacts {
    pub fn new(tag: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self {
            tag: tag.into(),
            attrs,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTables {
    pub non_content_tags: BTreeSet<String>,
    pub preformatted_tags: BTreeSet<String>,
    pub protected_roots: BTreeSet<String>,
    pub template_terms: Vec<String>,
    pub template_data_attributes: Vec<String>,
    pub asset_path_markers: Vec<String>,
    pub cache_bust_keys: BTreeSet<String>,
    pub ad_terms: Vec<String>,
    pub hidden_style_declarations: BTreeSet<String>,
    pub view_state_markers: Vec<String>,
    pub stripped_attributes: BTreeSet<String>,
    pub stripped_attribute_prefixes: Vec<String>,
    pub presentational_attributes: BTreeSet<String>,
    pub presentational_terms: Vec<String>,
    pub link_attributes: BTreeSet<String>,
    pub form_controls: BTreeSet<String>,
    pub form_attributes: BTreeSet<String>,
    pub void_content_tags: BTreeSet<String>,
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleTables {
    fn default() -> Self {
        Self {
            non_content_tags: set(&[
                "script", "style", "noscript", "iframe", "meta", "link", "head", "svg", "path",
                "img", "picture", "source", "video", "audio", "canvas", "embed", "object",
                "param", "track", "template",
            ]),
            preformatted_tags: set(&["pre", "code", "textarea"]),
            protected_roots: set(&["html", "body"]),
            template_terms: list(&[
                "template", "theme", "framework", "bootstrap", "uikit", "widget", "nav",
                "sidebar", "footer", "header", "menu", "breadcrumb", "social", "share",
            ]),
            template_data_attributes: list(&["data-template", "data-theme"]),
            asset_path_markers: list(&[
                "/templates/", "/themes/", "/framework/", "/vendor/", "/resources/",
                "/assets/", "/css/", "/js/", "/images/", "/img/", "/media/", "/components/",
                "/com_", "/mod_", "/plugins/", "/libraries/",
            ]),
            cache_bust_keys: set(&["v", "ver", "version", "rev", "t", "ts", "cb", "_"]),
            ad_terms: list(&[
                "ad", "ads", "advert", "advertisement", "banner", "tracking", "tracker",
                "analytics", "popup", "sponsored", "cookie",
            ]),
            hidden_style_declarations: set(&[
                "display:none",
                "visibility:hidden",
                "opacity:0",
                "opacity:0.0",
                "opacity:0%",
            ]),
            view_state_markers: list(&[
                "__viewstate",
                "__eventvalidation",
                "__eventtarget",
                "__eventargument",
                "__requestdigest",
                "__previouspage",
            ]),
            stripped_attributes: set(&["style", "class", "id", "role"]),
            stripped_attribute_prefixes: list(&["data-", "aria-"]),
            presentational_attributes: set(&[
                "align", "valign", "bgcolor", "color", "face", "size", "width", "height",
                "margin", "padding", "border", "background", "font", "text-align",
                "font-family", "font-size", "font-weight", "font-style", "line-height",
                "text-decoration", "text-transform", "letter-spacing", "word-spacing",
                "cellpadding", "cellspacing",
            ]),
            presentational_terms: list(&[
                "style", "color", "font", "size", "width", "height", "margin", "padding",
                "border", "background",
            ]),
            link_attributes: set(&["href", "src"]),
            form_controls: set(&["input", "button", "option", "select"]),
            form_attributes: set(&["type", "value", "name"]),
            void_content_tags: set(&["br", "hr", "input"]),
        }
    }
}

impl RuleTables {
    /// Load tables from a JSON file. Keys that are absent keep their defaults.
    pub fn from_json_file(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn is_non_content_tag(&self, tag: &str) -> bool {
        self.non_content_tags.contains(tag)
    }

    pub fn is_preformatted(&self, tag: &str) -> bool {
        self.preformatted_tags.contains(tag)
    }

    pub fn is_void_content(&self, tag: &str) -> bool {
        self.void_content_tags.contains(tag)
    }

    /// Apply removal rules 1 through 5 in order; the first match wins.
    pub fn classify(&self, facts: &NodeFacts) -> Option<Removal> {
        if self.matches_template(facts) {
            Some(Removal::Template)
        } else if self.matches_asset_path(facts) {
            Some(Removal::AssetPath)
        } else if self.matches_advertising(facts) {
            Some(Removal::Advertising)
        } else if self.matches_hidden(facts) {
            Some(Removal::Hidden)
        } else if self.matches_form_state(facts) {
            Some(Removal::FormState)
        } else {
            None
        }
    }

    pub fn matches_template(&self, facts: &NodeFacts) -> bool {
        if self.protected_roots.contains(&facts.tag) {
            return false;
        }

        let class_id = format!(
            "{} {}",
            facts.attr("class").unwrap_or_default(),
            facts.attr("id").unwrap_or_default()
        )
        .to_lowercase();

        self.template_terms
            .iter()
            .any(|term| class_id.contains(term.as_str()))
            || self
                .template_data_attributes
                .iter()
                .any(|name| facts.has_attr(name))
    }

    pub fn matches_asset_path(&self, facts: &NodeFacts) -> bool {
        self.link_attributes.iter().any(|name| {
            let Some(value) = facts.attr(name) else {
                return false;
            };
            let value = value.to_lowercase();
            self.asset_path_markers
                .iter()
                .any(|marker| value.contains(marker.as_str()))
                || self.is_cache_busting(&value)
        })
    }

    /// `?123` or a single `?v=1.2.3` style parameter.
    pub fn is_cache_busting(&self, value: &str) -> bool {
        let Some((_, query)) = value.split_once('?') else {
            return false;
        };
        let query = query.split('#').next().unwrap_or_default();
        if query.is_empty() {
            return false;
        }
        if query.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        if query.contains('&') {
            return false;
        }

        match query.split_once('=') {
            Some((key, token)) => {
                self.cache_bust_keys.contains(key)
                    && !token.is_empty()
                    && token.chars().any(|c| c.is_ascii_digit())
                    && token.chars().all(|c| c.is_ascii_digit() || c == '.')
            }
            None => false,
        }
    }

    pub fn matches_advertising(&self, facts: &NodeFacts) -> bool {
        if self.protected_roots.contains(&facts.tag) {
            return false;
        }

        let values = facts.attrs.iter().filter_map(|(name, value)| {
            (name == "class" || name == "id" || name.starts_with("data-"))
                .then(|| value.to_lowercase())
        });

        for value in values {
            for term in &self.ad_terms {
                let hit = if term.len() <= 3 {
                    // Short terms like "ad" only count as whole tokens.
                    value
                        .split(|c: char| !c.is_ascii_alphanumeric())
                        .any(|token| token == term)
                } else {
                    value.contains(term.as_str())
                };
                if hit {
                    return true;
                }
            }
        }
        false
    }

    pub fn matches_hidden(&self, facts: &NodeFacts) -> bool {
        if facts.has_attr("hidden") {
            return true;
        }
        if facts
            .attr("aria-hidden")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        {
            return true;
        }

        let Some(style) = facts.attr("style") else {
            return false;
        };
        style.split(';').any(|declaration| {
            let compact: String = declaration
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            let compact = compact.trim_end_matches("!important");
            self.hidden_style_declarations.contains(compact)
        })
    }

    pub fn matches_form_state(&self, facts: &NodeFacts) -> bool {
        if facts.tag == "input"
            && facts
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"))
        {
            return true;
        }

        ["id", "name"].iter().any(|name| {
            facts.attr(name).is_some_and(|value| {
                let value = value.to_lowercase();
                self.view_state_markers
                    .iter()
                    .any(|marker| value.starts_with(marker.as_str()))
            })
        })
    }

    /// Rule 6: should `attr` be stripped from a surviving `tag` element.
    pub fn should_strip_attribute(&self, tag: &str, attr: &str) -> bool {
        let attr = attr.to_lowercase();
        if self.link_attributes.contains(&attr) {
            return false;
        }
        if self.form_controls.contains(tag) && self.form_attributes.contains(&attr) {
            return false;
        }

        self.stripped_attributes.contains(&attr)
            || self
                .stripped_attribute_prefixes
                .iter()
                .any(|prefix| attr.starts_with(prefix.as_str()))
            || self.presentational_attributes.contains(&attr)
            || self
                .presentational_terms
                .iter()
                .any(|term| attr.contains(term.as_str()))
    }
}
