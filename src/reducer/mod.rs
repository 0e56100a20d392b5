pub mod budget;
pub mod document;
pub mod normalize;
pub mod project;
pub mod prune;
pub mod rules;

#[cfg(test)]
mod tests;

pub use budget::{DEFAULT_REDUCTION_BUDGET, truncate_to_budget};
pub use document::Document;
pub use normalize::{normalize, normalize_with};
pub use project::project;
pub use prune::{PruneReport, prune, prune_with};
pub use rules::RuleTables;

use tracing::debug;
use url::Url;

/// Output of one normalize → prune → project → truncate run.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub text: String,
    pub truncated: bool,
    pub raw_len: usize,
    pub projected_len: usize,
    pub prune: PruneReport,
}

impl Reduction {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The reduction pipeline with its rule tables and budget.
#[derive(Debug, Clone)]
pub struct Reducer {
    rules: RuleTables,
    budget: usize,
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new(RuleTables::default(), DEFAULT_REDUCTION_BUDGET)
    }
}

impl Reducer {
    pub fn new(rules: RuleTables, budget: usize) -> Self {
        Self { rules, budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn rules(&self) -> &RuleTables {
        &self.rules
    }

    /// Full projection with no budget applied.
    pub fn render(&self, raw_markup: &str, page_url: &Url) -> (String, PruneReport) {
        let doc = normalize_with(raw_markup, &self.rules);
        let report = prune_with(&doc, &self.rules);
        (project(&doc, page_url), report)
    }

    pub fn reduce(&self, raw_markup: &str, page_url: &Url) -> Reduction {
        let (projected, prune) = self.render(raw_markup, page_url);
        let text = truncate_to_budget(&projected, self.budget).to_string();
        let reduction = Reduction {
            truncated: text.len() < projected.len(),
            raw_len: raw_markup.len(),
            projected_len: projected.len(),
            text,
            prune,
        };

        debug!(
            url = %page_url,
            raw = reduction.raw_len,
            projected = reduction.projected_len,
            kept = reduction.text.len(),
            truncated = reduction.truncated,
            "reduced page"
        );
        reduction
    }
}
