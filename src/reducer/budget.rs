/// How far back from the cap we look for a whitespace boundary.
pub const LOOKBACK_WINDOW: usize = 64;

/// Default cap on projected text handed to inference.
pub const DEFAULT_REDUCTION_BUDGET: usize = 40_000;

/// Cut `text` to at most `budget` bytes.
///
/// The cut lands on a UTF-8 boundary, preferring the last whitespace within
/// [`LOOKBACK_WINDOW`] bytes of the cap so a word or URL is not split.
/// Without such whitespace it hard-cuts at the cap.
pub fn truncate_to_budget(text: &str, budget: usize) -> &str {
    if text.len() <= budget {
        return text;
    }

    let mut cap = budget;
    while !text.is_char_boundary(cap) {
        cap -= 1;
    }

    if text[cap..].starts_with(char::is_whitespace) {
        return text[..cap].trim_end();
    }

    let mut window_start = cap.saturating_sub(LOOKBACK_WINDOW);
    while !text.is_char_boundary(window_start) {
        window_start += 1;
    }

    let boundary = text[window_start..cap]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(idx, _)| window_start + idx);

    match boundary {
        Some(cut) => text[..cut].trim_end(),
        None => &text[..cap],
    }
}
