/// Instructions sent as the system message on every call.
pub const SYSTEM_PROMPT: &str = r#"You help a golfer find the next available tee time on a golf course website.
You receive the readable text of one page. Links appear as `text (url)`.

1. If the page lists a bookable tee time, pick the next one after the current time and answer:
   {"kind": "tee_time", "time": "<exact time>", "players": <number of players>, "price": "<price or null>", "notes": "<important details or null>"}
2. Otherwise find the link most likely to lead to a tee time booking page. Prefer links with words
   like "tee time", "book", "reserve", "schedule" or "play", and prominent buttons or navigation items. Answer:
   {"kind": "booking_link", "url": "<full URL from the page>", "text": "<link or button text>", "reason": "<why this link leads to booking>"}
3. If the page has neither, answer {"kind": "empty"}.

Reply with exactly one JSON object and nothing else."#;

/// The user message: current time first, then the reduced page.
pub fn user_prompt(page_text: &str, current_time_hint: &str) -> String {
    format!(
        "Current time: {}\n\nPage content:\n{}",
        current_time_hint, page_text
    )
}

/// `07:45 AM` style wall-clock hint, as a golfer would read it.
pub fn current_time_hint(now: chrono::DateTime<chrono::Local>) -> String {
    now.format("%I:%M %p").to_string()
}
