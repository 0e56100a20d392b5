use rand::Rng;
use std::time::Duration;

/// Exponent cap, so a misconfigured retry count cannot sleep for hours.
const MAX_EXPONENT: u32 = 6;

/// Exponential backoff with ±30% jitter: `base * 2^attempt`.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let capped_attempt = attempt.min(MAX_EXPONENT);
    let delay = base.saturating_mul(2_u32.saturating_pow(capped_attempt));

    let jitter_factor = rand::thread_rng().gen_range(0.7..1.3);
    delay.mul_f64(jitter_factor)
}

/// Longest delay [`backoff_delay`] can return for `attempt`.
pub fn max_backoff_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt.min(MAX_EXPONENT)))
        .mul_f64(1.3)
}
