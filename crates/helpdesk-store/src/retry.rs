use std::time::Duration;

const MAX_SHIFT: u32 = 6;

/// Exponential backoff: `base`, `2*base`, `4*base`, ... capped at `64*base`
pub fn next_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1_u32 << attempt.min(MAX_SHIFT))
}
