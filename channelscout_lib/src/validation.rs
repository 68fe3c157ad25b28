use std::time::Duration;

use crate::error::ScoutError;
use crate::pacing::Jitter;

pub const MAX_QUERY_LENGTH: usize = 200;
pub const MAX_SCROLL_ROUNDS: u32 = 100;
pub const MAX_DELAY_SECS: u64 = 600;
pub const MAX_STEP_TIMEOUT_SECS: u64 = 600;

/// Replace whitespace control characters (tab, newline, carriage return,
/// form feed) with a space, drop the remaining ASCII control characters,
/// trim, and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, ScoutError> {
    if input.len() > max_len {
        return Err(ScoutError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_whitespace() => Some(' '),
            c if c.is_ascii_control() => None,
            c => Some(c),
        })
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(ScoutError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a search query: enforce length, clean control chars, trim.
pub fn validate_query(input: &str) -> Result<String, ScoutError> {
    sanitize_text(input, MAX_QUERY_LENGTH)
}

pub fn validate_scroll_rounds(rounds: u32) -> Result<u32, ScoutError> {
    if (1..=MAX_SCROLL_ROUNDS).contains(&rounds) {
        Ok(rounds)
    } else {
        Err(ScoutError::InvalidInput(format!(
            "scroll rounds must be between 1 and {}, got {}",
            MAX_SCROLL_ROUNDS, rounds
        )))
    }
}

/// Validate delay bounds in seconds and build the jitter they describe.
pub fn validate_delay_bounds(min_secs: f64, max_secs: f64) -> Result<Jitter, ScoutError> {
    for (name, value) in [("min", min_secs), ("max", max_secs)] {
        if !value.is_finite() || value < 0.0 || value > MAX_DELAY_SECS as f64 {
            return Err(ScoutError::InvalidInput(format!(
                "{} delay must be between 0 and {} seconds, got {}",
                name, MAX_DELAY_SECS, value
            )));
        }
    }
    if min_secs > max_secs {
        return Err(ScoutError::InvalidInput(format!(
            "min delay ({}) is greater than max delay ({})",
            min_secs, max_secs
        )));
    }
    Ok(Jitter::new(
        Duration::from_secs_f64(min_secs),
        Duration::from_secs_f64(max_secs),
    ))
}

pub fn validate_step_timeout(secs: u64) -> Result<Duration, ScoutError> {
    if (1..=MAX_STEP_TIMEOUT_SECS).contains(&secs) {
        Ok(Duration::from_secs(secs))
    } else {
        Err(ScoutError::InvalidInput(format!(
            "step timeout must be between 1 and {} seconds, got {}",
            MAX_STEP_TIMEOUT_SECS, secs
        )))
    }
}

pub fn validate_max_candidates(max: usize) -> Result<usize, ScoutError> {
    if max == 0 {
        return Err(ScoutError::InvalidInput(
            "max candidates must be at least 1".to_string(),
        ));
    }
    Ok(max)
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
