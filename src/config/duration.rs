use crate::error::{Error, Result};
use std::time::Duration;

/// Parse duration text such as "30s", "5m", "1h30m" or "500ms".
///
/// A zero total is rejected: every duration configured here is a wait bound.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = |detail: String| Error::Configuration(format!("Invalid duration '{}': {}", s, detail));

    let mut total = Duration::ZERO;
    let mut num_str = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_ascii_digit() {
            num_str.push(ch);
        } else if ch.is_alphabetic() {
            let num: u64 = num_str
                .parse()
                .map_err(|_| invalid(format!("missing number before '{}'", ch)))?;

            let unit_duration = if ch == 'm' && chars.peek() == Some(&'s') {
                chars.next();
                Some(Duration::from_millis(num))
            } else {
                match ch {
                    's' => Some(Duration::from_secs(num)),
                    'm' => num.checked_mul(60).map(Duration::from_secs),
                    'h' => num.checked_mul(3600).map(Duration::from_secs),
                    _ => return Err(invalid(format!("unknown unit '{}'", ch))),
                }
            };

            total = unit_duration
                .and_then(|d| total.checked_add(d))
                .ok_or_else(|| invalid("too large".to_string()))?;
            num_str.clear();
        } else if !ch.is_whitespace() {
            return Err(invalid(format!("unexpected character '{}'", ch)));
        }
    }

    if !num_str.is_empty() {
        return Err(invalid(format!("{} is missing a unit", num_str)));
    }

    if total.is_zero() {
        return Err(invalid("must be greater than zero".to_string()));
    }

    Ok(total)
}
