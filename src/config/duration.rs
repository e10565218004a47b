//! Duration strings such as `"5s"`, `"250ms"`, `"2m"`.

use std::time::Duration;

/// Parse `<digits><unit>` where unit is `ms`, `s`, `m` or `h`.
///
/// `"0"` (with or without a unit) means no timeout and yields `None`.
pub fn parse_duration(raw: &str) -> Result<Option<Duration>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty duration".to_string());
    }

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    if digits.is_empty() {
        return Err(format!("'{}' does not start with a number", raw));
    }
    let value: u64 = digits
        .parse()
        .map_err(|e| format!("'{}': {}", raw, e))?;

    let duration = match unit {
        "" if value == 0 => Duration::ZERO,
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(3600)),
        "" => return Err(format!("'{}' is missing a unit (ms, s, m, h)", raw)),
        other => return Err(format!("unknown unit '{}' in '{}'", other, raw)),
    };

    if duration.is_zero() {
        Ok(None)
    } else {
        Ok(Some(duration))
    }
}
