//! Trailing time windows for report commands
//!
//! Accepts strings made of `<integer><unit>` terms such as `90s`, `24h`, `7d` or `1h30m`.

use crate::error::{MonitorError, Result};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

/// A trailing duration restricting aggregation to recent samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window(Duration);

impl Window {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Earliest timestamp still inside the window when evaluated at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.0)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Parse a window argument
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }
}

impl FromStr for Window {
    type Err = MonitorError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason: &str| MonitorError::InvalidWindow {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let s = input.trim();
        if s.is_empty() {
            return Err(invalid("empty duration"));
        }

        let mut total_ms: i64 = 0;
        let mut rest = s;
        while !rest.is_empty() {
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| invalid("missing unit"))?;
            if digits_end == 0 {
                return Err(invalid("expected a number"));
            }
            let amount: i64 = rest[..digits_end]
                .parse()
                .map_err(|_| invalid("number too large"))?;

            let unit_part = &rest[digits_end..];
            let unit_end = unit_part
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(unit_part.len());
            let unit = &unit_part[..unit_end];

            let unit_ms: i64 = match unit {
                "ms" => 1,
                "s" => 1_000,
                "m" => 60_000,
                "h" => 3_600_000,
                "d" => 86_400_000,
                "w" => 604_800_000,
                _ => return Err(invalid(&format!("unknown unit {:?}", unit))),
            };

            total_ms = amount
                .checked_mul(unit_ms)
                .and_then(|ms| total_ms.checked_add(ms))
                .ok_or_else(|| invalid("duration too large"))?;
            rest = &unit_part[unit_end..];
        }

        if total_ms == 0 {
            return Err(invalid("duration must be positive"));
        }

        let duration = Duration::milliseconds(total_ms);
        if Utc::now().checked_sub_signed(duration).is_none() {
            return Err(invalid("duration too large"));
        }

        Ok(Window(duration))
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.num_milliseconds();
        if millis % 1_000 != 0 {
            return write!(f, "{}ms", millis);
        }

        let secs = millis / 1_000;
        if secs % 86_400 == 0 {
            write!(f, "{}d", secs / 86_400)
        } else if secs % 3_600 == 0 {
            write!(f, "{}h", secs / 3_600)
        } else if secs % 60 == 0 {
            write!(f, "{}m", secs / 60)
        } else {
            write!(f, "{}s", secs)
        }
    }
}
