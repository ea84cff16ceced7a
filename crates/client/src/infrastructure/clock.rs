//! Clock port and implementations.

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of wall-clock time for timestamps the client stamps itself.
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// ISO-8601 with millisecond precision and a `Z` suffix.
    fn now_iso(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl FixedClock {
    /// 2026-01-02T03:04:05.678Z
    pub fn sample() -> Self {
        use chrono::TimeZone;
        let at = Utc
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .map(|t| t + chrono::Duration::milliseconds(678))
            .unwrap_or_default();
        Self(at)
    }
}

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
