use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Aggregate result of a batch removal. One failed item never stops the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl CleanupReport {
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(message.into());
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Instant before which an item counts as older than `max_age_days`.
pub fn age_cutoff(max_age_days: u64) -> DateTime<Utc> {
    let age = i64::try_from(max_age_days)
        .ok()
        .and_then(TimeDelta::try_days)
        .unwrap_or(TimeDelta::MAX);
    Utc::now()
        .checked_sub_signed(age)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_days_is_now_and_huge_values_saturate() {
        let before = Utc::now();
        assert!(age_cutoff(0) >= before);
        assert_eq!(age_cutoff(u64::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
