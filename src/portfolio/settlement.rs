use chrono::NaiveDate;
use std::collections::VecDeque;

/// Per-symbol FIFO ledger of same-day purchases pending T+1 availability.
///
/// A T+0 symbol never locks shares; its bucket only records entries for audit and
/// [`SettlementBucket::roll`] is a no-op for it.
#[derive(Clone, Debug, Default)]
pub struct SettlementBucket {
    entries: VecDeque<(NaiveDate, u64)>,
    is_t0: bool,
}

impl SettlementBucket {
    pub fn new(is_t0: bool) -> Self {
        Self {
            entries: VecDeque::new(),
            is_t0,
        }
    }

    /// Records `shares` bought on `trade_day`. For a T+1 symbol these are locked until the next
    /// [`SettlementBucket::roll`] past `trade_day`; for a T+0 symbol they are recorded for audit
    /// only and are never locked.
    pub fn record_purchase(&mut self, trade_day: NaiveDate, shares: u64) {
        self.entries.push_back((trade_day, shares));
    }

    /// Shares still locked (bought on `trade_day` or later).
    pub fn locked_shares(&self) -> u64 {
        if self.is_t0 {
            return 0;
        }
        self.entries.iter().map(|(_, shares)| shares).sum()
    }

    /// Releases every entry whose trade day is strictly before `new_day`. Returns the number of
    /// shares released so the caller can credit them to `available_shares`.
    pub fn roll(&mut self, new_day: NaiveDate) -> u64 {
        if self.is_t0 {
            return 0;
        }
        let mut released = 0u64;
        while let Some(&(day, shares)) = self.entries.front() {
            if day < new_day {
                released += shares;
                self.entries.pop_front();
            } else {
                break;
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        chrono::Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap().date_naive()
    }

    #[test]
    fn should_lock_shares_bought_today_for_t1_symbol() {
        let mut bucket = SettlementBucket::new(false);
        bucket.record_purchase(day(1), 100);
        assert_eq!(bucket.locked_shares(), 100);
    }

    #[test]
    fn should_release_shares_after_rolling_past_trade_day() {
        let mut bucket = SettlementBucket::new(false);
        bucket.record_purchase(day(1), 100);
        let released = bucket.roll(day(2));
        assert_eq!(released, 100);
        assert_eq!(bucket.locked_shares(), 0);
    }

    #[test]
    fn should_never_lock_shares_for_t0_symbol() {
        let mut bucket = SettlementBucket::new(true);
        bucket.record_purchase(day(1), 100);
        assert_eq!(bucket.locked_shares(), 0);
        assert_eq!(bucket.roll(day(1)), 0);
    }

    #[test]
    fn should_not_release_shares_bought_same_day_as_roll() {
        let mut bucket = SettlementBucket::new(false);
        bucket.record_purchase(day(2), 100);
        assert_eq!(bucket.roll(day(2)), 0);
        assert_eq!(bucket.locked_shares(), 100);
    }
}
