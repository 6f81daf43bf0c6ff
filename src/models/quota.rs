//! Freemium usage counters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted usage counters.
///
/// `daily_count` only means something while `daily_date` is today; callers
/// run [`QuotaState::normalize`] before reading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuotaState {
    pub daily_count: u32,
    pub daily_date: Option<NaiveDate>,
    pub lifetime_count: u64,
    pub is_premium: bool,
}

/// How many more units may be committed today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unlimited,
    Limited(u32),
}

impl Remaining {
    /// Clamp a batch size to this allowance.
    pub fn clamp(self, requested: usize) -> usize {
        match self {
            Remaining::Unlimited => requested,
            Remaining::Limited(left) => requested.min(left as usize),
        }
    }
}

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub remaining: Remaining,
}

impl QuotaState {
    /// Reset the daily counter if it belongs to another day.
    ///
    /// Returns `true` when the state changed and must be persisted.
    pub fn normalize(&mut self, today: NaiveDate) -> bool {
        if self.daily_date == Some(today) {
            return false;
        }
        self.daily_count = 0;
        self.daily_date = Some(today);
        true
    }

    /// Today's count without mutating the state.
    pub fn count_on(&self, today: NaiveDate) -> u32 {
        if self.daily_date == Some(today) {
            self.daily_count
        } else {
            0
        }
    }

    /// Evaluate the gate against `limit`. Assumes a normalized state.
    pub fn check(&self, limit: u32) -> QuotaCheck {
        if self.is_premium {
            return QuotaCheck {
                allowed: true,
                remaining: Remaining::Unlimited,
            };
        }
        let left = limit.saturating_sub(self.daily_count);
        QuotaCheck {
            allowed: left > 0,
            remaining: Remaining::Limited(left),
        }
    }

    /// Add `n` committed units to both counters.
    pub fn record(&mut self, today: NaiveDate, n: u32) {
        self.normalize(today);
        self.daily_count = self.daily_count.saturating_add(n);
        self.lifetime_count = self.lifetime_count.saturating_add(u64::from(n));
    }
}
