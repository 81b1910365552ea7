//! Daily completion streaks

use chrono::NaiveDate;
use serde::Serialize;

/// What completing a day does to a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakStep {
    /// The day is not after the last counted day.
    Unchanged,
    /// The day directly follows the last counted day.
    Increment,
    /// First counted day, or a gap since the last one.
    Reset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub current: i32,
    pub longest: i32,
    /// Last calendar day that counted towards the streak
    pub last_day: Option<NaiveDate>,
}

impl Streak {
    pub fn new(current: i32, longest: i32, last_day: Option<NaiveDate>) -> Self {
        Self {
            current,
            longest,
            last_day,
        }
    }

    /// Decide how completing `day` moves the streak, without changing it.
    pub fn step(&self, day: NaiveDate) -> StreakStep {
        match self.last_day {
            Some(last) if last >= day => StreakStep::Unchanged,
            Some(last) if last.succ_opt() == Some(day) => StreakStep::Increment,
            _ => StreakStep::Reset,
        }
    }

    pub fn apply(&mut self, step: StreakStep, day: NaiveDate) {
        match step {
            StreakStep::Unchanged => return,
            StreakStep::Increment => self.current += 1,
            StreakStep::Reset => self.current = 1,
        }
        self.last_day = Some(day);
        self.longest = self.longest.max(self.current);
    }

    /// Record that `day` was completed. Returns true when the streak changed.
    pub fn record(&mut self, day: NaiveDate) -> bool {
        let step = self.step(day);
        self.apply(step, day);
        step != StreakStep::Unchanged
    }

    /// Streak as seen on `today`: a streak whose last day is older than
    /// yesterday has lapsed.
    pub fn effective(&self, today: NaiveDate) -> i32 {
        match self.last_day {
            Some(last) if last >= today.pred_opt().unwrap_or(today) => self.current,
            _ => 0,
        }
    }
}
