// src/calendar/mod.rs
// Calendar math: canonical week starts, the month grid and navigation

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};

pub mod aggregator;
pub mod index;

pub use aggregator::{DragState, DropOutcome, WeekPlanAggregator};
pub use index::SlotIndex;

/// Weeks start on Saturday unless configured otherwise
pub const DEFAULT_WEEK_START: Weekday = Weekday::Sat;

/// Today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Most recent `first_day` on or before `date`
pub fn week_start_for(date: NaiveDate, first_day: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() - first_day.num_days_from_monday()) % 7;
    date - Days::new(u64::from(offset))
}

/// Whole weeks covering one month, padded with days of the neighbouring
/// months at both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    first_of_month: NaiveDate,
    first_day: Weekday,
    days: Vec<NaiveDate>,
}

impl MonthGrid {
    /// `None` for an invalid year/month
    pub fn new(year: i32, month: u32, first_day: Weekday) -> Option<Self> {
        let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last_of_month = first_of_month.checked_add_months(Months::new(1))? - Days::new(1);

        let start = week_start_for(first_of_month, first_day);
        let end = week_start_for(last_of_month, first_day) + Days::new(6);
        let days = start.iter_days().take_while(|d| *d <= end).collect();

        Some(Self {
            first_of_month,
            first_day,
            days,
        })
    }

    /// Grid for the month containing `date`
    pub fn containing(date: NaiveDate, first_day: Weekday) -> Option<Self> {
        Self::new(date.year(), date.month(), first_day)
    }

    pub fn first_of_month(&self) -> NaiveDate {
        self.first_of_month
    }

    pub fn first_day(&self) -> Weekday {
        self.first_day
    }

    /// Every cell, row by row; the length is a multiple of 7
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[NaiveDate]> {
        self.days.chunks(7)
    }

    /// One canonical week start per row
    pub fn week_starts(&self) -> Vec<NaiveDate> {
        self.weeks().map(|week| week[0]).collect()
    }

    /// False for padding cells
    pub fn is_in_month(&self, date: NaiveDate) -> bool {
        date.year() == self.first_of_month.year() && date.month() == self.first_of_month.month()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.first().is_some_and(|first| date >= *first)
            && self.days.last().is_some_and(|last| date <= *last)
    }

    /// Short weekday names in column order
    pub fn headers(&self) -> Vec<String> {
        let mut day = self.first_day;
        let mut headers = Vec::with_capacity(7);
        for _ in 0..7 {
            headers.push(day.to_string());
            day = day.succ();
        }
        headers
    }

    /// e.g. "March 2025"
    pub fn title(&self) -> String {
        self.first_of_month.format("%B %Y").to_string()
    }
}

/// Week-at-a-time cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekNavigation {
    week_start: NaiveDate,
    first_day: Weekday,
}

impl WeekNavigation {
    pub fn new(date: NaiveDate, first_day: Weekday) -> Self {
        Self {
            week_start: week_start_for(date, first_day),
            first_day,
        }
    }

    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    pub fn week_end(&self) -> NaiveDate {
        self.week_start + Days::new(6)
    }

    pub fn prev(&mut self) {
        self.week_start = self.week_start - Days::new(7);
    }

    pub fn next(&mut self) {
        self.week_start = self.week_start + Days::new(7);
    }

    /// Jump back to the week containing `today`
    pub fn current(&mut self, today: NaiveDate) {
        self.week_start = week_start_for(today, self.first_day);
    }
}

/// Month-at-a-time cursor, always on the 1st
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    month: NaiveDate,
}

impl MonthCursor {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            month: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn month(&self) -> NaiveDate {
        self.month
    }

    pub fn grid(&self, first_day: Weekday) -> Option<MonthGrid> {
        MonthGrid::containing(self.month, first_day)
    }

    pub fn prev(&mut self) {
        if let Some(month) = self.month.checked_sub_months(Months::new(1)) {
            self.month = month;
        }
    }

    pub fn next(&mut self) {
        if let Some(month) = self.month.checked_add_months(Months::new(1)) {
            self.month = month;
        }
    }

    pub fn today(&mut self, today: NaiveDate) {
        *self = Self::new(today);
    }
}
