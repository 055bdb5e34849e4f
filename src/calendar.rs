use chrono::{Datelike, Months, NaiveDate};

/// A calendar month, used as the window for time-entry queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    first: NaiveDate,
}

impl MonthWindow {
    /// `month` is 1-based. Returns `None` for an invalid month or year.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(self.first)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last_day()
    }

    /// English month name, e.g. "March".
    pub fn month_name(&self) -> &'static str {
        month_name(self.month())
    }

    /// `from`/`to` query bounds in ISO format.
    pub fn query(&self) -> [(&'static str, String); 2] {
        [
            ("from", self.first_day().format("%Y-%m-%d").to_string()),
            ("to", self.last_day().format("%Y-%m-%d").to_string()),
        ]
    }
}

pub fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| chrono::Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("")
}

/// Default month/year offered when creating an invoice.
///
/// On or before `cutoff_day` the previous month is recommended, except in
/// January where the current month is kept.
pub fn recommended_month(today: NaiveDate, cutoff_day: u32) -> (i32, u32) {
    if today.day() <= cutoff_day && today.month() != 1 {
        (today.year(), today.month() - 1)
    } else {
        (today.year(), today.month())
    }
}

/// `count` years counting down from the current one.
pub fn available_years(today: NaiveDate, count: u32) -> Vec<i32> {
    let current = today.year();
    (0..count as i32).map(|offset| current - offset).collect()
}
