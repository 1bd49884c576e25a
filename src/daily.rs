//! Reduces the 3-hourly forecast to one sample per calendar day.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Timelike};

use crate::openweather::forecast::ForecastSample;

pub const MAX_DAYS: usize = 5;
const PREFERRED_HOUR: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyForecast<'a> {
    pub date: NaiveDate,
    pub sample: &'a ForecastSample,
}

impl DailyForecast<'_> {
    /// "Today", "Tomorrow", or e.g. "Sat, Oct 17".
    pub fn label(&self, today: NaiveDate) -> String {
        day_label(self.date, today)
    }
}

pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.checked_add_days(Days::new(1)) == Some(date) {
        "Tomorrow".to_string()
    } else {
        date.format("%a, %b %-d").to_string()
    }
}

/// Picks one sample per local calendar date, in first-seen order, capped at [`MAX_DAYS`].
///
/// A sample at local noon replaces whatever was picked for its date; otherwise the first
/// sample of the date is kept.
pub fn daily_forecast<'a, Tz: TimeZone>(
    samples: &'a [ForecastSample],
    tz: &Tz,
) -> Vec<DailyForecast<'a>> {
    let mut days: Vec<DailyForecast<'a>> = Vec::new();

    for sample in samples {
        let Some(utc) = DateTime::from_timestamp(sample.dt, 0) else {
            continue;
        };
        let local = utc.with_timezone(tz);
        let date = local.date_naive();
        let at_noon = local.hour() == PREFERRED_HOUR;

        match days.iter_mut().find(|day| day.date == date) {
            Some(day) if at_noon => day.sample = sample,
            Some(_) => {}
            None => days.push(DailyForecast { date, sample }),
        }
    }

    days.truncate(MAX_DAYS);
    days
}
