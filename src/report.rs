use chrono::{NaiveDate, TimeZone};

use crate::daily::daily_forecast;
use crate::openweather::Weather;
use crate::units::direction::degree_to_compass;
use crate::units::temperature::format_celsius;
use crate::units::time::timestamp_to_time;

/// Formats fetched weather as plain text, for `--plain`.
pub fn format_report<Tz: TimeZone>(weather: &Weather, today: NaiveDate, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let current = &weather.current;
    let mut output = format!("{}, {}\n", current.name, current.sys.country);

    if let Some(cond) = current.condition() {
        output.push_str(&format!("  {} ({})\n", cond.description, cond.icon_url()));
    }
    let wind = match current.wind.deg {
        Some(deg) => format!("{} m/s {}", current.wind.speed, degree_to_compass(deg)),
        None => format!("{} m/s", current.wind.speed),
    };
    let details = [
        ("Temperature", format!("{}\u{00b0}C", format_celsius(current.main.temp))),
        ("Feels like", format!("{}\u{00b0}C", format_celsius(current.main.feels_like))),
        ("Humidity", format!("{}%", current.main.humidity)),
        ("Wind speed", wind),
        ("Sunrise", timestamp_to_time(current.sys.sunrise, tz)),
        ("Sunset", timestamp_to_time(current.sys.sunset, tz)),
    ];
    for (label, value) in details {
        output.push_str(&format!("  {label}: {value}\n"));
    }

    let days = daily_forecast(&weather.forecast.list, tz);
    if days.is_empty() {
        return output;
    }

    output.push_str("\n5-Day Forecast:\n");
    for day in days {
        let sample = day.sample;
        output.push_str(&format!(
            "  {:<12} {:>6}\u{00b0} / {:>6}\u{00b0}",
            day.label(today),
            format_celsius(sample.main.temp_max),
            format_celsius(sample.main.temp_min),
        ));
        if let Some(cond) = sample.condition() {
            output.push_str(&format!("  {} ({})", cond.description, cond.small_icon_url()));
        }
        output.push('\n');
    }
    output
}
