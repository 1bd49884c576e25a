pub mod temperature {
    const ZERO_CELSIUS_K: f64 = 273.15;

    /// Kelvin to Celsius, rounded half away from zero to one decimal.
    pub fn kelvin_to_celsius(temp_k: f64) -> f64 {
        ((temp_k - ZERO_CELSIUS_K) * 10.0).round() / 10.0
    }

    pub fn format_celsius(temp_k: f64) -> String {
        format!("{:.1}", kelvin_to_celsius(temp_k))
    }

    #[test]
    fn test_kelvin_to_celsius() {
        assert_eq!(kelvin_to_celsius(273.15), 0.0);
        assert_eq!(kelvin_to_celsius(300.0), 26.9);
        assert_eq!(kelvin_to_celsius(373.15), 100.0);
        assert_eq!(kelvin_to_celsius(263.15), -10.0);
    }

    #[test]
    fn test_format_celsius() {
        assert_eq!(format_celsius(300.0), "26.9");
        assert_eq!(format_celsius(273.15), "0.0");
        assert_eq!(format_celsius(290.0), "16.9");
    }
}

pub mod time {
    use chrono::{DateTime, Local, TimeZone};

    pub fn timestamp_to_time<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        match DateTime::from_timestamp(timestamp, 0) {
            Some(utc) => utc.with_timezone(tz).format("%-I:%M:%S %p").to_string(),
            None => "--".to_string(),
        }
    }

    pub fn timestamp_to_local_time(timestamp: i64) -> String {
        timestamp_to_time(timestamp, &Local)
    }

    #[test]
    fn test_timestamp_to_time() {
        use chrono::{FixedOffset, Utc};

        // 2024-06-01 04:30:15 UTC
        assert_eq!(timestamp_to_time(1_717_216_215, &Utc), "4:30:15 AM");
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(timestamp_to_time(1_717_216_215, &cest), "6:30:15 AM");
        assert_eq!(timestamp_to_time(1_717_216_215 + 12 * 3600, &Utc), "4:30:15 PM");
    }
}

pub mod direction {
    const COMPASS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];

    pub fn degree_to_compass(deg: f64) -> &'static str {
        let deg = deg.rem_euclid(360.0);
        let idx = (deg / 22.5 + 0.5) as usize % 16;
        COMPASS[idx]
    }

    #[test]
    fn test_degree_to_compass() {
        assert_eq!(degree_to_compass(0.0), "N");
        assert_eq!(degree_to_compass(90.0), "E");
        assert_eq!(degree_to_compass(180.0), "S");
        assert_eq!(degree_to_compass(270.0), "W");
        assert_eq!(degree_to_compass(360.0), "N");
        assert_eq!(degree_to_compass(350.0), "N");
        assert_eq!(degree_to_compass(-90.0), "W");
    }
}
