//! Turns provider values into display strings.

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

use crate::config::SunTimes;

const AQI_LABELS: [&str; 6] = ["", "Good", "Fair", "Moderate", "Poor", "Very Poor"];

/// Nearest whole degree, ties to even.
pub fn round_degrees(value: f64) -> i64 {
    value.round_ties_even() as i64
}

pub fn temperature(value: f64) -> String {
    format!("{}°", round_degrees(value))
}

pub fn feels_like(value: f64) -> String {
    format!("Feels like {}°", round_degrees(value))
}

pub fn humidity(pct: u8) -> String {
    format!("{pct}%")
}

pub fn wind_speed(mps: f64) -> String {
    format!("{mps} m/s")
}

pub fn pressure(hpa: u32) -> String {
    format!("{hpa} hPa")
}

/// Label for an AQI bucket. 0 and anything out of range render blank.
pub fn aqi_label(aqi: u8) -> &'static str {
    AQI_LABELS.get(usize::from(aqi)).copied().unwrap_or("")
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// City offset truncated to whole minutes (floor division, as the provider may send
/// odd second counts).
pub fn city_offset(utc_offset_secs: i32) -> FixedOffset {
    let minutes = utc_offset_secs.div_euclid(60);
    FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
}

/// "03:04 PM, Monday" in the queried city's clock.
pub fn local_time(now: DateTime<Utc>, utc_offset_secs: i32) -> String {
    now.with_timezone(&city_offset(utc_offset_secs)).format("%I:%M %p, %A").to_string()
}

/// "06:12 AM" for an epoch timestamp, in the city's or the viewer's zone.
pub fn sun_time(epoch: i64, utc_offset_secs: i32, zone: SunTimes) -> String {
    let Some(at) = DateTime::<Utc>::from_timestamp(epoch, 0) else {
        return String::new();
    };
    match zone {
        SunTimes::City => at.with_timezone(&city_offset(utc_offset_secs)).format("%I:%M %p"),
        SunTimes::Viewer => at.with_timezone(&Local).format("%I:%M %p"),
    }
    .to_string()
}
