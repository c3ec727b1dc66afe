//! iCalendar export of a planner week.

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{Day, Tile, WeekPlan};

pub const ICS_MIME_TYPE: &str = "text/calendar";
pub const PRODUCT_ID: &str = "-//Win the Week//Planner//EN";
const UID_DOMAIN: &str = "wtw-planner";
const DEFAULT_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hours: u32,
    pub minutes: u32,
}

/// Parse a slot label such as `"9:30 PM"` into 24-hour time.
pub fn parse_time_12_to_24(time: &str) -> Result<ClockTime> {
    let (clock, period) = time
        .trim()
        .split_once(' ')
        .with_context(|| format!("Invalid time '{time}'. Expected e.g. '9:00 AM'"))?;
    let (h, m) = clock
        .split_once(':')
        .with_context(|| format!("Invalid time '{time}'. Expected e.g. '9:00 AM'"))?;
    let mut hours: u32 = h.parse().with_context(|| format!("Invalid hour in '{time}'"))?;
    let minutes: u32 = m.parse().with_context(|| format!("Invalid minutes in '{time}'"))?;
    if !(1..=12).contains(&hours) || minutes > 59 {
        bail!("Time '{time}' is out of range");
    }
    match period.trim() {
        "AM" if hours == 12 => hours = 0,
        "PM" if hours != 12 => hours += 12,
        "AM" | "PM" => {}
        other => bail!("Invalid period '{other}' in '{time}'. Use AM or PM"),
    }
    Ok(ClockTime { hours, minutes })
}

/// Minutes for a duration label. `"30 min"` is literal minutes, `"1.5 hr"` is
/// hours (fractions allowed). Missing, `"No duration"` or unreadable labels
/// count as one hour.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn parse_duration_minutes(duration: Option<&str>) -> u32 {
    let Some(d) = duration.map(str::trim).filter(|d| !d.is_empty()) else {
        return DEFAULT_DURATION_MINUTES;
    };
    if d == crate::models::NO_DURATION {
        return DEFAULT_DURATION_MINUTES;
    }
    let number = d.split_whitespace().next().unwrap_or_default();
    if d.contains("min") {
        let digits: String = number.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().unwrap_or(DEFAULT_DURATION_MINUTES)
    } else {
        match number.parse::<f64>() {
            Ok(hours) if hours.is_finite() && hours >= 0.0 => (hours * 60.0).round() as u32,
            _ => DEFAULT_DURATION_MINUTES,
        }
    }
}

#[must_use]
pub fn format_ics_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[must_use]
pub fn format_ics_datetime(at: NaiveDateTime) -> String {
    at.format("%Y%m%dT%H%M%S").to_string()
}

/// Escape a TEXT property value (RFC 5545 section 3.3.11).
#[must_use]
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

#[must_use]
pub fn ics_filename(week_key: &str) -> String {
    format!("week-{week_key}.ics")
}

/// Meal tiles describe themselves as `type | ingredients | N cal | notes`.
fn description(tile: &Tile) -> Option<String> {
    let block = &tile.block;
    if !block.is_meal() {
        return None;
    }
    fn present(v: &Option<String>) -> Option<&str> {
        v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(m) = present(&block.meal_type) {
        parts.push(m.to_string());
    }
    if let Some(i) = present(&block.ingredients) {
        parts.push(i.to_string());
    }
    if let Some(c) = present(&block.calories) {
        parts.push(format!("{c} cal"));
    }
    if let Some(n) = present(&block.notes) {
        parts.push(n.to_string());
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(" | "))
}

fn push_event(lines: &mut Vec<String>, tile: &Tile, date: NaiveDate) {
    let block = &tile.block;
    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{}-{}@{UID_DOMAIN}", tile.id, format_ics_date(date)));

    let start = block.scheduled_start().and_then(|t| match parse_time_12_to_24(t) {
        Ok(c) => NaiveTime::from_hms_opt(c.hours, c.minutes, 0),
        Err(e) => {
            tracing::warn!(tile = %tile.id, "exporting as all-day: {e:#}");
            None
        }
    });

    if let Some(time) = start {
        let begin = date.and_time(time);
        let minutes = parse_duration_minutes(block.scheduled_duration());
        let end = begin + Duration::minutes(i64::from(minutes));
        lines.push(format!("DTSTART:{}", format_ics_datetime(begin)));
        lines.push(format!("DTEND:{}", format_ics_datetime(end)));
    } else {
        let next = date + Duration::days(1);
        lines.push(format!("DTSTART;VALUE=DATE:{}", format_ics_date(date)));
        lines.push(format!("DTEND;VALUE=DATE:{}", format_ics_date(next)));
    }

    lines.push(format!("SUMMARY:{}", escape_text(&block.label)));
    if let Some(desc) = description(tile) {
        lines.push(format!("DESCRIPTION:{}", escape_text(&desc)));
    }
    lines.push("END:VEVENT".to_string());
}

/// Render the week as a calendar document, one event per tile in day order.
#[must_use]
pub fn generate_ics(week: &WeekPlan, dates: &[NaiveDate; 7]) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODUCT_ID}"),
    ];
    for day in Day::ALL {
        let date = dates[day.index()];
        for tile in week.day(day) {
            push_event(&mut lines, tile, date);
        }
    }
    lines.push("END:VCALENDAR".to_string());
    let mut doc = lines.join("\r\n");
    doc.push_str("\r\n");
    doc
}
