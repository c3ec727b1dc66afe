use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use wtw_core::models::{Day, Tile, WeekPlan};

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing tile and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// An empty flag value clears the field.
pub(crate) fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A tile together with the day it sits on, for `--json` output.
#[derive(Serialize)]
pub(crate) struct PlacedTile<'a> {
    pub day: Day,
    #[serde(flatten)]
    pub tile: &'a Tile,
}

/// One-line description of a tile, used in confirmations.
pub(crate) fn describe(tile: &Tile, day: Day) -> String {
    let block = &tile.block;
    let mut line = format!("[{}] {} on {day}", tile.id, block.label);
    if let Some(start) = block.scheduled_start() {
        line.push_str(&format!(" at {start}"));
    }
    if block.recurring {
        line.push_str(" (weekly)");
    }
    line
}

#[derive(Tabled)]
struct TileRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Length")]
    duration: String,
    #[tabled(rename = "Block")]
    label: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Weekly")]
    recurring: String,
}

fn tile_row(day: Day, tile: &Tile) -> TileRow {
    let block = &tile.block;
    let kind = match &block.meal_type {
        Some(meal_type) if block.is_meal() => meal_type.clone(),
        _ => block.kind.to_string(),
    };
    TileRow {
        day: day.short_name().to_string(),
        id: tile.id.clone(),
        time: block.scheduled_start().unwrap_or("-").to_string(),
        duration: block.scheduled_duration().unwrap_or("-").to_string(),
        label: truncate(&block.label, 40),
        kind,
        color: block.color.name.clone(),
        recurring: if block.recurring { "yes" } else { "" }.to_string(),
    }
}

pub(crate) fn week_table(week: &WeekPlan) -> String {
    let rows: Vec<TileRow> = week.iter().map(|(day, tile)| tile_row(day, tile)).collect();
    Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string()
}
