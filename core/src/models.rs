use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Day of the planner week. Weeks start on Monday regardless of locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }

    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Day::Monday => "MON",
            Day::Tuesday => "TUE",
            Day::Wednesday => "WED",
            Day::Thursday => "THU",
            Day::Friday => "FRI",
            Day::Saturday => "SAT",
            Day::Sunday => "SUN",
        }
    }

    /// Zero-based position in the week, Monday = 0.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Day::ALL[date.weekday().num_days_from_monday() as usize]
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Day {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monday" | "mon" => Ok(Day::Monday),
            "tuesday" | "tue" => Ok(Day::Tuesday),
            "wednesday" | "wed" => Ok(Day::Wednesday),
            "thursday" | "thu" => Ok(Day::Thursday),
            "friday" | "fri" => Ok(Day::Friday),
            "saturday" | "sat" => Ok(Day::Saturday),
            "sunday" | "sun" => Ok(Day::Sunday),
            _ => bail!("Invalid day: {s}. Use monday-sunday or mon-sun"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    #[default]
    Task,
    Meal,
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileKind::Task => f.write_str("task"),
            TileKind::Meal => f.write_str("meal"),
        }
    }
}

/// A palette entry as compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub name: &'static str,
    pub bg: &'static str,
    pub border: &'static str,
    pub text: &'static str,
}

pub const PALETTE: [Swatch; 8] = [
    Swatch { name: "Slate", bg: "#e2e8f0", border: "#94a3b8", text: "#1e293b" },
    Swatch { name: "Amber", bg: "#fef3c7", border: "#f59e0b", text: "#78350f" },
    Swatch { name: "Emerald", bg: "#d1fae5", border: "#10b981", text: "#064e3b" },
    Swatch { name: "Sky", bg: "#e0f2fe", border: "#0ea5e9", text: "#0c4a6e" },
    Swatch { name: "Rose", bg: "#ffe4e6", border: "#f43f5e", text: "#881337" },
    Swatch { name: "Violet", bg: "#ede9fe", border: "#8b5cf6", text: "#4c1d95" },
    Swatch { name: "Orange", bg: "#ffedd5", border: "#f97316", text: "#7c2d12" },
    Swatch { name: "Teal", bg: "#ccfbf1", border: "#14b8a6", text: "#134e4a" },
];

/// Tile color as persisted. Stored records carry the full hue set, not just the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    #[serde(default)]
    pub name: String,
    pub bg: String,
    pub border: String,
    pub text: String,
}

impl From<Swatch> for Color {
    fn from(s: Swatch) -> Self {
        Self {
            name: s.name.to_string(),
            bg: s.bg.to_string(),
            border: s.border.to_string(),
            text: s.text.to_string(),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        PALETTE[0].into()
    }
}

pub fn palette_color(name: &str) -> Result<Color> {
    PALETTE
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
        .map(|s| Color::from(*s))
        .ok_or_else(|| {
            let names: Vec<&str> = PALETTE.iter().map(|s| s.name).collect();
            anyhow::anyhow!("Invalid color '{name}'. Must be one of: {}", names.join(", "))
        })
}

pub const NO_TIME: &str = "No time";
pub const NO_DURATION: &str = "No duration";

pub const TIME_OPTIONS: &[&str] = &[
    NO_TIME, "5:00 AM", "5:30 AM", "6:00 AM", "6:30 AM", "7:00 AM", "7:30 AM", "8:00 AM",
    "8:30 AM", "9:00 AM", "9:30 AM", "10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM", "12:00 PM",
    "12:30 PM", "1:00 PM", "1:30 PM", "2:00 PM", "2:30 PM", "3:00 PM", "3:30 PM", "4:00 PM",
    "4:30 PM", "5:00 PM", "5:30 PM", "6:00 PM", "6:30 PM", "7:00 PM", "7:30 PM", "8:00 PM",
    "8:30 PM", "9:00 PM", "9:30 PM", "10:00 PM", "10:30 PM", "11:00 PM", "11:30 PM",
];

pub const DURATION_OPTIONS: &[&str] = &[
    NO_DURATION, "15 min", "30 min", "45 min", "1 hr", "1.5 hr", "2 hr", "2.5 hr", "3 hr", "4 hr",
    "5 hr", "6 hr", "8 hr",
];

pub const MEAL_TYPES: &[&str] = &["Breakfast", "Lunch", "Dinner", "Snack"];

pub const DEFAULT_MEAL_TYPE: &str = "Lunch";

fn default_start_time() -> String {
    NO_TIME.to_string()
}

fn default_duration() -> String {
    NO_DURATION.to_string()
}

/// Everything about a tile except its identity. Recurring templates are stored as blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: TileKind,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_id: Option<String>,
    // Meal-only fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Block {
    #[must_use]
    pub fn task(label: &str) -> Self {
        Self {
            label: label.to_string(),
            kind: TileKind::Task,
            color: Color::default(),
            start_time: default_start_time(),
            duration: default_duration(),
            recurring: false,
            recurring_id: None,
            meal_type: None,
            ingredients: None,
            calories: None,
            protein: None,
            carbs: None,
            fat: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn meal(label: &str, meal_type: &str) -> Self {
        Self {
            kind: TileKind::Meal,
            meal_type: Some(meal_type.to_string()),
            ..Self::task(label)
        }
    }

    #[must_use]
    pub fn is_meal(&self) -> bool {
        self.kind == TileKind::Meal
    }

    /// The start slot, unless the block is unscheduled.
    #[must_use]
    pub fn scheduled_start(&self) -> Option<&str> {
        let t = self.start_time.trim();
        if t.is_empty() || t == NO_TIME {
            None
        } else {
            Some(t)
        }
    }

    #[must_use]
    pub fn scheduled_duration(&self) -> Option<&str> {
        let d = self.duration.trim();
        if d.is_empty() || d == NO_DURATION {
            None
        } else {
            Some(d)
        }
    }

    /// Reject what the editor would refuse to save.
    pub fn validate(&self) -> Result<()> {
        validate_label(&self.label)?;
        validate_start_time(&self.start_time)?;
        validate_duration(&self.duration)?;
        // Older records carry only the hues, so an empty name is accepted.
        if !self.color.name.is_empty() {
            palette_color(&self.color.name)?;
        }
        if self.is_meal() {
            if let Some(meal_type) = &self.meal_type {
                validate_meal_type(meal_type)?;
            }
            for (field, value) in [
                ("calories", &self.calories),
                ("protein", &self.protein),
                ("carbs", &self.carbs),
                ("fat", &self.fat),
            ] {
                if let Some(v) = value {
                    validate_macro(field, v)?;
                }
            }
        }
        if self.recurring_id.is_some() && !self.recurring {
            bail!("Only recurring blocks may carry a recurring id");
        }
        Ok(())
    }
}

/// A block placed on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub block: Block,
}

/// What the editor hands back on save: new blocks have no id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDraft {
    pub id: Option<String>,
    pub block: Block,
}

impl TileDraft {
    #[must_use]
    pub fn new(block: Block) -> Self {
        Self { id: None, block }
    }

    #[must_use]
    pub fn existing(tile: &Tile) -> Self {
        Self {
            id: Some(tile.id.clone()),
            block: tile.block.clone(),
        }
    }
}

/// Ordered items per weekday. Every weekday key is always present when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayMap<T> {
    days: BTreeMap<Day, Vec<T>>,
}

impl<T> Default for DayMap<T> {
    fn default() -> Self {
        Self {
            days: Day::ALL.iter().map(|d| (*d, Vec::new())).collect(),
        }
    }
}

impl<T> DayMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn day(&self, day: Day) -> &[T] {
        self.days.get(&day).map_or(&[], Vec::as_slice)
    }

    pub fn day_mut(&mut self, day: Day) -> &mut Vec<T> {
        self.days.entry(day).or_default()
    }

    /// Fill in weekdays missing from a deserialized record.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for day in Day::ALL {
            self.days.entry(day).or_default();
        }
        self
    }

    /// All items in day order, then within-day order.
    pub fn iter(&self) -> impl Iterator<Item = (Day, &T)> {
        Day::ALL
            .into_iter()
            .flat_map(move |d| self.day(d).iter().map(move |t| (d, t)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type WeekPlan = DayMap<Tile>;
pub type RecurringTemplates = DayMap<Block>;

impl WeekPlan {
    #[must_use]
    pub fn find(&self, id: &str) -> Option<(Day, usize, &Tile)> {
        Day::ALL.into_iter().find_map(|d| {
            self.day(d)
                .iter()
                .position(|t| t.id == id)
                .map(|i| (d, i, &self.day(d)[i]))
        })
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Tile> {
        self.days
            .values_mut()
            .flat_map(|tiles| tiles.iter_mut())
            .find(|t| t.id == id)
    }

    /// Remove every tile with `id` from every day, returning the first one found.
    pub fn remove(&mut self, id: &str) -> Option<(Day, Tile)> {
        let mut removed = None;
        for day in Day::ALL {
            let tiles = self.day_mut(day);
            while let Some(pos) = tiles.iter().position(|t| t.id == id) {
                let tile = tiles.remove(pos);
                if removed.is_none() {
                    removed = Some((day, tile));
                }
            }
        }
        removed
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|(_, t)| t.id.as_str()).collect()
    }
}

/// The cross-boundary message a drag carries from its source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub id: String,
    pub source_day: Day,
}

impl DragPayload {
    #[must_use]
    pub fn new(id: &str, source_day: Day) -> Self {
        Self {
            id: id.to_string(),
            source_day,
        }
    }

    /// Decode transfer text. Anything unparseable, or without an id, is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let payload: Self = serde_json::from_str(raw).ok()?;
        if payload.id.trim().is_empty() {
            return None;
        }
        Some(payload)
    }

    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub fn validate_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        bail!("Label must not be empty");
    }
    Ok(())
}

pub fn validate_start_time(time: &str) -> Result<()> {
    if TIME_OPTIONS.contains(&time) {
        Ok(())
    } else {
        bail!(
            "Invalid start time '{time}'. Use '{NO_TIME}' or a half-hour slot from 5:00 AM to 11:30 PM"
        )
    }
}

pub fn validate_duration(duration: &str) -> Result<()> {
    if DURATION_OPTIONS.contains(&duration) {
        Ok(())
    } else {
        bail!(
            "Invalid duration '{duration}'. Must be one of: {}",
            DURATION_OPTIONS.join(", ")
        )
    }
}

/// Case-insensitive, returns the canonical spelling.
pub fn validate_meal_type(meal: &str) -> Result<String> {
    MEAL_TYPES
        .iter()
        .find(|m| m.eq_ignore_ascii_case(meal.trim()))
        .map(|m| (*m).to_string())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid meal type '{meal}'. Must be one of: {}",
                MEAL_TYPES.join(", ")
            )
        })
}

fn validate_macro(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(()),
        _ => bail!("Invalid {field} '{value}'. Must be a non-negative number"),
    }
}
