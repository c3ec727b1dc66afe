use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::ids::IdGenerator;
use crate::kv::KeyValueStore;
use crate::models::{Day, RecurringTemplates, Tile, WeekPlan};

/// Storage key holding every saved week as one JSON object keyed by week key.
pub const WEEKS_KEY: &str = "wtw-planner";
/// Storage key holding the recurring templates.
pub const RECURRING_KEY: &str = "wtw-recurring";

/// Week snapshots and recurring templates on top of a key-value store.
///
/// Reads never fail: absent or malformed records come back as `None` or as
/// an empty default, with a warning logged for malformed ones.
pub struct PlannerStore<S> {
    kv: S,
}

impl<S: KeyValueStore> PlannerStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn into_inner(self) -> S {
        self.kv
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// The outer week blob, `None` when absent or unreadable.
    fn read_weeks(&self) -> Option<BTreeMap<String, Value>> {
        let raw = self.kv.get(WEEKS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(map) => Some(map),
            Err(e) => {
                tracing::warn!(key = WEEKS_KEY, "ignoring malformed week store: {e}");
                None
            }
        }
    }

    pub fn load_week(&self, week_key: &str) -> Option<WeekPlan> {
        let value = self.read_weeks()?.remove(week_key)?;
        if value.is_null() {
            return None;
        }
        match serde_json::from_value::<WeekPlan>(value) {
            Ok(week) => Some(week.normalized()),
            Err(e) => {
                tracing::warn!(week = week_key, "ignoring malformed week: {e}");
                None
            }
        }
    }

    /// Overwrite one week inside the blob. Other weeks are written back as read.
    pub fn save_week(&mut self, week_key: &str, week: &WeekPlan) -> Result<()> {
        let mut weeks = self.read_weeks().unwrap_or_default();
        weeks.insert(week_key.to_string(), serde_json::to_value(week)?);
        let raw = serde_json::to_string(&weeks)?;
        self.kv
            .set(WEEKS_KEY, &raw)
            .with_context(|| format!("Failed to save week {week_key}"))
    }

    pub fn load_recurring(&self) -> RecurringTemplates {
        let Some(raw) = self.kv.get(RECURRING_KEY) else {
            return RecurringTemplates::new();
        };
        match serde_json::from_str::<Option<RecurringTemplates>>(&raw) {
            Ok(templates) => templates.unwrap_or_default().normalized(),
            Err(e) => {
                tracing::warn!(key = RECURRING_KEY, "ignoring malformed templates: {e}");
                RecurringTemplates::new()
            }
        }
    }

    pub fn save_recurring(&mut self, templates: &RecurringTemplates) -> Result<()> {
        let raw = serde_json::to_string(templates)?;
        self.kv
            .set(RECURRING_KEY, &raw)
            .context("Failed to save recurring templates")
    }

    /// The saved week, or one synthesized from the recurring templates.
    ///
    /// Either way `ids` is advanced past every tile and recurring id stored in
    /// the week and in the templates. Synthesized tiles get fresh ids and keep
    /// their template's `recurringId`.
    pub fn load_or_populate_week(&self, week_key: &str, ids: &mut IdGenerator) -> WeekPlan {
        let templates = self.load_recurring();
        ids.observe_templates(&templates);
        if let Some(week) = self.load_week(week_key) {
            ids.observe_week(&week);
            return week;
        }
        let mut week = WeekPlan::new();
        for day in Day::ALL {
            for block in templates.day(day) {
                week.day_mut(day).push(Tile {
                    id: ids.next_id(),
                    block: block.clone(),
                });
            }
        }
        week
    }
}
