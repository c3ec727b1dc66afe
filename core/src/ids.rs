use crate::models::{RecurringTemplates, WeekPlan};

pub const TILE_ID_PREFIX: &str = "tile-";
pub const RECURRING_ID_PREFIX: &str = "rec-";

/// Hands out `tile-<n>` identifiers from a monotonically increasing counter.
///
/// The counter lives for one planner session. Whenever persisted data is
/// loaded it must be shown to [`IdGenerator::observe_week`] so that new ids
/// never collide with stored ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn starting_at(next: u64) -> Self {
        Self { next: next.max(1) }
    }

    /// The number the next id will carry.
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.next
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("{TILE_ID_PREFIX}{}", self.next);
        self.next += 1;
        id
    }

    /// A fresh recurring join key, `rec-tile-<n>`.
    pub fn next_recurring_id(&mut self) -> String {
        format!("{RECURRING_ID_PREFIX}{}", self.next_id())
    }

    /// Advance past `id` if it is a `tile-<n>` id. Never moves backwards.
    pub fn observe(&mut self, id: &str) {
        if let Some(n) = id
            .strip_prefix(TILE_ID_PREFIX)
            .and_then(|s| s.parse::<u64>().ok())
        {
            if n >= self.next {
                self.next = n + 1;
            }
        }
    }

    /// Advance past a `rec-tile-<n>` recurring id.
    pub fn observe_recurring(&mut self, recurring_id: &str) {
        if let Some(inner) = recurring_id.strip_prefix(RECURRING_ID_PREFIX) {
            self.observe(inner);
        }
    }

    /// Tile ids and the recurring ids carried by the week's tiles.
    pub fn observe_week(&mut self, week: &WeekPlan) {
        for (_, tile) in week.iter() {
            self.observe(&tile.id);
            if let Some(rid) = &tile.block.recurring_id {
                self.observe_recurring(rid);
            }
        }
    }

    pub fn observe_templates(&mut self, templates: &RecurringTemplates) {
        for (_, block) in templates.iter() {
            if let Some(rid) = &block.recurring_id {
                self.observe_recurring(rid);
            }
        }
    }
}
