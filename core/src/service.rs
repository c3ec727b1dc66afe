use chrono::{Local, NaiveDate};

use crate::groceries::{self, GroceryItem};
use crate::ics;
use crate::ids::IdGenerator;
use crate::kv::KeyValueStore;
use crate::models::{Block, Day, DragPayload, RecurringTemplates, Tile, TileDraft, WeekPlan};
use crate::nutrition::{self, WeekNutrition};
use crate::recurrence;
use crate::storage::PlannerStore;
use crate::week;

/// What the editor currently has open.
#[derive(Debug, Clone, PartialEq)]
pub struct Editing {
    pub day: Day,
    /// `None` while composing a new block.
    pub tile: Option<Tile>,
}

/// The planner session: one live week plus everything needed to change it.
///
/// Every mutation is written back to the store before the call returns. A
/// failed write is logged and the in-memory week is kept, so the session
/// carries on with whatever it has.
pub struct Planner<S: KeyValueStore> {
    store: PlannerStore<S>,
    ids: IdGenerator,
    today: NaiveDate,
    offset: i64,
    week: WeekPlan,
    editing: Option<Editing>,
}

impl<S: KeyValueStore> Planner<S> {
    /// Open the current week, using the local date as "today".
    pub fn new(kv: S) -> Self {
        Self::with_today(kv, Local::now().date_naive())
    }

    pub fn with_today(kv: S, today: NaiveDate) -> Self {
        let store = PlannerStore::new(kv);
        let mut ids = IdGenerator::new();
        let week = store.load_or_populate_week(&week::week_key(today, 0), &mut ids);
        Self {
            store,
            ids,
            today,
            offset: 0,
            week,
            editing: None,
        }
    }

    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    // --- Views ---

    #[must_use]
    pub fn week(&self) -> &WeekPlan {
        &self.week
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    #[must_use]
    pub fn week_key(&self) -> String {
        week::week_key(self.today, self.offset)
    }

    #[must_use]
    pub fn week_dates(&self) -> [NaiveDate; 7] {
        week::week_dates(self.today, self.offset)
    }

    #[must_use]
    pub fn week_range(&self) -> String {
        week::format_week_range(&self.week_dates())
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<(Day, &Tile)> {
        self.week.find(id).map(|(day, _, tile)| (day, tile))
    }

    #[must_use]
    pub fn templates(&self) -> RecurringTemplates {
        self.store.load_recurring()
    }

    #[must_use]
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    #[must_use]
    pub fn export_ics(&self) -> String {
        ics::generate_ics(&self.week, &self.week_dates())
    }

    #[must_use]
    pub fn ics_filename(&self) -> String {
        ics::ics_filename(&self.week_key())
    }

    #[must_use]
    pub fn groceries(&self) -> Vec<GroceryItem> {
        groceries::aggregate_ingredients(&self.week)
    }

    #[must_use]
    pub fn nutrition(&self) -> WeekNutrition {
        nutrition::summarize_week(&self.week)
    }

    // --- Navigation ---

    /// Switch to the week `offset` weeks from the current one, loading it or
    /// building it from the recurring templates.
    pub fn navigate(&mut self, offset: i64) {
        self.offset = offset;
        self.editing = None;
        let key = self.week_key();
        self.week = self.store.load_or_populate_week(&key, &mut self.ids);
        tracing::debug!(week = %key, tiles = self.week.len(), "loaded week");
    }

    pub fn next_week(&mut self) {
        self.navigate(self.offset + 1);
    }

    pub fn previous_week(&mut self) {
        self.navigate(self.offset - 1);
    }

    pub fn this_week(&mut self) {
        self.navigate(0);
    }

    // --- Editor selection ---

    #[must_use]
    pub fn editing(&self) -> Option<&Editing> {
        self.editing.as_ref()
    }

    pub fn open_new(&mut self, day: Day) {
        self.editing = Some(Editing { day, tile: None });
    }

    /// Select an existing tile for editing. Returns false if it is not in this week.
    pub fn open_existing(&mut self, id: &str) -> bool {
        let Some((day, tile)) = self.find(id) else {
            return false;
        };
        self.editing = Some(Editing {
            day,
            tile: Some(tile.clone()),
        });
        true
    }

    pub fn close_editor(&mut self) {
        self.editing = None;
    }

    // --- Mutations ---

    /// Save a new or edited block and return its tile id.
    ///
    /// A blank label saves nothing. An existing tile is updated where it sits,
    /// whatever `day` says; an id not present in this week saves nothing.
    pub fn save(&mut self, draft: TileDraft, day: Day) -> Option<String> {
        let TileDraft { id, mut block } = draft;
        if block.label.trim().is_empty() {
            tracing::debug!("refusing to save a block without a label");
            return None;
        }
        let (id, day, before) = match id {
            Some(id) => {
                let (found_day, _, existing) = self.week.find(&id)?;
                let before = existing.block.clone();
                // The join key survives an edit that stays recurring
                if before.recurring && block.recurring && block.recurring_id.is_none() {
                    block.recurring_id.clone_from(&before.recurring_id);
                }
                recurrence::assign_recurring_id(&mut block, &mut self.ids);
                let tile = self.week.find_mut(&id)?;
                tile.block = block.clone();
                (id, found_day, Some(before))
            }
            None => {
                recurrence::assign_recurring_id(&mut block, &mut self.ids);
                let id = self.ids.next_id();
                self.week.day_mut(day).push(Tile {
                    id: id.clone(),
                    block: block.clone(),
                });
                (id, day, None)
            }
        };
        self.persist_week();

        let mut templates = self.store.load_recurring();
        let transition = recurrence::sync_on_save(&mut templates, day, before.as_ref(), &block);
        if transition != recurrence::Transition::Unchanged {
            self.persist_templates(&templates);
        }
        tracing::debug!(tile = %id, %day, ?transition, "saved tile");

        self.editing = None;
        Some(id)
    }

    /// Remove a tile, and its template if it was recurring.
    pub fn delete(&mut self, id: &str) -> Option<Tile> {
        let (day, tile) = self.week.remove(id)?;
        self.persist_week();

        if tile.block.recurring {
            let mut templates = self.store.load_recurring();
            if recurrence::sync_on_delete(&mut templates, day, &tile.block) {
                self.persist_templates(&templates);
            }
        }
        tracing::debug!(tile = %id, %day, "deleted tile");

        self.editing = None;
        Some(tile)
    }

    /// Move a tile to `target_day` at `target_index` (end of the day when `None`).
    ///
    /// Within one day this is a pure reorder: the index refers to the list as
    /// it was before the tile was lifted out. Returns false if nothing moved.
    pub fn move_tile(
        &mut self,
        id: &str,
        source_day: Day,
        target_day: Day,
        target_index: Option<usize>,
    ) -> bool {
        if source_day == target_day {
            if let Some(index) = target_index {
                let tiles = self.week.day_mut(target_day);
                let Some(current) = tiles.iter().position(|t| t.id == id) else {
                    return false;
                };
                let tile = tiles.remove(current);
                let adjusted = if index > current { index - 1 } else { index };
                let at = adjusted.min(tiles.len());
                tiles.insert(at, tile);
                self.persist_week();
                return true;
            }
        }

        let Some((_, tile)) = self.week.remove(id) else {
            return false;
        };
        let tiles = self.week.day_mut(target_day);
        let at = target_index.map_or(tiles.len(), |i| i.min(tiles.len()));
        tiles.insert(at, tile);
        self.persist_week();
        true
    }

    /// Handle a drop carrying raw transfer text. Malformed payloads do nothing.
    pub fn drop_payload(&mut self, raw: &str, target_day: Day, target_index: Option<usize>) -> bool {
        let Some(payload) = DragPayload::parse(raw) else {
            tracing::debug!("ignoring malformed drag payload");
            return false;
        };
        self.move_tile(&payload.id, payload.source_day, target_day, target_index)
    }

    /// Copy a block onto `target_day` as a new, non-recurring tile.
    pub fn duplicate(&mut self, block: &Block, target_day: Day) -> String {
        let mut block = block.clone();
        block.recurring = false;
        block.recurring_id = None;
        let id = self.ids.next_id();
        self.week.day_mut(target_day).push(Tile {
            id: id.clone(),
            block,
        });
        self.persist_week();
        self.editing = None;
        id
    }

    fn persist_week(&mut self) {
        let key = self.week_key();
        if let Err(e) = self.store.save_week(&key, &self.week) {
            tracing::warn!(week = %key, "{e:#}");
        }
    }

    fn persist_templates(&mut self, templates: &RecurringTemplates) {
        if let Err(e) = self.store.save_recurring(templates) {
            tracing::warn!("{e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::kv::MemoryStore;

    // A Thursday; its week starts Monday 2026-02-09
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 12).unwrap()
    }

    fn planner() -> Planner<MemoryStore> {
        Planner::with_today(MemoryStore::new(), today())
    }

    fn add(p: &mut Planner<MemoryStore>, day: Day, label: &str) -> String {
        p.save(TileDraft::new(Block::task(label)), day).unwrap()
    }

    fn recurring(label: &str) -> Block {
        let mut b = Block::task(label);
        b.recurring = true;
        b
    }

    fn labels(p: &Planner<MemoryStore>, day: Day) -> Vec<String> {
        p.week().day(day).iter().map(|t| t.block.label.clone()).collect()
    }

    #[test]
    fn test_starts_on_current_week() {
        let p = planner();
        assert_eq!(p.week_key(), "2026-02-09");
        assert_eq!(p.week_range(), "Feb 9 \u{2013} 15, 2026");
        assert!(p.week().is_empty());
        assert_eq!(p.ics_filename(), "week-2026-02-09.ics");
    }

    #[test]
    fn test_save_new_appends_with_fresh_id() {
        let mut p = planner();
        let a = add(&mut p, Day::Monday, "A");
        let b = add(&mut p, Day::Monday, "B");
        assert_eq!(a, "tile-1");
        assert_eq!(b, "tile-2");
        assert_eq!(labels(&p, Day::Monday), vec!["A", "B"]);
    }

    #[test]
    fn test_save_blank_label_is_noop() {
        let mut p = planner();
        assert!(p.save(TileDraft::new(Block::task("  ")), Day::Monday).is_none());
        assert!(p.week().is_empty());
        assert!(p.into_store().is_empty());
    }

    #[test]
    fn test_save_existing_replaces_in_place() {
        let mut p = planner();
        add(&mut p, Day::Tuesday, "A");
        let id = add(&mut p, Day::Tuesday, "B");
        add(&mut p, Day::Tuesday, "C");

        let (_, tile) = p.find(&id).unwrap();
        let mut draft = TileDraft::existing(tile);
        draft.block.label = "B2".to_string();
        // The day argument does not move an existing tile
        assert_eq!(p.save(draft, Day::Friday), Some(id.clone()));
        assert_eq!(labels(&p, Day::Tuesday), vec!["A", "B2", "C"]);
        assert!(p.week().day(Day::Friday).is_empty());
    }

    #[test]
    fn test_save_unknown_id_is_noop() {
        let mut p = planner();
        let draft = TileDraft {
            id: Some("tile-99".to_string()),
            block: Block::task("Ghost"),
        };
        assert!(p.save(draft, Day::Monday).is_none());
        assert!(p.week().is_empty());
    }

    #[test]
    fn test_mutations_persist() {
        let mut p = planner();
        add(&mut p, Day::Monday, "Persisted");
        let store = p.into_store();
        let reopened = Planner::with_today(store, today());
        assert_eq!(labels(&reopened, Day::Monday), vec!["Persisted"]);
        assert_eq!(reopened.ids().counter(), 2);
    }

    #[test]
    fn test_new_ids_never_collide_with_loaded() {
        let mut p = planner();
        for label in ["A", "B", "C"] {
            add(&mut p, Day::Monday, label);
        }
        let mut p = Planner::with_today(p.into_store(), today());
        let id = add(&mut p, Day::Monday, "D");
        let ids: HashSet<&str> = p.week().ids().into_iter().collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(id, "tile-4");
    }

    #[test]
    fn test_recurring_save_creates_template_and_populates_future_week() {
        let mut p = planner();
        let id = p
            .save(TileDraft::new(recurring("Standup")), Day::Monday)
            .unwrap();
        let rid = p.find(&id).unwrap().1.block.recurring_id.clone().unwrap();
        assert!(rid.starts_with("rec-tile-"));

        let templates = p.templates();
        assert_eq!(templates.day(Day::Monday).len(), 1);
        assert_eq!(templates.day(Day::Monday)[0].recurring_id.as_deref(), Some(rid.as_str()));

        p.next_week();
        assert_eq!(p.week_key(), "2026-02-16");
        let synthesized = &p.week().day(Day::Monday)[0];
        assert_eq!(synthesized.block.label, "Standup");
        assert_eq!(synthesized.block.recurring_id.as_deref(), Some(rid.as_str()));
        assert_ne!(synthesized.id, id);
    }

    #[test]
    fn test_synthesized_week_is_not_saved_until_changed() {
        let mut p = planner();
        p.save(TileDraft::new(recurring("Standup")), Day::Monday);
        p.next_week();
        p.previous_week();
        p.navigate(2);
        assert!(p.store.load_week("2026-02-23").is_none());
        add(&mut p, Day::Friday, "Extra");
        assert!(p.store.load_week("2026-02-23").is_some());
    }

    #[test]
    fn test_rename_keeps_recurring_link() {
        let mut p = planner();
        let id = p
            .save(TileDraft::new(recurring("Gym")), Day::Wednesday)
            .unwrap();
        let (_, tile) = p.find(&id).unwrap();
        let rid = tile.block.recurring_id.clone();
        let mut draft = TileDraft::existing(tile);
        draft.block.label = "Gym (legs)".to_string();
        p.save(draft, Day::Wednesday);

        let templates = p.templates();
        assert_eq!(templates.day(Day::Wednesday).len(), 1);
        assert_eq!(templates.day(Day::Wednesday)[0].label, "Gym (legs)");
        assert_eq!(templates.day(Day::Wednesday)[0].recurring_id, rid);
        assert_eq!(p.find(&id).unwrap().1.block.recurring_id, rid);
    }

    #[test]
    fn test_edit_without_recurring_id_keeps_stored_one() {
        let mut p = planner();
        let id = p
            .save(TileDraft::new(recurring("Gym")), Day::Monday)
            .unwrap();
        let first = p.find(&id).unwrap().1.block.recurring_id.clone();

        let draft = TileDraft {
            id: Some(id.clone()),
            block: recurring("Gym"),
        };
        p.save(draft, Day::Monday);

        assert_eq!(p.find(&id).unwrap().1.block.recurring_id, first);
        let templates = p.templates();
        assert_eq!(templates.day(Day::Monday).len(), 1);
        assert_eq!(templates.day(Day::Monday)[0].recurring_id, first);
    }

    #[test]
    fn test_recurring_ids_stay_unique_across_reloads() {
        let mut p = planner();
        let gym = add(&mut p, Day::Monday, "Gym");
        let mut draft = TileDraft::existing(p.find(&gym).unwrap().1);
        draft.block.recurring = true;
        p.save(draft, Day::Monday);

        let mut p = Planner::with_today(p.into_store(), today());
        let read = p
            .save(TileDraft::new(recurring("Read")), Day::Monday)
            .unwrap();

        let gym_rid = p.find(&gym).unwrap().1.block.recurring_id.clone();
        let read_rid = p.find(&read).unwrap().1.block.recurring_id.clone();
        assert!(gym_rid.is_some());
        assert_ne!(gym_rid, read_rid);

        let templates = p.templates();
        let labels: Vec<&str> = templates
            .day(Day::Monday)
            .iter()
            .map(|b| b.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Gym", "Read"]);
    }

    #[test]
    fn test_disable_recurring_removes_template_and_id() {
        let mut p = planner();
        let id = p
            .save(TileDraft::new(recurring("Gym")), Day::Wednesday)
            .unwrap();
        let mut draft = TileDraft::existing(p.find(&id).unwrap().1);
        draft.block.recurring = false;
        p.save(draft, Day::Wednesday);

        assert!(p.templates().day(Day::Wednesday).is_empty());
        assert!(p.find(&id).unwrap().1.block.recurring_id.is_none());
    }

    #[test]
    fn test_toggle_off_then_on_issues_new_recurring_id() {
        let mut p = planner();
        let id = p
            .save(TileDraft::new(recurring("Gym")), Day::Monday)
            .unwrap();
        let first = p.find(&id).unwrap().1.block.recurring_id.clone();

        let mut off = TileDraft::existing(p.find(&id).unwrap().1);
        off.block.recurring = false;
        p.save(off, Day::Monday);
        let mut on = TileDraft::existing(p.find(&id).unwrap().1);
        on.block.recurring = true;
        p.save(on, Day::Monday);

        let second = p.find(&id).unwrap().1.block.recurring_id.clone();
        assert!(second.is_some());
        assert_ne!(first, second);
        assert_eq!(p.templates().day(Day::Monday).len(), 1);
    }

    #[test]
    fn test_delete_recurring_removes_template() {
        let mut p = planner();
        let id = p
            .save(TileDraft::new(recurring("Gym")), Day::Thursday)
            .unwrap();
        add(&mut p, Day::Thursday, "Other");
        let removed = p.delete(&id).unwrap();
        assert_eq!(removed.block.label, "Gym");
        assert!(p.templates().day(Day::Thursday).is_empty());
        assert_eq!(labels(&p, Day::Thursday), vec!["Other"]);
        assert!(p.delete(&id).is_none());
    }

    #[test]
    fn test_move_within_day_is_pure_reorder() {
        let mut p = planner();
        let a = add(&mut p, Day::Monday, "A");
        add(&mut p, Day::Monday, "B");
        add(&mut p, Day::Monday, "C");
        let before: HashSet<String> = p.week().ids().into_iter().map(String::from).collect();

        // Drop A below C: index 3 in the original list
        assert!(p.move_tile(&a, Day::Monday, Day::Monday, Some(3)));
        assert_eq!(labels(&p, Day::Monday), vec!["B", "C", "A"]);

        // And back to the top
        assert!(p.move_tile(&a, Day::Monday, Day::Monday, Some(0)));
        assert_eq!(labels(&p, Day::Monday), vec!["A", "B", "C"]);

        // Dropping onto its own slot or the one right after changes nothing
        assert!(p.move_tile(&a, Day::Monday, Day::Monday, Some(1)));
        assert_eq!(labels(&p, Day::Monday), vec!["A", "B", "C"]);

        let after: HashSet<String> = p.week().ids().into_iter().map(String::from).collect();
        assert_eq!(before, after);
        assert_eq!(p.week().len(), 3);
    }

    #[test]
    fn test_move_within_day_clamps_index() {
        let mut p = planner();
        let a = add(&mut p, Day::Monday, "A");
        add(&mut p, Day::Monday, "B");
        assert!(p.move_tile(&a, Day::Monday, Day::Monday, Some(40)));
        assert_eq!(labels(&p, Day::Monday), vec!["B", "A"]);
    }

    #[test]
    fn test_move_across_days() {
        let mut p = planner();
        let a = add(&mut p, Day::Monday, "A");
        add(&mut p, Day::Friday, "X");
        add(&mut p, Day::Friday, "Y");

        assert!(p.move_tile(&a, Day::Monday, Day::Friday, Some(1)));
        assert!(p.week().day(Day::Monday).is_empty());
        assert_eq!(labels(&p, Day::Friday), vec!["X", "A", "Y"]);

        assert!(p.move_tile(&a, Day::Friday, Day::Sunday, Some(9)));
        assert_eq!(labels(&p, Day::Sunday), vec!["A"]);

        assert!(p.move_tile(&a, Day::Sunday, Day::Friday, None));
        assert_eq!(labels(&p, Day::Friday), vec!["X", "Y", "A"]);
        assert_eq!(p.find(&a).unwrap().0, Day::Friday);
    }

    #[test]
    fn test_move_unknown_tile_is_noop() {
        let mut p = planner();
        add(&mut p, Day::Monday, "A");
        assert!(!p.move_tile("tile-42", Day::Monday, Day::Monday, Some(0)));
        assert!(!p.move_tile("tile-42", Day::Monday, Day::Tuesday, None));
        assert_eq!(p.week().len(), 1);
    }

    #[test]
    fn test_drop_payload() {
        let mut p = planner();
        let a = add(&mut p, Day::Monday, "A");
        add(&mut p, Day::Tuesday, "B");

        let raw = DragPayload::new(&a, Day::Monday).encode();
        assert!(p.drop_payload(&raw, Day::Tuesday, Some(0)));
        assert_eq!(labels(&p, Day::Tuesday), vec!["A", "B"]);

        let snapshot = p.week().clone();
        assert!(!p.drop_payload("{{{", Day::Monday, None));
        assert!(!p.drop_payload(r#"{"sourceDay":"Tuesday"}"#, Day::Monday, None));
        assert_eq!(p.week(), &snapshot);
    }

    #[test]
    fn test_duplicate_gets_fresh_identity() {
        let mut p = planner();
        let id = p
            .save(TileDraft::new(recurring("Gym")), Day::Monday)
            .unwrap();
        let block = p.find(&id).unwrap().1.block.clone();
        let copy = p.duplicate(&block, Day::Saturday);

        assert_ne!(copy, id);
        let (day, tile) = p.find(&copy).unwrap();
        assert_eq!(day, Day::Saturday);
        assert_eq!(tile.block.label, "Gym");
        assert!(!tile.block.recurring);
        assert!(tile.block.recurring_id.is_none());
        // Only the original is backed by a template
        assert_eq!(p.templates().len(), 1);
    }

    #[test]
    fn test_editor_selection() {
        let mut p = planner();
        p.open_new(Day::Sunday);
        assert_eq!(p.editing().unwrap().day, Day::Sunday);
        assert!(p.editing().unwrap().tile.is_none());

        let id = add(&mut p, Day::Sunday, "A");
        assert!(p.editing().is_none());

        assert!(p.open_existing(&id));
        assert_eq!(p.editing().unwrap().tile.as_ref().unwrap().id, id);
        p.close_editor();
        assert!(p.editing().is_none());
        assert!(!p.open_existing("tile-404"));
    }

    #[test]
    fn test_navigation_keeps_weeks_apart() {
        let mut p = planner();
        add(&mut p, Day::Monday, "This week");
        p.previous_week();
        assert_eq!(p.week_key(), "2026-02-02");
        assert!(p.week().is_empty());
        add(&mut p, Day::Monday, "Last week");
        p.this_week();
        assert_eq!(labels(&p, Day::Monday), vec!["This week"]);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_views_over_live_week() {
        let mut p = planner();
        let mut meal = Block::meal("Stir fry", "Dinner");
        meal.ingredients = Some("chicken, broccoli".to_string());
        meal.calories = Some("600".to_string());
        p.save(TileDraft::new(meal), Day::Tuesday);

        assert_eq!(p.groceries().len(), 2);
        assert_eq!(p.nutrition().active_days, 1);
        assert!(p.export_ics().contains("SUMMARY:Stir fry"));
    }
}
