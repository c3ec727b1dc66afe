use anyhow::{Context, Result, bail};
use clap::Args;

use wtw_core::kv::KeyValueStore;
use wtw_core::models::{
    Block, DURATION_OPTIONS, Day, TIME_OPTIONS, TileDraft, TileKind, palette_color,
    validate_meal_type,
};
use wtw_core::service::{Editing, Planner};

use super::helpers::{PlacedTile, describe, exit_not_found, optional_text};

/// Block fields shared by `add` and `edit`. Passing an empty string clears an optional field.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct BlockOptions {
    /// Start time slot, e.g. "9:30 AM" or "No time"
    #[arg(short, long)]
    pub time: Option<String>,
    /// Duration, e.g. "45 min", "1.5 hr" or "No duration"
    #[arg(short, long)]
    pub duration: Option<String>,
    /// Palette color: slate, amber, emerald, sky, rose, violet, orange, teal
    #[arg(short, long)]
    pub color: Option<String>,
    /// Make this a meal: breakfast, lunch, dinner, snack
    #[arg(short, long)]
    pub meal: Option<String>,
    /// Comma-separated ingredients (meals only)
    #[arg(long)]
    pub ingredients: Option<String>,
    /// Calories (meals only)
    #[arg(long)]
    pub calories: Option<String>,
    /// Protein in grams (meals only)
    #[arg(long)]
    pub protein: Option<String>,
    /// Carbs in grams (meals only)
    #[arg(long)]
    pub carbs: Option<String>,
    /// Fat in grams (meals only)
    #[arg(long)]
    pub fat: Option<String>,
    /// Free-form notes (meals only)
    #[arg(long)]
    pub notes: Option<String>,
}

/// Match a value against a fixed option list, ignoring case.
fn pick<'a>(options: &[&'a str], value: &str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(value))
        .copied()
        .with_context(|| format!("Invalid {what} '{value}'"))
}

impl BlockOptions {
    fn is_empty(&self) -> bool {
        self.time.is_none()
            && self.duration.is_none()
            && self.color.is_none()
            && self.meal.is_none()
            && !self.has_meal_fields()
    }

    fn has_meal_fields(&self) -> bool {
        [
            &self.ingredients,
            &self.calories,
            &self.protein,
            &self.carbs,
            &self.fat,
            &self.notes,
        ]
        .iter()
        .any(|f| f.is_some())
    }

    pub(crate) fn apply(&self, block: &mut Block) -> Result<()> {
        if let Some(time) = &self.time {
            block.start_time = pick(TIME_OPTIONS, time, "start time")?.to_string();
        }
        if let Some(duration) = &self.duration {
            block.duration = pick(DURATION_OPTIONS, duration, "duration")?.to_string();
        }
        if let Some(color) = &self.color {
            block.color = palette_color(color)?;
        }
        if let Some(meal) = &self.meal {
            block.kind = TileKind::Meal;
            block.meal_type = Some(validate_meal_type(meal)?);
        }

        if self.has_meal_fields() && !block.is_meal() {
            bail!("Ingredients, macros and notes only apply to meals. Add --meal <type>");
        }
        for (value, field) in [
            (&self.ingredients, &mut block.ingredients),
            (&self.calories, &mut block.calories),
            (&self.protein, &mut block.protein),
            (&self.carbs, &mut block.carbs),
            (&self.fat, &mut block.fat),
            (&self.notes, &mut block.notes),
        ] {
            if let Some(v) = value {
                *field = optional_text(v);
            }
        }
        Ok(())
    }
}

fn print_saved<S: KeyValueStore>(
    planner: &Planner<S>,
    id: &str,
    verb: &str,
    json: bool,
) -> Result<()> {
    let (day, tile) = planner
        .find(id)
        .with_context(|| format!("Tile {id} disappeared after saving"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&PlacedTile { day, tile })?);
    } else {
        println!("{verb} {}", describe(tile, day));
    }
    Ok(())
}

pub(crate) fn cmd_add<S: KeyValueStore>(
    planner: &mut Planner<S>,
    day: Day,
    label: &str,
    options: &BlockOptions,
    recurring: bool,
    json: bool,
) -> Result<()> {
    let mut block = Block::task(label.trim());
    options.apply(&mut block)?;
    block.recurring = recurring;
    block.validate()?;

    planner.open_new(day);
    let id = planner
        .save(TileDraft::new(block), day)
        .context("Nothing was saved")?;
    print_saved(planner, &id, "Added", json)
}

pub(crate) fn cmd_edit<S: KeyValueStore>(
    planner: &mut Planner<S>,
    id: &str,
    label: Option<&str>,
    options: &BlockOptions,
    recurring: Option<bool>,
    task: bool,
    json: bool,
) -> Result<()> {
    if label.is_none() && options.is_empty() && recurring.is_none() && !task {
        bail!("Nothing to update. Provide a new label or at least one field option");
    }
    if task && options.meal.is_some() {
        bail!("--task and --meal cannot be combined");
    }
    if !planner.open_existing(id) {
        exit_not_found(&format!("Tile {id} not found"), json);
    }
    let Some(Editing {
        day,
        tile: Some(tile),
    }) = planner.editing().cloned()
    else {
        exit_not_found(&format!("Tile {id} not found"), json);
    };

    let mut draft = TileDraft::existing(&tile);
    if let Some(label) = label {
        draft.block.label = label.trim().to_string();
    }
    if task {
        draft.block.kind = TileKind::Task;
        draft.block.meal_type = None;
    }
    options.apply(&mut draft.block)?;
    if let Some(recurring) = recurring {
        draft.block.recurring = recurring;
        if !recurring {
            // A block that stops repeating drops its template link
            draft.block.recurring_id = None;
        }
    }
    draft.block.validate()?;

    let id = planner.save(draft, day).context("Nothing was saved")?;
    print_saved(planner, &id, "Updated", json)
}

pub(crate) fn cmd_delete<S: KeyValueStore>(
    planner: &mut Planner<S>,
    id: &str,
    json: bool,
) -> Result<()> {
    let Some((day, _)) = planner.find(id) else {
        exit_not_found(&format!("Tile {id} not found"), json);
    };
    let Some(tile) = planner.delete(id) else {
        exit_not_found(&format!("Tile {id} not found"), json);
    };
    if json {
        println!("{}", serde_json::json!({ "deleted": tile.id, "day": day }));
    } else {
        println!("Deleted {}", describe(&tile, day));
    }
    Ok(())
}

/// `position` is 1-based; `None` appends to the end of the day.
pub(crate) fn cmd_move<S: KeyValueStore>(
    planner: &mut Planner<S>,
    id: &str,
    day: Day,
    position: Option<usize>,
    json: bool,
) -> Result<()> {
    let Some((source_day, current, _)) = planner.week().find(id) else {
        exit_not_found(&format!("Tile {id} not found"), json);
    };
    // Same-day indexes count the tile's own slot, so a later position is one further on
    let index = position.map(|p| {
        let slot = p.saturating_sub(1);
        if source_day == day && slot > current {
            slot + 1
        } else {
            slot
        }
    });
    if !planner.move_tile(id, source_day, day, index) {
        exit_not_found(&format!("Tile {id} not found"), json);
    }
    print_saved(planner, id, "Moved", json)
}

pub(crate) fn cmd_duplicate<S: KeyValueStore>(
    planner: &mut Planner<S>,
    id: &str,
    day: Day,
    json: bool,
) -> Result<()> {
    let Some((_, tile)) = planner.find(id) else {
        exit_not_found(&format!("Tile {id} not found"), json);
    };
    let block = tile.block.clone();
    let copy = planner.duplicate(&block, day);
    print_saved(planner, &copy, "Duplicated as", json)
}
