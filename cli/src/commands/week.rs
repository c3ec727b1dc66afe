use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use wtw_core::groceries::{GroceryItem, grocery_list_text};
use wtw_core::kv::KeyValueStore;
use wtw_core::models::{Day, Tile, WeekPlan};
use wtw_core::service::Planner;

use super::helpers::{PlacedTile, no_neg_zero, truncate, week_table};

pub(crate) fn cmd_show<S: KeyValueStore>(planner: &Planner<S>, json: bool) -> Result<()> {
    if json {
        #[derive(Serialize)]
        struct WeekOutput<'a> {
            week: String,
            range: String,
            tiles: Vec<PlacedTile<'a>>,
        }
        let output = WeekOutput {
            week: planner.week_key(),
            range: planner.week_range(),
            tiles: planner
                .week()
                .iter()
                .map(|(day, tile)| PlacedTile { day, tile })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let range = planner.week_range();
    println!("=== {range} ===\n");
    if planner.week().is_empty() {
        eprintln!("Nothing planned this week");
        process::exit(2);
    }
    println!("{}", week_table(planner.week()));
    Ok(())
}

pub(crate) fn cmd_templates<S: KeyValueStore>(planner: &Planner<S>, json: bool) -> Result<()> {
    let templates = planner.templates();

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    if templates.is_empty() {
        eprintln!("No recurring blocks");
        process::exit(2);
    }

    // Templates have no tile id of their own; show the recurring id instead
    let mut as_week = WeekPlan::new();
    for (day, block) in templates.iter() {
        as_week.day_mut(day).push(Tile {
            id: block.recurring_id.clone().unwrap_or_default(),
            block: block.clone(),
        });
    }
    println!("{}", week_table(&as_week));
    Ok(())
}

fn groceries_json(items: &[GroceryItem], checked: &HashSet<String>) -> Result<String> {
    #[derive(Serialize)]
    struct GroceryOutput<'a> {
        #[serde(flatten)]
        item: &'a GroceryItem,
        checked: bool,
    }
    let output: Vec<GroceryOutput> = items
        .iter()
        .map(|item| GroceryOutput {
            item,
            checked: checked.contains(&item.name),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&output)?)
}

pub(crate) fn cmd_groceries<S: KeyValueStore>(
    planner: &Planner<S>,
    checked: &[String],
    copy: bool,
    json: bool,
) -> Result<()> {
    let items = planner.groceries();
    let checked: HashSet<String> = checked.iter().map(|c| c.trim().to_lowercase()).collect();

    if json {
        println!("{}", groceries_json(&items, &checked)?);
        return Ok(());
    }

    if items.is_empty() {
        eprintln!("No ingredients in this week's meals");
        process::exit(2);
    }

    if copy {
        println!("{}", grocery_list_text(&items, &checked));
        return Ok(());
    }

    #[derive(Tabled)]
    struct GroceryRow {
        #[tabled(rename = "")]
        check: &'static str,
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Used in")]
        meals: String,
    }

    let rows: Vec<GroceryRow> = items
        .iter()
        .map(|item| GroceryRow {
            check: if checked.contains(&item.name) { "x" } else { " " },
            name: item.name.clone(),
            meals: truncate(&item.meals.join(", "), 60),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    let remaining = items.len() - items.iter().filter(|i| checked.contains(&i.name)).count();
    println!("{remaining} of {} still to buy", items.len());
    Ok(())
}

pub(crate) fn cmd_nutrition<S: KeyValueStore>(planner: &Planner<S>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct NutritionRow {
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Meals")]
        meals: usize,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
    }

    let summary = planner.nutrition();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.active_days == 0 {
        eprintln!("No meals planned this week");
        process::exit(2);
    }

    let mut rows: Vec<NutritionRow> = summary
        .days
        .iter()
        .map(|d| NutritionRow {
            day: d.short_name.to_string(),
            meals: d.totals.meal_count,
            calories: format!("{:.0}", no_neg_zero(d.totals.calories)),
            protein: format!("{:.0}g", no_neg_zero(d.totals.protein)),
            carbs: format!("{:.0}g", no_neg_zero(d.totals.carbs)),
            fat: format!("{:.0}g", no_neg_zero(d.totals.fat)),
        })
        .collect();
    rows.push(NutritionRow {
        day: "TOTAL".to_string(),
        meals: summary.total.meal_count,
        calories: format!("{:.0}", summary.total.calories),
        protein: format!("{:.0}g", summary.total.protein),
        carbs: format!("{:.0}g", summary.total.carbs),
        fat: format!("{:.0}g", summary.total.fat),
    });

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let avg = summary.average_calories;
    let active = summary.active_days;
    println!("  AVERAGE: {avg:.0} kcal over {active} planned day(s)");
    Ok(())
}

/// Parse a day name for clap.
pub(crate) fn parse_day(s: &str) -> Result<Day, String> {
    s.parse::<Day>().map_err(|e| e.to_string())
}
