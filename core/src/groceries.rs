use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::WeekPlan;

/// One shopping-list line and the meals that call for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroceryItem {
    pub name: String,
    /// `"<Day> — <meal label>"`, one per occurrence.
    pub meals: Vec<String>,
}

/// Collect the week's meal ingredients, normalized and merged, sorted by name.
#[must_use]
pub fn aggregate_ingredients(week: &WeekPlan) -> Vec<GroceryItem> {
    let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (day, tile) in week.iter() {
        let block = &tile.block;
        if !block.is_meal() {
            continue;
        }
        let Some(ingredients) = block.ingredients.as_deref() else {
            continue;
        };
        for raw in ingredients.split(',') {
            let name = raw.trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            by_name
                .entry(name)
                .or_default()
                .push(format!("{day} \u{2014} {}", block.label));
        }
    }
    by_name
        .into_iter()
        .map(|(name, meals)| GroceryItem { name, meals })
        .collect()
}

/// Clipboard text: one `- <ingredient>` line per item not yet checked off.
#[must_use]
pub fn grocery_list_text(items: &[GroceryItem], checked: &HashSet<String>) -> String {
    items
        .iter()
        .filter(|i| !checked.contains(&i.name))
        .map(|i| format!("- {}", i.name))
        .collect::<Vec<_>>()
        .join("\n")
}
