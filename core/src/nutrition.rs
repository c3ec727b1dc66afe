use serde::Serialize;

use crate::models::{Block, Day, WeekPlan};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub meal_count: usize,
}

impl MacroTotals {
    fn add_meal(&mut self, block: &Block) {
        self.calories += amount(block.calories.as_deref());
        self.protein += amount(block.protein.as_deref());
        self.carbs += amount(block.carbs.as_deref());
        self.fat += amount(block.fat.as_deref());
        self.meal_count += 1;
    }

    fn add(&mut self, other: &MacroTotals) {
        self.calories += other.calories;
        self.protein += other.protein;
        self.carbs += other.carbs;
        self.fat += other.fat;
        self.meal_count += other.meal_count;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayNutrition {
    pub day: Day,
    pub short_name: &'static str,
    #[serde(flatten)]
    pub totals: MacroTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekNutrition {
    pub days: Vec<DayNutrition>,
    pub total: MacroTotals,
    pub active_days: usize,
    /// Calories per day that has at least one meal.
    pub average_calories: f64,
}

/// Macro strings are free text; anything that is not a number counts as zero.
fn amount(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[must_use]
pub fn summarize_week(week: &WeekPlan) -> WeekNutrition {
    let days: Vec<DayNutrition> = Day::ALL
        .into_iter()
        .map(|day| {
            let mut totals = MacroTotals::default();
            for tile in week.day(day).iter().filter(|t| t.block.is_meal()) {
                totals.add_meal(&tile.block);
            }
            DayNutrition {
                day,
                short_name: day.short_name(),
                totals,
            }
        })
        .collect();

    let mut total = MacroTotals::default();
    for d in &days {
        total.add(&d.totals);
    }
    let active_days = days.iter().filter(|d| d.totals.meal_count > 0).count();
    #[allow(clippy::cast_precision_loss)]
    let average_calories = if active_days == 0 {
        0.0
    } else {
        total.calories / active_days as f64
    };

    WeekNutrition {
        days,
        total,
        active_days,
        average_calories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tile;

    fn meal(calories: &str, protein: &str) -> Tile {
        let mut block = Block::meal("Meal", "Dinner");
        block.calories = Some(calories.to_string());
        block.protein = Some(protein.to_string());
        Tile {
            id: String::new(),
            block,
        }
    }

    #[test]
    fn test_empty_week() {
        let summary = summarize_week(&WeekPlan::new());
        assert_eq!(summary.days.len(), 7);
        assert_eq!(summary.active_days, 0);
        assert_eq!(summary.total, MacroTotals::default());
        assert!(summary.average_calories.abs() < f64::EPSILON);
    }

    #[test]
    fn test_sums_per_day_and_week() {
        let mut week = WeekPlan::new();
        week.day_mut(Day::Monday).push(meal("500", "30"));
        week.day_mut(Day::Monday).push(meal("250.5", "10"));
        week.day_mut(Day::Thursday).push(meal("700", "45"));

        let summary = summarize_week(&week);
        let monday = &summary.days[0];
        assert_eq!(monday.short_name, "MON");
        assert!((monday.totals.calories - 750.5).abs() < 1e-9);
        assert!((monday.totals.protein - 40.0).abs() < 1e-9);
        assert_eq!(monday.totals.meal_count, 2);

        assert_eq!(summary.active_days, 2);
        assert_eq!(summary.total.meal_count, 3);
        assert!((summary.total.calories - 1450.5).abs() < 1e-9);
        assert!((summary.average_calories - 725.25).abs() < 1e-9);
    }

    #[test]
    fn test_ignores_tasks_and_non_numbers() {
        let mut week = WeekPlan::new();
        let mut task = Block::task("Gym");
        task.calories = Some("900".to_string());
        week.day_mut(Day::Friday).push(Tile {
            id: String::new(),
            block: task,
        });
        week.day_mut(Day::Friday).push(meal("about 400", ""));

        let summary = summarize_week(&week);
        let friday = &summary.days[Day::Friday.index()];
        assert_eq!(friday.totals.meal_count, 1);
        assert!(friday.totals.calories.abs() < f64::EPSILON);
    }
}
