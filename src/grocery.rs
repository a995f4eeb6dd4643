// src/grocery.rs
// Grocery list aggregation and the shopping checklist

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::types::{GroceryItem, GroceryList, MealSlot, Recipe};

/// Display order of ingredient categories
pub const CATEGORY_ORDER: [&str; 7] = [
    "produce", "meat", "dairy", "bakery", "frozen", "pantry", "other",
];

const FALLBACK_CATEGORY: &str = "other";

struct Tally {
    item: GroceryItem,
    recipes: BTreeSet<String>,
}

/// Build the shopping list for one week plan on the client.
///
/// Only non-leftover slots with a recipe count. Lines merge on
/// `(ingredient_id, unit)`; the same ingredient in another unit stays a
/// separate item. Slots whose recipe is not in `recipes` are skipped.
pub fn aggregate_grocery_list(
    week_plan_id: i64,
    slots: &[MealSlot],
    recipes: &HashMap<i64, Recipe>,
) -> GroceryList {
    let mut tallies: HashMap<(i64, String), Tally> = HashMap::new();

    let counted = slots
        .iter()
        .filter(|slot| slot.week_plan_id == week_plan_id && !slot.is_leftover);

    for slot in counted {
        let Some(recipe_id) = slot.recipe_id else { continue };
        let Some(recipe) = recipes.get(&recipe_id) else {
            warn!("Recipe {} for slot {} not loaded, skipping", recipe_id, slot.id);
            continue;
        };

        for line in &recipe.ingredients {
            let tally = tallies
                .entry((line.ingredient_id, line.unit.clone()))
                .or_insert_with(|| Tally {
                    item: GroceryItem {
                        ingredient_id: line.ingredient_id,
                        ingredient_name: line
                            .ingredient_name
                            .clone()
                            .unwrap_or_else(|| format!("ingredient #{}", line.ingredient_id)),
                        category: line
                            .ingredient_category
                            .clone()
                            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
                        total_quantity: 0.0,
                        unit: line.unit.clone(),
                        recipes: Vec::new(),
                    },
                    recipes: BTreeSet::new(),
                });
            tally.item.total_quantity += line.quantity;
            tally.recipes.insert(recipe.name.clone());
        }
    }

    let mut items: Vec<GroceryItem> = tallies
        .into_values()
        .map(|mut tally| {
            tally.item.recipes = tally.recipes.into_iter().collect();
            tally.item
        })
        .collect();
    items.sort_by(|a, b| {
        a.ingredient_name
            .cmp(&b.ingredient_name)
            .then_with(|| a.unit.cmp(&b.unit))
    });

    let mut categories: BTreeMap<String, Vec<GroceryItem>> = BTreeMap::new();
    for item in items {
        categories.entry(item.category.clone()).or_default().push(item);
    }

    debug!(week_plan_id, categories = categories.len(), "Aggregated grocery list");
    GroceryList {
        week_plan_id,
        categories,
    }
}

/// Non-empty categories in display order. Categories outside
/// `CATEGORY_ORDER` follow alphabetically.
pub fn ordered_categories(list: &GroceryList) -> Vec<(&str, &[GroceryItem])> {
    let known = CATEGORY_ORDER
        .iter()
        .filter_map(|name| list.categories.get_key_value(*name));
    let unknown = list
        .categories
        .iter()
        .filter(|(name, _)| !CATEGORY_ORDER.contains(&name.as_str()));

    known
        .chain(unknown)
        .filter(|(_, items)| !items.is_empty())
        .map(|(name, items)| (name.as_str(), items.as_slice()))
        .collect()
}

/// Items ticked off while shopping, keyed `"{ingredient_id}-{unit}"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroceryChecklist {
    checked: HashSet<String>,
}

impl GroceryChecklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(item: &GroceryItem) -> String {
        format!("{}-{}", item.ingredient_id, item.unit)
    }

    /// Flip an item; returns whether it is now checked
    pub fn toggle(&mut self, item: &GroceryItem) -> bool {
        let key = Self::key(item);
        if self.checked.remove(&key) {
            false
        } else {
            self.checked.insert(key);
            true
        }
    }

    pub fn is_checked(&self, item: &GroceryItem) -> bool {
        self.checked.contains(&Self::key(item))
    }

    pub fn checked_count(&self) -> usize {
        self.checked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecipeIngredient;
    use chrono::NaiveDate;

    fn line(ingredient_id: i64, name: &str, category: &str, quantity: f64, unit: &str) -> RecipeIngredient {
        RecipeIngredient {
            id: ingredient_id * 100,
            ingredient_id,
            quantity,
            unit: unit.into(),
            preparation: None,
            optional: false,
            ingredient_name: Some(name.into()),
            ingredient_category: Some(category.into()),
        }
    }

    fn recipe(id: i64, name: &str, ingredients: Vec<RecipeIngredient>) -> Recipe {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Recipe {
            id,
            name: name.into(),
            description: None,
            servings: 4,
            prep_time_min: None,
            cook_time_min: None,
            instructions: None,
            tags: vec![],
            ingredients,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn slot(id: i64, recipe_id: Option<i64>, is_leftover: bool) -> MealSlot {
        MealSlot {
            id,
            week_plan_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            meal_type: "dinner".into(),
            recipe_id,
            is_leftover,
            leftover_source_id: None,
            notes: None,
            sort_order: 0,
            recipe_name: None,
        }
    }

    fn book() -> HashMap<i64, Recipe> {
        HashMap::from([
            (
                10,
                recipe(10, "Tacos", vec![
                    line(1, "Onion", "produce", 1.0, "whole"),
                    line(2, "Beef", "meat", 500.0, "g"),
                ]),
            ),
            (
                20,
                recipe(20, "Chili", vec![
                    line(1, "Onion", "produce", 2.0, "whole"),
                    line(1, "Onion", "produce", 100.0, "g"),
                    line(3, "Cumin", "spices", 1.0, "tsp"),
                ]),
            ),
        ])
    }

    #[test]
    fn test_same_ingredient_and_unit_merge() {
        let slots = [slot(1, Some(10), false), slot(2, Some(20), false), slot(3, Some(10), false)];
        let list = aggregate_grocery_list(1, &slots, &book());

        let produce = &list.categories["produce"];
        assert_eq!(produce.len(), 2);
        let whole = produce.iter().find(|i| i.unit == "whole").unwrap();
        assert_eq!(whole.total_quantity, 4.0);
        assert_eq!(whole.recipes, vec!["Chili", "Tacos"]);

        let grams = produce.iter().find(|i| i.unit == "g").unwrap();
        assert_eq!(grams.total_quantity, 100.0);
        assert_eq!(grams.recipes, vec!["Chili"]);
    }

    #[test]
    fn test_leftovers_and_empty_slots_are_skipped() {
        let slots = [slot(1, Some(10), true), slot(2, None, false), slot(3, Some(99), false)];
        let list = aggregate_grocery_list(1, &slots, &book());
        assert!(list.is_empty());
        assert_eq!(list.week_plan_id, 1);
    }

    #[test]
    fn test_category_order_with_unknown_last() {
        let slots = [slot(1, Some(10), false), slot(2, Some(20), false)];
        let list = aggregate_grocery_list(1, &slots, &book());

        let names: Vec<&str> = ordered_categories(&list).iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["produce", "meat", "spices"]);
    }

    #[test]
    fn test_checklist_keys_by_ingredient_and_unit() {
        let slots = [slot(1, Some(20), false)];
        let list = aggregate_grocery_list(1, &slots, &book());
        let produce = &list.categories["produce"];

        let mut checklist = GroceryChecklist::new();
        assert!(checklist.toggle(&produce[0]));
        assert!(checklist.is_checked(&produce[0]));
        assert!(!checklist.is_checked(&produce[1]));
        assert_eq!(GroceryChecklist::key(&produce[0]), format!("1-{}", produce[0].unit));

        assert!(!checklist.toggle(&produce[0]));
        assert_eq!(checklist.checked_count(), 0);
    }
}
