//! Corpus text composition for embedding.
//!
//! Folds structured recipe or pantry fields into a single descriptive
//! string. `recipe_text` runs only at ingest time; `pantry_text` runs per
//! match request.

use crate::matching::normalize::normalize_ingredient;
use crate::pantry::PantryItem;
use crate::recipes::Recipe;

/// Compose the embedding text for a recipe.
///
/// Expects `cleaned_ingredients_list` to be populated already.
pub fn recipe_text(recipe: &Recipe) -> String {
    format!(
        "Recipe: {}. Category: {} ({}, {}). Description: {}. Ingredients: {}.",
        recipe.name,
        recipe.maincategory.as_deref().unwrap_or_default(),
        recipe.subcategory.as_deref().unwrap_or_default(),
        recipe.dish_type.as_deref().unwrap_or_default(),
        recipe.description,
        recipe.cleaned_ingredients_list.join(" "),
    )
    .trim()
    .to_string()
}

/// Compose the embedding text for the current pantry.
///
/// Items whose normalized name is empty are skipped. An empty return value
/// is the documented "empty pantry" signal, not an error.
pub fn pantry_text(items: &[PantryItem]) -> String {
    let mut parts = vec![];

    for item in items {
        let cleaned = normalize_ingredient(&item.name);
        if cleaned.is_empty() {
            continue;
        }

        let mut fields = vec![];
        if item.quantity > 0.0 {
            fields.push(format_quantity(item.quantity));
        }
        if let Some(unit) = item.unit.as_deref() {
            if !unit.trim().is_empty() {
                fields.push(unit.trim().to_string());
            }
        }
        fields.push(cleaned);

        parts.push(fields.join(" "));
    }

    parts.join(", ")
}

/// Integral quantities print without the trailing `.0`.
fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        format!("{}", quantity)
    }
}
