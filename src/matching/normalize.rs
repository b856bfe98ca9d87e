//! Ingredient text normalization.
//!
//! Turns a raw ingredient phrase ("2 tbsp olive oil (extra virgin)") into a
//! canonical lowercase token phrase ("olive oil"). The pipeline:
//! 1. Lowercase, strip parenthetical/bracketed asides
//! 2. Per word: keep only `[a-z0-9-]`, trim stray hyphens
//! 3. Drop empty words, stop words (units, descriptors, filler, spelled-out
//!    numbers) and anything still carrying a digit
//! 4. Rejoin and apply the correction table
//!
//! Deterministic, never fails; fully-filtered input yields an empty string.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Matches parenthetical or bracketed asides, non-greedy.
static PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[].*?[\)\]]").unwrap());

/// Measurement units, quantity descriptors, preparation words, filler words
/// and spelled-out numbers one through ten.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // units
        "tsp", "teaspoon", "tbsp", "tablespoon", "g", "gram", "kg", "kilogram", "ml",
        "milliliter", "l", "liter", "oz", "ounce", "lb", "pound", "cup", "clove", "pinch",
        "dash", "small", "medium", "large",
        // common descriptors
        "chopped", "minced", "diced", "sliced", "ground", "fresh", "dried", "raw", "cooked",
        "cubed",
        // numbers
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        // general words
        "and", "or", "a", "an", "the", "to", "for", "with", "plus", "some", "any",
    ]
    .into_iter()
    .collect()
});

/// Phrase-level corrections applied after filtering.
static CORRECTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("all-purpose flour", "flour"),
        ("granulated sugar", "sugar"),
        ("caster sugar", "sugar"),
        ("plain flour", "flour"),
    ]
    .into_iter()
    .collect()
});

/// Clean a raw ingredient phrase into its canonical form.
pub fn normalize_ingredient(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = PAREN_RE.replace_all(&lowered, "");

    let mut words = vec![];
    for word in stripped.split_whitespace() {
        let w: String = word
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
            .collect();
        let w = w.trim_matches('-');

        if w.is_empty() || STOP_WORDS.contains(w) || w.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }

        words.push(w.to_string());
    }

    let cleaned = words.join(" ");

    match CORRECTIONS.get(cleaned.as_str()) {
        Some(corrected) => corrected.to_string(),
        None => cleaned,
    }
}

/// Derive the deduplicated token list for a recipe's raw ingredient lines.
///
/// For every line the full cleaned phrase is kept alongside each of its
/// whitespace-split sub-tokens, preserving first-seen order. This is the
/// `cleaned_ingredients_list` field the ingredient search filters on.
pub fn cleaned_ingredient_tokens(lines: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = vec![];

    for raw in lines {
        let cleaned = normalize_ingredient(raw);
        if cleaned.is_empty() {
            continue;
        }

        if seen.insert(cleaned.clone()) {
            tokens.push(cleaned.clone());
        }

        for tok in cleaned.split_whitespace() {
            if seen.insert(tok.to_string()) {
                tokens.push(tok.to_string());
            }
        }
    }

    tokens
}
