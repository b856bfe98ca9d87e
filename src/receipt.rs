//! Fallback receipt-text parser.
//!
//! A deterministic line parser for pasted receipt text: price lines are
//! skipped, a leading integer becomes the quantity, everything else is the
//! item name. Produces pantry drafts for the confirm-add flow.

use crate::pantry::PantryItemDraft;
use once_cell::sync::Lazy;
use regex::Regex;

/// Lines carrying a price are receipt noise, not items.
static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s*\d+\.?\d*").unwrap());

/// Leading quantity followed by the item name.
static QTY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s+(.*)").unwrap());

/// Extract draft pantry items from raw receipt text.
pub fn parse_items(raw_text: &str) -> Vec<PantryItemDraft> {
    let mut items = vec![];

    for line in raw_text.lines() {
        let line = line.trim();
        if line.is_empty() || PRICE_RE.is_match(line) {
            continue;
        }

        let (quantity, name) = match QTY_RE.captures(line) {
            Some(caps) => match caps[1].parse::<f64>() {
                Ok(qty) => (qty, caps[2].trim().to_string()),
                Err(_) => (1.0, line.to_string()),
            },
            None => (1.0, line.to_string()),
        };

        if name.is_empty() {
            continue;
        }

        items.push(PantryItemDraft {
            name: Some(name.to_lowercase()),
            quantity: Some(quantity),
            ..Default::default()
        });
    }

    items
}
