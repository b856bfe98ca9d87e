//! Pantry items and the pantry store.
//!
//! Items are created by confirming parsed receipt drafts or manual entry,
//! updated and deleted by id, and read as an aggregate by the match service
//! when composing the pantry embedding text.

use anyhow::anyhow;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusty_ulid::Ulid;
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PantryItem {
    pub id: String,

    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: Option<String>,

    pub expiry: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,

    pub location: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub notes: Option<String>,

    pub is_opened: bool,
    pub added_at: DateTime<Utc>,
}

/// An unconfirmed item, as posted to confirm-add or produced by the
/// receipt parser. Everything except the name is defaulted server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PantryItemDraft {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_opened: bool,
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PantryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_opened: Option<bool>,
}

impl PantryItem {
    /// Materialize a draft, applying the server-side defaults: quantity 1,
    /// expiry a week out, purchase date today, location "Pantry".
    ///
    /// Returns `None` when the draft has no usable name.
    pub fn from_draft(draft: PantryItemDraft, now: DateTime<Utc>) -> Option<Self> {
        let name = draft.name.map(|n| n.trim().to_string())?;
        if name.is_empty() {
            return None;
        }

        let today = now.date_naive();

        Some(PantryItem {
            id: Ulid::generate().to_string(),
            name,
            category: draft.category.unwrap_or_else(|| "Uncategorized".to_string()),
            quantity: draft.quantity.unwrap_or(1.0),
            unit: draft.unit,
            expiry: Some(draft.expiry.unwrap_or(today + Duration::days(7))),
            purchase_date: Some(draft.purchase_date.unwrap_or(today)),
            location: draft.location.unwrap_or_else(|| "Pantry".to_string()),
            brand: draft.brand,
            barcode: draft.barcode,
            notes: draft.notes,
            is_opened: draft.is_opened,
            added_at: draft.added_at.unwrap_or(now),
        })
    }
}

pub trait PantryStore: Send + Sync {
    fn list(&self) -> anyhow::Result<Vec<PantryItem>>;
    fn insert_many(&self, items: Vec<PantryItem>) -> anyhow::Result<Vec<PantryItem>>;
    fn update(&self, id: &str, update: PantryUpdate) -> anyhow::Result<Option<PantryItem>>;
    fn delete(&self, id: &str) -> anyhow::Result<bool>;
}

/// CSV-file backed pantry store.
#[derive(Debug, Clone, Default)]
pub struct BackendCsv {
    list: Arc<RwLock<Vec<PantryItem>>>,
    path: PathBuf,
}

const CSV_HEADERS: [&str; 13] = [
    "id",
    "name",
    "category",
    "quantity",
    "unit",
    "expiry",
    "purchase_date",
    "location",
    "brand",
    "barcode",
    "notes",
    "is_opened",
    "added_at",
];

fn opt_str(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl BackendCsv {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new pantry database at {}", path.display());
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let mut csv_reader = csv::Reader::from_path(path)?;
        let mut items = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let field = |idx: usize, name: &str| -> anyhow::Result<String> {
                Ok(record
                    .get(idx)
                    .ok_or(anyhow!("couldnt get pantry record {name}"))?
                    .to_string())
            };

            let expiry = opt_str(&field(5, "expiry")?)
                .map(|d| d.parse::<NaiveDate>())
                .transpose()?;
            let purchase_date = opt_str(&field(6, "purchase_date")?)
                .map(|d| d.parse::<NaiveDate>())
                .transpose()?;

            let item = PantryItem {
                id: field(0, "id")?,
                name: field(1, "name")?,
                category: field(2, "category")?,
                quantity: field(3, "quantity")?.parse::<f64>()?,
                unit: opt_str(&field(4, "unit")?),
                expiry,
                purchase_date,
                location: field(7, "location")?,
                brand: opt_str(&field(8, "brand")?),
                barcode: opt_str(&field(9, "barcode")?),
                notes: opt_str(&field(10, "notes")?),
                is_opened: field(11, "is_opened")? == "true",
                added_at: field(12, "added_at")?.parse::<DateTime<Utc>>()?,
            };

            items.push(item);
        }

        Ok(BackendCsv {
            list: Arc::new(RwLock::new(items)),
            path: path.to_path_buf(),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        let items = self.list.read().unwrap();

        let temp_path = self.path.with_extension("csv-tmp");
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for item in items.iter() {
            let quantity = item.quantity.to_string();
            let expiry = item.expiry.map(|d| d.to_string()).unwrap_or_default();
            let purchase_date = item
                .purchase_date
                .map(|d| d.to_string())
                .unwrap_or_default();
            let added_at = item.added_at.to_rfc3339();

            csv_wrt.write_record([
                item.id.as_str(),
                item.name.as_str(),
                item.category.as_str(),
                quantity.as_str(),
                item.unit.as_deref().unwrap_or_default(),
                expiry.as_str(),
                purchase_date.as_str(),
                item.location.as_str(),
                item.brand.as_deref().unwrap_or_default(),
                item.barcode.as_deref().unwrap_or_default(),
                item.notes.as_deref().unwrap_or_default(),
                if item.is_opened { "true" } else { "false" },
                added_at.as_str(),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl PantryStore for BackendCsv {
    fn list(&self) -> anyhow::Result<Vec<PantryItem>> {
        Ok(self.list.read().unwrap().clone())
    }

    fn insert_many(&self, new_items: Vec<PantryItem>) -> anyhow::Result<Vec<PantryItem>> {
        let mut items = self.list.write().unwrap();
        items.extend(new_items.iter().cloned());
        drop(items);

        self.save()?;

        Ok(new_items)
    }

    fn update(&self, id: &str, update: PantryUpdate) -> anyhow::Result<Option<PantryItem>> {
        let mut items = self.list.write().unwrap();

        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            item.name = name;
        }
        if let Some(category) = update.category {
            item.category = category;
        }
        if let Some(quantity) = update.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = update.unit {
            item.unit = Some(unit);
        }
        if let Some(expiry) = update.expiry {
            item.expiry = Some(expiry);
        }
        if let Some(purchase_date) = update.purchase_date {
            item.purchase_date = Some(purchase_date);
        }
        if let Some(location) = update.location {
            item.location = location;
        }
        if let Some(brand) = update.brand {
            item.brand = Some(brand);
        }
        if let Some(barcode) = update.barcode {
            item.barcode = Some(barcode);
        }
        if let Some(notes) = update.notes {
            item.notes = Some(notes);
        }
        if let Some(is_opened) = update.is_opened {
            item.is_opened = is_opened;
        }

        let result = item.clone();
        drop(items);

        self.save()?;

        Ok(Some(result))
    }

    fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let mut items = self.list.write().unwrap();
        let found = items.iter().position(|i| i.id == id).map(|idx| {
            items.remove(idx);
        });
        drop(items);

        if found.is_none() {
            return Ok(false);
        }

        self.save()?;

        Ok(true)
    }
}
