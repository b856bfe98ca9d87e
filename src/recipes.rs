//! Recipe records and the recipe store.
//!
//! Recipes are written by the offline ingestion job and read-only to the
//! serving path. The store is a trait so the match engine can be tested
//! against an in-memory double.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u64>,

    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrients: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serves: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maincategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dish_type: Option<String>,

    /// Derived by the ingestion job: deduplicated cleaned ingredient
    /// phrases plus their sub-tokens, in first-seen order.
    #[serde(default)]
    pub cleaned_ingredients_list: Vec<String>,
}

pub trait RecipeStore: Send + Sync {
    fn fetch_all(&self) -> anyhow::Result<Vec<Recipe>>;

    /// Fetch the subset of records whose ids are in `ids`, in store order.
    /// Unknown ids are silently absent from the result.
    fn fetch_by_ids(&self, ids: &[String]) -> anyhow::Result<Vec<Recipe>>;

    /// Recipes whose `cleaned_ingredients_list` contains every query token.
    fn search_by_ingredients(&self, tokens: &[String]) -> anyhow::Result<Vec<Recipe>>;

    fn upsert(&self, recipes: Vec<Recipe>) -> anyhow::Result<usize>;
    fn total(&self) -> anyhow::Result<usize>;
}

/// JSON-file backed recipe store.
#[derive(Debug, Clone, Default)]
pub struct BackendJson {
    list: Arc<RwLock<Vec<Recipe>>>,
    path: PathBuf,
}

impl BackendJson {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new recipe database at {}", path.display());
                    std::fs::write(path, b"[]")?;
                }
                _ => Err(err)?,
            }
        }

        let raw = std::fs::read(path)
            .with_context(|| format!("couldnt read recipe database {}", path.display()))?;
        let recipes: Vec<Recipe> =
            serde_json::from_slice(&raw).context("recipe database is malformed")?;

        Ok(BackendJson {
            list: Arc::new(RwLock::new(recipes)),
            path: path.to_path_buf(),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        let recipes = self.list.read().unwrap();

        let temp_path = self.path.with_extension("json-tmp");
        let data = serde_json::to_vec(&*recipes)?;
        std::fs::write(&temp_path, data)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl RecipeStore for BackendJson {
    fn fetch_all(&self) -> anyhow::Result<Vec<Recipe>> {
        Ok(self.list.read().unwrap().clone())
    }

    fn fetch_by_ids(&self, ids: &[String]) -> anyhow::Result<Vec<Recipe>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();

        Ok(self
            .list
            .read()
            .unwrap()
            .iter()
            .filter(|r| wanted.contains(r.id.as_str()))
            .cloned()
            .collect())
    }

    fn search_by_ingredients(&self, tokens: &[String]) -> anyhow::Result<Vec<Recipe>> {
        let recipes = self.list.read().unwrap();

        Ok(recipes
            .iter()
            .filter(|r| {
                tokens
                    .iter()
                    .all(|t| r.cleaned_ingredients_list.iter().any(|c| c == t))
            })
            .cloned()
            .collect())
    }

    fn upsert(&self, incoming: Vec<Recipe>) -> anyhow::Result<usize> {
        let count = incoming.len();

        let mut recipes = self.list.write().unwrap();
        for recipe in incoming {
            match recipes.iter_mut().find(|r| r.id == recipe.id) {
                Some(existing) => *existing = recipe,
                None => recipes.push(recipe),
            }
        }
        drop(recipes);

        self.save()?;

        Ok(count)
    }

    fn total(&self) -> anyhow::Result<usize> {
        Ok(self.list.read().unwrap().len())
    }
}
