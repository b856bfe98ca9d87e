//! Offline recipe ingestion and index build.
//!
//! Reads raw recipe JSON files, derives cleaned ingredient tokens, embeds
//! the corpus text of every recipe, and produces the index + ID-map
//! artifact pair alongside the authoritative record store rows. Vectors
//! and ids are appended in the same iteration order; recipes without a
//! usable embedding are skipped entirely so the pair stays consistent.

use std::path::Path;

use anyhow::{bail, Context};
use indicatif::ProgressBar;

use crate::matching::corpus::recipe_text;
use crate::matching::embeddings::{model_id_hash, EmbeddingProvider};
use crate::matching::index::{IdMap, VectorIndex};
use crate::matching::normalize::cleaned_ingredient_tokens;
use crate::matching::storage::IndexStorage;
use crate::recipes::{Recipe, RecipeStore};

#[derive(Debug, Default)]
pub struct IngestReport {
    /// Raw records found in the data files
    pub loaded: usize,
    /// Recipes embedded and added to the index
    pub indexed: usize,
    /// Records dropped (malformed, missing id/name, failed embedding)
    pub skipped: usize,
}

/// Read every `.json` file in `data_dir` and collect raw recipe records.
///
/// Accepts both a bare array of recipes and a `{"recipes": [...]}` wrapper.
/// Records that don't coerce to the recipe shape are dropped with a warning
/// rather than failing the whole run.
fn load_raw_recipes(data_dir: &Path) -> anyhow::Result<(Vec<Recipe>, usize)> {
    let mut recipes = vec![];
    let mut rejected = 0;

    let mut entries: Vec<_> = std::fs::read_dir(data_dir)
        .with_context(|| format!("couldnt read data directory {}", data_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    entries.sort();

    for path in entries {
        let raw = std::fs::read(&path)
            .with_context(|| format!("couldnt read {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_slice(&raw)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;

        let records = match value {
            serde_json::Value::Object(mut obj) => match obj.remove("recipes") {
                Some(serde_json::Value::Array(records)) => records,
                _ => {
                    log::warn!("{} has no recipes array, skipping", path.display());
                    continue;
                }
            },
            serde_json::Value::Array(records) => records,
            _ => {
                log::warn!("{} is neither an array nor an object, skipping", path.display());
                continue;
            }
        };

        for record in records {
            match serde_json::from_value::<Recipe>(record) {
                Ok(recipe) => recipes.push(recipe),
                Err(err) => {
                    log::warn!("dropping malformed recipe record in {}: {err}", path.display());
                    rejected += 1;
                }
            }
        }
    }

    Ok((recipes, rejected))
}

/// Build the artifact pair and refresh the record store.
pub fn ingest_recipes_and_build_index(
    data_dir: &Path,
    storage: &IndexStorage,
    embedder: &dyn EmbeddingProvider,
    recipes: &dyn RecipeStore,
) -> anyhow::Result<IngestReport> {
    log::info!("starting recipe ingestion from {}", data_dir.display());

    let (all_recipes, rejected) = load_raw_recipes(data_dir)?;
    let mut report = IngestReport {
        loaded: all_recipes.len() + rejected,
        skipped: rejected,
        ..Default::default()
    };

    if all_recipes.is_empty() {
        bail!("no recipes loaded from {}", data_dir.display());
    }

    let valid: Vec<Recipe> = all_recipes
        .into_iter()
        .filter(|r| {
            let ok = !r.id.is_empty() && !r.name.is_empty();
            if !ok {
                log::warn!("skipping recipe without id or name");
            }
            ok
        })
        .collect();
    report.skipped += report.loaded - rejected - valid.len();

    let mut index = VectorIndex::new(embedder.dimensions());
    let mut id_map = IdMap::new();
    let mut recipes_for_db = vec![];

    let progress = ProgressBar::new(valid.len() as u64);
    for mut recipe in valid {
        progress.inc(1);

        recipe.cleaned_ingredients_list = cleaned_ingredient_tokens(&recipe.ingredients);

        let text = recipe_text(&recipe);
        let embedding = match embedder.embed(&text) {
            Ok(embedding) => embedding,
            Err(err) => {
                log::warn!("skipping recipe '{}': {err}", recipe.id);
                report.skipped += 1;
                continue;
            }
        };

        if index.push(&embedding).is_err() {
            log::warn!(
                "skipping recipe '{}': embedding has wrong dimension",
                recipe.id
            );
            report.skipped += 1;
            continue;
        }
        id_map.push(recipe.id.clone());
        recipes_for_db.push(recipe);
    }
    progress.finish_and_clear();

    if index.is_empty() {
        bail!("no valid embeddings generated, index not written");
    }

    report.indexed = index.count();

    let model_id = model_id_hash(embedder.identity());
    storage
        .save(&index, &id_map, &model_id)
        .context("couldnt persist index artifacts")?;
    log::info!(
        "index built and saved to {} with {} vectors",
        storage.index_path().display(),
        index.count()
    );

    let upserted = recipes.upsert(recipes_for_db)?;
    log::info!("upserted {upserted} recipes into the record store");

    Ok(report)
}
