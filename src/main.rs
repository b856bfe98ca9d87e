use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

mod cli;
mod config;
mod ingestion;
mod matching;
mod pantry;
mod receipt;
mod recipes;
#[cfg(test)]
mod tests;
mod web;

use config::Config;
use matching::{EmbeddingProvider, GeminiEmbedder, IndexStorage, MatchEngine, MatchService};
use pantry::PantryStore;
use recipes::RecipeStore;

fn base_dir(args: &cli::Args) -> anyhow::Result<std::path::PathBuf> {
    if let Some(dir) = &args.base_dir {
        return Ok(dir.clone());
    }

    let home = homedir::my_home()
        .ok()
        .flatten()
        .context("couldnt resolve home directory, pass --base-dir")?;
    Ok(home.join(".pantryd"))
}

/// Wire the stores, the embedder and the match engine into the shared
/// request state. Constructed once at startup; the index artifacts are
/// read-only afterwards.
fn build_state(config: &Config) -> anyhow::Result<web::SharedState> {
    let recipe_store: Arc<dyn RecipeStore> =
        Arc::new(recipes::BackendJson::load(&config.recipes_path())?);
    let pantry_store: Arc<dyn PantryStore> =
        Arc::new(pantry::BackendCsv::load(&config.pantry_path())?);

    let embedder = Arc::new(GeminiEmbedder::new(&config.embedding)?);

    let storage = IndexStorage::new(config.index_path(), config.id_map_path());
    let engine = MatchEngine::load(
        &storage,
        embedder.identity(),
        config.embedding.dimensions,
        recipe_store.clone(),
    );

    let service = Arc::new(MatchService::new(
        engine,
        embedder,
        pantry_store.clone(),
        config.matching.default_k,
    ));

    Ok(web::SharedState {
        service,
        recipes: recipe_store,
        pantry: pantry_store,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    let base = base_dir(&args)?;
    let config = Config::load_with(&base)?;

    match args.command {
        cli::Command::Daemon {} => {
            let state = build_state(&config)?;
            web::start_daemon(state, config.listen_addr.clone());
            Ok(())
        }

        cli::Command::Ingest { data_dir } => {
            let recipe_store = recipes::BackendJson::load(&config.recipes_path())?;
            let embedder = GeminiEmbedder::new(&config.embedding)?;
            let storage = IndexStorage::new(config.index_path(), config.id_map_path());

            let report = ingestion::ingest_recipes_and_build_index(
                &data_dir,
                &storage,
                &embedder,
                &recipe_store,
            )?;

            println!(
                "{} records loaded, {} indexed, {} skipped",
                report.loaded, report.indexed, report.skipped
            );
            Ok(())
        }

        cli::Command::Match { k } => {
            let state = build_state(&config)?;

            match state.service.suggest(k) {
                matching::MatchOutcome::EmptyPantry => {
                    println!("Your pantry is empty. Please add items to get recipe suggestions.");
                }
                matching::MatchOutcome::EmbeddingFailed => {
                    anyhow::bail!("failed to generate embedding for your pantry items");
                }
                matching::MatchOutcome::Matches(matches) => {
                    println!("{}", serde_json::to_string_pretty(&matches).unwrap());
                }
            }
            Ok(())
        }

        cli::Command::Search { ingredients } => {
            let recipe_store = recipes::BackendJson::load(&config.recipes_path())?;

            let tokens: Vec<String> = ingredients
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if tokens.is_empty() {
                anyhow::bail!("please provide at least one ingredient");
            }

            let results = recipe_store.search_by_ingredients(&tokens)?;
            println!("{}", serde_json::to_string_pretty(&results).unwrap());
            Ok(())
        }
    }
}
