use anyhow::{Context, Result};
use attrib_lib::matching::index::OwnerIndex;
use attrib_lib::matching::manager;
use attrib_lib::sources::bulk::BulkSnapshotStore;
use attrib_lib::sources::live::LiveContributionClient;
use attrib_lib::sources::registry::{load_all, ReferencePaths};
use attrib_lib::sources::router::SourceRouter;
use attrib_lib::utils::env::{load_env, EngineConfig};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(
    name = "resolve",
    about = "Resolve contribution records against the owner registry"
)]
struct Cli {
    /// Collector identifier (C########) or contributor-name search term
    term: String,

    /// Directory holding owner_registry.json, collector_directory.json
    /// and crossref_mapping.json
    #[arg(long, default_value = "data/reference")]
    reference_dir: PathBuf,

    /// Owner rows to print
    #[arg(long, default_value_t = 20)]
    top: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting contribution-to-owner resolution");
    load_env();

    let cli = Cli::parse();
    let config = EngineConfig::from_env();
    config.log_config();

    let mut phase_times: HashMap<&str, Duration> = HashMap::new();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    // Phase 1: reference data (three independent files, loaded in parallel)
    spinner.set_message("Loading reference data...");
    let phase1_start = Instant::now();
    let reference = load_all(&ReferencePaths::under(&cli.reference_dir))
        .await
        .context("Failed to load reference data")?;
    let directory = Arc::new(reference.directory);
    // autocomplete warms behind the first response; no one blocks on it
    directory.warm_in_background();

    let index = OwnerIndex::build_with_aliases(reference.owners, &reference.crossrefs);
    phase_times.insert("reference_load_and_index", phase1_start.elapsed());
    info!(
        "🔑 Index ready: {} owners, {} lookup keys",
        index.owner_count(),
        index.key_count()
    );

    // Phase 2: fetch + resolve + attribute
    spinner.set_message(format!("Searching for {:?}...", cli.term));
    let phase2_start = Instant::now();
    let router = SourceRouter::new(
        BulkSnapshotStore::new(&config.snapshot_dir),
        LiveContributionClient::new(&config),
    );
    let outcome = manager::search(
        &router,
        &index,
        &cli.term,
        config.substring_budget,
        Utc::now(),
    )
    .await;
    phase_times.insert("search_pass", phase2_start.elapsed());
    spinner.finish_and_clear();

    if let Some(error) = &outcome.source_error {
        println!("Data limited: {error}");
        if let attrib_lib::SourceError::SourceUnavailable { suggested_link, .. } = error {
            println!("Browse this collector directly: {suggested_link}");
        }
        return Ok(());
    }

    println!(
        "\nSource: {} | coverage: {:?}{}",
        outcome.source.map(|s| s.as_str()).unwrap_or("none"),
        outcome.coverage_years,
        if outcome.is_partial { " | PARTIAL" } else { "" }
    );
    for note in &outcome.notes {
        println!("  note: {}", note.describe());
    }

    println!(
        "\n{} records, {} matched to owners (avg score {:.1})",
        outcome.stats.records_total, outcome.stats.records_matched, outcome.stats.avg_composite
    );

    let rollup = &outcome.rollup;
    println!(
        "Conduit activity: {}/{} records, ${:.2} of ${:.2} ({:.1}%)",
        rollup.conduit_count,
        rollup.total_count,
        rollup.conduit_amount,
        rollup.total_amount,
        rollup.conduit_pct
    );
    if rollup.conduit_count > 0 {
        println!(
            "  resolved: {} (${:.2}, {:.1}%) | unresolved: {} (${:.2}, {:.1}%)",
            rollup.resolved_count,
            rollup.resolved_amount,
            rollup.resolved_pct,
            rollup.unresolved_count,
            rollup.unresolved_amount,
            rollup.unresolved_pct
        );
    }
    if !rollup.top_recipients.is_empty() {
        println!("Top ultimate recipients:");
        for recipient in &rollup.top_recipients {
            let name = if recipient.recipient_name.is_empty() {
                directory
                    .display_name(&recipient.recipient_id)
                    .unwrap_or(&recipient.recipient_id)
            } else {
                recipient.recipient_name.as_str()
            };
            println!(
                "  ${:>12.2}  {:>4} records  {}",
                recipient.amount, recipient.count, name
            );
        }
    }

    if !outcome.owner_aggregates.is_empty() {
        println!("\nMatched owners:");
        for aggregate in outcome.owner_aggregates.iter().take(cli.top) {
            println!(
                "  ${:>12.2}  {:>4} records  [{}]  {}",
                aggregate.total_amount,
                aggregate.contribution_count,
                aggregate.best_band.as_str(),
                aggregate.owner_name
            );
        }
    }

    for (phase, duration) in &phase_times {
        info!("Phase '{}' took {:.2}s", phase, duration.as_secs_f64());
    }
    Ok(())
}
