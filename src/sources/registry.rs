// src/sources/registry.rs - Startup loads of the reference files
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::models::core::OwnerRecord;
use crate::sources::directory::{CollectorDirectory, CollectorInfo};

/// Everything the engine needs loaded before the first resolution
/// pass. Loaded once per process; read-only thereafter.
pub struct ReferenceData {
    pub owners: Vec<OwnerRecord>,
    pub directory: CollectorDirectory,
    /// Alias filing name -> owner internal id.
    pub crossrefs: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ReferencePaths {
    pub owner_registry: PathBuf,
    pub collector_directory: PathBuf,
    pub crossref_mapping: PathBuf,
}

impl ReferencePaths {
    pub fn under(dir: &Path) -> Self {
        Self {
            owner_registry: dir.join("owner_registry.json"),
            collector_directory: dir.join("collector_directory.json"),
            crossref_mapping: dir.join("crossref_mapping.json"),
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Registry: failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Registry: malformed {}", path.display()))
}

/// Load the owner registry, collector directory, and cross-reference
/// mapping concurrently; the three files have no cross-dependencies.
/// The registry is required; the other two degrade to empty with a
/// warning so a thin deployment can still resolve names.
pub async fn load_all(paths: &ReferencePaths) -> Result<ReferenceData> {
    let (owners, directory_entries, crossrefs) = tokio::join!(
        read_json::<Vec<OwnerRecord>>(&paths.owner_registry),
        read_json::<Vec<CollectorInfo>>(&paths.collector_directory),
        read_json::<HashMap<String, String>>(&paths.crossref_mapping),
    );

    let owners = owners?;
    let directory_entries = directory_entries.unwrap_or_else(|e| {
        warn!("Registry: collector directory unavailable: {e:#}");
        Vec::new()
    });
    let crossrefs = crossrefs.unwrap_or_else(|e| {
        warn!("Registry: cross-reference mapping unavailable: {e:#}");
        HashMap::new()
    });

    info!(
        "📚 Reference data loaded: {} owners, {} collectors, {} cross-references",
        owners.len(),
        directory_entries.len(),
        crossrefs.len()
    );

    Ok(ReferenceData {
        owners,
        directory: CollectorDirectory::new(directory_entries),
        crossrefs,
    })
}
