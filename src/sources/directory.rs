// src/sources/directory.rs - Collector directory and autocomplete cache
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorType {
    Pac,
    JointFundraising,
    Committee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorInfo {
    pub id: String,
    pub display_name: String,
    pub collector_type: CollectorType,
}

/// Read-only directory of collectors, loaded once at startup. The
/// autocomplete listing over it is built lazily, exactly once, even
/// under concurrent first use; callers that need it before the
/// background warm completes await the same single build.
pub struct CollectorDirectory {
    by_id: HashMap<String, CollectorInfo>,
    autocomplete: OnceCell<Arc<Vec<(String, String)>>>,
    builds: AtomicUsize,
}

impl CollectorDirectory {
    pub fn new(entries: Vec<CollectorInfo>) -> Self {
        let by_id = entries
            .into_iter()
            .map(|info| (info.id.clone(), info))
            .collect();
        Self {
            by_id,
            autocomplete: OnceCell::new(),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, collector_id: &str) -> Option<&CollectorInfo> {
        self.by_id.get(collector_id)
    }

    pub fn display_name(&self, collector_id: &str) -> Option<&str> {
        self.get(collector_id).map(|info| info.display_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Sorted (lowercased name, id) pairs for prefix lookups.
    /// Single-flight: concurrent first callers share one build.
    pub async fn autocomplete(&self) -> Arc<Vec<(String, String)>> {
        self.autocomplete
            .get_or_init(|| async {
                self.builds.fetch_add(1, Ordering::SeqCst);
                let mut listing: Vec<(String, String)> = self
                    .by_id
                    .values()
                    .map(|info| (info.display_name.to_lowercase(), info.id.clone()))
                    .collect();
                listing.sort();
                Arc::new(listing)
            })
            .await
            .clone()
    }

    /// Start the autocomplete build without blocking the caller.
    pub fn warm_in_background(self: &Arc<Self>) {
        let directory = Arc::clone(self);
        tokio::spawn(async move {
            let listing = directory.autocomplete().await;
            log::debug!("Directory: warmed autocomplete cache ({} names)", listing.len());
        });
    }

    pub fn autocomplete_builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}
