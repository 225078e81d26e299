//! Runtime loading of persisted artifacts into the read-only system context.
//!
//! This is the serving-side counterpart of [`crate::build::build_indices`]:
//! two separately named entry points, never selected by fallback.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{info, warn};

use agroqa_core::config::Settings;
use agroqa_core::error::{Error, Result};
use agroqa_core::traits::Embedder;
use agroqa_core::types::DocumentMeta;

use crate::flat::FlatIpIndex;

pub struct Partition {
    pub culture: String,
    pub index: FlatIpIndex,
    /// Keyed by stringified internal id, valid for this build generation only.
    pub docs: HashMap<String, DocumentMeta>,
    pub centroid: Option<Vec<f32>>,
}

/// Read-only serving state. Built once at startup, never mutated afterward,
/// safe to share across concurrent searches.
pub struct SystemContext {
    pub embedder: Box<dyn Embedder>,
    cultures: Vec<String>,
    partitions: HashMap<String, Partition>,
    pub default_k: usize,
}

impl SystemContext {
    /// Cultures in configured order — also the routing tiebreak order.
    pub fn cultures(&self) -> &[String] {
        &self.cultures
    }

    pub fn partition(&self, culture: &str) -> Option<&Partition> {
        self.partitions.get(culture)
    }
}

/// Loads every configured partition. A missing index or metadata artifact
/// is fatal; a missing centroid file only degrades routing.
pub fn load_system(settings: &Settings, embedder: Box<dyn Embedder>) -> Result<SystemContext> {
    let cultures = settings.effective_cultures();
    if cultures.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "no cultures configured and none discovered under {}",
            settings.corpus_dir.display()
        )));
    }

    let centroids = load_centroids(&settings.centroids_path());

    let mut partitions = HashMap::new();
    for culture in &cultures {
        let index_path = settings.index_path(culture);
        if !index_path.exists() {
            return Err(Error::MissingArtifact {
                kind: "index",
                culture: culture.clone(),
                path: index_path,
            });
        }
        let docs_path = settings.docs_path(culture);
        if !docs_path.exists() {
            return Err(Error::MissingArtifact {
                kind: "document metadata",
                culture: culture.clone(),
                path: docs_path,
            });
        }

        let index = FlatIpIndex::load(&index_path)?;
        let docs: HashMap<String, DocumentMeta> = read_json(&docs_path)?;
        if docs.len() != index.len() {
            warn!(
                %culture,
                index = index.len(),
                docs = docs.len(),
                "index and metadata sizes differ"
            );
        }
        let centroid = centroids
            .as_ref()
            .and_then(|m| m.get(culture.as_str()).cloned());

        info!(%culture, docs = docs.len(), "partition loaded");
        partitions.insert(
            culture.clone(),
            Partition {
                culture: culture.clone(),
                index,
                docs,
                centroid,
            },
        );
    }

    Ok(SystemContext {
        embedder,
        cultures,
        partitions,
        default_k: settings.search.default_k,
    })
}

fn load_centroids(path: &Path) -> Option<HashMap<String, Vec<f32>>> {
    if !path.exists() {
        warn!(path = %path.display(), "no centroid file; routing falls back to the first culture");
        return None;
    }
    match read_json(path) {
        Ok(map) => Some(map),
        Err(e) => {
            warn!(%e, "centroid file unreadable; routing degraded");
            None
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::DataFormat {
        path: path.to_path_buf(),
        reason: format!("cannot read: {e}"),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::DataFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
