//! Offline index construction: one artifact set per culture plus one shared
//! centroid file. Idempotent; reruns fully overwrite prior artifacts.

use std::collections::BTreeMap;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use agroqa_core::config::Settings;
use agroqa_core::corpus::load_corpus;
use agroqa_core::traits::Embedder;
use agroqa_core::types::DocumentMeta;

use crate::flat::FlatIpIndex;

const ENCODE_BATCH: usize = 32;

/// Builds every configured culture. A corpus that fails to load is fatal;
/// an empty corpus skips its partition with a warning.
pub fn build_indices(settings: &Settings, embedder: &dyn Embedder) -> Result<()> {
    fs::create_dir_all(&settings.index_dir)
        .with_context(|| format!("creating {}", settings.index_dir.display()))?;

    let cultures = settings.effective_cultures();
    anyhow::ensure!(
        !cultures.is_empty(),
        "no cultures configured and none discovered under {}",
        settings.corpus_dir.display()
    );

    let mut centroids: BTreeMap<String, Vec<f32>> = BTreeMap::new();
    for culture in &cultures {
        let corpus_path = settings.corpus_path(culture);
        info!(%culture, path = %corpus_path.display(), "reading corpus");
        let docs = load_corpus(&corpus_path)?;
        if docs.is_empty() {
            warn!(%culture, "empty corpus, skipping partition");
            continue;
        }

        let texts: Vec<String> = docs.iter().map(|d| d.text.clone()).collect();
        let embeddings = encode_with_progress(embedder, &texts, culture)?;

        // Internal ids are positional per build generation: 0..N-1 in
        // document order, reassigned on every rebuild.
        let mut index = FlatIpIndex::new(embedder.dim());
        for (i, row) in embeddings.iter().enumerate() {
            index.add(i as i64, row);
        }
        let index_path = settings.index_path(culture);
        index.save(&index_path)?;

        let docs_map: BTreeMap<String, &DocumentMeta> = docs
            .iter()
            .enumerate()
            .map(|(i, d)| (i.to_string(), &d.meta))
            .collect();
        write_json(&settings.docs_path(culture), &docs_map)?;

        centroids.insert(culture.clone(), mean_embedding(&embeddings));
        info!(
            %culture,
            docs = docs.len(),
            dim = embedder.dim(),
            index = %index_path.display(),
            "partition built"
        );
    }

    write_json(&settings.centroids_path(), &centroids)?;
    info!(path = %settings.centroids_path().display(), "centroids written");
    Ok(())
}

/// Raw arithmetic mean of the rows. NOT re-normalized: routing dots this
/// against unit query vectors as-is.
fn mean_embedding(rows: &[Vec<f32>]) -> Vec<f32> {
    let dim = rows[0].len();
    let mut mean = vec![0f32; dim];
    for row in rows {
        for (m, x) in mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    let n = rows.len() as f32;
    for m in &mut mean {
        *m /= n;
    }
    mean
}

fn encode_with_progress(
    embedder: &dyn Embedder,
    texts: &[String],
    culture: &str,
) -> Result<Vec<Vec<f32>>> {
    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs {msg}")
            .expect("progress template")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("encoding {culture}"));
    let mut rows = Vec::with_capacity(texts.len());
    for batch in texts.chunks(ENCODE_BATCH) {
        rows.extend(embedder.encode(batch)?);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    Ok(rows)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
