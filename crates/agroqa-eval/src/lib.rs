//! Retrieval evaluation against a curated ground-truth file.
//!
//! Each valid entry is searched once with the largest configured k; every
//! smaller k is computed by slicing that single ranked list. Both sides of
//! the comparison speak canonical external ids — internal ids never leave
//! the build generation that assigned them.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use agroqa_core::error::{Error, Result};
use agroqa_core::types::GroundTruthEntry;
use agroqa_index::{search_top_k, SystemContext};

/// Recall@k = |relevant ∩ retrieved[:k]| / |unique relevant|.
/// An empty relevant set scores 0.0.
pub fn recall_at_k(relevant: &[String], retrieved: &[String], k: usize) -> f64 {
    let relevant: HashSet<&str> = relevant.iter().map(String::as_str).collect();
    if relevant.is_empty() {
        return 0.0;
    }
    let topk: HashSet<&str> = retrieved.iter().take(k).map(String::as_str).collect();
    let hits = relevant.intersection(&topk).count();
    hits as f64 / relevant.len() as f64
}

/// Loads and schema-validates a ground-truth file. The file must be a JSON
/// array; every entry must carry a `query` string and a `relevantes` list.
/// Violations are fatal and name the offending entry; they are never
/// skipped per-entry. Non-string ids inside `relevantes` are stringified,
/// matching what annotation tooling may emit.
pub fn load_ground_truth(path: &Path) -> Result<Vec<GroundTruthEntry>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::DataFormat {
        path: path.to_path_buf(),
        reason: format!("cannot read ground truth: {e}"),
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| Error::DataFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let Some(items) = value.as_array() else {
        return Err(Error::DataFormat {
            path: path.to_path_buf(),
            reason: "ground truth must be a JSON array of objects".to_string(),
        });
    };

    let mut entries = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(query) = item.get("query").and_then(|v| v.as_str()) else {
            return Err(Error::DataFormat {
                path: path.to_path_buf(),
                reason: format!("entry {i}: missing 'query' field"),
            });
        };
        let Some(relevant) = item.get("relevantes").and_then(|v| v.as_array()) else {
            return Err(Error::DataFormat {
                path: path.to_path_buf(),
                reason: format!("entry {i}: 'relevantes' must be a list"),
            });
        };
        let relevant = relevant
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        let culture = item
            .get("cultura")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        entries.push(GroundTruthEntry {
            query: query.to_string(),
            relevant,
            culture,
        });
    }
    Ok(entries)
}

/// Mean recall@k for every configured k, averaged over valid entries.
/// Entries with a blank query or an empty relevant set are skipped; zero
/// valid entries is fatal.
pub fn evaluate(
    ctx: &SystemContext,
    entries: &[GroundTruthEntry],
    k_values: &[usize],
) -> Result<BTreeMap<usize, f64>> {
    let Some(&k_max) = k_values.iter().max() else {
        return Err(Error::InvalidConfig("no k values configured".to_string()));
    };

    let mut sums: BTreeMap<usize, f64> = k_values.iter().map(|&k| (k, 0.0)).collect();
    let mut valid = 0usize;

    for entry in entries {
        let query = entry.query.trim();
        let relevant: Vec<String> = entry
            .relevant
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if query.is_empty() || relevant.is_empty() {
            continue;
        }

        // One search with the largest k; slices cover the rest.
        let results = search_top_k(ctx, query, k_max as i64, entry.culture.as_deref());
        let retrieved: Vec<String> = results
            .iter()
            .map(|r| r.meta.external_id.clone())
            .collect();

        debug!(query, ?relevant, ?retrieved, "evaluated entry");
        if !retrieved.iter().any(|id| relevant.iter().any(|r| r == id)) {
            warn!(query, k = k_max, "no relevant document in the retrieved list");
        }

        for &k in k_values {
            *sums.entry(k).or_insert(0.0) += recall_at_k(&relevant, &retrieved, k);
        }
        valid += 1;
    }

    if valid == 0 {
        return Err(Error::Evaluation(
            "no usable ground-truth entries (blank query or empty relevant set)".to_string(),
        ));
    }
    Ok(sums
        .into_iter()
        .map(|(k, sum)| (k, sum / valid as f64))
        .collect())
}

/// Prints the per-k recall table.
pub fn print_report(recall: &BTreeMap<usize, f64>) {
    println!("\n=== Retrieval evaluation ===");
    println!("Mean metrics over the ground-truth set (higher is better)\n");
    println!("{:>3} | {:>10}", "k", "Recall@k");
    println!("{}", "-".repeat(30));
    for (k, value) in recall {
        println!("{k:>3} | {value:>10.4}");
    }
    println!();
}
