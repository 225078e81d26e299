//! Top-k retrieval with metadata join.

use tracing::warn;

use agroqa_core::types::SearchResult;

use crate::route::route_culture;
use crate::store::SystemContext;

/// Runs one ranked search against the context.
///
/// Blank queries yield an empty list, never an error; `k <= 0` falls back
/// to the context default; encoder failures degrade to an empty list.
/// Identical `(query, k, culture)` against the same context always returns
/// the same ranked list.
pub fn search_top_k(
    ctx: &SystemContext,
    query: &str,
    k: i64,
    culture: Option<&str>,
) -> Vec<SearchResult> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let k = if k <= 0 { ctx.default_k } else { k as usize };

    let culture_used = route_culture(ctx, query, culture);
    let Some(partition) = ctx.partition(&culture_used) else {
        // Routing only returns loaded cultures; keep the guard anyway.
        return Vec::new();
    };

    let query_vec = match ctx.embedder.encode(&[query.to_string()]) {
        Ok(mut rows) if !rows.is_empty() => rows.remove(0),
        Ok(_) => return Vec::new(),
        Err(e) => {
            warn!(%e, "query encoding failed; returning no results");
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    let mut rank = 1;
    for hit in partition.index.search(&query_vec, k) {
        if hit.id < 0 {
            // Sentinel for "fewer than k vectors in the partition".
            continue;
        }
        let Some(meta) = partition.docs.get(&hit.id.to_string()) else {
            continue;
        };
        results.push(SearchResult {
            internal_id: hit.id,
            meta: meta.clone(),
            score: hit.score,
            rank,
            culture: culture_used.clone(),
        });
        rank += 1;
    }
    results
}
