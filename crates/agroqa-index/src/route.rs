//! Culture routing for queries that do not name a partition.

use tracing::warn;

use crate::store::SystemContext;

/// Picks the partition to search.
///
/// An explicit culture naming a loaded partition wins without touching the
/// encoder, as does a single-partition context. Otherwise the query is
/// encoded and routed to the culture whose stored centroid has the highest
/// inner product with the unit query vector; ties keep the first configured
/// culture. No centroids, or an encoder failure, fall back to the first
/// configured culture.
pub fn route_culture(ctx: &SystemContext, query: &str, explicit: Option<&str>) -> String {
    if let Some(c) = explicit.map(str::trim).filter(|c| !c.is_empty()) {
        if ctx.partition(c).is_some() {
            return c.to_string();
        }
    }

    let cultures = ctx.cultures();
    if cultures.len() == 1 {
        return cultures[0].clone();
    }

    let has_centroids = cultures
        .iter()
        .any(|c| ctx.partition(c).and_then(|p| p.centroid.as_ref()).is_some());
    if !has_centroids {
        return cultures[0].clone();
    }

    let query_vec = match ctx.embedder.encode(&[query.to_string()]) {
        Ok(mut rows) if !rows.is_empty() => rows.remove(0),
        Ok(_) => return cultures[0].clone(),
        Err(e) => {
            warn!(%e, "query encoding failed during routing; using first culture");
            return cultures[0].clone();
        }
    };

    // Centroids are raw means while the query is unit length; the dot
    // product below is intentionally left on that mixed scale.
    let mut best = cultures[0].clone();
    let mut best_sim = f32::NEG_INFINITY;
    for culture in cultures {
        let Some(centroid) = ctx.partition(culture).and_then(|p| p.centroid.as_ref()) else {
            continue;
        };
        let sim: f32 = query_vec.iter().zip(centroid).map(|(a, b)| a * b).sum();
        if sim > best_sim {
            best_sim = sim;
            best = culture.clone();
        }
    }
    best
}
