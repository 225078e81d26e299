//! Ground-truth generation over a batch of unlabeled queries.
//!
//! Retrieval and filtering run synchronously up front; judge calls then go
//! through a bounded-width, order-preserving pool. Whatever happens to the
//! judge, a query with candidates never ends up with an empty relevance
//! set: the fallback takes the top filtered (or raw) candidates.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use agroqa_core::config::JudgeSettings;
use agroqa_core::error::Error;
use agroqa_core::types::{GroundTruthEntry, SearchResult};
use agroqa_index::{search_top_k, SystemContext};

use crate::filter::{relevant_excerpt, rule_filter};
use crate::judge::{CandidateItem, JudgeClient};

/// Per-query audit record written next to the ground-truth file.
#[derive(Debug, Serialize)]
pub struct DebugRow {
    pub query: String,
    pub top10_ids: Vec<String>,
    pub filtered_top20_ids: Vec<String>,
    pub relevantes: Vec<String>,
    pub judge_used: bool,
    pub candidate_count: usize,
    pub filtered_count: usize,
}

struct Prepared {
    query: String,
    candidates: Vec<SearchResult>,
    filtered: Vec<SearchResult>,
}

/// Reads the annotation input: a JSON array of raw query strings.
pub fn load_queries(path: &Path) -> std::result::Result<Vec<String>, Error> {
    let raw = fs::read_to_string(path).map_err(|e| Error::DataFormat {
        path: path.to_path_buf(),
        reason: format!("cannot read queries: {e}"),
    })?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&raw).map_err(|e| Error::DataFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut queries = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        match value {
            serde_json::Value::String(s) => queries.push(s),
            other => {
                return Err(Error::DataFormat {
                    path: path.to_path_buf(),
                    reason: format!("item {i}: expected a string, found {other}"),
                })
            }
        }
    }
    Ok(queries)
}

/// Annotates a batch of queries against the loaded system.
pub async fn annotate_queries(
    ctx: &SystemContext,
    settings: &JudgeSettings,
    queries: &[String],
) -> Result<(Vec<GroundTruthEntry>, Vec<DebugRow>)> {
    // Retrieval is culture-agnostic here: routing picks the partition.
    let mut prepared = Vec::new();
    for raw in queries {
        let query = raw.trim().to_string();
        if query.is_empty() {
            continue;
        }
        let candidates = search_top_k(ctx, &query, settings.fan_out as i64, None);
        let filtered = rule_filter(&query, &candidates);
        prepared.push(Prepared {
            query,
            candidates,
            filtered,
        });
    }

    let judged: Vec<Option<Vec<String>>> = if settings.enabled {
        let client = JudgeClient::new(settings)?;
        let pb = ProgressBar::new(prepared.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} queries")
                .expect("progress template")
                .progress_chars("#>-"),
        );
        let rows = stream::iter(prepared.iter())
            .map(|p| {
                let client = &client;
                let pb = &pb;
                async move {
                    let out = judge_with_retry(client, settings, p).await;
                    pb.inc(1);
                    out
                }
            })
            .buffered(settings.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        pb.finish_and_clear();
        rows
    } else {
        prepared.iter().map(|_| None).collect()
    };

    let mut ground_truth = Vec::new();
    let mut debug_rows = Vec::new();
    for (p, judge_ids) in prepared.iter().zip(judged) {
        if p.candidates.is_empty() {
            ground_truth.push(GroundTruthEntry {
                query: p.query.clone(),
                relevant: Vec::new(),
                culture: None,
            });
            debug_rows.push(DebugRow {
                query: p.query.clone(),
                top10_ids: Vec::new(),
                filtered_top20_ids: Vec::new(),
                relevantes: Vec::new(),
                judge_used: settings.enabled,
                candidate_count: 0,
                filtered_count: 0,
            });
            continue;
        }

        let mut relevant = match judge_ids {
            Some(ids) => ids,
            // Judge disabled: the filtered head stands in for a judgment.
            None => head_ids(&p.filtered, settings.max_relevant),
        };
        // A non-empty candidate set never yields an empty judgment.
        if relevant.is_empty() {
            let base = if p.filtered.is_empty() {
                &p.candidates
            } else {
                &p.filtered
            };
            relevant = head_ids(base, 3);
        }

        debug_rows.push(DebugRow {
            query: p.query.clone(),
            top10_ids: head_ids(&p.candidates, 10),
            filtered_top20_ids: head_ids(&p.filtered, 20),
            relevantes: relevant.clone(),
            judge_used: settings.enabled,
            candidate_count: p.candidates.len(),
            filtered_count: p.filtered.len(),
        });
        ground_truth.push(GroundTruthEntry {
            query: p.query.clone(),
            relevant,
            culture: None,
        });
    }

    Ok((ground_truth, debug_rows))
}

async fn judge_with_retry(
    client: &JudgeClient,
    settings: &JudgeSettings,
    p: &Prepared,
) -> Option<Vec<String>> {
    let items = candidate_items(&p.query, &p.filtered, settings.excerpt_limit);
    let mut attempt = 0;
    loop {
        match client.judge(&p.query, &items).await {
            Ok(ids) => return Some(ids),
            Err(e) if attempt < settings.max_retries => {
                attempt += 1;
                warn!(query = %p.query, %e, attempt, "judge call failed, retrying");
            }
            Err(e) => {
                // Skip: the per-query fallback takes over downstream.
                warn!(query = %p.query, %e, "judge unavailable for this query");
                return Some(Vec::new());
            }
        }
    }
}

fn candidate_items(query: &str, filtered: &[SearchResult], limit: usize) -> Vec<CandidateItem> {
    filtered
        .iter()
        .filter(|r| !r.meta.external_id.trim().is_empty())
        .map(|r| CandidateItem {
            doc_id: r.meta.external_id.clone(),
            question: r.meta.question.trim().to_string(),
            answer: relevant_excerpt(query, &r.meta.answer, limit),
        })
        .collect()
}

fn head_ids(results: &[SearchResult], n: usize) -> Vec<String> {
    results
        .iter()
        .map(|r| r.meta.external_id.trim().to_string())
        .filter(|id| !id.is_empty())
        .take(n)
        .collect()
}

/// Writes the ground-truth file and its debug trace.
pub fn write_artifacts(
    output_path: &Path,
    debug_path: &Path,
    ground_truth: &[GroundTruthEntry],
    debug_rows: &[DebugRow],
) -> Result<()> {
    for path in [output_path, debug_path] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(output_path, serde_json::to_string_pretty(ground_truth)?)
        .with_context(|| format!("writing {}", output_path.display()))?;
    fs::write(debug_path, serde_json::to_string_pretty(debug_rows)?)
        .with_context(|| format!("writing {}", debug_path.display()))?;
    info!(
        ground_truth = %output_path.display(),
        debug = %debug_path.display(),
        entries = ground_truth.len(),
        "annotation artifacts written"
    );
    Ok(())
}
