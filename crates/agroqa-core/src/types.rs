//! Domain types shared by the build, search and evaluation paths.

use serde::{Deserialize, Serialize};

/// Metadata persisted for one Q&A record. The embedding is never stored
/// here; it lives only inside the per-culture index file.
///
/// `external_id` is carried verbatim from the corpus bulk action and is the
/// only identifier that survives a rebuild. Internal ids are positional
/// (0..N-1 in load order), reassigned on every build generation, and must
/// never be persisted outside the build's own artifact pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub external_id: String,
    pub question_number: Option<i64>,
    pub question: String,
    pub answer: String,
    pub chapter: Option<String>,
    pub book: Option<String>,
    pub book_id: Option<String>,
    pub pdf: Option<String>,
    pub epub: Option<String>,
    pub year: Option<String>,
}

/// A loaded corpus record: metadata plus the text the encoder consumes.
#[derive(Debug, Clone)]
pub struct Document {
    pub meta: DocumentMeta,
    /// Trimmed `question + "\n" + answer`.
    pub text: String,
}

/// One ranked hit assembled by the searcher.
///
/// Within a result list `rank` is 1-based and strictly increasing, and
/// `score` (inner product, higher is closer) is non-increasing with rank.
/// `culture` names the partition that was actually searched.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub internal_id: i64,
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub score: f32,
    pub rank: usize,
    pub culture: String,
}

/// A relevance judgment for one query, curated by hand or produced by the
/// annotator. Serialized field names match the ground-truth file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthEntry {
    pub query: String,
    #[serde(rename = "relevantes")]
    pub relevant: Vec<String>,
    #[serde(rename = "cultura", default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
}
