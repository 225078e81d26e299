//! Ground-truth annotation: wide culture-agnostic retrieval, rule-based
//! filtering, external relevance judging, and auditable output artifacts.

pub mod annotator;
pub mod filter;
pub mod judge;

pub use annotator::{annotate_queries, load_queries, write_artifacts, DebugRow};
pub use filter::{relevant_excerpt, rule_filter, strip_html};
pub use judge::{parse_judge_reply, CandidateItem, JudgeClient, JudgeError};
