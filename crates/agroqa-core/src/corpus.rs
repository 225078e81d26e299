//! Bulk corpus reader.
//!
//! One corpus file per culture, newline-delimited JSON in strictly
//! alternating pairs: an index-action line (`{"index": {"_id": ...}}`)
//! followed by a data line carrying the Q&A record. Blank lines are
//! ignored. Any structural violation is fatal at load time.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Document, DocumentMeta};

#[derive(Deserialize)]
struct IndexLine {
    index: IndexAction,
}

#[derive(Deserialize)]
struct IndexAction {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Default, Deserialize)]
struct DataLine {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    question_number: Option<i64>,
    #[serde(default)]
    chapter: Option<String>,
    #[serde(default)]
    book: Option<String>,
    #[serde(default)]
    book_id: Option<String>,
    #[serde(default)]
    pdf: Option<String>,
    #[serde(default)]
    epub: Option<String>,
    // The source corpus carries `year` sometimes as a number, sometimes as
    // a string; normalized to `Option<String>` below.
    #[serde(default)]
    year: Option<Value>,
}

fn year_string(v: Option<Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn bad_line(path: &Path, nth: usize, err: &serde_json::Error) -> Error {
    Error::DataFormat {
        path: path.to_path_buf(),
        reason: format!("non-blank line {}: {err}", nth + 1),
    }
}

/// Parses a bulk file into documents, assigning no ids: internal ids are
/// positional and belong to the build step.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::DataFormat {
        path: path.to_path_buf(),
        reason: format!("cannot read corpus: {e}"),
    })?;

    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() % 2 != 0 {
        return Err(Error::DataFormat {
            path: path.to_path_buf(),
            reason: format!(
                "expected index/data line pairs, found {} non-blank lines",
                lines.len()
            ),
        });
    }

    let mut docs = Vec::with_capacity(lines.len() / 2);
    for (pair, chunk) in lines.chunks(2).enumerate() {
        let action: IndexLine =
            serde_json::from_str(chunk[0]).map_err(|e| bad_line(path, pair * 2, &e))?;
        let data: DataLine =
            serde_json::from_str(chunk[1]).map_err(|e| bad_line(path, pair * 2 + 1, &e))?;

        let text = format!("{}\n{}", data.question, data.answer)
            .trim()
            .to_string();
        docs.push(Document {
            meta: DocumentMeta {
                external_id: action.index.id,
                question_number: data.question_number,
                question: data.question,
                answer: data.answer,
                chapter: data.chapter,
                book: data.book,
                book_id: data.book_id,
                pdf: data.pdf,
                epub: data.epub,
                year: year_string(data.year),
            },
            text,
        });
    }
    Ok(docs)
}
