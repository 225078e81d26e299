//! Relevance judging through an ollama-style chat endpoint.
//!
//! The judge is an untrusted collaborator: its reply may carry reasoning
//! markup or arbitrary prose. `parse_judge_reply` implements the strict
//! reply grammar; every failure mode is a typed [`JudgeError`] so callers
//! can tell "the judge said nothing is relevant" from "the judge broke".

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use agroqa_core::config::JudgeSettings;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge call failed: {0}")]
    Http(String),
    #[error("judge reply did not match the expected grammar: {0}")]
    Parse(String),
}

/// One candidate as presented to the judge.
#[derive(Debug, Serialize)]
pub struct CandidateItem {
    pub doc_id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<AssistantMessage>,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct JudgeClient {
    http: Client,
    url: String,
    model: String,
    max_relevant: usize,
}

impl JudgeClient {
    pub fn new(settings: &JudgeSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: settings.url.clone(),
            model: settings.model.clone(),
            max_relevant: settings.max_relevant,
        })
    }

    /// Judges one query: returns the ids of directly relevant candidates,
    /// deduplicated in first-appearance order and capped at the configured
    /// maximum. An empty candidate list short-circuits without a call.
    pub async fn judge(
        &self,
        query: &str,
        candidates: &[CandidateItem],
    ) -> Result<Vec<String>, JudgeError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(query, candidates),
                },
            ],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| JudgeError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| JudgeError::Http(e.to_string()))?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::Http(e.to_string()))?;
        let raw = body.message.and_then(|m| m.content).unwrap_or_default();

        let ids = parse_judge_reply(&raw)?;
        Ok(dedupe_capped(ids, self.max_relevant))
    }

    fn system_prompt(&self) -> String {
        format!(
            "Você é um avaliador de relevância para recuperação de Q&A agrícola.\n\
             Marque como RELEVANTE somente itens que respondem diretamente à query.\n\
             Se a query pedir parâmetro numérico (ex.: espaçamento), só marque itens com valores explícitos.\n\
             Retorne no máximo {} doc_id.\n\
             Responda APENAS com um bloco <json>...</json> contendo JSON válido.\n\
             NÃO escreva nada fora do <json>.\n\
             Formato: <json>{{\"relevantes\": [\"doc_id\", ...]}}</json>\n",
            self.max_relevant
        )
    }
}

fn user_prompt(query: &str, candidates: &[CandidateItem]) -> String {
    let payload = serde_json::json!({ "query": query, "candidates": candidates });
    format!("ENTRADA (JSON):\n{payload}\n\nRETORNE SOMENTE:\n<json>{{\"relevantes\": []}}</json>")
}

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"));
static JSON_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<json>\s*(.*?)\s*</json>").expect("valid regex"));

#[derive(Deserialize)]
struct JudgeReply {
    relevantes: Vec<String>,
}

/// Strict reply grammar: after stripping `<think>` reasoning blocks the
/// text must contain exactly one `<json>…</json>` block whose body is
/// `{"relevantes": [string, …]}`. Anything else is a parse failure — a
/// different outcome from a valid empty list.
pub fn parse_judge_reply(raw: &str) -> Result<Vec<String>, JudgeError> {
    let cleaned = THINK_RE.replace_all(raw, "");
    let mut blocks = JSON_BLOCK_RE.captures_iter(&cleaned);
    let Some(first) = blocks.next() else {
        return Err(JudgeError::Parse("no <json> block".to_string()));
    };
    if blocks.next().is_some() {
        return Err(JudgeError::Parse("more than one <json> block".to_string()));
    }

    let body = first.get(1).map(|m| m.as_str()).unwrap_or_default();
    let reply: JudgeReply =
        serde_json::from_str(body).map_err(|e| JudgeError::Parse(format!("invalid payload: {e}")))?;
    Ok(reply.relevantes)
}

fn dedupe_capped(ids: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        let id = id.trim().to_string();
        if id.is_empty() || !seen.insert(id.clone()) {
            continue;
        }
        out.push(id);
        if out.len() >= cap {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_fenced_block() {
        let raw = "<json>{\"relevantes\": [\"qa-1\", \"qa-9\"]}</json>";
        assert_eq!(parse_judge_reply(raw).expect("parse"), vec!["qa-1", "qa-9"]);
    }

    #[test]
    fn strips_reasoning_markup_before_parsing() {
        let raw = "<think>qa-7 parece bom...\n</think>\n<json>{\"relevantes\": [\"qa-7\"]}</json>";
        assert_eq!(parse_judge_reply(raw).expect("parse"), vec!["qa-7"]);
    }

    #[test]
    fn missing_block_is_a_parse_failure_not_an_empty_list() {
        let raw = "{\"relevantes\": [\"qa-1\"]}";
        assert!(matches!(parse_judge_reply(raw), Err(JudgeError::Parse(_))));
    }

    #[test]
    fn multiple_blocks_violate_the_grammar() {
        let raw = "<json>{\"relevantes\": []}</json><json>{\"relevantes\": [\"x\"]}</json>";
        assert!(matches!(parse_judge_reply(raw), Err(JudgeError::Parse(_))));
    }

    #[test]
    fn non_string_ids_violate_the_schema() {
        let raw = "<json>{\"relevantes\": [\"qa-1\", 7]}</json>";
        assert!(matches!(parse_judge_reply(raw), Err(JudgeError::Parse(_))));
    }

    #[test]
    fn valid_empty_list_is_ok() {
        let raw = "<json>{\"relevantes\": []}</json>";
        assert_eq!(parse_judge_reply(raw).expect("parse"), Vec::<String>::new());
    }

    #[test]
    fn dedupes_in_first_appearance_order_and_caps() {
        let ids: Vec<String> = ["a", "b", "a", "c", "b", "d", "e", "f", "g", "h", "i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = dedupe_capped(ids, 8);
        assert_eq!(out, vec!["a", "b", "c", "d", "e", "f", "g", "h"]);
    }
}
