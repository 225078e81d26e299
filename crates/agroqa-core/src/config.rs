//! Typed configuration loader.
//!
//! Merges `agroqa.toml` + `agroqa.<env>.toml` + `AGROQA_*` env vars via
//! Figment and extracts a single `Settings` value with serde defaults, so
//! every knob is validated once at startup rather than re-read ad hoc.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one `bulk-<culture>.json` per culture.
    pub corpus_dir: PathBuf,
    /// Directory where index artifacts are written and served from.
    pub index_dir: PathBuf,
    /// Cultures to build and serve, in routing-tiebreak order. Empty means
    /// discover from `corpus_dir`.
    pub cultures: Vec<String>,
    pub model: ModelSettings,
    pub search: SearchSettings,
    pub judge: JudgeSettings,
    pub annotate: AnnotateSettings,
    pub eval: EvalSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Local directory with tokenizer.json, config.json, model.safetensors.
    pub dir: PathBuf,
    pub dim: usize,
    pub max_seq_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    pub enabled: bool,
    /// Ollama-style chat endpoint (`/api/chat`, messages form).
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Hard cap on relevant ids per query.
    pub max_relevant: usize,
    /// Dense retrieval fan-out feeding the filter and the judge.
    pub fan_out: usize,
    /// Width of the judge call pool.
    pub concurrency: usize,
    /// Retries per judge call before skipping to the fallback.
    pub max_retries: u32,
    /// Per-candidate excerpt cap (chars) in the judge payload.
    pub excerpt_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnnotateSettings {
    /// JSON array of raw query strings to annotate.
    pub queries_path: PathBuf,
    pub output_path: PathBuf,
    pub debug_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    pub ground_truth_path: PathBuf,
    pub k_values: Vec<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("bulk"),
            index_dir: PathBuf::from("indices"),
            cultures: Vec::new(),
            model: ModelSettings::default(),
            search: SearchSettings::default(),
            judge: JudgeSettings::default(),
            annotate: AnnotateSettings::default(),
            eval: EvalSettings::default(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models/serafim-335m"),
            dim: 1024,
            max_seq_len: 256,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_k: 5 }
    }
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:11434/api/chat".to_string(),
            model: "qwen3:8b".to_string(),
            timeout_secs: 120,
            max_relevant: 8,
            fan_out: 30,
            concurrency: 4,
            max_retries: 0,
            excerpt_limit: 2500,
        }
    }
}

impl Default for AnnotateSettings {
    fn default() -> Self {
        Self {
            queries_path: PathBuf::from("data/annotation_queries.json"),
            output_path: PathBuf::from("data/ground_truth.json"),
            debug_path: PathBuf::from("data/ground_truth_debug.json"),
        }
    }
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            ground_truth_path: PathBuf::from("data/ground_truth.json"),
            k_values: vec![1, 3, 5, 10],
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("agroqa.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("agroqa.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("agroqa.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("agroqa.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("AGROQA_").split("__"));

        figment
            .extract()
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))
    }

    /// Configured cultures, or the ones discovered from `corpus_dir`.
    pub fn effective_cultures(&self) -> Vec<String> {
        if self.cultures.is_empty() {
            discover_cultures(&self.corpus_dir)
        } else {
            self.cultures.clone()
        }
    }

    pub fn corpus_path(&self, culture: &str) -> PathBuf {
        self.corpus_dir.join(format!("bulk-{culture}.json"))
    }

    pub fn index_path(&self, culture: &str) -> PathBuf {
        self.index_dir.join(format!("{culture}.idx"))
    }

    pub fn docs_path(&self, culture: &str) -> PathBuf {
        self.index_dir.join(format!("{culture}_docs.json"))
    }

    /// Single shared centroid file covering all cultures.
    pub fn centroids_path(&self) -> PathBuf {
        self.index_dir.join("centroids.json")
    }
}

/// Scans `corpus_dir` (one level) for `bulk-<culture>.json` files.
pub fn discover_cultures(corpus_dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    for entry in walkdir::WalkDir::new(corpus_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        if let Some(name) = entry.path().file_name().and_then(|s| s.to_str()) {
            if let Some(culture) = name
                .strip_prefix("bulk-")
                .and_then(|rest| rest.strip_suffix(".json"))
            {
                if !culture.is_empty() {
                    found.push(culture.to_string());
                }
            }
        }
    }
    found.sort();
    found
}

/// Resolve a possibly relative path against a base directory.
/// Absolute paths are returned as-is.
pub fn resolve_with_base(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
