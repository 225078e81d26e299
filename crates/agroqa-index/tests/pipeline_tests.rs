use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use agroqa_core::config::Settings;
use agroqa_core::traits::Embedder;
use agroqa_embed::HashedEmbedder;
use agroqa_index::{build_indices, load_system, route_culture, search_top_k};

const DIM: usize = 64;

fn test_settings(root: &Path, cultures: &[&str]) -> Settings {
    let mut settings = Settings::default();
    settings.corpus_dir = root.join("bulk");
    settings.index_dir = root.join("indices");
    settings.cultures = cultures.iter().map(|c| c.to_string()).collect();
    settings.model.dim = DIM;
    settings
}

fn write_corpus(path: &Path, docs: &[(&str, &str, &str)]) {
    let mut body = String::new();
    for (id, question, answer) in docs {
        body.push_str(&serde_json::json!({"index": {"_id": id}}).to_string());
        body.push('\n');
        body.push_str(&serde_json::json!({"question": question, "answer": answer}).to_string());
        body.push('\n');
    }
    fs::write(path, body).expect("write corpus");
}

fn abacaxi_docs() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        (
            "qa-1",
            "Como reconhecer a fusariose?",
            "Pela exsudacao de resina nos tecidos atacados.",
        ),
        (
            "qa-2",
            "Qual espacamento usar no plantio do abacaxizeiro?",
            "Fileiras duplas de 90 x 40 cm favorecem o manejo.",
        ),
        (
            "qa-3",
            "Quando colher os frutos maduros?",
            "No estadio de vez, com casca verde-clara.",
        ),
    ]
}

fn build_single_culture(root: &Path) -> Settings {
    let settings = test_settings(root, &["abacaxi"]);
    fs::create_dir_all(&settings.corpus_dir).expect("mkdir bulk");
    write_corpus(&settings.corpus_path("abacaxi"), &abacaxi_docs());
    let embedder = HashedEmbedder::new(DIM);
    build_indices(&settings, &embedder).expect("build");
    settings
}

struct CountingEmbedder {
    inner: HashedEmbedder,
    calls: Arc<AtomicUsize>,
}

impl Embedder for CountingEmbedder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn encode(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(texts)
    }
}

#[test]
fn end_to_end_build_then_self_query() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = build_single_culture(tmp.path());
    let ctx = load_system(&settings, Box::new(HashedEmbedder::new(DIM))).expect("load");

    let results = search_top_k(
        &ctx,
        "Qual espacamento usar no plantio do abacaxizeiro?",
        1,
        None,
    );
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].meta.external_id, "qa-2");
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[0].culture, "abacaxi");

    // Querying with a document's full encoded text is self-similarity:
    // the score must sit at the encoder's maximum.
    let full_text = "Qual espacamento usar no plantio do abacaxizeiro?\nFileiras duplas de 90 x 40 cm favorecem o manejo.";
    let exact = search_top_k(&ctx, full_text, 1, None);
    assert_eq!(exact[0].meta.external_id, "qa-2");
    assert!(exact[0].score > 0.999, "self-similarity score was {}", exact[0].score);
}

#[test]
fn ranks_are_one_based_and_scores_non_increasing() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = build_single_culture(tmp.path());
    let ctx = load_system(&settings, Box::new(HashedEmbedder::new(DIM))).expect("load");

    let results = search_top_k(&ctx, "abacaxizeiro plantio colher fusariose", 10, None);
    assert_eq!(results.len(), 3, "only three documents exist; sentinels are dropped");
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.rank, i + 1);
    }
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn non_positive_k_uses_the_default() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = build_single_culture(tmp.path());
    let ctx = load_system(&settings, Box::new(HashedEmbedder::new(DIM))).expect("load");

    let query = "Como reconhecer a fusariose?";
    let with_default: Vec<String> = search_top_k(&ctx, query, settings.search.default_k as i64, None)
        .into_iter()
        .map(|r| r.meta.external_id)
        .collect();
    let with_zero: Vec<String> = search_top_k(&ctx, query, 0, None)
        .into_iter()
        .map(|r| r.meta.external_id)
        .collect();
    let with_negative: Vec<String> = search_top_k(&ctx, query, -3, None)
        .into_iter()
        .map(|r| r.meta.external_id)
        .collect();

    assert_eq!(with_zero, with_default);
    assert_eq!(with_negative, with_default);
}

#[test]
fn blank_query_returns_empty_list() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = build_single_culture(tmp.path());
    let ctx = load_system(&settings, Box::new(HashedEmbedder::new(DIM))).expect("load");

    assert!(search_top_k(&ctx, "   ", 5, None).is_empty());
}

#[test]
fn identical_searches_are_deterministic() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = build_single_culture(tmp.path());
    let ctx = load_system(&settings, Box::new(HashedEmbedder::new(DIM))).expect("load");

    let a = search_top_k(&ctx, "colher frutos maduros", 3, None);
    let b = search_top_k(&ctx, "colher frutos maduros", 3, None);
    let ids_a: Vec<&str> = a.iter().map(|r| r.meta.external_id.as_str()).collect();
    let ids_b: Vec<&str> = b.iter().map(|r| r.meta.external_id.as_str()).collect();
    assert_eq!(ids_a, ids_b);
    for (ra, rb) in a.iter().zip(b.iter()) {
        assert_eq!(ra.score, rb.score);
        assert_eq!(ra.rank, rb.rank);
    }
}

#[test]
fn missing_index_artifact_is_fatal_and_names_the_path() {
    let tmp = TempDir::new().expect("tempdir");
    let mut settings = build_single_culture(tmp.path());
    // A second culture is configured but was never built.
    settings.cultures.push("banana".to_string());

    let err = load_system(&settings, Box::new(HashedEmbedder::new(DIM)))
        .err()
        .expect("must fail");
    let msg = err.to_string();
    assert!(msg.contains("banana.idx"), "error must name the missing file: {msg}");
    assert!(msg.contains("agroqa-build"), "error must point at the rebuild action: {msg}");
}

#[test]
fn single_partition_routing_never_touches_the_encoder() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = build_single_culture(tmp.path());

    let calls = Arc::new(AtomicUsize::new(0));
    let embedder = CountingEmbedder {
        inner: HashedEmbedder::new(DIM),
        calls: Arc::clone(&calls),
    };
    let ctx = load_system(&settings, Box::new(embedder)).expect("load");

    let culture = route_culture(&ctx, "qualquer pergunta", None);
    assert_eq!(culture, "abacaxi");
    assert_eq!(calls.load(Ordering::SeqCst), 0, "routing must skip encoding");
}

#[test]
fn multi_culture_routing_by_centroid_and_explicit_override() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = test_settings(tmp.path(), &["abacaxi", "banana"]);
    fs::create_dir_all(&settings.corpus_dir).expect("mkdir bulk");
    write_corpus(&settings.corpus_path("abacaxi"), &abacaxi_docs());
    write_corpus(
        &settings.corpus_path("banana"),
        &[
            ("bn-1", "Como evitar a sigatoka negra?", "Com drenagem e desfolha sanitaria."),
            ("bn-2", "Qual irrigacao para bananal?", "Turnos curtos em solos arenosos."),
        ],
    );
    let embedder = HashedEmbedder::new(DIM);
    build_indices(&settings, &embedder).expect("build");
    let ctx = load_system(&settings, Box::new(HashedEmbedder::new(DIM))).expect("load");

    let query = "evitar sigatoka drenagem desfolha irrigacao para bananal em solos";
    let auto = search_top_k(&ctx, query, 2, None);
    assert!(!auto.is_empty());
    assert_eq!(auto[0].culture, "banana", "centroid routing must pick the banana partition");

    let explicit = search_top_k(&ctx, query, 2, Some("abacaxi"));
    assert!(explicit.iter().all(|r| r.culture == "abacaxi"));

    // An explicit culture that is not loaded falls back to auto-routing.
    let unknown = search_top_k(&ctx, query, 2, Some("manga"));
    assert_eq!(unknown[0].culture, "banana");
}

#[test]
fn centroids_are_stored_as_raw_means() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = build_single_culture(tmp.path());

    let raw = fs::read_to_string(settings.centroids_path()).expect("read centroids");
    let map: std::collections::HashMap<String, Vec<f32>> =
        serde_json::from_str(&raw).expect("parse centroids");
    let centroid = &map["abacaxi"];
    assert_eq!(centroid.len(), DIM);

    let norm: f32 = centroid.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!(
        norm < 0.999,
        "the mean of distinct unit vectors must not be re-normalized (norm={norm})"
    );
}

#[test]
fn ids_without_metadata_are_dropped_silently() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = build_single_culture(tmp.path());

    // Corrupt the metadata map: remove internal id 0.
    let docs_path = settings.docs_path("abacaxi");
    let mut map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&docs_path).expect("read docs")).expect("parse");
    map.remove("0");
    fs::write(&docs_path, serde_json::Value::Object(map).to_string()).expect("rewrite docs");

    let ctx = load_system(&settings, Box::new(HashedEmbedder::new(DIM))).expect("load");
    let results = search_top_k(&ctx, "abacaxizeiro plantio colher fusariose", 10, None);
    assert_eq!(results.len(), 2, "the unjoinable id disappears from results");
    assert!(results.iter().all(|r| r.meta.external_id != "qa-1"));
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[1].rank, 2);
}
