use std::fs;
use tempfile::TempDir;

use agroqa_core::config::discover_cultures;
use agroqa_core::corpus::load_corpus;
use agroqa_core::error::Error;

fn write_bulk(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write bulk");
    path
}

#[test]
fn parses_alternating_pairs() {
    let tmp = TempDir::new().expect("tempdir");
    let path = write_bulk(
        tmp.path(),
        "bulk-abacaxi.json",
        concat!(
            "{\"index\": {\"_id\": \"qa-1\"}}\n",
            "{\"question\": \"Como plantar?\", \"answer\": \"Em solo leve.\", \"year\": 2020}\n",
            "\n",
            "{\"index\": {\"_id\": \"qa-2\"}}\n",
            "{\"question\": \"Quando colher?\", \"answer\": \"No ponto de vez.\", \"year\": \"2021\", \"book\": \"Manual\"}\n",
        ),
    );

    let docs = load_corpus(&path).expect("load");
    assert_eq!(docs.len(), 2);

    assert_eq!(docs[0].meta.external_id, "qa-1");
    assert_eq!(docs[0].text, "Como plantar?\nEm solo leve.");
    assert_eq!(docs[0].meta.year.as_deref(), Some("2020"), "numeric year is stringified");
    assert!(docs[0].meta.book.is_none());

    assert_eq!(docs[1].meta.external_id, "qa-2");
    assert_eq!(docs[1].meta.year.as_deref(), Some("2021"));
    assert_eq!(docs[1].meta.book.as_deref(), Some("Manual"));
}

#[test]
fn trims_concatenated_text() {
    let tmp = TempDir::new().expect("tempdir");
    let path = write_bulk(
        tmp.path(),
        "bulk-x.json",
        "{\"index\": {\"_id\": \"a\"}}\n{\"question\": \"\", \"answer\": \"so a resposta\"}\n",
    );

    let docs = load_corpus(&path).expect("load");
    // Leading newline from the empty question must not survive.
    assert_eq!(docs[0].text, "so a resposta");
}

#[test]
fn odd_line_count_is_a_data_format_error() {
    let tmp = TempDir::new().expect("tempdir");
    let path = write_bulk(
        tmp.path(),
        "bulk-x.json",
        "{\"index\": {\"_id\": \"a\"}}\n{\"question\": \"q\", \"answer\": \"a\"}\n{\"index\": {\"_id\": \"b\"}}\n",
    );

    match load_corpus(&path) {
        Err(Error::DataFormat { reason, .. }) => {
            assert!(reason.contains("3 non-blank lines"), "got: {reason}")
        }
        other => panic!("expected DataFormat, got {other:?}"),
    }
}

#[test]
fn malformed_json_line_is_fatal_and_identified() {
    let tmp = TempDir::new().expect("tempdir");
    let path = write_bulk(
        tmp.path(),
        "bulk-x.json",
        "{\"index\": {\"_id\": \"a\"}}\nnot json at all\n",
    );

    match load_corpus(&path) {
        Err(Error::DataFormat { reason, .. }) => {
            assert!(reason.starts_with("non-blank line 2"), "got: {reason}")
        }
        other => panic!("expected DataFormat, got {other:?}"),
    }
}

#[test]
fn missing_corpus_file_is_fatal() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("bulk-nope.json");
    assert!(matches!(load_corpus(&path), Err(Error::DataFormat { .. })));
}

#[test]
fn discovers_cultures_from_bulk_files() {
    let tmp = TempDir::new().expect("tempdir");
    write_bulk(tmp.path(), "bulk-abacaxi.json", "");
    write_bulk(tmp.path(), "bulk-banana.json", "");
    write_bulk(tmp.path(), "notes.txt", "");

    assert_eq!(discover_cultures(tmp.path()), vec!["abacaxi", "banana"]);
}
