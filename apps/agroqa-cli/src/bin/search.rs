use std::env;

use agroqa_core::config::Settings;
use agroqa_embed::default_embedder;
use agroqa_index::{load_system, search_top_k};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [k] [culture]", args[0]);
        eprintln!("Example: {} 'como plantar abacaxi?' 5 abacaxi", args[0]);
        std::process::exit(1);
    }
    let query = &args[1];
    let k: i64 = args.get(2).and_then(|v| v.parse().ok()).unwrap_or(0);
    let culture = args.get(3).map(String::as_str);

    let settings = Settings::load()?;
    let embedder = default_embedder(&settings.model)?;
    let ctx = load_system(&settings, embedder)?;

    let results = search_top_k(&ctx, query, k, culture);
    println!("\nFound {} results for: \"{}\"", results.len(), query);
    for r in &results {
        println!(
            "\n  {}. score={:.4}  id={}  culture={}",
            r.rank, r.score, r.meta.external_id, r.culture
        );
        println!("     Q: {}", r.meta.question);
        println!("     A: {}", r.meta.answer);
    }
    Ok(())
}
