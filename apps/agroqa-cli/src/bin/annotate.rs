use agroqa_annotate::{annotate_queries, load_queries, write_artifacts};
use agroqa_core::config::Settings;
use agroqa_embed::default_embedder;
use agroqa_index::load_system;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;
    let embedder = default_embedder(&settings.model)?;
    let ctx = load_system(&settings, embedder)?;

    let queries = load_queries(&settings.annotate.queries_path)?;
    println!(
        "Annotating {} queries (judge enabled: {}, concurrency: {})",
        queries.len(),
        settings.judge.enabled,
        settings.judge.concurrency
    );

    let (ground_truth, debug_rows) = tokio::runtime::Runtime::new()?
        .block_on(annotate_queries(&ctx, &settings.judge, &queries))?;

    write_artifacts(
        &settings.annotate.output_path,
        &settings.annotate.debug_path,
        &ground_truth,
        &debug_rows,
    )?;
    println!("Ground truth written to: {}", settings.annotate.output_path.display());
    println!("Debug trace written to:  {}", settings.annotate.debug_path.display());
    Ok(())
}
