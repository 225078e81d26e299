use agroqa_core::config::Settings;
use agroqa_embed::default_embedder;
use agroqa_eval::{evaluate, load_ground_truth, print_report};
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

    let entries = load_ground_truth(&settings.eval.ground_truth_path)?;
    println!(
        "Evaluating {} ground-truth entries with k = {:?}",
        entries.len(),
        settings.eval.k_values
    );

    let recall = evaluate(&ctx, &entries, &settings.eval.k_values)?;
    print_report(&recall);
    Ok(())
}
