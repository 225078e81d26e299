use agroqa_core::config::Settings;
use agroqa_embed::default_embedder;
use agroqa_index::build_indices;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;
    println!("agroqa index build\n==================");
    println!("Corpus directory: {}", settings.corpus_dir.display());
    println!("Index directory:  {}", settings.index_dir.display());

    let embedder = default_embedder(&settings.model)?;
    build_indices(&settings, embedder.as_ref())?;

    println!("\nBuild finished. Serve or evaluate with the artifacts in {}", settings.index_dir.display());
    Ok(())
}
