/// Batch text-to-vector encoder.
///
/// Implementations must be deterministic for a fixed model and must return
/// one L2-unit row of length `dim()` per input text.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn encode(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
