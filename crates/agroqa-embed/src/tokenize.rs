use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Pads or truncates every text to `max_len` and returns `[B, max_len]`
/// token-id and attention-mask tensors.
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let mut all_ids = Vec::with_capacity(texts.len());
    let mut all_masks = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer
            .encode(text.as_str(), true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > max_len {
            ids.truncate(max_len);
            mask.truncate(max_len);
        }
        if ids.len() < max_len {
            let pad = max_len - ids.len();
            ids.extend(std::iter::repeat(0u32).take(pad));
            mask.extend(std::iter::repeat(0u32).take(pad));
        }
        all_ids.push(Tensor::from_iter(ids, device)?);
        all_masks.push(Tensor::from_iter(mask, device)?);
    }
    Ok((Tensor::stack(&all_ids, 0)?, Tensor::stack(&all_masks, 0)?))
}
