use anyhow::Result;
use candle_core::Tensor;

/// Mean-pools `[B,T,H]` hidden states under the attention mask and returns
/// unit-L2 rows `[B,H]`.
pub fn masked_mean_unit(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    anyhow::ensure!(dims.len() == 3, "hidden shape must be [B,T,H]");

    let mask = attention_mask.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_b = mask_3d.broadcast_as(hidden.shape())?;
    let masked = (hidden * &mask_b)?;
    let sum = masked.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?;
    let mean = sum.broadcast_div(&lengths)?;
    l2_unit(&mean)
}

/// Row-normalizes `[B,H]` to unit length. The epsilon keeps degenerate
/// all-zero rows finite instead of dividing by zero.
pub fn l2_unit(rows: &Tensor) -> Result<Tensor> {
    let norm = rows.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norm = (norm + 1e-12)?;
    Ok(rows.broadcast_div(&norm)?)
}
