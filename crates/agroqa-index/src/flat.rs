//! Exact inner-product index with explicit ids.
//!
//! The search contract here is exact ranking over stable integer ids with a
//! restartable rebuild; a flat row-major scan satisfies it. Results are
//! padded to `k` with the id `-1` sentinel when the partition holds fewer
//! vectors, which callers are required to discard.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use agroqa_core::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub id: i64,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlatIpIndex {
    dim: usize,
    ids: Vec<i64>,
    vectors: Vec<f32>, // concatenated rows of length `dim`
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn add(&mut self, id: i64, v: &[f32]) {
        assert_eq!(v.len(), self.dim);
        self.ids.push(id);
        self.vectors.extend_from_slice(v);
    }

    #[inline]
    fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// Exact top-k by inner product: score desc, ties by ascending id.
    /// Always returns exactly `k` hits; empty slots carry `id: -1`.
    pub fn search(&self, q: &[f32], k: usize) -> Vec<Hit> {
        assert_eq!(q.len(), self.dim);
        let mut hits: Vec<Hit> = (0..self.len())
            .map(|i| Hit {
                id: self.ids[i],
                score: dot(q, self.row(i)),
            })
            .collect();
        hits.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            std::cmp::Ordering::Equal => a.id.cmp(&b.id),
            ord => ord,
        });
        hits.truncate(k);
        while hits.len() < k {
            hits.push(Hit {
                id: -1,
                score: f32::NEG_INFINITY,
            });
        }
        hits
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::DataFormat {
            path: path.to_path_buf(),
            reason: format!("cannot create index file: {e}"),
        })?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|e| Error::DataFormat {
            path: path.to_path_buf(),
            reason: format!("cannot serialize index: {e}"),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::DataFormat {
            path: path.to_path_buf(),
            reason: format!("cannot open index file: {e}"),
        })?;
        bincode::deserialize_from(BufReader::new(file)).map_err(|e| Error::DataFormat {
            path: path.to_path_buf(),
            reason: format!("cannot deserialize index: {e}"),
        })
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
