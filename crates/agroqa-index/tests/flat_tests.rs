use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use agroqa_index::FlatIpIndex;

fn random_unit_vec(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim).map(|_| rng.gen::<f32>() - 0.5).collect();
    let n = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt() as f32;
    if n > 0.0 {
        for x in v.iter_mut() {
            *x /= n;
        }
    }
    v
}

#[test]
fn ranking_is_exact_and_scores_non_increasing() {
    let dim = 16;
    let mut rng = StdRng::seed_from_u64(42);
    let mut index = FlatIpIndex::new(dim);
    for i in 0..200 {
        index.add(i, &random_unit_vec(&mut rng, dim));
    }

    let q = random_unit_vec(&mut rng, dim);
    let hits = index.search(&q, 10);
    assert_eq!(hits.len(), 10);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score, "scores must be non-increasing");
    }
}

#[test]
fn ties_break_by_ascending_id() {
    let dim = 4;
    let v = vec![0.5f32; dim];
    let mut index = FlatIpIndex::new(dim);
    index.add(7, &v);
    index.add(2, &v);
    index.add(5, &v);

    let hits = index.search(&v, 3);
    let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![2, 5, 7]);
}

#[test]
fn pads_with_negative_sentinel_when_short() {
    let dim = 4;
    let mut index = FlatIpIndex::new(dim);
    index.add(0, &[1.0, 0.0, 0.0, 0.0]);
    index.add(1, &[0.0, 1.0, 0.0, 0.0]);

    let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 5);
    assert_eq!(hits.len(), 5, "always exactly k slots");
    assert_eq!(hits[0].id, 0);
    assert!(hits[2..].iter().all(|h| h.id == -1), "missing matches carry the -1 sentinel");
}

#[test]
fn save_load_roundtrip_preserves_ranking() {
    let dim = 8;
    let mut rng = StdRng::seed_from_u64(7);
    let mut index = FlatIpIndex::new(dim);
    for i in 0..50 {
        index.add(i, &random_unit_vec(&mut rng, dim));
    }

    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("abacaxi.idx");
    index.save(&path).expect("save");
    let loaded = FlatIpIndex::load(&path).expect("load");

    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.dim(), index.dim());
    let q = random_unit_vec(&mut rng, dim);
    assert_eq!(index.search(&q, 10), loaded.search(&q, 10));
}
