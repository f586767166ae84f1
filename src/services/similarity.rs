//! Cosine similarity and linear nearest-neighbor scan.

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

/// Cosine of the angle between `a` and `b`, in `[-1, 1]`. A zero-norm operand
/// or a length mismatch scores exactly `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0) as f32
}

/// Index and score of the candidate most similar to `query`. Full scan; on equal
/// scores the lowest index wins. `None` when there are no candidates.
pub fn nearest_neighbor<'a, I>(query: &[f32], candidates: I) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut best: Option<(usize, f32)> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        let score = cosine_similarity(query, candidate);
        match best {
            Some((_, max)) if score <= max => {}
            _ => best = Some((index, score)),
        }
    }
    best
}

/// The `k` best candidates, highest score first, ties in index order.
pub fn top_k<'a, I>(query: &[f32], candidates: I, k: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scored: Vec<(usize, f32)> = candidates
        .into_iter()
        .map(|c| cosine_similarity(query, c))
        .enumerate()
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(vs: &[Vec<f32>]) -> impl Iterator<Item = &[f32]> {
        vs.iter().map(Vec::as_slice)
    }

    #[test]
    fn test_self_similarity() {
        let v = [0.3, -1.2, 4.0, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_norm_candidate() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_opposite_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_neighbor_example() {
        let candidates = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]];
        let (index, score) = nearest_neighbor(&[1.0, 0.0], refs(&candidates)).unwrap();
        assert_eq!(index, 0);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_neighbor_order_independent() {
        let mut candidates = vec![vec![0.0, 1.0], vec![0.6, 0.8], vec![0.8, 0.6], vec![-1.0, 0.0]];
        let query = [1.0, 0.1];
        let best = candidates[2].clone();
        for _ in 0..candidates.len() {
            candidates.rotate_left(1);
            let (index, _) = nearest_neighbor(&query, refs(&candidates)).unwrap();
            assert_eq!(candidates[index], best);
        }
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let candidates = vec![vec![0.0, 1.0], vec![2.0, 0.0], vec![1.0, 0.0], vec![3.0, 0.0]];
        let (index, _) = nearest_neighbor(&[1.0, 0.0], refs(&candidates)).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_all_zero_candidates() {
        let candidates = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        assert_eq!(nearest_neighbor(&[1.0, 0.0], refs(&candidates)), Some((0, 0.0)));
        assert_eq!(nearest_neighbor(&[1.0, 0.0], std::iter::empty()), None);
    }

    #[test]
    fn test_top_k_stable() {
        let candidates = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![2.0, 0.0]];
        let ranked = top_k(&[1.0, 0.0], refs(&candidates), 2);
        assert_eq!(ranked.iter().map(|r| r.0).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_length_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        let candidates = vec![vec![1.0, 0.0, 0.0], vec![0.5, 0.5]];
        assert_eq!(nearest_neighbor(&[1.0, 1.0], refs(&candidates)), Some((1, 1.0)));
    }
}
