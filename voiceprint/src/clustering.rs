//! Agglomerative clustering of speaker embeddings.
//!
//! Bottom-up clustering under cosine distance, with average linkage
//! approximated by count-weighted centroid merging. O(N^3) by construction,
//! which is fine for the small N that VAD segmentation produces.

/// Per-input labels compacted to `0..num_clusters`.
#[derive(Debug, Clone, Default)]
pub struct ClusterResult {
    pub labels: Vec<usize>,
    pub num_clusters: usize,
}

/// Clusters `embeddings` until the closest pair is farther apart than
/// `threshold` (cosine distance), or the active cluster count has come down
/// to `max_clusters` (0 = no cap).
///
/// Each cluster keeps a count-weighted, L2-renormalised centroid; the
/// closest pair by centroid distance merges first, ties broken by the first
/// `(i, j)` pair encountered with `i < j`. Labels are compacted to
/// `0..K-1` in first-occurrence order.
pub fn agglomerative_cluster(
    embeddings: &[Vec<f32>],
    threshold: f32,
    max_clusters: usize,
) -> ClusterResult {
    let n = embeddings.len();
    if n == 0 {
        return ClusterResult::default();
    }
    if n == 1 {
        return ClusterResult {
            labels: vec![0],
            num_clusters: 1,
        };
    }

    let mut labels: Vec<usize> = (0..n).collect();
    // Centroids in f64 so long merge chains do not accumulate f32 error.
    let mut means: Vec<Vec<f64>> = embeddings
        .iter()
        .map(|e| e.iter().map(|&v| v as f64).collect())
        .collect();
    let mut counts = vec![1usize; n];
    let mut active = vec![true; n];
    let mut num_active = n;

    loop {
        if max_clusters > 0 && num_active <= max_clusters {
            break;
        }

        // Closest active pair by centroid cosine distance.
        let mut best_dist = f32::MAX;
        let mut best_pair: Option<(usize, usize)> = None;
        for i in 0..n {
            if !active[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !active[j] {
                    continue;
                }
                let d = centroid_distance(&means[i], &means[j]);
                if d < best_dist {
                    best_dist = d;
                    best_pair = Some((i, j));
                }
            }
        }

        let (bi, bj) = match best_pair {
            Some(p) if best_dist <= threshold => p,
            _ => break,
        };

        // Merge j into i: count-weighted mean, re-normalised.
        let (ci, cj) = (counts[bi] as f64, counts[bj] as f64);
        let total = ci + cj;
        for k in 0..means[bi].len() {
            means[bi][k] = (means[bi][k] * ci + means[bj][k] * cj) / total;
        }
        renormalize(&mut means[bi]);

        counts[bi] += counts[bj];
        active[bj] = false;
        num_active -= 1;

        for label in labels.iter_mut() {
            if *label == bj {
                *label = bi;
            }
        }
    }

    compact_labels(labels)
}

/// Cosine distance between two centroids, all-f64.
fn centroid_distance(a: &[f64], b: &[f64]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let sim = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    (1.0 - sim) as f32
}

fn renormalize(v: &mut [f64]) {
    let norm: f64 = v.iter().map(|&x| x * x).sum::<f64>().sqrt();
    if norm > 1e-8 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Remaps raw labels to `0..K-1` in first-occurrence order.
fn compact_labels(labels: Vec<usize>) -> ClusterResult {
    let mut id_map: Vec<Option<usize>> = vec![None; labels.len()];
    let mut next_id = 0usize;
    let mut compacted = Vec::with_capacity(labels.len());
    for &label in &labels {
        let id = match id_map[label] {
            Some(id) => id,
            None => {
                let id = next_id;
                id_map[label] = Some(id);
                next_id += 1;
                id
            }
        };
        compacted.push(id);
    }
    ClusterResult {
        labels: compacted,
        num_clusters: next_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: Vec<f32>) -> Vec<f32> {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.into_iter().map(|x| x / norm).collect()
    }

    #[test]
    fn empty_input() {
        let r = agglomerative_cluster(&[], 0.45, 0);
        assert_eq!(r.num_clusters, 0);
        assert!(r.labels.is_empty());
    }

    #[test]
    fn single_input_is_one_cluster() {
        let r = agglomerative_cluster(&[unit(vec![1.0, 0.0])], 0.45, 0);
        assert_eq!(r.num_clusters, 1);
        assert_eq!(r.labels, vec![0]);
    }

    #[test]
    fn identical_vectors_collapse() {
        let v = unit(vec![0.3, 0.7, 0.2]);
        let embeddings = vec![v.clone(), v.clone(), v.clone(), v];
        let r = agglomerative_cluster(&embeddings, 0.45, 0);
        assert_eq!(r.num_clusters, 1);
        assert!(r.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn orthogonal_vectors_stay_apart() {
        let embeddings = vec![
            unit(vec![1.0, 0.0, 0.0]),
            unit(vec![0.0, 1.0, 0.0]),
            unit(vec![0.0, 0.0, 1.0]),
        ];
        let r = agglomerative_cluster(&embeddings, 0.45, 0);
        assert_eq!(r.num_clusters, 3);
        // Labels cover 0..K-1.
        let mut seen = r.labels.clone();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn two_tight_groups() {
        // Two clusters of three near (1,0) and (0,1), threshold 0.3.
        let embeddings = vec![
            unit(vec![1.0, 0.02]),
            unit(vec![0.99, 0.05]),
            unit(vec![1.0, 0.08]),
            unit(vec![0.02, 1.0]),
            unit(vec![0.05, 0.99]),
            unit(vec![0.08, 1.0]),
        ];
        let r = agglomerative_cluster(&embeddings, 0.3, 0);
        assert_eq!(r.num_clusters, 2);
        assert_eq!(r.labels[0], r.labels[1]);
        assert_eq!(r.labels[1], r.labels[2]);
        assert_eq!(r.labels[3], r.labels[4]);
        assert_eq!(r.labels[4], r.labels[5]);
        assert_ne!(r.labels[0], r.labels[3]);
    }

    #[test]
    fn labels_compact_in_first_occurrence_order() {
        let embeddings = vec![
            unit(vec![0.0, 1.0]),
            unit(vec![1.0, 0.0]),
            unit(vec![0.0, 1.0]),
        ];
        let r = agglomerative_cluster(&embeddings, 0.3, 0);
        assert_eq!(r.num_clusters, 2);
        // First input defines label 0.
        assert_eq!(r.labels[0], 0);
        assert_eq!(r.labels[1], 1);
        assert_eq!(r.labels[2], 0);
    }

    #[test]
    fn max_clusters_floors_merging() {
        let v = unit(vec![0.5, 0.5]);
        let embeddings = vec![v.clone(), v.clone(), v.clone(), v];
        // Even identical vectors stop merging at the cap.
        let r = agglomerative_cluster(&embeddings, 1.0, 2);
        assert_eq!(r.num_clusters, 2);
    }
}
