//! Speaker diarization: who spoke when.
//!
//! VAD segments the recording, each sufficiently long segment is embedded,
//! the embeddings are clustered under cosine distance, and cluster centroids
//! are optionally matched against the enrolled speaker set.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clustering::agglomerative_cluster;
use crate::embedding::EmbeddingExtractor;
use crate::manager::SpeakerManager;
use crate::VoiceprintError;

/// Minimum duration of a VAD segment worth embedding, in seconds.
pub const MIN_SEG_DURATION: f32 = 0.5;

/// Cosine-distance threshold for merging segment clusters.
pub const CLUSTER_THRESHOLD: f32 = 0.45;

const SAMPLE_RATE: usize = 16000;

/// One diarized span of speech.
#[derive(Debug, Clone, PartialEq)]
pub struct DiarizeSegment {
    pub start_sec: f32,
    pub end_sec: f32,
    /// Synthetic per-recording tag, `SPEAKER_<k>`.
    pub speaker_label: String,
    /// Matched enrolled speaker id; empty when no centroid cleared the
    /// manager's threshold (or no manager was attached).
    pub speaker_id: String,
    /// VAD confidence of the underlying segment.
    pub confidence: f32,
}

/// Segments multi-speaker recordings by speaker identity.
///
/// Shares the [`EmbeddingExtractor`] (and through it the VAD) with the
/// speaker manager's runtime.
pub struct Diarizer {
    extractor: Arc<EmbeddingExtractor>,
}

impl Diarizer {
    pub fn new(extractor: Arc<EmbeddingExtractor>) -> Self {
        info!(threshold = CLUSTER_THRESHOLD, "diarizer initialized");
        Self { extractor }
    }

    /// Diarizes without consulting the enrolled speaker set; every
    /// `speaker_id` stays empty.
    pub fn diarize(
        &self,
        pcm: &[f32],
        max_segments: usize,
    ) -> Result<Vec<DiarizeSegment>, VoiceprintError> {
        self.run(pcm, max_segments, None)
    }

    /// Diarizes and matches cluster centroids against `manager`'s enrolled
    /// speakers; clusters scoring at or above the manager's threshold carry
    /// the matched speaker id on all of their segments.
    ///
    /// The manager reference is borrowed only for the duration of the call.
    pub fn diarize_with_manager(
        &self,
        pcm: &[f32],
        max_segments: usize,
        manager: &SpeakerManager,
    ) -> Result<Vec<DiarizeSegment>, VoiceprintError> {
        self.run(pcm, max_segments, Some(manager))
    }

    fn run(
        &self,
        pcm: &[f32],
        max_segments: usize,
        manager: Option<&SpeakerManager>,
    ) -> Result<Vec<DiarizeSegment>, VoiceprintError> {
        if pcm.is_empty() {
            return Ok(Vec::new());
        }

        // Step 1: VAD.
        let segments = self.extractor.vad().detect(pcm)?;
        if segments.is_empty() {
            warn!("diarizer: no speech detected");
            return Ok(Vec::new());
        }
        debug!(segments = segments.len(), "diarizer: VAD segments");

        // Step 2+3: embed every segment long enough to judge.
        struct SegEmb {
            start_sample: usize,
            end_sample: usize,
            confidence: f32,
            embedding: Vec<f32>,
        }
        let mut segs_with_emb: Vec<SegEmb> = Vec::new();

        for seg in &segments {
            if seg.duration_secs() < MIN_SEG_DURATION {
                continue;
            }
            let end = seg.end_sample.min(pcm.len());
            if end <= seg.start_sample {
                continue;
            }
            // Segments the extractor rejects (too short after its own VAD
            // pass, inference trouble) are skipped, not fatal.
            match self.extractor.extract(&pcm[seg.start_sample..end], SAMPLE_RATE as u32) {
                Ok(embedding) => segs_with_emb.push(SegEmb {
                    start_sample: seg.start_sample,
                    end_sample: end,
                    confidence: seg.confidence,
                    embedding,
                }),
                Err(e) => debug!(error = %e, "diarizer: segment skipped"),
            }
        }

        if segs_with_emb.is_empty() {
            warn!("diarizer: no segment produced an embedding");
            return Ok(Vec::new());
        }

        // Step 4: cluster.
        let embeddings: Vec<Vec<f32>> = segs_with_emb
            .iter()
            .map(|s| s.embedding.clone())
            .collect();
        let clusters = agglomerative_cluster(&embeddings, CLUSTER_THRESHOLD, 0);
        info!(
            segments = segs_with_emb.len(),
            speakers = clusters.num_clusters,
            "diarization complete"
        );

        // Step 5: count-weighted centroids, then optional matching against
        // the enrolled speaker set.
        let centroids = cluster_centroids(&embeddings, &clusters.labels, clusters.num_clusters);
        let mut cluster_speaker_id = vec![String::new(); clusters.num_clusters];
        if let Some(manager) = manager {
            for (k, centroid) in centroids.iter().enumerate() {
                if let Some((id, score)) = manager.best_match_embedding(centroid) {
                    if score >= manager.threshold() {
                        debug!(cluster = k, id = %id, score, "centroid matched enrolled speaker");
                        cluster_speaker_id[k] = id;
                    }
                }
            }
        }

        // Step 6: emit in temporal order, truncated at max_segments.
        let mut out = Vec::new();
        for (i, seg) in segs_with_emb.iter().enumerate() {
            if out.len() >= max_segments {
                break;
            }
            let label = clusters.labels[i];
            out.push(DiarizeSegment {
                start_sec: seg.start_sample as f32 / SAMPLE_RATE as f32,
                end_sec: seg.end_sample as f32 / SAMPLE_RATE as f32,
                speaker_label: format!("SPEAKER_{label}"),
                speaker_id: cluster_speaker_id[label].clone(),
                confidence: seg.confidence,
            });
        }
        Ok(out)
    }
}

/// Count-weighted, L2-renormalised mean embedding per cluster.
fn cluster_centroids(
    embeddings: &[Vec<f32>],
    labels: &[usize],
    num_clusters: usize,
) -> Vec<Vec<f32>> {
    if num_clusters == 0 || embeddings.is_empty() {
        return Vec::new();
    }
    let dim = embeddings[0].len();
    let mut sums = vec![vec![0.0f64; dim]; num_clusters];
    let mut counts = vec![0usize; num_clusters];

    for (emb, &label) in embeddings.iter().zip(labels.iter()) {
        for (d, &v) in emb.iter().enumerate() {
            sums[label][d] += v as f64;
        }
        counts[label] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            if count == 0 {
                return vec![0.0f32; dim];
            }
            let mean: Vec<f64> = sum.into_iter().map(|v| v / count as f64).collect();
            let norm: f64 = mean.iter().map(|&v| v * v).sum::<f64>().sqrt();
            if norm > 1e-8 {
                mean.into_iter().map(|v| (v / norm) as f32).collect()
            } else {
                mean.into_iter().map(|v| v as f32).collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroids_are_normalized_means() {
        let embeddings = vec![
            vec![1.0f32, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ];
        let labels = vec![0, 1, 1];
        let centroids = cluster_centroids(&embeddings, &labels, 2);

        assert_eq!(centroids.len(), 2);
        assert!((centroids[0][0] - 1.0).abs() < 1e-6);
        assert!((centroids[1][1] - 1.0).abs() < 1e-6);
        for c in &centroids {
            let norm: f64 = c.iter().map(|&v| v as f64 * v as f64).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn centroid_weighting_follows_counts() {
        // Cluster of two (1,0) and one (0,1): mean (2/3, 1/3) renormalised.
        let embeddings = vec![
            vec![1.0f32, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ];
        let labels = vec![0, 0, 0];
        let centroids = cluster_centroids(&embeddings, &labels, 1);
        let c = &centroids[0];
        assert!(c[0] > c[1]);
        let ratio = c[0] / c[1];
        assert!((ratio - 2.0).abs() < 1e-5, "got ratio {ratio}");
    }

    #[test]
    fn empty_inputs_yield_no_centroids() {
        assert!(cluster_centroids(&[], &[], 0).is_empty());
    }
}
