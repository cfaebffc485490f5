//! Enrolled-speaker management: the durable cache plus verify/identify.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use voiceprint_audio::fbank::l2_normalize;
use voiceprint_onnx::SessionConfig;

use crate::embedding::EmbeddingExtractor;
use crate::similarity::cosine_similarity;
use crate::store::{unix_now, SpeakerProfile, SpeakerStore};
use crate::VoiceprintError;

/// Default identification threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.30;

/// Thread-safe speaker registry backed by a durable store.
///
/// Profiles are immutable once published: enroll replaces the whole cache
/// entry, so concurrent readers see either the old or the new profile but
/// never a torn vector. Identify snapshots the candidate list under the
/// read lock and scores outside it.
pub struct SpeakerManager {
    extractor: Arc<EmbeddingExtractor>,
    store: SpeakerStore,
    cache: RwLock<HashMap<String, Arc<SpeakerProfile>>>,
    threshold: RwLock<f32>,
}

impl SpeakerManager {
    /// Builds the extractor, opens the store at `db_path` and loads the
    /// cache from it.
    pub fn new(
        model_dir: impl AsRef<Path>,
        db_path: impl AsRef<Path>,
        cfg: &SessionConfig,
    ) -> Result<Self, VoiceprintError> {
        let extractor = Arc::new(EmbeddingExtractor::load(model_dir, cfg)?);
        let store = SpeakerStore::open(db_path)?;

        let mut cache = HashMap::new();
        for profile in store.load_all() {
            cache.insert(profile.id.clone(), Arc::new(profile));
        }
        info!(speakers = cache.len(), "speaker manager initialized");

        Ok(Self {
            extractor,
            store,
            cache: RwLock::new(cache),
            threshold: RwLock::new(DEFAULT_THRESHOLD),
        })
    }

    /// The embedding extractor, shared with the diarizer.
    pub fn extractor(&self) -> Arc<EmbeddingExtractor> {
        Arc::clone(&self.extractor)
    }

    /// Enrolls (or re-enrolls) a speaker from 16 kHz mono PCM.
    ///
    /// A new id inserts a fresh profile; an existing id folds the new
    /// embedding into the running mean and re-normalises. The store write
    /// happens before the cache commit, so a failed write leaves both in
    /// their pre-enroll state.
    pub fn enroll(&self, speaker_id: &str, pcm: &[f32]) -> Result<(), VoiceprintError> {
        if speaker_id.is_empty() {
            return Err(VoiceprintError::InvalidParam(
                "speaker id must not be empty".into(),
            ));
        }
        if pcm.is_empty() {
            return Err(VoiceprintError::InvalidParam("empty audio".into()));
        }

        let embedding = self.extractor.extract(pcm, 16000)?;
        self.commit_enrollment(speaker_id, embedding)
    }

    /// Enrolls from a WAV file (any supported format/rate).
    pub fn enroll_file(&self, speaker_id: &str, wav_path: impl AsRef<Path>) -> Result<(), VoiceprintError> {
        if speaker_id.is_empty() {
            return Err(VoiceprintError::InvalidParam(
                "speaker id must not be empty".into(),
            ));
        }
        let embedding = self.extractor.extract_from_file(wav_path)?;
        self.commit_enrollment(speaker_id, embedding)
    }

    fn commit_enrollment(&self, speaker_id: &str, embedding: Vec<f32>) -> Result<(), VoiceprintError> {
        let mut cache = self.cache.write().unwrap();

        let updated = match cache.get(speaker_id) {
            Some(existing) => {
                let mut p = incremental_update(existing, &embedding);
                p.updated_at = unix_now();
                p
            }
            None => SpeakerProfile::new(speaker_id, embedding),
        };

        self.store.save(&updated)?;
        let count = updated.enroll_count;
        cache.insert(speaker_id.to_string(), Arc::new(updated));
        info!(id = speaker_id, count, "speaker enrolled");
        Ok(())
    }

    /// Removes a speaker from cache and store.
    pub fn remove(&self, speaker_id: &str) -> Result<(), VoiceprintError> {
        let mut cache = self.cache.write().unwrap();
        if !cache.contains_key(speaker_id) {
            return Err(VoiceprintError::SpeakerNotFound(speaker_id.to_string()));
        }
        self.store.remove(speaker_id)?;
        cache.remove(speaker_id);
        info!(id = speaker_id, "speaker removed");
        Ok(())
    }

    /// 1:N identification. Returns the best-scoring enrolled speaker, or
    /// `NoMatch` (still carrying the best score) when nobody clears the
    /// threshold.
    pub fn identify(&self, pcm: &[f32]) -> Result<(String, f32), VoiceprintError> {
        if pcm.is_empty() {
            return Err(VoiceprintError::InvalidParam("empty audio".into()));
        }
        let embedding = self.extractor.extract(pcm, 16000)?;

        // Snapshot under the read lock, score outside it. Profiles are
        // shared Arcs, so this is O(speakers) pointer clones.
        let candidates: Vec<(String, Arc<SpeakerProfile>)> = {
            let cache = self.cache.read().unwrap();
            cache
                .iter()
                .map(|(id, p)| (id.clone(), Arc::clone(p)))
                .collect()
        };

        let mut best_id: Option<&str> = None;
        let mut best_score = -1.0f32;
        for (id, profile) in &candidates {
            let score = cosine_similarity(&embedding, &profile.embedding);
            if score > best_score {
                best_score = score;
                best_id = Some(id);
            }
        }

        let threshold = *self.threshold.read().unwrap();
        match best_id {
            Some(id) if best_score >= threshold => {
                info!(id, score = best_score, "speaker identified");
                Ok((id.to_string(), best_score))
            }
            _ => {
                warn!(best_score, threshold, "no matching speaker");
                Err(VoiceprintError::NoMatch {
                    best_score,
                })
            }
        }
    }

    /// 1:1 verification: the cosine similarity between the utterance and the
    /// stored profile. Success does not imply a match; callers compare the
    /// score against their threshold.
    pub fn verify(&self, speaker_id: &str, pcm: &[f32]) -> Result<f32, VoiceprintError> {
        if pcm.is_empty() {
            return Err(VoiceprintError::InvalidParam("empty audio".into()));
        }

        let reference = {
            let cache = self.cache.read().unwrap();
            match cache.get(speaker_id) {
                Some(p) => Arc::clone(p),
                None => return Err(VoiceprintError::SpeakerNotFound(speaker_id.to_string())),
            }
        };

        let embedding = self.extractor.extract(pcm, 16000)?;
        Ok(cosine_similarity(&embedding, &reference.embedding))
    }

    /// Best enrolled match for an already-extracted embedding; the search
    /// the diarizer runs per cluster centroid. `None` when the store is
    /// empty.
    pub fn best_match_embedding(&self, embedding: &[f32]) -> Option<(String, f32)> {
        let cache = self.cache.read().unwrap();
        let mut best: Option<(String, f32)> = None;
        for (id, profile) in cache.iter() {
            let score = cosine_similarity(embedding, &profile.embedding);
            match &best {
                Some((_, s)) if score <= *s => {}
                _ => best = Some((id.clone(), score)),
            }
        }
        best
    }

    /// Sets the identification threshold; values outside [0, 1] are
    /// rejected and leave the previous threshold in place.
    pub fn set_threshold(&self, threshold: f32) -> Result<(), VoiceprintError> {
        if !(0.0..=1.0).contains(&threshold) || threshold.is_nan() {
            return Err(VoiceprintError::InvalidParam(format!(
                "threshold {threshold} outside [0, 1]"
            )));
        }
        *self.threshold.write().unwrap() = threshold;
        Ok(())
    }

    pub fn threshold(&self) -> f32 {
        *self.threshold.read().unwrap()
    }

    /// Number of enrolled speakers.
    pub fn count(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}

/// Running-mean update: `new = (old * n + emb) / (n + 1)`, re-normalised.
fn incremental_update(existing: &SpeakerProfile, embedding: &[f32]) -> SpeakerProfile {
    let n = existing.enroll_count as f64;
    let mut mean: Vec<f32> = existing
        .embedding
        .iter()
        .zip(embedding.iter())
        .map(|(&old, &new)| ((old as f64 * n + new as f64) / (n + 1.0)) as f32)
        .collect();
    l2_normalize(&mut mean);

    SpeakerProfile {
        id: existing.id.clone(),
        embedding: mean,
        enroll_count: existing.enroll_count + 1,
        created_at: existing.created_at,
        updated_at: existing.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: Vec<f32>) -> Vec<f32> {
        let mut v = v;
        l2_normalize(&mut v);
        v
    }

    #[test]
    fn incremental_update_of_identical_embedding_is_stable() {
        let emb = unit(vec![0.3, 0.4, 0.5, 0.1]);
        let profile = SpeakerProfile::new("x", emb.clone());

        let mut current = profile;
        for expect_count in 2..=5u32 {
            current = incremental_update(&current, &emb);
            assert_eq!(current.enroll_count, expect_count);
            for (a, b) in current.embedding.iter().zip(emb.iter()) {
                assert!((a - b).abs() < 1e-5, "embedding drifted: {a} vs {b}");
            }
        }
    }

    #[test]
    fn incremental_update_moves_toward_new_sample() {
        let old = unit(vec![1.0, 0.0]);
        let new = unit(vec![0.0, 1.0]);
        let profile = SpeakerProfile::new("x", old.clone());
        let updated = incremental_update(&profile, &new);

        assert_eq!(updated.enroll_count, 2);
        // Mean of two orthogonal unit vectors, re-normalised: (1,1)/sqrt(2).
        assert!((updated.embedding[0] - 0.70710677).abs() < 1e-5);
        assert!((updated.embedding[1] - 0.70710677).abs() < 1e-5);
    }

    #[test]
    fn incremental_update_result_is_normalized() {
        let profile = SpeakerProfile::new("x", unit(vec![0.2, 0.9, 0.1]));
        let updated = incremental_update(&profile, &unit(vec![0.5, 0.5, 0.5]));
        let norm: f64 = updated
            .embedding
            .iter()
            .map(|&x| x as f64 * x as f64)
            .sum::<f64>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
