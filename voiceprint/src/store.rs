//! Durable speaker profile storage.
//!
//! Profiles live in a single versioned binary file, rewritten atomically
//! (temp file + rename) on every mutation and mirrored in memory. All
//! multi-byte values are little-endian.
//!
//! ```text
//! [4B magic "VPSK"] [4B version=1] [4B count]
//! For each profile:
//!   [4B idLen] [idLen bytes id (UTF-8)]
//!   [4B dim] [dim x 4B float32 embedding]
//!   [4B enrollCount]
//!   [8B createdAt (unix secs)] [8B updatedAt (unix secs)]
//! ```

use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::VoiceprintError;

const STORE_MAGIC: [u8; 4] = *b"VPSK";
const STORE_VERSION: u32 = 1;

/// One enrolled speaker: a unique id, the running-mean L2-normalised
/// embedding and the number of enrollments folded into it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerProfile {
    pub id: String,
    pub embedding: Vec<f32>,
    pub enroll_count: u32,
    pub created_at: u64,
    pub updated_at: u64,
}

impl SpeakerProfile {
    /// A fresh single-enrollment profile stamped with the current time.
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        let now = unix_now();
        Self {
            id: id.into(),
            embedding,
            enroll_count: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// File-backed speaker profile store with an in-memory mirror.
pub struct SpeakerStore {
    path: PathBuf,
    records: Mutex<HashMap<String, SpeakerProfile>>,
}

impl SpeakerStore {
    /// Opens (or lazily creates) the store at `path` and loads all records.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VoiceprintError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let file = std::fs::File::open(&path)
                .map_err(|e| VoiceprintError::Db(format!("open {}: {e}", path.display())))?;
            read_records(&mut BufReader::new(file))?
        } else {
            HashMap::new()
        };
        info!(path = %path.display(), speakers = records.len(), "store opened");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// All profiles currently in the store.
    pub fn load_all(&self) -> Vec<SpeakerProfile> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    /// Inserts or replaces a profile and persists the store. The in-memory
    /// mirror is only updated after the file write succeeded.
    pub fn save(&self, profile: &SpeakerProfile) -> Result<(), VoiceprintError> {
        let mut records = self.records.lock().unwrap();
        let mut next = records.clone();
        next.insert(profile.id.clone(), profile.clone());
        self.persist(&next)?;
        *records = next;
        debug!(id = %profile.id, count = profile.enroll_count, "profile saved");
        Ok(())
    }

    /// Removes a profile. Missing ids fail with `SpeakerNotFound`.
    pub fn remove(&self, id: &str) -> Result<(), VoiceprintError> {
        let mut records = self.records.lock().unwrap();
        if !records.contains_key(id) {
            return Err(VoiceprintError::SpeakerNotFound(id.to_string()));
        }
        let mut next = records.clone();
        next.remove(id);
        self.persist(&next)?;
        *records = next;
        debug!(id, "profile removed");
        Ok(())
    }

    pub fn exists(&self, id: &str) -> bool {
        self.records.lock().unwrap().contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Atomic whole-file rewrite: write a sibling temp file, then rename
    /// over the store path.
    fn persist(&self, records: &HashMap<String, SpeakerProfile>) -> Result<(), VoiceprintError> {
        let tmp_path = self.path.with_extension("tmp");
        {
            let file = std::fs::File::create(&tmp_path)
                .map_err(|e| VoiceprintError::Db(format!("create {}: {e}", tmp_path.display())))?;
            let mut w = BufWriter::new(file);
            write_records(&mut w, records)?;
            w.flush()
                .map_err(|e| VoiceprintError::Db(format!("flush: {e}")))?;
        }
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| VoiceprintError::Db(format!("rename {}: {e}", self.path.display())))
    }
}

fn write_records(
    w: &mut dyn Write,
    records: &HashMap<String, SpeakerProfile>,
) -> Result<(), VoiceprintError> {
    let err = |e: std::io::Error| VoiceprintError::Db(format!("write: {e}"));

    w.write_all(&STORE_MAGIC).map_err(err)?;
    w.write_all(&STORE_VERSION.to_le_bytes()).map_err(err)?;
    w.write_all(&(records.len() as u32).to_le_bytes()).map_err(err)?;

    // Deterministic order keeps repeated saves byte-identical.
    let mut ids: Vec<&String> = records.keys().collect();
    ids.sort();

    for id in ids {
        let p = &records[id];
        let id_bytes = p.id.as_bytes();
        w.write_all(&(id_bytes.len() as u32).to_le_bytes()).map_err(err)?;
        w.write_all(id_bytes).map_err(err)?;
        w.write_all(&(p.embedding.len() as u32).to_le_bytes()).map_err(err)?;
        for &v in &p.embedding {
            w.write_all(&v.to_le_bytes()).map_err(err)?;
        }
        w.write_all(&p.enroll_count.to_le_bytes()).map_err(err)?;
        w.write_all(&p.created_at.to_le_bytes()).map_err(err)?;
        w.write_all(&p.updated_at.to_le_bytes()).map_err(err)?;
    }
    Ok(())
}

fn read_records(r: &mut dyn Read) -> Result<HashMap<String, SpeakerProfile>, VoiceprintError> {
    let err = |e: std::io::Error| VoiceprintError::Db(format!("read: {e}"));

    let mut buf4 = [0u8; 4];
    let mut buf8 = [0u8; 8];

    r.read_exact(&mut buf4).map_err(err)?;
    if buf4 != STORE_MAGIC {
        return Err(VoiceprintError::Db(format!("invalid magic {buf4:?}")));
    }
    r.read_exact(&mut buf4).map_err(err)?;
    let version = u32::from_le_bytes(buf4);
    if version != STORE_VERSION {
        return Err(VoiceprintError::Db(format!(
            "unsupported store version {version}"
        )));
    }
    r.read_exact(&mut buf4).map_err(err)?;
    let count = u32::from_le_bytes(buf4) as usize;

    let mut records = HashMap::with_capacity(count);
    for _ in 0..count {
        r.read_exact(&mut buf4).map_err(err)?;
        let id_len = u32::from_le_bytes(buf4) as usize;
        let mut id_bytes = vec![0u8; id_len];
        r.read_exact(&mut id_bytes).map_err(err)?;
        let id = String::from_utf8(id_bytes)
            .map_err(|e| VoiceprintError::Db(format!("invalid id: {e}")))?;

        r.read_exact(&mut buf4).map_err(err)?;
        let dim = u32::from_le_bytes(buf4) as usize;
        let mut embedding = Vec::with_capacity(dim);
        for _ in 0..dim {
            r.read_exact(&mut buf4).map_err(err)?;
            embedding.push(f32::from_le_bytes(buf4));
        }

        r.read_exact(&mut buf4).map_err(err)?;
        let enroll_count = u32::from_le_bytes(buf4);
        r.read_exact(&mut buf8).map_err(err)?;
        let created_at = u64::from_le_bytes(buf8);
        r.read_exact(&mut buf8).map_err(err)?;
        let updated_at = u64::from_le_bytes(buf8);

        records.insert(
            id.clone(),
            SpeakerProfile {
                id,
                embedding,
                enroll_count,
                created_at,
                updated_at,
            },
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, dim: usize, fill: f32) -> SpeakerProfile {
        SpeakerProfile::new(id, vec![fill; dim])
    }

    #[test]
    fn save_and_reload_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speakers.vpdb");

        {
            let store = SpeakerStore::open(&path).unwrap();
            store.save(&profile("alice", 192, 0.1)).unwrap();
            store.save(&profile("bob", 192, 0.2)).unwrap();
            assert_eq!(store.count(), 2);
        }

        let store = SpeakerStore::open(&path).unwrap();
        assert_eq!(store.count(), 2);
        let all = store.load_all();
        let alice = all.iter().find(|p| p.id == "alice").unwrap();
        assert_eq!(alice.embedding.len(), 192);
        assert_eq!(alice.enroll_count, 1);
        assert!((alice.embedding[0] - 0.1).abs() < 1e-7);
    }

    #[test]
    fn save_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SpeakerStore::open(dir.path().join("s.vpdb")).unwrap();

        store.save(&profile("x", 4, 0.5)).unwrap();
        let mut updated = profile("x", 4, 0.7);
        updated.enroll_count = 2;
        store.save(&updated).unwrap();

        assert_eq!(store.count(), 1);
        let all = store.load_all();
        assert_eq!(all[0].enroll_count, 2);
        assert!((all[0].embedding[0] - 0.7).abs() < 1e-7);
    }

    #[test]
    fn remove_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = SpeakerStore::open(dir.path().join("s.vpdb")).unwrap();
        assert!(matches!(
            store.remove("ghost"),
            Err(VoiceprintError::SpeakerNotFound(_))
        ));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.vpdb");
        {
            let store = SpeakerStore::open(&path).unwrap();
            store.save(&profile("a", 8, 0.3)).unwrap();
            store.save(&profile("b", 8, 0.4)).unwrap();
            store.remove("a").unwrap();
        }
        let store = SpeakerStore::open(&path).unwrap();
        assert_eq!(store.count(), 1);
        assert!(store.exists("b"));
        assert!(!store.exists("a"));
    }

    #[test]
    fn corrupt_magic_is_db_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.vpdb");
        std::fs::write(&path, b"not a store file").unwrap();
        assert!(matches!(
            SpeakerStore::open(&path),
            Err(VoiceprintError::Db(_))
        ));
    }

    #[test]
    fn empty_store_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.vpdb");
        {
            let store = SpeakerStore::open(&path).unwrap();
            store.save(&profile("only", 2, 1.0)).unwrap();
            store.remove("only").unwrap();
        }
        let store = SpeakerStore::open(&path).unwrap();
        assert_eq!(store.count(), 0);
    }
}
