use std::io;

use xxhash_rust::xxh3::Xxh3;

use super::model::PlacedAsset;

const XXH3_SEED: u64 = 0x5c3a_91e4_07bd_2f68;

/// Structural identity of a scene: ids, order, geometry and effects. Selection is ignored so
/// that selecting an asset never creates an undo step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneFingerprint {
    pub hi: u64,
    pub lo: u64,
}

pub fn fingerprint_scene(assets: &[PlacedAsset]) -> Result<SceneFingerprint, serde_json::Error> {
    let mut h = StableHasher::new();
    h.write_u64(assets.len() as u64);
    for asset in assets {
        h.write_str(asset.id.as_str());
        h.write_str(&asset.bitmap_url);
        for v in [
            asset.bounds.x,
            asset.bounds.y,
            asset.bounds.width,
            asset.bounds.height,
        ] {
            h.write_f64(v);
        }
        match &asset.effects {
            Some(effects) => {
                h.write_u8(1);
                serde_json::to_writer(&mut h, effects)?;
            }
            None => h.write_u8(0),
        }
    }
    Ok(h.finish())
}

/// Selection-blind equality, used when a snapshot could not be fingerprinted.
fn same_structure(a: &[PlacedAsset], b: &[PlacedAsset]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.id == y.id
                && x.bitmap_url == y.bitmap_url
                && x.bounds == y.bounds
                && x.effects == y.effects
        })
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> SceneFingerprint {
        let v = self.inner.digest128();
        SceneFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

impl io::Write for StableHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    snapshot: Vec<PlacedAsset>,
    fingerprint: Option<SceneFingerprint>,
}

impl HistoryEntry {
    fn new(snapshot: Vec<PlacedAsset>) -> Self {
        let fingerprint = match fingerprint_scene(&snapshot) {
            Ok(fingerprint) => Some(fingerprint),
            Err(err) => {
                tracing::warn!(%err, "scene fingerprint failed, comparing snapshots directly");
                None
            }
        };
        Self {
            snapshot,
            fingerprint,
        }
    }

    fn matches(&self, other: &HistoryEntry) -> bool {
        match (self.fingerprint, other.fingerprint) {
            (Some(a), Some(b)) => a == b,
            _ => same_structure(&self.snapshot, &other.snapshot),
        }
    }
}

/// Linear snapshot history with one current index.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    index: usize,
    limit: usize,
}

impl HistoryManager {
    pub fn new(initial: Vec<PlacedAsset>, limit: usize) -> Self {
        Self {
            entries: vec![HistoryEntry::new(initial)],
            index: 0,
            limit: limit.max(2),
        }
    }

    /// Records `snapshot` as the new current entry, discarding any redo tail. Snapshots that
    /// match the current entry structurally are skipped.
    pub fn push(&mut self, snapshot: Vec<PlacedAsset>) -> bool {
        let entry = HistoryEntry::new(snapshot);
        if self
            .entries
            .get(self.index)
            .is_some_and(|current| current.matches(&entry))
        {
            return false;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
        }
        self.index = self.entries.len() - 1;
        true
    }

    pub fn undo(&mut self) -> Option<Vec<PlacedAsset>> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(self.entries[self.index].snapshot.clone())
    }

    pub fn redo(&mut self) -> Option<Vec<PlacedAsset>> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.entries[self.index].snapshot.clone())
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn reset(&mut self, initial: Vec<PlacedAsset>) {
        self.entries = vec![HistoryEntry::new(initial)];
        self.index = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.index
    }
}
