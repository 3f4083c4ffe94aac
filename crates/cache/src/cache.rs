//! Master-call feature cache: memory-resident MFCC sequences backed by a
//! disk `.mfc` tier, recomputed from the source WAV on a cold cache or a
//! sample-rate mismatch.
//!
//! Grounded on `HuntmasterAudioEngine::Impl`'s `masterCallMutex_`-guarded
//! `masterCallFeatures_` map (a C++ `shared_mutex` maps onto
//! `parking_lot::RwLock`) and on `InMemorySessionStore`'s
//! `RwLock<HashMap<_, _>>` store shape. The single-in-flight-load-per-id
//! gate is new: the teacher holds one mutex around the whole map during a
//! load, which would serialize unrelated ids; a per-id `OnceCell` lets
//! concurrent loads of different masters proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use callcoach_config::{MfccConfig, PathsConfig};
use callcoach_core::mfcc::MfccSequence;
use callcoach_dsp::MfccExtractor;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::error::{CacheError, Result};
use crate::mfc;
use crate::wav;

struct MasterCallEntry {
    sequence: Arc<MfccSequence>,
    sample_rate: u32,
}

/// Read-through cache over a master call's MFCC features: memory, then
/// disk `.mfc`, then on-demand extraction from the source WAV.
pub struct MasterCallCache {
    paths: PathsConfig,
    mfcc_template: MfccConfig,
    max_cached_masters: usize,
    entries: RwLock<HashMap<String, Arc<MasterCallEntry>>>,
    loads: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl MasterCallCache {
    pub fn new(paths: PathsConfig, mfcc_template: MfccConfig, max_cached_masters: usize) -> Self {
        Self {
            paths,
            mfcc_template,
            max_cached_masters,
            entries: RwLock::new(HashMap::new()),
            loads: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a master call's MFCC features at `sample_rate`, loading and
    /// caching it if necessary. Concurrent calls for the same `(id,
    /// sample_rate)` collapse into a single load.
    #[tracing::instrument(skip(self), fields(master_call_id = %id, sample_rate))]
    pub fn get(&self, id: &str, sample_rate: u32) -> Result<Arc<MfccSequence>> {
        if let Some(entry) = self.lookup(id, sample_rate) {
            return Ok(entry.sequence.clone());
        }

        let gate_key = format!("{id}:{sample_rate}");
        let gate = {
            let mut loads = self.loads.lock();
            loads
                .entry(gate_key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        // Double-checked: another thread may have populated the entry
        // while we were waiting for the gate. A failed load leaves the
        // gate uninitialized so a later retry can try again.
        gate.get_or_try_init(|| {
            if self.lookup(id, sample_rate).is_some() {
                return Ok(());
            }
            let entry = self.load_entry(id, sample_rate)?;
            self.insert(id, entry);
            Ok(())
        })?;

        self.lookup(id, sample_rate)
            .map(|entry| entry.sequence.clone())
            .ok_or_else(|| CacheError::NotFound(id.to_string()))
    }

    fn lookup(&self, id: &str, sample_rate: u32) -> Option<Arc<MasterCallEntry>> {
        self.entries
            .read()
            .get(id)
            .filter(|entry| entry.sample_rate == sample_rate)
            .cloned()
    }

    fn insert(&self, id: &str, entry: MasterCallEntry) {
        let mut entries = self.entries.write();
        if !entries.contains_key(id) && entries.len() >= self.max_cached_masters {
            tracing::warn!(
                cached = entries.len(),
                limit = self.max_cached_masters,
                "master call cache full, evicting all entries"
            );
            entries.clear();
        }
        entries.insert(id.to_string(), Arc::new(entry));
    }

    /// Drop every cached entry (disk files are untouched).
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load_entry(&self, id: &str, sample_rate: u32) -> Result<MasterCallEntry> {
        let mfc_path = format!("{}/{}.mfc", self.paths.feature_cache_dir, id);

        if let Ok(loaded) = mfc::read_mfc(&mfc_path) {
            match loaded.sample_rate {
                Some(cached_rate) if cached_rate == sample_rate => {
                    tracing::debug!("loaded cached .mfc for {id}");
                    return Ok(MasterCallEntry {
                        sequence: Arc::new(loaded.sequence),
                        sample_rate: cached_rate,
                    });
                }
                Some(_) => {
                    tracing::info!(
                        "cached .mfc for {id} was computed at a different sample rate, recomputing"
                    );
                }
                None => {
                    // Legacy files carry no sample-rate tag; trust them as-is,
                    // matching the original engine's unconditional cache reuse.
                    return Ok(MasterCallEntry {
                        sequence: Arc::new(loaded.sequence),
                        sample_rate,
                    });
                }
            }
        }

        let wav_path = format!("{}/{}.wav", self.paths.master_call_dir, id);
        let decoded = wav::read_wav(&wav_path).map_err(|_| CacheError::NotFound(id.to_string()))?;

        let mut config = self.mfcc_template.clone();
        config.sample_rate = decoded.sample_rate;
        let extractor = MfccExtractor::new(config)?;
        let sequence = extractor.extract_sequence(&decoded.samples)?;

        if let Err(e) = mfc::write_mfc(&mfc_path, &sequence, decoded.sample_rate) {
            tracing::warn!(error = %e, "failed to persist .mfc cache for {id}");
        }

        Ok(MasterCallEntry {
            sequence: Arc::new(sequence),
            sample_rate: decoded.sample_rate,
        })
    }
}
