//! Multi-tenant session manager and public API.
//!
//! Grounded on `HuntmasterAudioEngine::Impl`: one map of live sessions
//! behind a lock that is held only long enough to look a session up, a
//! monotonic id counter, and a master-call cache shared read-only across
//! every session. Each `Session` then does its own heavy lifting without
//! holding the session-table lock, so two sessions never serialize on each
//! other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use callcoach_cache::MasterCallCache;
use callcoach_config::{Settings, VadConfig};
use callcoach_core::{EngineError, Result, Sample};
use callcoach_dsp::VadState;
use parking_lot::RwLock;

use crate::session::Session;

/// Multi-tenant call-coaching engine: owns every live session and the
/// shared master-call cache.
pub struct Engine {
    settings: Settings,
    sessions: RwLock<HashMap<u64, Arc<Session>>>,
    next_session_id: AtomicU64,
    cache: MasterCallCache,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        let cache = MasterCallCache::new(
            settings.paths.clone(),
            settings.mfcc.clone(),
            settings.cache.max_cached_masters,
        );
        Self {
            settings,
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            cache,
        }
    }

    /// Create a new session at `sample_rate`, returning its id.
    #[tracing::instrument(skip(self))]
    pub fn create_session(&self, sample_rate: u32) -> Result<u64> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidParams(
                "sample_rate must be positive".to_string(),
            ));
        }

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.settings.session.max_sessions {
            return Err(EngineError::InvalidParams(format!(
                "session limit reached: {} active",
                self.settings.session.max_sessions
            )));
        }

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = Session::new(
            id,
            sample_rate,
            &self.settings.mfcc,
            &self.settings.vad,
            self.settings.session.max_buffer_size,
        )?;
        sessions.insert(id, Arc::new(session));
        Ok(id)
    }

    pub fn destroy_session(&self, id: u64) -> Result<()> {
        self.sessions
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::InvalidSession(id))
    }

    /// Bind a master call to a session, loading and caching its features
    /// at the session's sample rate if necessary.
    #[tracing::instrument(skip(self))]
    pub fn load_master(&self, id: u64, master_call_id: &str) -> Result<()> {
        let session = self.session(id)?;
        let sequence = self
            .cache
            .get(master_call_id, session.sample_rate)
            .map_err(EngineError::from)?;
        session.bind_master(master_call_id, sequence);
        Ok(())
    }

    pub fn process_chunk(&self, id: u64, chunk: &[Sample]) -> Result<()> {
        self.session(id)?.process_chunk(chunk)
    }

    pub fn get_similarity(&self, id: u64) -> Result<f32> {
        self.session(id)?.similarity()
    }

    pub fn get_feature_count(&self, id: u64) -> Result<usize> {
        Ok(self.session(id)?.feature_count())
    }

    pub fn reset(&self, id: u64) -> Result<()> {
        self.session(id)?.reset();
        Ok(())
    }

    pub fn configure_vad(&self, id: u64, config: VadConfig) -> Result<()> {
        self.session(id)?.configure_vad(config);
        Ok(())
    }

    /// Current VAD activity state for a session (`Silent`/`Candidate`/
    /// `Active`/`Hangover`).
    pub fn get_vad(&self, id: u64) -> Result<VadState> {
        Ok(self.session(id)?.vad_state())
    }

    pub fn active_sessions(&self) -> Vec<u64> {
        self.sessions.read().keys().copied().collect()
    }

    pub fn is_active(&self, id: u64) -> bool {
        self.sessions.read().contains_key(&id)
    }

    fn session(&self, id: u64) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(EngineError::InvalidSession(id))
    }
}
