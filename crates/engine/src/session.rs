//! Per-session state: a rolling audio buffer, accumulated MFCC features,
//! VAD, and an optional master-call binding.
//!
//! Grounded on `HuntmasterAudioEngine::Impl::RealtimeSessionState` (a
//! per-session audio buffer plus accumulated feature vector, with VAD run
//! independently over incoming windows) and on the teacher's `Session`
//! (`crates/server/src/session.rs`): one struct per session, immutable
//! identity fields alongside lock-guarded mutable state, so that
//! processing one session never contends with another.

use std::sync::Arc;
use std::time::Instant;

use callcoach_config::{MfccConfig, VadConfig};
use callcoach_core::mfcc::MfccSequence;
use callcoach_core::{all_finite, EngineError, Result, Sample};
use callcoach_dsp::{MfccExtractor, VadState, VoiceActivityDetector};
use parking_lot::Mutex;

/// A master call bound to a session: a shared, read-only handle into the
/// cache plus the sample rate it was computed at (always the session's
/// own rate, since the cache recomputes on mismatch).
struct BoundMaster {
    id: String,
    sequence: Arc<MfccSequence>,
}

struct SessionState {
    buffer: Vec<Sample>,
    vad_buffer: Vec<Sample>,
    features: MfccSequence,
    vad: VoiceActivityDetector,
    vad_config: VadConfig,
    master: Option<BoundMaster>,
}

/// One caller's live audio-coaching interaction: a unique id, a fixed
/// sample rate, a per-session MFCC extractor (never shared across
/// sessions — see spec's "shared mutable processor" footgun), and
/// mutable state behind a single lock.
pub struct Session {
    pub id: u64,
    pub sample_rate: u32,
    pub created_at: Instant,
    max_buffer_size: usize,
    mfcc: MfccExtractor,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(
        id: u64,
        sample_rate: u32,
        mfcc_template: &MfccConfig,
        vad_config: &VadConfig,
        max_buffer_size: usize,
    ) -> Result<Self> {
        let mut mfcc_config = mfcc_template.clone();
        mfcc_config.sample_rate = sample_rate;
        let mfcc = MfccExtractor::new(mfcc_config.clone())?;

        Ok(Self {
            id,
            sample_rate,
            created_at: Instant::now(),
            max_buffer_size,
            mfcc,
            state: Mutex::new(SessionState {
                buffer: Vec::new(),
                vad_buffer: Vec::new(),
                features: MfccSequence::new(mfcc_config.num_coefficients),
                vad: VoiceActivityDetector::new(vad_config.clone()),
                vad_config: vad_config.clone(),
                master: None,
            }),
        })
    }

    pub fn bind_master(&self, master_id: &str, sequence: Arc<MfccSequence>) {
        let mut state = self.state.lock();
        state.master = Some(BoundMaster {
            id: master_id.to_string(),
            sequence,
        });
    }

    /// Append a chunk of audio, draining complete MFCC frames and VAD
    /// windows from the rolling buffers as they become available.
    #[tracing::instrument(skip(self, chunk), fields(session_id = self.id, chunk_len = chunk.len()))]
    pub fn process_chunk(&self, chunk: &[Sample]) -> Result<()> {
        if chunk.is_empty() {
            return Err(EngineError::InvalidParams(
                "process_chunk requires a non-empty buffer".to_string(),
            ));
        }
        if !all_finite(chunk) {
            return Err(EngineError::InvalidParams(
                "process_chunk input contains NaN or infinite samples".to_string(),
            ));
        }

        let mut state = self.state.lock();
        if state.buffer.len() + chunk.len() > self.max_buffer_size {
            return Err(EngineError::BufferOverflow {
                attempted: chunk.len(),
                max: self.max_buffer_size,
            });
        }

        state.buffer.extend_from_slice(chunk);
        state.vad_buffer.extend_from_slice(chunk);

        let frame_size = self.mfcc.frame_size();
        let hop_size = self.mfcc.hop_size();
        while state.buffer.len() >= frame_size {
            let frame = state.buffer[..frame_size].to_vec();
            let coefficients = self.mfcc.extract_frame(&frame)?;
            state.features.push(coefficients)?;
            state.buffer.drain(..hop_size);
        }

        let window = (((self.sample_rate as u64 * state.vad_config.window_ms as u64) / 1_000)
            .max(1)) as usize;
        while state.vad_buffer.len() >= window {
            let vad_window = state.vad_buffer[..window].to_vec();
            state.vad.process_window(&vad_window);
            state.vad_buffer.drain(..window);
        }

        Ok(())
    }

    pub fn feature_count(&self) -> usize {
        self.state.lock().features.len()
    }

    /// Compute similarity against the bound master, or `InsufficientData`
    /// if either side has no features yet.
    pub fn similarity(&self) -> Result<f32> {
        let state = self.state.lock();
        let master = state
            .master
            .as_ref()
            .ok_or_else(|| EngineError::InsufficientData("no master call bound".to_string()))?;
        if state.features.is_empty() {
            return Err(EngineError::InsufficientData(
                "session has no accumulated features yet".to_string(),
            ));
        }
        callcoach_similarity::similarity(master.sequence.frames(), state.features.frames())
            .map_err(EngineError::from)
    }

    pub fn bound_master_id(&self) -> Option<String> {
        self.state.lock().master.as_ref().map(|m| m.id.clone())
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.buffer.clear();
        state.vad_buffer.clear();
        state.features.clear();
        state.vad.reset();
        state.master = None;
        self.mfcc.reset();
    }

    pub fn configure_vad(&self, config: VadConfig) {
        let mut state = self.state.lock();
        state.vad = VoiceActivityDetector::new(config.clone());
        state.vad_config = config;
    }

    pub fn vad_state(&self) -> VadState {
        self.state.lock().vad.state()
    }

    pub fn vad_config(&self) -> VadConfig {
        self.state.lock().vad_config.clone()
    }
}
