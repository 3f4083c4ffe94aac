//! Layered application settings, built from defaults, an optional file, and
//! environment variables — in that order of increasing priority.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{cache, cadence, harmonic, mfcc, pitch, session, vad};
use crate::ConfigError;

/// Runtime environment, mirrored from deployment tooling. Only affects how
/// strictly [`Settings::validate`] treats missing/out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Top-level settings for the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub mfcc: MfccConfig,

    #[serde(default)]
    pub pitch: PitchConfig,

    #[serde(default)]
    pub vad: VadConfig,

    #[serde(default)]
    pub harmonic: HarmonicConfig,

    #[serde(default)]
    pub cadence: CadenceConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate cross-field invariants. In development mode, violations are
    /// logged as warnings where a sensible fallback exists; in staging and
    /// production every violation is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_mfcc()?;
        self.validate_pitch()?;
        self.validate_cadence()?;
        self.validate_session()?;
        Ok(())
    }

    fn validate_mfcc(&self) -> Result<(), ConfigError> {
        if !self.mfcc.frame_size.is_power_of_two() {
            return Err(ConfigError::InvalidValue {
                field: "mfcc.frame_size".to_string(),
                message: format!("must be a power of two, got {}", self.mfcc.frame_size),
            });
        }
        if self.mfcc.hop_size == 0 || self.mfcc.hop_size > self.mfcc.frame_size {
            return Err(ConfigError::InvalidValue {
                field: "mfcc.hop_size".to_string(),
                message: "must be nonzero and no larger than frame_size".to_string(),
            });
        }
        if self.mfcc.num_coefficients == 0 || self.mfcc.num_coefficients > self.mfcc.num_filters {
            return Err(ConfigError::InvalidValue {
                field: "mfcc.num_coefficients".to_string(),
                message: "must be nonzero and no larger than num_filters".to_string(),
            });
        }
        Ok(())
    }

    fn validate_pitch(&self) -> Result<(), ConfigError> {
        if self.pitch.min_f0_hz <= 0.0 || self.pitch.min_f0_hz >= self.pitch.max_f0_hz {
            return Err(ConfigError::InvalidValue {
                field: "pitch.min_f0_hz".to_string(),
                message: "must be positive and less than max_f0_hz".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.pitch.yin_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "pitch.yin_threshold".to_string(),
                message: format!("must be in [0, 1), got {}", self.pitch.yin_threshold),
            });
        }
        Ok(())
    }

    fn validate_cadence(&self) -> Result<(), ConfigError> {
        if self.cadence.min_tempo_bpm <= 0.0 || self.cadence.min_tempo_bpm >= self.cadence.max_tempo_bpm
        {
            return Err(ConfigError::InvalidValue {
                field: "cadence.min_tempo_bpm".to_string(),
                message: "must be positive and less than max_tempo_bpm".to_string(),
            });
        }
        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        if self.session.max_buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_buffer_size".to_string(),
                message: "must be at least 1 sample".to_string(),
            });
        }
        if self.session.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_sessions".to_string(),
                message: "must allow at least 1 session".to_string(),
            });
        }
        Ok(())
    }
}

/// Filesystem locations the engine reads from and writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding master-call reference WAV recordings.
    #[serde(default = "default_master_call_dir")]
    pub master_call_dir: String,

    /// Directory holding cached `.mfc` feature files for master calls.
    #[serde(default = "default_feature_cache_dir")]
    pub feature_cache_dir: String,

    /// Directory recordings of session audio are written to, when enabled.
    #[serde(default = "default_recording_output_dir")]
    pub recording_output_dir: String,
}

fn default_master_call_dir() -> String {
    "data/master_calls".to_string()
}
fn default_feature_cache_dir() -> String {
    "data/feature_cache".to_string()
}
fn default_recording_output_dir() -> String {
    "data/recordings".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            master_call_dir: default_master_call_dir(),
            feature_cache_dir: default_feature_cache_dir(),
            recording_output_dir: default_recording_output_dir(),
        }
    }
}

/// MFCC front-end parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfccConfig {
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
    #[serde(default = "default_num_coefficients")]
    pub num_coefficients: usize,
    #[serde(default = "default_num_filters")]
    pub num_filters: usize,
    #[serde(default = "default_pre_emphasis")]
    pub pre_emphasis: f32,
    #[serde(default = "default_lifter_length")]
    pub lifter_length: usize,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_frame_size() -> usize {
    mfcc::FRAME_SIZE
}
fn default_hop_size() -> usize {
    mfcc::HOP_SIZE
}
fn default_num_coefficients() -> usize {
    mfcc::NUM_COEFFICIENTS
}
fn default_num_filters() -> usize {
    mfcc::NUM_FILTERS
}
fn default_pre_emphasis() -> f32 {
    mfcc::PRE_EMPHASIS
}
fn default_lifter_length() -> usize {
    mfcc::LIFTER_LENGTH
}
fn default_sample_rate() -> u32 {
    mfcc::DEFAULT_SAMPLE_RATE
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            hop_size: default_hop_size(),
            num_coefficients: default_num_coefficients(),
            num_filters: default_num_filters(),
            pre_emphasis: default_pre_emphasis(),
            lifter_length: default_lifter_length(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// YIN pitch tracker parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchConfig {
    #[serde(default = "default_yin_threshold")]
    pub yin_threshold: f32,
    #[serde(default = "default_min_f0")]
    pub min_f0_hz: f32,
    #[serde(default = "default_max_f0")]
    pub max_f0_hz: f32,
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

fn default_yin_threshold() -> f32 {
    pitch::YIN_THRESHOLD
}
fn default_min_f0() -> f32 {
    pitch::MIN_F0_HZ
}
fn default_max_f0() -> f32 {
    pitch::MAX_F0_HZ
}
fn default_smoothing_alpha() -> f32 {
    pitch::SMOOTHING_ALPHA
}
fn default_min_confidence() -> f32 {
    pitch::MIN_CONFIDENCE
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            yin_threshold: default_yin_threshold(),
            min_f0_hz: default_min_f0(),
            max_f0_hz: default_max_f0(),
            smoothing_alpha: default_smoothing_alpha(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// Voice activity detector parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    #[serde(default = "default_energy_threshold")]
    pub energy_threshold: f32,
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f32,
    #[serde(default = "default_min_active_frames")]
    pub min_active_frames: usize,
    /// Consecutive inactive windows required before `Active` gives way to
    /// `Hangover`. Independent of `hangover_frames`, which instead gates
    /// `Hangover` falling back to `Silent`.
    #[serde(default = "default_min_silence")]
    pub min_silence: usize,
    #[serde(default = "default_hangover_frames")]
    pub hangover_frames: usize,
    /// Duration of one VAD analysis window, in milliseconds.
    #[serde(default = "default_vad_window_ms")]
    pub window_ms: u32,
}

fn default_energy_threshold() -> f32 {
    vad::ENERGY_THRESHOLD
}
fn default_peak_threshold() -> f32 {
    vad::PEAK_THRESHOLD
}
fn default_min_active_frames() -> usize {
    vad::MIN_ACTIVE_FRAMES
}
fn default_min_silence() -> usize {
    vad::MIN_SILENCE
}
fn default_hangover_frames() -> usize {
    vad::HANGOVER_FRAMES
}
fn default_vad_window_ms() -> u32 {
    vad::WINDOW_MS
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: default_energy_threshold(),
            peak_threshold: default_peak_threshold(),
            min_active_frames: default_min_active_frames(),
            min_silence: default_min_silence(),
            hangover_frames: default_hangover_frames(),
            window_ms: default_vad_window_ms(),
        }
    }
}

/// Harmonic/spectral analyzer parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonicConfig {
    #[serde(default = "default_rolloff_threshold")]
    pub rolloff_threshold: f32,
    #[serde(default = "default_num_harmonics")]
    pub num_harmonics: usize,
    #[serde(default = "default_harmonic_search_window")]
    pub harmonic_search_window: f32,
    #[serde(default = "default_max_formants")]
    pub max_formants: usize,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_rolloff_threshold() -> f32 {
    harmonic::ROLLOFF_THRESHOLD
}
fn default_num_harmonics() -> usize {
    harmonic::NUM_HARMONICS
}
fn default_harmonic_search_window() -> f32 {
    harmonic::HARMONIC_SEARCH_WINDOW
}
fn default_max_formants() -> usize {
    harmonic::MAX_FORMANTS
}
fn default_true() -> bool {
    true
}

impl Default for HarmonicConfig {
    fn default() -> Self {
        Self {
            rolloff_threshold: default_rolloff_threshold(),
            num_harmonics: default_num_harmonics(),
            harmonic_search_window: default_harmonic_search_window(),
            max_formants: default_max_formants(),
            enabled: default_true(),
        }
    }
}

/// Cadence/rhythm analyzer parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default = "default_onset_frame_size")]
    pub onset_frame_size: usize,
    #[serde(default = "default_onset_hop_size")]
    pub onset_hop_size: usize,
    #[serde(default = "default_onset_threshold_k")]
    pub onset_threshold_k: f32,
    #[serde(default = "default_min_tempo")]
    pub min_tempo_bpm: f32,
    #[serde(default = "default_max_tempo")]
    pub max_tempo_bpm: f32,
    #[serde(default = "default_min_syllable_gap")]
    pub min_syllable_gap_secs: f32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Gate on the second-pass syllable-timing breakdown, mirroring the
    /// original engine's `Config::enableSyllableAnalysis`.
    #[serde(default = "default_true")]
    pub enable_syllable_analysis: bool,
}

fn default_onset_frame_size() -> usize {
    cadence::ONSET_FRAME_SIZE
}
fn default_onset_hop_size() -> usize {
    cadence::ONSET_HOP_SIZE
}
fn default_onset_threshold_k() -> f32 {
    cadence::ONSET_THRESHOLD_K
}
fn default_min_tempo() -> f32 {
    cadence::MIN_TEMPO_BPM
}
fn default_max_tempo() -> f32 {
    cadence::MAX_TEMPO_BPM
}
fn default_min_syllable_gap() -> f32 {
    cadence::MIN_SYLLABLE_GAP_SECS
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            onset_frame_size: default_onset_frame_size(),
            onset_hop_size: default_onset_hop_size(),
            onset_threshold_k: default_onset_threshold_k(),
            min_tempo_bpm: default_min_tempo(),
            max_tempo_bpm: default_max_tempo(),
            min_syllable_gap_secs: default_min_syllable_gap(),
            enabled: default_true(),
            enable_syllable_analysis: default_true(),
        }
    }
}

/// Master-call cache parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_cached_masters")]
    pub max_cached_masters: usize,
}

fn default_max_cached_masters() -> usize {
    cache::DEFAULT_MAX_CACHED_MASTERS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cached_masters: default_max_cached_masters(),
        }
    }
}

/// Session manager parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_buffer_size() -> usize {
    session::DEFAULT_MAX_BUFFER_SIZE
}
fn default_max_sessions() -> usize {
    session::DEFAULT_MAX_SESSIONS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: default_max_buffer_size(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Logging/tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from an optional config file and environment variables.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`CALLCOACH_` prefix, `__` nesting separator)
/// 2. `config/{env}.toml` (if `env` is given)
/// 3. `config/default.toml`
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("CALLCOACH")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_frame_size() {
        let mut settings = Settings::default();
        settings.mfcc.frame_size = 500;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_hop_size_larger_than_frame() {
        let mut settings = Settings::default();
        settings.mfcc.hop_size = settings.mfcc.frame_size + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_inverted_pitch_bounds() {
        let mut settings = Settings::default();
        settings.pitch.min_f0_hz = 1000.0;
        settings.pitch.max_f0_hz = 100.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_buffer_size() {
        let mut settings = Settings::default();
        settings.session.max_buffer_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn load_settings_falls_back_to_defaults_without_files() {
        let settings = load_settings(None).expect("defaults alone must validate");
        assert_eq!(settings.mfcc.num_coefficients, mfcc::NUM_COEFFICIENTS);
    }
}
