//! Voice activity detector: a small state machine driven by two cheap
//! per-window activity votes (RMS energy and spectral peak), with
//! hysteresis so brief dips inside an utterance don't chop it up.

use callcoach_config::VadConfig;

/// Voice activity detector states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadState {
    /// No activity; the common resting state.
    #[default]
    Silent,
    /// Activity just started; not yet confirmed.
    Candidate,
    /// Confirmed speech/call activity.
    Active,
    /// Activity just stopped; tolerating a short gap before falling back
    /// to `Silent`.
    Hangover,
}

/// Per-window verdict returned alongside the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    Silent,
    CandidateStart,
    Confirmed,
    Continuing,
    HangoverStart,
    Ended,
}

/// Stateful voice activity detector. Not `Sync` by itself — callers that
/// share one across threads wrap it the way the session manager does, in a
/// `parking_lot::Mutex`.
pub struct VoiceActivityDetector {
    config: VadConfig,
    state: VadState,
    active_frames: usize,
    inactive_frames: usize,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            state: VadState::Silent,
            active_frames: 0,
            inactive_frames: 0,
        }
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = VadState::Silent;
        self.active_frames = 0;
        self.inactive_frames = 0;
    }

    /// Feed one window of samples and advance the state machine.
    pub fn process_window(&mut self, window: &[f32]) -> (VadState, VadEvent) {
        let is_active = self.is_window_active(window);
        self.update(is_active)
    }

    fn is_window_active(&self, window: &[f32]) -> bool {
        if window.is_empty() {
            return false;
        }
        let energy = mean_squared_energy(window);
        let peak = window.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        energy >= self.config.energy_threshold || peak >= self.config.peak_threshold
    }

    fn update(&mut self, is_active: bool) -> (VadState, VadEvent) {
        let event = match (self.state, is_active) {
            (VadState::Silent, true) => {
                self.state = VadState::Candidate;
                self.active_frames = 1;
                VadEvent::CandidateStart
            }

            (VadState::Silent, false) => VadEvent::Silent,

            (VadState::Candidate, true) => {
                self.active_frames += 1;
                if self.active_frames >= self.config.min_active_frames {
                    self.state = VadState::Active;
                    VadEvent::Confirmed
                } else {
                    VadEvent::CandidateStart
                }
            }

            (VadState::Candidate, false) => {
                self.state = VadState::Silent;
                self.active_frames = 0;
                VadEvent::Silent
            }

            (VadState::Active, true) => {
                self.inactive_frames = 0;
                VadEvent::Continuing
            }

            (VadState::Active, false) => {
                self.inactive_frames += 1;
                if self.inactive_frames >= self.config.min_silence {
                    self.state = VadState::Hangover;
                    self.inactive_frames = 1;
                    VadEvent::HangoverStart
                } else {
                    VadEvent::Continuing
                }
            }

            (VadState::Hangover, true) => {
                self.state = VadState::Active;
                self.inactive_frames = 0;
                VadEvent::Continuing
            }

            (VadState::Hangover, false) => {
                self.inactive_frames += 1;
                if self.inactive_frames >= self.config.hangover_frames {
                    self.state = VadState::Silent;
                    self.active_frames = 0;
                    self.inactive_frames = 0;
                    VadEvent::Ended
                } else {
                    VadEvent::HangoverStart
                }
            }
        };
        (self.state, event)
    }
}

/// Mean squared amplitude of the window, `mean(x^2)` with no square root,
/// matching the threshold scale the original engine's energy votes use.
fn mean_squared_energy(window: &[f32]) -> f32 {
    let sum_sq: f32 = window.iter().map(|s| s * s).sum();
    sum_sq / window.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VadConfig {
        VadConfig {
            energy_threshold: 0.1,
            peak_threshold: 0.3,
            min_active_frames: 2,
            min_silence: 1,
            hangover_frames: 2,
            window_ms: 20,
        }
    }

    fn loud() -> Vec<f32> {
        vec![0.5; 64]
    }

    fn quiet() -> Vec<f32> {
        vec![0.0; 64]
    }

    #[test]
    fn silence_stays_silent() {
        let mut vad = VoiceActivityDetector::new(config());
        let (state, event) = vad.process_window(&quiet());
        assert_eq!(state, VadState::Silent);
        assert_eq!(event, VadEvent::Silent);
    }

    #[test]
    fn sustained_activity_confirms_then_continues() {
        let mut vad = VoiceActivityDetector::new(config());
        let (state, event) = vad.process_window(&loud());
        assert_eq!(state, VadState::Candidate);
        assert_eq!(event, VadEvent::CandidateStart);

        let (state, event) = vad.process_window(&loud());
        assert_eq!(state, VadState::Active);
        assert_eq!(event, VadEvent::Confirmed);

        let (state, event) = vad.process_window(&loud());
        assert_eq!(state, VadState::Active);
        assert_eq!(event, VadEvent::Continuing);
    }

    #[test]
    fn brief_dip_inside_hangover_recovers_to_active() {
        let mut vad = VoiceActivityDetector::new(config());
        vad.process_window(&loud());
        vad.process_window(&loud()); // now Active

        let (state, event) = vad.process_window(&quiet());
        assert_eq!(state, VadState::Hangover);
        assert_eq!(event, VadEvent::HangoverStart);

        let (state, event) = vad.process_window(&loud());
        assert_eq!(state, VadState::Active);
        assert_eq!(event, VadEvent::Continuing);
    }

    #[test]
    fn hangover_expires_to_silent() {
        let mut vad = VoiceActivityDetector::new(config());
        vad.process_window(&loud());
        vad.process_window(&loud()); // Active
        vad.process_window(&quiet()); // Hangover, inactive_frames=1
        let (state, event) = vad.process_window(&quiet()); // inactive_frames=2 >= 2
        assert_eq!(state, VadState::Silent);
        assert_eq!(event, VadEvent::Ended);
    }

    #[test]
    fn min_silence_above_one_tolerates_a_single_quiet_window_in_active() {
        let mut config = config();
        config.min_silence = 2;
        let mut vad = VoiceActivityDetector::new(config);
        vad.process_window(&loud());
        vad.process_window(&loud()); // Active

        let (state, event) = vad.process_window(&quiet()); // inactive_frames=1 < 2
        assert_eq!(state, VadState::Active);
        assert_eq!(event, VadEvent::Continuing);

        let (state, event) = vad.process_window(&quiet()); // inactive_frames=2 >= 2
        assert_eq!(state, VadState::Hangover);
        assert_eq!(event, VadEvent::HangoverStart);
    }

    #[test]
    fn candidate_drops_back_to_silent_on_early_silence() {
        let mut vad = VoiceActivityDetector::new(config());
        vad.process_window(&loud());
        let (state, event) = vad.process_window(&quiet());
        assert_eq!(state, VadState::Silent);
        assert_eq!(event, VadEvent::Silent);
    }

    #[test]
    fn reset_clears_state() {
        let mut vad = VoiceActivityDetector::new(config());
        vad.process_window(&loud());
        vad.process_window(&loud());
        assert_eq!(vad.state(), VadState::Active);
        vad.reset();
        assert_eq!(vad.state(), VadState::Silent);
    }
}
