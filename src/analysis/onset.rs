/*
Onset/Offset Detection
======================

A two-state hysteresis machine over the level envelope, with the pitch
confidence of the same window as an inhibit input.

    ┌──────────┐  level >= attack_threshold   ┌────────┐
    │ Inactive │ ───────────────────────────→ │ Active │
    └──────────┘                              └────────┘
         ↑        level < release_threshold        │
         └─────────────────────────────────────────┘

Attack lookahead: the reported onset frame is the trigger frame minus the
lookahead, so downstream capture includes the transient that built up
before the envelope crossed the threshold. The onset can therefore precede
the current window, and even be negative right after startup; indices are
signed for that reason.

Release hold: the reported offset frame is the trigger frame plus the hold
time, padding the tail of the event.

Inhibit: a window with confident pitch means a note is still sounding even
if the envelope briefly dips, so while Active the scan for a release is
skipped for the remainder of any window whose pitch confidence exceeds the
inhibit threshold. State is unchanged.

Scanning resumes at the transition point within the same window, so one
window can produce several onset/offset pairs.
*/

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OnsetConfig {
    /// Level at or above which an onset fires.
    pub attack_threshold: f32,
    /// Seconds subtracted from the onset frame to catch the transient.
    pub attack_lookahead: f32,
    /// Level below which an offset fires. Must not exceed the attack
    /// threshold or the scan could livelock.
    pub release_threshold: f32,
    /// Seconds added to the offset frame to pad the event tail.
    pub release_hold_time: f32,
    /// Pitch confidence above which release scanning is inhibited.
    pub inhibit_threshold: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            attack_threshold: 0.1,
            attack_lookahead: 0.05,
            release_threshold: 0.01,
            release_hold_time: 0.05,
            inhibit_threshold: 0.5,
        }
    }
}

/// A state transition, in absolute frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OnsetEvent {
    Onset { frame: i64 },
    Offset { frame: i64 },
}

/// Detector state published to consumers. Transitions happen only inside
/// [`OnsetDetector::process`]; the state persists across windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OnsetState {
    pub active: bool,
    pub attack_frame: Option<i64>,
    pub release_frame: Option<i64>,
}

pub struct OnsetDetector {
    attack_threshold: f32,
    attack_lookahead: i64, // frames
    release_threshold: f32,
    release_hold: i64, // frames
    inhibit_threshold: f32,
    state: OnsetState,
}

impl OnsetDetector {
    pub fn new(config: OnsetConfig, sample_rate: f32) -> Self {
        assert!(sample_rate > 0.0);
        assert!(
            config.release_threshold <= config.attack_threshold,
            "release threshold above attack threshold would livelock the scan"
        );
        Self {
            attack_threshold: config.attack_threshold,
            attack_lookahead: (config.attack_lookahead * sample_rate) as i64,
            release_threshold: config.release_threshold,
            release_hold: (config.release_hold_time * sample_rate) as i64,
            inhibit_threshold: config.inhibit_threshold,
            state: OnsetState::default(),
        }
    }

    pub fn state(&self) -> OnsetState {
        self.state
    }

    /// Scan one window of level samples starting at absolute frame
    /// `window_start`, pushing a transition event per state change.
    ///
    /// `pitch_confidence` is the confidence of the same window's pitch
    /// estimate and inhibits release scanning when high.
    pub fn process(
        &mut self,
        window_start: u64,
        levels: &[f32],
        pitch_confidence: f32,
        events: &mut Vec<OnsetEvent>,
    ) {
        let mut i = 0;
        while i < levels.len() {
            if !self.state.active {
                while i < levels.len() && levels[i] < self.attack_threshold {
                    i += 1;
                }
                if i == levels.len() {
                    break;
                }
                let frame = window_start as i64 + i as i64 - self.attack_lookahead;
                self.state.active = true;
                self.state.attack_frame = Some(frame);
                self.state.release_frame = None;
                events.push(OnsetEvent::Onset { frame });
                // Resume scanning at the trigger point in the active branch.
            } else {
                if pitch_confidence > self.inhibit_threshold {
                    // A confidently pitched window: the note is still
                    // sounding, skip release scanning until the next window.
                    break;
                }
                while i < levels.len() && levels[i] >= self.release_threshold {
                    i += 1;
                }
                if i == levels.len() {
                    break;
                }
                let frame = window_start as i64 + i as i64 + self.release_hold;
                self.state.active = false;
                self.state.release_frame = Some(frame);
                events.push(OnsetEvent::Offset { frame });
            }
        }
    }
}
