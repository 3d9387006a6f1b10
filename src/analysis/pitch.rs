use crate::analysis::autocorrelation::SpectralAutocorrelator;

/*
Autocorrelation Pitch Estimation
================================

A periodic signal is maximally similar to itself shifted by one period, so
the fundamental frequency shows up as the strongest autocorrelation peak
away from lag 0.

Vocabulary
----------

  lag          Shift in samples at which the autocorrelation is evaluated.
               The dominant peak's lag is the signal's period.

  confidence   The normalized autocorrelation value at the chosen peak.
               1.0 means perfectly periodic; silence and noise score near 0.
               Consumers conventionally treat anything below 0.5 as
               "no pitch". That threshold is the caller's policy, not
               enforced here.

  cents        1/100th of a semitone, the fine deviation from the nearest
               note. +50 cents is a quarter tone sharp.

Finding the peak
----------------

The autocorrelation always starts at 1.0 (lag 0, by normalization) and
falls off through an initial positive lobe. We skip forward while values
stay positive, then take the global maximum of what remains:

    1.0 ┐
        │╲          peak = period
        │ ╲        ╱╲
    0.0 └──╲──────╱──╲────╱─→ lag
            ╲____╱    ╲__╱
           ↑skip this lobe

If no later value ever exceeds the first candidate, there is no second
peak: the window is silence or noise, and the result is zero confidence
and zero frequency. This outcome is frequent and not an error.

Lag to note
-----------

    frequency  = sample_rate / lag
    note_value = 12 * log2(frequency / 27.5)        (A0 = 27.5 Hz)

Rounding note_value gives the semitone index; the remainder in cents; the
index splits into an octave (per 12) and one of the 12 pitch classes
starting at A. Frequency resolution is quantized by the integer lag, so a
true tone at f is reported as sample_rate / round(sample_rate / f).
*/

/// The 12 chromatic pitch classes, starting at A to match the A0 = 27.5 Hz
/// reference used for note conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PitchClass {
    A,
    ASharp,
    B,
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
}

impl PitchClass {
    const ALL: [PitchClass; 12] = [
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
        }
    }
}

impl std::fmt::Display for PitchClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A musical note: pitch class, octave, and deviation in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Note {
    pub class: PitchClass,
    /// A-based octave number: A0 is 27.5 Hz, the octave increments at
    /// each A.
    pub octave: i32,
    /// Deviation from the named note, -50..=50 cents.
    pub cents: i32,
}

impl Note {
    /// Nearest note to a frequency in Hz. Returns `None` for frequencies
    /// at or below zero.
    pub fn from_frequency(frequency: f32) -> Option<Note> {
        if frequency <= 0.0 {
            return None;
        }
        const FREQ_A0: f32 = 27.5;
        let note_value = 12.0 * (frequency / FREQ_A0).log2();
        let semitone = note_value.round() as i64;
        let cents = ((note_value - semitone as f32) * 100.0).round() as i32;
        // Euclidean split keeps sub-A0 frequencies in range instead of
        // indexing the class table with a negative remainder.
        let octave = semitone.div_euclid(12) as i32;
        let class = PitchClass::ALL[semitone.rem_euclid(12) as usize];
        Some(Note { class, octave, cents })
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.class, self.octave)?;
        if self.cents != 0 {
            write!(f, " {:+}c", self.cents)?;
        }
        Ok(())
    }
}

/// Pitch estimate for one analysis window. Immutable once produced; the
/// next window's result supersedes it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchResult {
    /// Period of the detected pitch in samples; 0 when no pitch was found.
    pub lag: usize,
    /// Autocorrelation value at the peak, roughly 0..=1.
    pub confidence: f32,
    /// Fundamental frequency in Hz; 0.0 when no pitch was found.
    pub frequency: f32,
    pub note: Option<Note>,
}

impl PitchResult {
    /// The "no pitch detected" result: silence or noise.
    pub const fn none() -> Self {
        Self {
            lag: 0,
            confidence: 0.0,
            frequency: 0.0,
            note: None,
        }
    }
}

impl Default for PitchResult {
    fn default() -> Self {
        Self::none()
    }
}

/// Estimates the fundamental frequency of fixed-length windows.
pub struct PitchEstimator {
    sample_rate: f32,
    autocorrelator: SpectralAutocorrelator,
}

impl PitchEstimator {
    /// `window_time` in seconds fixes the window length (and therefore the
    /// FFT size) for the estimator's lifetime.
    pub fn new(window_time: f64, sample_rate: f32) -> Self {
        let window_length = (window_time * sample_rate as f64) as usize;
        Self {
            sample_rate,
            autocorrelator: SpectralAutocorrelator::new(window_length),
        }
    }

    pub fn window_length(&self) -> usize {
        self.autocorrelator.window_length()
    }

    /// The autocorrelation of the most recent window, for visualization.
    pub fn autocorrelation(&self) -> &[f32] {
        self.autocorrelator.last()
    }

    pub fn estimate(&mut self, window: &[f32]) -> PitchResult {
        let ac = self.autocorrelator.compute(window);

        // Skip the initial positive lobe around lag 0.
        let mut i = 0;
        while i < ac.len() && ac[i] > 0.0 {
            i += 1;
        }
        if i >= ac.len() {
            return PitchResult::none();
        }

        // Global maximum of the remainder. The index only moves off 0 when
        // a later value strictly exceeds the first candidate, so a scan
        // that finds nothing reports lag 0, the "no pitch" marker.
        let mut max = ac[i];
        let mut max_i = 0;
        for (j, &value) in ac.iter().enumerate().skip(i + 1) {
            if value > max {
                max = value;
                max_i = j;
            }
        }
        if max_i == 0 {
            return PitchResult::none();
        }

        let frequency = self.sample_rate / max_i as f32;
        PitchResult {
            lag: max_i,
            confidence: max,
            frequency,
            note: Note::from_frequency(frequency),
        }
    }
}
