//! Pitch constants and pitch-name conversions.
//!
//! Pitches are real numbers in semitone space using the MIDI convention
//! (middle C = C4 = 60). Names use chromatic spelling: sharps on output,
//! sharps and flats accepted on input.

use crate::error::{ChordSpaceError, Result};

/// The default octave generator interval, in semitones.
pub const OCTAVE: f64 = 12.0;

/// Middle C in MIDI key numbers.
pub const MIDDLE_C: f64 = 60.0;

/// Middle C by its scientific name.
pub const C4: f64 = MIDDLE_C;

/// Default register range for revoicing searches: five octaves up from 0.
pub const DEFAULT_RANGE: f64 = 60.0;

/// Remainder of `pitch` modulo a generator interval, always in
/// `[0, generator)`. `rem_euclid` alone can land exactly on the generator
/// for inputs an ulp below a multiple, so the boundary folds back to 0.
pub fn modulo(pitch: f64, generator: f64) -> f64 {
    let r = pitch.rem_euclid(generator);
    if r >= generator {
        r - generator
    } else {
        r
    }
}

/// Pitch class of a pitch under the conventional 12-semitone octave.
pub fn epc(pitch: f64) -> f64 {
    modulo(pitch, OCTAVE)
}

/// Chromatic pitch class for a note name (`C`, `F#`, `Bb`, ...).
pub fn pitch_class_for_name(name: &str) -> Result<f64> {
    let pc = match name.trim().to_uppercase().as_str() {
        "C" => 0,
        "C#" | "DB" => 1,
        "D" => 2,
        "D#" | "EB" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "GB" => 6,
        "G" => 7,
        "G#" | "AB" => 8,
        "A" => 9,
        "A#" | "BB" => 10,
        "B" => 11,
        _ => {
            return Err(ChordSpaceError::Format(format!(
                "unknown pitch name: {}",
                name
            )))
        }
    };
    Ok(pc as f64)
}

/// Sharp-spelled name for the pitch class nearest a value.
pub fn name_for_pitch_class(pitch_class: f64) -> &'static str {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let index = modulo(pitch_class.round(), OCTAVE) as usize;
    NAMES[index % 12]
}

/// Name a pitch with its octave, e.g. `60 -> "C4"`.
pub fn name_for_pitch(pitch: f64) -> String {
    let rounded = pitch.round();
    let octave = (rounded / OCTAVE).floor() as i64 - 1;
    format!("{}{}", name_for_pitch_class(rounded), octave)
}

/// Parse one pitch token: either a real number (`"7"`, `"66.5"`) or a note
/// name with an optional octave (`"G"`, `"F#3"`, `"Bb-1"`; octave defaults
/// to 4).
pub fn parse_pitch(token: &str) -> Result<f64> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ChordSpaceError::Format("empty pitch token".to_string()));
    }
    if let Ok(value) = token.parse::<f64>() {
        if !value.is_finite() {
            return Err(ChordSpaceError::Format(format!(
                "non-finite pitch: {}",
                token
            )));
        }
        return Ok(value);
    }

    // Note name: 1 letter, optional accidental, optional signed octave.
    let upper = token.to_uppercase();
    let mut name_end = 1;
    let bytes = upper.as_bytes();
    if bytes.len() > 1 && (bytes[1] == b'#' || bytes[1] == b'B') {
        name_end = 2;
    }
    let (name_part, octave_part) = upper.split_at(name_end.min(upper.len()));
    let pitch_class = pitch_class_for_name(name_part)?;
    let octave: i32 = if octave_part.is_empty() {
        4
    } else {
        octave_part.parse().map_err(|_| {
            ChordSpaceError::Format(format!("invalid octave in pitch token: {}", token))
        })?
    };
    Ok(pitch_class + (octave as f64 + 1.0) * OCTAVE)
}
