//! The PITV coordinate system: dense integer indexing over all chords of
//! a fixed cardinality.
//!
//! A `Pitv` value is built once for a (voice count, space, register range)
//! configuration and is immutable afterwards, so shared references may be
//! read from any number of threads. It assigns every grid-aligned chord a
//! coordinate (P, I, T, V): prime-form index, inversion flag,
//! transposition, and octavewise voicing index.

use crate::error::{ChordSpaceError, Result};

use super::chord::{all_of_equivalence_class, Chord, Space};
use super::pitch;
use super::voice_leading::{index_for_octavewise_revoicing, octavewise_revoicing};

/// A position in PITV space. Each component lives in `[0, count_x)` of the
/// `Pitv` that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitvCoordinate {
    /// Prime-form index.
    pub p: u64,
    /// Inversion flag: 0 for the prime form, 1 for its reflection.
    pub i: u64,
    /// Transposition in grid steps.
    pub t: u64,
    /// Octavewise voicing index within the register.
    pub v: u64,
}

/// Coordinate system over all chords of one cardinality within a register.
#[derive(Debug, Clone)]
pub struct Pitv {
    voices: usize,
    space: Space,
    range: f64,
    modulus: u64,
    prime_forms: Vec<Chord>,
    count_v: u64,
}

impl Pitv {
    /// Enumerate the prime-form table for `voices` voices under the
    /// space's generator, with voicing indices spanning `[0, range]`.
    ///
    /// The generator must be integral and at least 1; `voices` at least 1;
    /// `range` finite and non-negative.
    pub fn new(voices: usize, space: Space, range: f64) -> Result<Self> {
        if voices < 1 {
            return Err(ChordSpaceError::Domain(
                "PITV requires at least one voice".to_string(),
            ));
        }
        let g = space.generator;
        let tol = space.tolerance;
        if !g.is_finite() || !tol.is_integral(g) || g < 1.0 {
            return Err(ChordSpaceError::Domain(format!(
                "PITV requires an integral generator >= 1, got {}",
                g
            )));
        }
        if !range.is_finite() || range < 0.0 {
            return Err(ChordSpaceError::Domain(format!(
                "register range must be finite and non-negative, got {}",
                range
            )));
        }
        let modulus = g.round() as u64;

        // Octave placements per voice at pitch class 0; the declared
        // voicing bound is this count raised to the cardinality.
        let mut steps = (range / g).round() as i64;
        if tol.gt(steps as f64 * g, range) {
            steps -= 1;
        }
        let per_voice = (steps + 1) as u64;
        let count_v = per_voice
            .checked_pow(voices as u32)
            .ok_or_else(|| {
                ChordSpaceError::Domain(format!(
                    "voicing space overflows: {}^{}",
                    per_voice, voices
                ))
            })?;

        let prime_forms = all_of_equivalence_class(voices, "OPTTI", space)?;
        log::debug!(
            "pitv: {} prime forms for {} voices, modulus {}, {} voicings",
            prime_forms.len(),
            voices,
            modulus,
            count_v
        );

        Ok(Pitv {
            voices,
            space,
            range,
            modulus,
            prime_forms,
            count_v,
        })
    }

    pub fn voices(&self) -> usize {
        self.voices
    }

    pub fn space(&self) -> Space {
        self.space
    }

    /// The register range voicing indices span.
    pub fn range(&self) -> f64 {
        self.range
    }

    /// The octave generator, as an integer grid step count.
    pub fn g(&self) -> u64 {
        self.modulus
    }

    /// Number of prime forms (OPTTI classes) of this cardinality.
    pub fn count_p(&self) -> u64 {
        self.prime_forms.len() as u64
    }

    /// Inversion states: prime and reflected.
    pub fn count_i(&self) -> u64 {
        2
    }

    /// Transposition states: one per grid step of the generator.
    pub fn count_t(&self) -> u64 {
        self.modulus
    }

    /// Declared bound on voicing indices. A concrete chord's own legal
    /// revoicing count may be smaller; indices beyond it are range errors
    /// at `to_chord`.
    pub fn count_v(&self) -> u64 {
        self.count_v
    }

    /// Total number of (P, I, T) cells.
    pub fn n(&self) -> u64 {
        self.count_p() * self.count_i() * self.count_t()
    }

    /// The prime form at index `p`.
    pub fn prime_form(&self, p: u64) -> Result<&Chord> {
        self.check_coordinate(PitvCoordinate { p, i: 0, t: 0, v: 0 })?;
        Ok(&self.prime_forms[p as usize])
    }

    fn check_coordinate(&self, c: PitvCoordinate) -> Result<()> {
        if c.p >= self.count_p()
            || c.i >= self.count_i()
            || c.t >= self.count_t()
            || c.v >= self.count_v()
        {
            return Err(ChordSpaceError::Range(format!(
                "coordinate (P {}, I {}, T {}, V {}) outside ({}, {}, {}, {})",
                c.p,
                c.i,
                c.t,
                c.v,
                self.count_p(),
                self.count_i(),
                self.count_t(),
                self.count_v()
            )));
        }
        Ok(())
    }

    /// The OP representative of a (P, I, T) cell.
    fn cell_op(&self, p: u64, i: u64, t: u64) -> Chord {
        let mut chord = self.prime_forms[p as usize].clone();
        if i == 1 {
            chord = chord.i();
        }
        chord.t(t as f64).e_op()
    }

    /// The chord at a coordinate: prime form `p`, reflected when `i` is 1,
    /// transposed by `t`, revoiced by index `v` within the register.
    /// Out-of-bounds coordinates are range errors, never clamped.
    pub fn to_chord(&self, coordinate: PitvCoordinate) -> Result<Chord> {
        self.check_coordinate(coordinate)?;
        let op = self.cell_op(coordinate.p, coordinate.i, coordinate.t);
        octavewise_revoicing(&op, coordinate.v, self.range)
    }

    /// The coordinate of a grid-aligned chord of the configured
    /// cardinality within the register. Inverse of `to_chord` for chords
    /// whose voices are sorted by (pitch class, then pitch) — note a
    /// duplicated pitch class must also be in ascending register; any
    /// other voice order round-trips to that normalized reordering.
    pub fn from_chord(&self, chord: &Chord) -> Result<PitvCoordinate> {
        if chord.k() != self.voices {
            return Err(ChordSpaceError::Domain(format!(
                "chord has {} voices, configuration indexes {}",
                chord.k(),
                self.voices
            )));
        }
        if chord.space() != self.space {
            return Err(ChordSpaceError::Domain(
                "chord lives in a different space than this configuration".to_string(),
            ));
        }
        let tol = self.space.tolerance;
        if !chord.point().iter().all(|p| tol.is_integral(p)) {
            return Err(ChordSpaceError::Domain(format!(
                "chord {} is not on the grid",
                chord
            )));
        }

        let op = chord.e_op();
        let mut found = None;
        'scan: for p in 0..self.count_p() {
            for i in 0..self.count_i() {
                for t in 0..self.count_t() {
                    if self.cell_op(p, i, t) == op {
                        found = Some((p, i, t));
                        break 'scan;
                    }
                }
            }
        }
        let (p, i, t) = found.ok_or_else(|| {
            ChordSpaceError::Domain(format!(
                "chord {} has no cell in this configuration",
                chord
            ))
        })?;

        // Voicing indices are measured against the sorted pitch-class
        // order the OP representative uses.
        let g = self.space.generator;
        let mut values: Vec<f64> = chord.point().iter().collect();
        values.sort_by(|&a, &b| {
            tol.cmp(pitch::modulo(a, g), pitch::modulo(b, g))
                .then(tol.cmp(a, b))
        });
        let normalized = Chord::from_pitches_in(values, self.space);
        let v = index_for_octavewise_revoicing(&normalized, self.range)?;
        Ok(PitvCoordinate { p, i, t, v })
    }

    /// Lazy enumeration of the OP representative of every (P, I, T) cell
    /// in ascending coordinate order. Restartable; safe to consume
    /// partially.
    pub fn list(&self) -> PitvIter<'_> {
        PitvIter {
            pitv: self,
            index: 0,
        }
    }
}

/// Iterator over a `Pitv`'s (P, I, T) cells. Yields `n()` chords.
pub struct PitvIter<'a> {
    pitv: &'a Pitv,
    index: u64,
}

impl Iterator for PitvIter<'_> {
    type Item = Chord;

    fn next(&mut self) -> Option<Chord> {
        if self.index >= self.pitv.n() {
            return None;
        }
        let cells_per_p = self.pitv.count_i() * self.pitv.count_t();
        let p = self.index / cells_per_p;
        let i = (self.index % cells_per_p) / self.pitv.count_t();
        let t = self.index % self.pitv.count_t();
        self.index += 1;
        Some(self.pitv.cell_op(p, i, t))
    }
}
