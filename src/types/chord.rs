//! The chord value type and its equivalence-operator family.
//!
//! A `Chord` is a point in pitch space with one dimension per voice, plus
//! per-voice attributes (duration, loudness, instrument, pan) that ride
//! along through every operator but never participate in equivalence. For
//! each equivalence relation X the engine provides `e_x` (the canonical
//! representative, a pure function returning a new chord) and `is_e_x`
//! (true exactly on fixed points of `e_x`, up to tolerance).
//!
//! The relations and their composition order follow the usual geometry of
//! chord space: O (octave), P (permutation), T (transposition), I
//! (inversion), R (register confinement), and their compounds OP, OPI,
//! OPT, OPTT, OPTI, OPTTI, RP, RPI, RPT, RPTT, RPTI, RPTTI.

use crate::error::{ChordSpaceError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::pitch::{self, OCTAVE};
use super::point::{Point, Tolerance};

/// Default duration attribute for a new voice.
pub const DEFAULT_DURATION: f64 = 1.0;
/// Default loudness attribute (MIDI velocity scale).
pub const DEFAULT_LOUDNESS: f64 = 80.0;
/// Default instrument number.
pub const DEFAULT_INSTRUMENT: f64 = 1.0;
/// Default stereo pan, centered.
pub const DEFAULT_PAN: f64 = 0.0;

/// Configuration for a chord space: the octave generator interval and the
/// numeric tolerance. Stored in every chord at construction; there is no
/// ambient global state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Space {
    pub generator: f64,
    pub tolerance: Tolerance,
}

impl Default for Space {
    fn default() -> Self {
        Space {
            generator: OCTAVE,
            tolerance: Tolerance::default(),
        }
    }
}

/// A chord: K voices in semitone pitch space with parallel per-voice
/// attribute arrays. Voices are not required to be sorted except
/// immediately after a canonicalizing operator has been applied.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chord {
    pitches: Point,
    duration: Vec<f64>,
    loudness: Vec<f64>,
    instrument: Vec<f64>,
    pan: Vec<f64>,
    space: Space,
}

impl Chord {
    /// Create a chord of `k` voices at the origin with default attributes.
    pub fn new(k: usize) -> Self {
        Self::with_space(k, Space::default())
    }

    /// Create a chord of `k` voices in an explicit space.
    pub fn with_space(k: usize, space: Space) -> Self {
        Chord {
            pitches: Point::zeroed(k),
            duration: vec![DEFAULT_DURATION; k],
            loudness: vec![DEFAULT_LOUDNESS; k],
            instrument: vec![DEFAULT_INSTRUMENT; k],
            pan: vec![DEFAULT_PAN; k],
            space,
        }
    }

    /// Create a chord from explicit pitch values in the default space.
    pub fn from_pitches(pitches: Vec<f64>) -> Self {
        Self::from_pitches_in(pitches, Space::default())
    }

    /// Create a chord from explicit pitch values in an explicit space.
    pub fn from_pitches_in(pitches: Vec<f64>, space: Space) -> Self {
        let k = pitches.len();
        Chord {
            pitches: Point::from_values(pitches),
            duration: vec![DEFAULT_DURATION; k],
            loudness: vec![DEFAULT_LOUDNESS; k],
            instrument: vec![DEFAULT_INSTRUMENT; k],
            pan: vec![DEFAULT_PAN; k],
            space,
        }
    }

    /// Build a chord from a textual chord name such as `"CM"`, `"F#m7"`,
    /// or `"Bbsus4"`. The root is placed in the zero octave.
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.trim();
        let mut chars = name.chars();
        let letter = chars.next().ok_or_else(|| {
            ChordSpaceError::Format("empty chord name".to_string())
        })?;
        if !letter.is_ascii_uppercase() || !('A'..='G').contains(&letter) {
            return Err(ChordSpaceError::Format(format!(
                "chord name must start with a note letter A-G: {}",
                name
            )));
        }
        let mut root_len = 1;
        if let Some(c) = name[1..].chars().next() {
            if c == '#' || c == 'b' {
                root_len = 2;
            }
        }
        let root = pitch::pitch_class_for_name(&name[..root_len])?;
        let quality = &name[root_len..];
        let intervals = intervals_for_quality(quality).ok_or_else(|| {
            ChordSpaceError::Format(format!("unknown chord quality: {:?}", quality))
        })?;
        Ok(Self::from_pitches(
            intervals.iter().map(|i| root + i).collect(),
        ))
    }

    /// Voice count.
    pub fn k(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    /// Supported cardinality bounds for OP-class enumeration under a
    /// generator modulus.
    pub fn k_range(modulus: f64) -> (usize, usize) {
        (1, modulus.abs().round().max(1.0) as usize)
    }

    pub fn space(&self) -> Space {
        self.space
    }

    pub fn tolerance(&self) -> Tolerance {
        self.space.tolerance
    }

    pub fn generator(&self) -> f64 {
        self.space.generator
    }

    /// The chord as a point in pitch space.
    pub fn point(&self) -> &Point {
        &self.pitches
    }

    pub fn pitch_values(&self) -> &[f64] {
        self.pitches.values()
    }

    fn check_voice(&self, voice: usize) -> Result<()> {
        if voice >= self.k() {
            return Err(ChordSpaceError::Range(format!(
                "voice index {} out of bounds for {} voices",
                voice,
                self.k()
            )));
        }
        Ok(())
    }

    pub fn pitch(&self, voice: usize) -> Result<f64> {
        self.check_voice(voice)?;
        Ok(self.pitches[voice])
    }

    pub fn set_pitch(&mut self, voice: usize, pitch: f64) -> Result<()> {
        self.check_voice(voice)?;
        self.pitches.set(voice, pitch)
    }

    pub fn duration(&self, voice: usize) -> Result<f64> {
        self.check_voice(voice)?;
        Ok(self.duration[voice])
    }

    pub fn set_duration(&mut self, voice: usize, duration: f64) -> Result<()> {
        self.check_voice(voice)?;
        self.duration[voice] = duration;
        Ok(())
    }

    pub fn loudness(&self, voice: usize) -> Result<f64> {
        self.check_voice(voice)?;
        Ok(self.loudness[voice])
    }

    pub fn set_loudness(&mut self, voice: usize, loudness: f64) -> Result<()> {
        self.check_voice(voice)?;
        self.loudness[voice] = loudness;
        Ok(())
    }

    pub fn instrument(&self, voice: usize) -> Result<f64> {
        self.check_voice(voice)?;
        Ok(self.instrument[voice])
    }

    pub fn set_instrument(&mut self, voice: usize, instrument: f64) -> Result<()> {
        self.check_voice(voice)?;
        self.instrument[voice] = instrument;
        Ok(())
    }

    pub fn pan(&self, voice: usize) -> Result<f64> {
        self.check_voice(voice)?;
        Ok(self.pan[voice])
    }

    pub fn set_pan(&mut self, voice: usize, pan: f64) -> Result<()> {
        self.check_voice(voice)?;
        self.pan[voice] = pan;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    pub fn min_pitch(&self) -> Option<f64> {
        self.pitches.min()
    }

    pub fn max_pitch(&self) -> Option<f64> {
        self.pitches.max()
    }

    /// Spread of the chord's pitches (max - min).
    pub fn span(&self) -> f64 {
        self.pitches.span()
    }

    /// Sum of the pitches; the chord's layer in the unison-diagonal sense.
    pub fn layer(&self) -> f64 {
        self.pitches.sum()
    }

    /// Mean pitch; 0 for the empty chord.
    pub fn centroid(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.layer() / self.k() as f64
        }
    }

    /// Smallest interval between any two voices.
    pub fn min_interval(&self) -> Option<f64> {
        self.pairwise_intervals().reduce(f64::min)
    }

    /// Largest interval between any two voices.
    pub fn max_interval(&self) -> Option<f64> {
        self.pairwise_intervals().reduce(f64::max)
    }

    fn pairwise_intervals(&self) -> impl Iterator<Item = f64> + '_ {
        let values = self.pitch_values();
        (0..values.len()).flat_map(move |i| {
            (i + 1..values.len()).map(move |j| (values[j] - values[i]).abs())
        })
    }

    pub fn distance_to_origin(&self) -> f64 {
        self.pitches.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Distance to the unison diagonal (the line of all-equal pitches).
    pub fn distance_to_unison_diagonal(&self) -> f64 {
        let c = self.centroid();
        self.pitches
            .iter()
            .map(|x| (x - c) * (x - c))
            .sum::<f64>()
            .sqrt()
    }

    /// True when some voice sounds this pitch, within tolerance.
    pub fn contains(&self, pitch: f64) -> bool {
        let tol = self.space.tolerance;
        self.pitches.iter().any(|p| tol.eq(p, pitch))
    }

    /// Number of voices sounding this pitch, within tolerance.
    pub fn count(&self, pitch: f64) -> usize {
        let tol = self.space.tolerance;
        self.pitches.iter().filter(|&p| tol.eq(p, pitch)).count()
    }

    /// Per-voice floor to the integer grid.
    pub fn floored(&self) -> Chord {
        self.with_pitch_values(self.pitches.map(f64::floor).values().to_vec())
    }

    /// Per-voice ceiling to the integer grid.
    pub fn ceiled(&self) -> Chord {
        self.with_pitch_values(self.pitches.map(f64::ceil).values().to_vec())
    }

    // ------------------------------------------------------------------
    // Primitive transformations
    // ------------------------------------------------------------------

    /// Uniform transposition by `x` semitones.
    pub fn t(&self, x: f64) -> Chord {
        self.with_pitch_values(self.pitches.map(|p| p + x).values().to_vec())
    }

    /// Reflect every voice about an axis pitch.
    pub fn reflect(&self, axis: f64) -> Chord {
        self.with_pitch_values(self.pitches.map(|p| 2.0 * axis - p).values().to_vec())
    }

    /// Inversion: reflection about pitch 0.
    pub fn i(&self) -> Chord {
        self.reflect(0.0)
    }

    /// Rotate the voices (and their attributes) left by `n` positions.
    pub fn cycle(&self, n: i64) -> Chord {
        let k = self.k();
        if k == 0 {
            return self.clone();
        }
        let order: Vec<usize> = (0..k)
            .map(|i| ((i as i64 + n).rem_euclid(k as i64)) as usize)
            .collect();
        self.permuted(&order)
    }

    /// Octavewise voicing cycle: the bottom voice rises one generator and
    /// moves to the top. Applying `v` K times transposes the chord up one
    /// generator.
    pub fn v(&self) -> Chord {
        let k = self.k();
        if k == 0 {
            return self.clone();
        }
        let order: Vec<usize> = (1..k).chain(std::iter::once(0)).collect();
        let mut values: Vec<f64> = order.iter().map(|&i| self.pitches[i]).collect();
        values[k - 1] += self.space.generator;
        self.rebuilt(&order, values)
    }

    /// All K octavewise voicings of the chord's OP representative.
    pub fn voicings(&self) -> Vec<Chord> {
        let mut out = Vec::with_capacity(self.k());
        let mut current = self.e_op();
        for _ in 0..self.k() {
            let next = current.v();
            out.push(current);
            current = next;
        }
        out
    }

    /// All K! voice orderings of the chord.
    pub fn permutations(&self) -> Vec<Chord> {
        let mut orders = Vec::new();
        let mut current: Vec<usize> = (0..self.k()).collect();
        permute_orders(&mut current, 0, &mut orders);
        orders.iter().map(|order| self.permuted(order)).collect()
    }

    // ------------------------------------------------------------------
    // Equivalence operators
    // ------------------------------------------------------------------

    /// O: each voice reduced into `[0, generator)`, voice order preserved.
    pub fn e_o(&self) -> Chord {
        let g = self.space.generator;
        self.with_pitch_values(self.pitches.map(|p| pitch::modulo(p, g)).values().to_vec())
    }

    /// P: voices sorted ascending; attribute arrays permute along.
    pub fn e_p(&self) -> Chord {
        let tol = self.space.tolerance;
        let mut order: Vec<usize> = (0..self.k()).collect();
        order.sort_by(|&a, &b| {
            tol.cmp(self.pitches[a], self.pitches[b]).then(a.cmp(&b))
        });
        self.permuted(&order)
    }

    /// T: translated so the centroid is zero.
    pub fn e_t(&self) -> Chord {
        if self.is_empty() {
            return self.clone();
        }
        self.t(-self.centroid())
    }

    /// TT: translated so the lowest voice is zero; stays on the input grid.
    pub fn e_tt(&self) -> Chord {
        match self.min_pitch() {
            Some(lo) => self.t(-lo),
            None => self.clone(),
        }
    }

    /// I: the lex-smaller of the chord and its reflection about zero.
    pub fn e_i(&self) -> Chord {
        let reflected = self.i();
        self.lex_min(reflected)
    }

    /// OP: normal order. Octave reduction then ascending sort; duplicate
    /// pitch classes are legal and kept.
    pub fn e_op(&self) -> Chord {
        self.e_o().e_p()
    }

    /// OPI: the lex-smaller of the OP forms of the chord and its inversion.
    pub fn e_opi(&self) -> Chord {
        self.e_op().lex_min(self.i().e_op())
    }

    /// OPT: the tightest rotation of the normal order, translated so the
    /// centroid is zero (continuous form).
    pub fn e_opt(&self) -> Chord {
        self.tightest_rotation().e_t()
    }

    /// OPTT: the tightest rotation of the normal order, translated so the
    /// lowest voice is zero (grid form).
    pub fn e_optt(&self) -> Chord {
        self.tightest_rotation().e_tt()
    }

    /// OPTI: the lex-smaller of the OPT forms of the chord and its
    /// inversion; collapses mirror-image chords.
    pub fn e_opti(&self) -> Chord {
        self.e_opt().lex_min(self.i().e_opt())
    }

    /// OPTTI: the classic set-theory prime form on the grid.
    pub fn e_optti(&self) -> Chord {
        self.e_optt().lex_min(self.i().e_optt())
    }

    /// R: each voice clamped into the closed register `[0, range]`; no
    /// wraparound.
    pub fn e_r(&self, range: f64) -> Chord {
        self.with_pitch_values(
            self.pitches
                .map(|p| p.clamp(0.0, range.max(0.0)))
                .values()
                .to_vec(),
        )
    }

    /// RP: register clamp then ascending sort.
    pub fn e_rp(&self, range: f64) -> Chord {
        self.e_r(range).e_p()
    }

    /// RPI: the lex-smaller of the RP forms of the chord and its in-range
    /// reflection `x -> range - x`.
    pub fn e_rpi(&self, range: f64) -> Chord {
        self.e_rp(range).lex_min(self.reflect(range / 2.0).e_rp(range))
    }

    /// RPT: register clamp, sort, then translate the lowest voice to zero.
    pub fn e_rpt(&self, range: f64) -> Chord {
        self.e_rp(range).e_tt()
    }

    /// RPTT: grid translation is the only register-compatible translation,
    /// so this coincides with RPT.
    pub fn e_rptt(&self, range: f64) -> Chord {
        self.e_rpt(range)
    }

    /// RPTI: the lex-smaller of the RPT forms of the chord and its
    /// in-range reflection.
    pub fn e_rpti(&self, range: f64) -> Chord {
        self.e_rpt(range).lex_min(self.reflect(range / 2.0).e_rpt(range))
    }

    /// RPTTI: coincides with RPTI, as RPTT does with RPT.
    pub fn e_rptti(&self, range: f64) -> Chord {
        self.e_rpti(range)
    }

    // Fixed-point tests: true exactly when the operator leaves the chord
    // unchanged within tolerance, so the pair can never drift apart at
    // float boundaries.

    pub fn is_e_o(&self) -> bool {
        self.e_o() == *self
    }

    pub fn is_e_p(&self) -> bool {
        self.e_p() == *self
    }

    pub fn is_e_t(&self) -> bool {
        self.e_t() == *self
    }

    pub fn is_e_tt(&self) -> bool {
        self.e_tt() == *self
    }

    pub fn is_e_i(&self) -> bool {
        self.e_i() == *self
    }

    pub fn is_e_op(&self) -> bool {
        self.e_op() == *self
    }

    pub fn is_e_opi(&self) -> bool {
        self.e_opi() == *self
    }

    pub fn is_e_opt(&self) -> bool {
        self.e_opt() == *self
    }

    pub fn is_e_optt(&self) -> bool {
        self.e_optt() == *self
    }

    pub fn is_e_opti(&self) -> bool {
        self.e_opti() == *self
    }

    pub fn is_e_optti(&self) -> bool {
        self.e_optti() == *self
    }

    pub fn is_e_r(&self, range: f64) -> bool {
        self.e_r(range) == *self
    }

    pub fn is_e_rp(&self, range: f64) -> bool {
        self.e_rp(range) == *self
    }

    pub fn is_e_rpi(&self, range: f64) -> bool {
        self.e_rpi(range) == *self
    }

    pub fn is_e_rpt(&self, range: f64) -> bool {
        self.e_rpt(range) == *self
    }

    pub fn is_e_rptt(&self, range: f64) -> bool {
        self.e_rptt(range) == *self
    }

    pub fn is_e_rpti(&self, range: f64) -> bool {
        self.e_rpti(range) == *self
    }

    pub fn is_e_rptti(&self, range: f64) -> bool {
        self.e_rptti(range) == *self
    }

    // ------------------------------------------------------------------
    // Contextual transformations
    // ------------------------------------------------------------------

    /// Adjust voices of the root-position voicing (the tightest rotation
    /// of the normal order) by the given deltas, keyed on whether the
    /// translated third is major or minor. Other chords pass through the
    /// voicing unchanged.
    fn nr_adjust(&self, on_major: &[(usize, f64)], on_minor: &[(usize, f64)]) -> Chord {
        if self.k() < 3 {
            return self.clone();
        }
        let cv = self.tightest_rotation();
        let cvt = cv.e_tt();
        let tol = self.space.tolerance;
        let deltas = if tol.eq(cvt.pitches[1], 4.0) {
            on_major
        } else if tol.eq(cvt.pitches[1], 3.0) {
            on_minor
        } else {
            &[]
        };
        let mut values = cv.pitch_values().to_vec();
        for &(voice, delta) in deltas {
            values[voice] += delta;
        }
        cv.with_pitch_values(values)
    }

    /// Neo-Riemannian parallel: exchanges major and minor triads on the
    /// same root by moving the third a semitone.
    pub fn nr_p(&self) -> Chord {
        self.nr_adjust(&[(1, -1.0)], &[(1, 1.0)])
    }

    /// Neo-Riemannian leading-tone exchange: the major root falls a
    /// semitone, the minor fifth rises one.
    pub fn nr_l(&self) -> Chord {
        self.nr_adjust(&[(0, -1.0)], &[(2, 1.0)])
    }

    /// Neo-Riemannian relative: the major fifth rises a whole tone, the
    /// minor root falls one.
    pub fn nr_r(&self) -> Chord {
        self.nr_adjust(&[(2, 2.0)], &[(0, -2.0)])
    }

    /// Neo-Riemannian slide: minor triad a semitone above a major triad,
    /// sharing its third.
    pub fn nr_s(&self) -> Chord {
        self.nr_l().nr_p().nr_r()
    }

    /// Neo-Riemannian Nebenverwandt.
    pub fn nr_n(&self) -> Chord {
        self.nr_r().nr_l().nr_p()
    }

    /// Neo-Riemannian hexatonic pole.
    pub fn nr_h(&self) -> Chord {
        self.nr_l().nr_p().nr_l()
    }

    /// Neo-Riemannian dominant: transposition down a perfect fifth.
    pub fn nr_d(&self) -> Chord {
        self.t(-7.0)
    }

    /// Interchange by inversion (K): every voice reflected so pitch `p`
    /// becomes `s - p`, where `s` is the sum of the two lowest voices.
    /// Not reduced to any equivalence class.
    pub fn nr_k(&self) -> Chord {
        if self.k() < 2 {
            return self.clone();
        }
        let sorted = self.e_p();
        let center = sorted.pitches[0] + sorted.pitches[1];
        self.with_pitch_values(self.pitches.map(|p| center - p).values().to_vec())
    }

    /// True when some grid transposition of this chord matches `other`
    /// under OP.
    pub fn is_t_form_of(&self, other: &Chord) -> bool {
        let target = other.e_op();
        let steps = self.space.generator.ceil() as i64;
        (0..steps).any(|t| self.t(t as f64).e_op() == target)
    }

    /// True when some grid transposition of this chord's inversion
    /// matches `other` under OP.
    pub fn is_i_form_of(&self, other: &Chord) -> bool {
        self.i().is_t_form_of(other)
    }

    /// Contextual transposition (Q): T-forms of `m` transpose by `x`,
    /// I-forms by `-x`, any other chord is unchanged.
    pub fn q(&self, x: f64, m: &Chord) -> Chord {
        if self.is_t_form_of(m) {
            self.t(x)
        } else if self.is_i_form_of(m) {
            self.t(-x)
        } else {
            self.clone()
        }
    }

    /// Among the K cyclic rotations of the normal order (wrapping voices
    /// rise one generator), the one with the smallest span; ties break to
    /// the lexicographically smallest zero-based form, then to the lowest
    /// rotation index. The largest circular gap ends up as the wraparound,
    /// which is the standard prime-form packing rule.
    fn tightest_rotation(&self) -> Chord {
        let base = self.e_op();
        let k = base.k();
        if k == 0 {
            return base;
        }
        let g = self.space.generator;
        let tol = self.space.tolerance;

        let mut best: Option<(f64, Vec<i64>, Chord)> = None;
        for r in 0..k {
            let order: Vec<usize> = (0..k).map(|i| (r + i) % k).collect();
            let values: Vec<f64> = order
                .iter()
                .enumerate()
                .map(|(i, &j)| base.pitches[j] + if r + i >= k { g } else { 0.0 })
                .collect();
            let span = values[k - 1] - values[0];
            let zero_based: Vec<i64> = values
                .iter()
                .map(|&p| tol.quantize(p - values[0]))
                .collect();
            let better = match &best {
                None => true,
                Some((best_span, best_key, _)) => match tol.cmp(span, *best_span) {
                    Ordering::Less => true,
                    Ordering::Greater => false,
                    Ordering::Equal => zero_based < *best_key,
                },
            };
            if better {
                let candidate = base.rebuilt(&order, values);
                best = Some((span, zero_based, candidate));
            }
        }
        match best {
            Some((_, _, chord)) => chord,
            None => base,
        }
    }

    /// Lexicographic comparison of two chords' pitches under this chord's
    /// tolerance.
    pub fn cmp_chord(&self, other: &Chord) -> Ordering {
        self.pitches.cmp_with(&other.pitches, self.space.tolerance)
    }

    fn lex_min(&self, other: Chord) -> Chord {
        if self.cmp_chord(&other) != Ordering::Greater {
            self.clone()
        } else {
            other
        }
    }

    // ------------------------------------------------------------------
    // Naming and text
    // ------------------------------------------------------------------

    /// A human-readable name for the chord, derived from its pitch-class
    /// interval pattern, e.g. `"CM"`, `"Dm7"`. Falls back to the numeric
    /// text form when no quality matches.
    pub fn name(&self) -> String {
        let tol = self.space.tolerance;
        if self.k() >= 2 {
            let pcs: Vec<f64> = self
                .pitches
                .iter()
                .map(|p| pitch::modulo(p, OCTAVE))
                .collect();
            // Try each sounding pitch class as the root.
            for &root in &pcs {
                let mut intervals: Vec<i64> = pcs
                    .iter()
                    .map(|&pc| tol.quantize(pitch::modulo(pc - root, OCTAVE)))
                    .collect();
                intervals.sort_unstable();
                intervals.dedup();
                if let Some(quality) = quality_for_intervals(&intervals, tol) {
                    return format!("{}{}", pitch::name_for_pitch_class(root), quality);
                }
            }
        }
        self.to_string()
    }

    /// Multi-line descriptive summary: pitches, name, normal order, prime
    /// forms, and basic geometry.
    pub fn information(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{} {}\n", info_label("chord:"), self));
        out.push_str(&format!("{} {}\n", info_label("name:"), self.name()));
        out.push_str(&format!("{} {}\n", info_label("eOP:"), self.e_op()));
        out.push_str(&format!("{} {}\n", info_label("eOPTT:"), self.e_optt()));
        out.push_str(&format!("{} {}\n", info_label("eOPTTI:"), self.e_optti()));
        out.push_str(&format!(
            "{} span {} layer {} centroid {}\n",
            info_label("geometry:"),
            self.span(),
            self.layer(),
            self.centroid()
        ));
        out
    }

    pub(crate) fn with_pitch_values(&self, values: Vec<f64>) -> Chord {
        debug_assert_eq!(values.len(), self.k());
        Chord {
            pitches: Point::from_values(values),
            duration: self.duration.clone(),
            loudness: self.loudness.clone(),
            instrument: self.instrument.clone(),
            pan: self.pan.clone(),
            space: self.space,
        }
    }

    fn permuted(&self, order: &[usize]) -> Chord {
        let values: Vec<f64> = order.iter().map(|&i| self.pitches[i]).collect();
        self.rebuilt(order, values)
    }

    /// Permute the attribute arrays by `order` while installing explicit
    /// pitch values (used when a rotation also displaces octaves).
    fn rebuilt(&self, order: &[usize], values: Vec<f64>) -> Chord {
        debug_assert_eq!(order.len(), self.k());
        Chord {
            pitches: Point::from_values(values),
            duration: order.iter().map(|&i| self.duration[i]).collect(),
            loudness: order.iter().map(|&i| self.loudness[i]).collect(),
            instrument: order.iter().map(|&i| self.instrument[i]).collect(),
            pan: order.iter().map(|&i| self.pan[i]).collect(),
            space: self.space,
        }
    }
}

/// Equality is pitch-wise within the chord's own tolerance. Attributes and
/// spaces do not participate.
impl PartialEq for Chord {
    fn eq(&self, other: &Self) -> bool {
        self.pitches.eq_with(&other.pitches, self.space.tolerance)
    }
}

impl FromStr for Chord {
    type Err = ChordSpaceError;

    /// Parse a space- or comma-separated list of numeric pitches or pitch
    /// names: `"0 4 7"`, `"C4, E4, G4"`.
    fn from_str(s: &str) -> Result<Self> {
        let tokens: Vec<&str> = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(ChordSpaceError::Format(format!(
                "no pitches in chord text: {:?}",
                s
            )));
        }
        let mut pitches = Vec::with_capacity(tokens.len());
        for token in tokens {
            pitches.push(pitch::parse_pitch(token)?);
        }
        Ok(Chord::from_pitches(pitches))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.pitches.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Interval patterns for nameable chord qualities, in semitones above the
/// root. First match wins in `from_name`; `name` matches on the pattern
/// reduced to unique pitch classes.
const QUALITIES: &[(&str, &[f64])] = &[
    ("M", &[0.0, 4.0, 7.0]),
    ("m", &[0.0, 3.0, 7.0]),
    ("o", &[0.0, 3.0, 6.0]),
    ("+", &[0.0, 4.0, 8.0]),
    ("sus2", &[0.0, 2.0, 7.0]),
    ("sus4", &[0.0, 5.0, 7.0]),
    ("6", &[0.0, 4.0, 7.0, 9.0]),
    ("m6", &[0.0, 3.0, 7.0, 9.0]),
    ("7", &[0.0, 4.0, 7.0, 10.0]),
    ("M7", &[0.0, 4.0, 7.0, 11.0]),
    ("m7", &[0.0, 3.0, 7.0, 10.0]),
    ("o7", &[0.0, 3.0, 6.0, 9.0]),
    ("m7b5", &[0.0, 3.0, 6.0, 10.0]),
    ("mM7", &[0.0, 3.0, 7.0, 11.0]),
    ("+7", &[0.0, 4.0, 8.0, 10.0]),
    ("9", &[0.0, 4.0, 7.0, 10.0, 14.0]),
    ("M9", &[0.0, 4.0, 7.0, 11.0, 14.0]),
    ("m9", &[0.0, 3.0, 7.0, 10.0, 14.0]),
    ("add9", &[0.0, 4.0, 7.0, 14.0]),
];

fn intervals_for_quality(quality: &str) -> Option<&'static [f64]> {
    // Friendly aliases first, then the canonical table.
    let canonical = match quality {
        "" | "maj" => "M",
        "min" | "-" => "m",
        "dim" => "o",
        "aug" => "+",
        "sus" => "sus4",
        "maj7" => "M7",
        "min7" => "m7",
        "dim7" => "o7",
        "aug7" => "+7",
        other => other,
    };
    QUALITIES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, intervals)| *intervals)
}

fn quality_for_intervals(intervals: &[i64], tol: Tolerance) -> Option<&'static str> {
    for (name, pattern) in QUALITIES {
        let mut reduced: Vec<i64> = pattern
            .iter()
            .map(|&i| tol.quantize(pitch::modulo(i, OCTAVE)))
            .collect();
        reduced.sort_unstable();
        reduced.dedup();
        if reduced == intervals {
            return Some(name);
        }
    }
    None
}

/// Every canonical representative of an equivalence class for a voice
/// count, enumerated over the grid pitch classes of the space's generator
/// and sorted ascending. Supported tags: `OP`, `OPI`, `OPT`, `OPTT`,
/// `OPTI`, `OPTTI`; anything else is a format error. Requires an integral
/// generator.
pub fn all_of_equivalence_class(
    voices: usize,
    equivalence: &str,
    space: Space,
) -> Result<Vec<Chord>> {
    let reduce: fn(&Chord) -> Chord = match equivalence.to_uppercase().as_str() {
        "OP" => Chord::e_op,
        "OPI" => Chord::e_opi,
        "OPT" => Chord::e_opt,
        "OPTT" => Chord::e_optt,
        "OPTI" => Chord::e_opti,
        "OPTTI" => Chord::e_optti,
        _ => {
            return Err(ChordSpaceError::Format(format!(
                "unknown equivalence class: {:?}",
                equivalence
            )))
        }
    };
    if voices < 1 {
        return Err(ChordSpaceError::Domain(
            "equivalence class enumeration requires at least one voice".to_string(),
        ));
    }
    let g = space.generator;
    let tol = space.tolerance;
    if !g.is_finite() || !tol.is_integral(g) || g < 1.0 {
        return Err(ChordSpaceError::Domain(format!(
            "enumeration requires an integral generator >= 1, got {}",
            g
        )));
    }
    let modulus = g.round() as u64;

    // Every OP class has exactly one nondecreasing pitch-class tuple, so
    // enumerating multisets covers the space without the modulus^K blowup.
    let mut out: Vec<Chord> = Vec::new();
    let mut seen: Vec<Vec<i64>> = Vec::new();
    let mut tuple = vec![0u64; voices];
    enumerate_pitch_class_multisets(modulus, &mut tuple, &mut |pcs| {
        let chord = Chord::from_pitches_in(pcs.iter().map(|&pc| pc as f64).collect(), space);
        let canonical = reduce(&chord);
        let key = canonical.point().quantized(tol);
        if !seen.contains(&key) {
            seen.push(key);
            out.push(canonical);
        }
    });
    out.sort_by(|a, b| a.cmp_chord(b));
    Ok(out)
}

/// Visit every nondecreasing tuple of pitch classes below the modulus.
fn enumerate_pitch_class_multisets(
    modulus: u64,
    tuple: &mut [u64],
    f: &mut impl FnMut(&[u64]),
) {
    multiset_inner(modulus, 0, 0, tuple, f);
}

fn multiset_inner(
    modulus: u64,
    start: u64,
    depth: usize,
    tuple: &mut [u64],
    f: &mut impl FnMut(&[u64]),
) {
    if depth == tuple.len() {
        f(tuple);
        return;
    }
    for pc in start..modulus {
        tuple[depth] = pc;
        multiset_inner(modulus, pc, depth + 1, tuple, f);
    }
}

fn permute_orders(current: &mut Vec<usize>, start: usize, out: &mut Vec<Vec<usize>>) {
    if start == current.len() {
        out.push(current.clone());
        return;
    }
    for i in start..current.len() {
        current.swap(start, i);
        permute_orders(current, start + 1, out);
        current.swap(start, i);
    }
}

#[cfg(feature = "colored")]
fn info_label(text: &str) -> String {
    use colored::Colorize;
    text.cyan().bold().to_string()
}

#[cfg(not(feature = "colored"))]
fn info_label(text: &str) -> String {
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(pitches: &[f64]) -> Chord {
        Chord::from_pitches(pitches.to_vec())
    }

    #[test]
    fn test_construction_and_attributes() {
        let mut c = Chord::new(3);
        assert_eq!(c.k(), 3);
        assert_eq!(c.duration(0).unwrap(), DEFAULT_DURATION);
        assert_eq!(c.loudness(2).unwrap(), DEFAULT_LOUDNESS);

        c.set_pitch(1, 4.0).unwrap();
        assert_eq!(c.pitch(1).unwrap(), 4.0);
        assert!(c.set_pitch(3, 1.0).is_err());
        assert!(c.pan(5).is_err());
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        let c: Chord = "0 4 7".parse().unwrap();
        assert_eq!(c.pitch_values(), &[0.0, 4.0, 7.0]);
        let back: Chord = c.to_string().parse().unwrap();
        assert_eq!(back, c);

        let named: Chord = "C4, E4, G4".parse().unwrap();
        assert_eq!(named.pitch_values(), &[60.0, 64.0, 67.0]);

        assert!("".parse::<Chord>().is_err());
        assert!("0 X 7".parse::<Chord>().is_err());
    }

    #[test]
    fn test_from_name() {
        let cm = Chord::from_name("CM").unwrap();
        assert_eq!(cm.pitch_values(), &[0.0, 4.0, 7.0]);
        let dm = Chord::from_name("Dm").unwrap();
        assert_eq!(dm.pitch_values(), &[2.0, 5.0, 9.0]);
        let fs7 = Chord::from_name("F#7").unwrap();
        assert_eq!(fs7.pitch_values(), &[6.0, 10.0, 13.0, 16.0]);
        let bare = Chord::from_name("C").unwrap();
        assert_eq!(bare.pitch_values(), &[0.0, 4.0, 7.0]);

        assert!(Chord::from_name("Hm").is_err());
        assert!(Chord::from_name("Cxyz").is_err());
        assert!(Chord::from_name("").is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(chord(&[0.0, 4.0, 7.0]).name(), "CM");
        assert_eq!(chord(&[2.0, 5.0, 9.0]).name(), "Dm");
        assert_eq!(chord(&[67.0, 71.0, 74.0, 77.0]).name(), "G7");
        // Inversions still name the same chord.
        assert_eq!(chord(&[4.0, 7.0, 12.0]).name(), "CM");
    }

    #[test]
    fn test_e_p_sorts_and_permutes_attributes() {
        let mut c = chord(&[7.0, 0.0, 4.0]);
        c.set_loudness(0, 100.0).unwrap();
        let sorted = c.e_p();
        assert_eq!(sorted.pitch_values(), &[0.0, 4.0, 7.0]);
        // The loudness travels with the voice that had pitch 7.
        assert_eq!(sorted.loudness(2).unwrap(), 100.0);
        assert!(sorted.is_e_p());
        assert!(!c.is_e_p());
    }

    #[test]
    fn test_e_o_preserves_order() {
        let c = chord(&[13.0, -1.0, 24.5]);
        let reduced = c.e_o();
        assert_eq!(reduced.pitch_values(), &[1.0, 11.0, 0.5]);
        assert!(reduced.is_e_o());
    }

    #[test]
    fn test_e_o_folds_octave_boundary() {
        // Centroid translation leaves ulp-scale negative residues; octave
        // reduction must not emit a voice at the generator itself.
        let drifted = chord(&[0.1, 0.1, 0.1]).e_t().e_op();
        assert!(drifted.is_e_op());
        assert!(drifted
            .pitch_values()
            .iter()
            .all(|&p| (0.0..12.0).contains(&p)));
        assert_eq!(drifted.e_op(), drifted);

        let reduced = chord(&[-1e-16, 4.0, 7.0]).e_o();
        assert!(reduced
            .pitch_values()
            .iter()
            .all(|&p| (0.0..12.0).contains(&p)));
        assert_eq!(reduced.e_o(), reduced);
        assert!(reduced.is_e_o());
    }

    #[test]
    fn test_e_op_normal_order() {
        // Major and minor triads are already in normal order.
        assert_eq!(chord(&[0.0, 4.0, 7.0]).e_op(), chord(&[0.0, 4.0, 7.0]));
        assert_eq!(chord(&[0.0, 3.0, 7.0]).e_op(), chord(&[0.0, 3.0, 7.0]));
        // Doubled pitch classes are kept.
        assert_eq!(
            chord(&[12.0, 0.0, 7.0]).e_op().pitch_values(),
            &[0.0, 0.0, 7.0]
        );
    }

    #[test]
    fn test_e_t_and_e_tt() {
        let c = chord(&[60.0, 64.0, 67.0]);
        let t = c.e_t();
        assert!(c.tolerance().eq(t.centroid(), 0.0));
        let tt = c.e_tt();
        assert_eq!(tt.pitch_values(), &[0.0, 4.0, 7.0]);
        assert!(tt.is_e_tt());
    }

    #[test]
    fn test_e_optt_prime_forms() {
        // The major triad's tightest rotation is itself...
        assert_eq!(chord(&[0.0, 4.0, 7.0]).e_optt(), chord(&[0.0, 4.0, 7.0]));
        // ...and its inversion packs to the minor form.
        assert_eq!(chord(&[0.0, 5.0, 8.0]).e_optt(), chord(&[0.0, 3.0, 7.0]));
        // Prime form collapses the mirror pair.
        assert_eq!(
            chord(&[0.0, 4.0, 7.0]).e_optti(),
            chord(&[0.0, 5.0, 8.0]).e_optti()
        );
        assert_eq!(chord(&[0.0, 4.0, 7.0]).e_optti(), chord(&[0.0, 3.0, 7.0]));
    }

    #[test]
    fn test_e_i() {
        let c = chord(&[0.0, 4.0, 7.0]);
        let e = c.e_i();
        // The reflection (0 -4 -7) is lex-smaller than (0 4 7).
        assert_eq!(e.pitch_values(), &[0.0, -4.0, -7.0]);
        assert_eq!(e.e_i(), e);
    }

    #[test]
    fn test_r_family() {
        let c = chord(&[-3.0, 14.0, 7.0]);
        let r = c.e_r(12.0);
        assert_eq!(r.pitch_values(), &[0.0, 12.0, 7.0]);
        assert!(r.is_e_r(12.0));

        let rp = c.e_rp(12.0);
        assert_eq!(rp.pitch_values(), &[0.0, 7.0, 12.0]);

        let rpt = chord(&[3.0, 8.0, 10.0]).e_rpt(12.0);
        assert_eq!(rpt.pitch_values(), &[0.0, 5.0, 7.0]);
        assert!(rpt.is_e_rpt(12.0));
    }

    #[test]
    fn test_operator_totality_on_empty() {
        let empty = Chord::new(0);
        assert_eq!(empty.e_op(), empty);
        assert_eq!(empty.e_optti(), empty);
        assert_eq!(empty.e_rpti(12.0), empty);
        assert!(empty.is_e_op());
    }

    #[test]
    fn test_cycle_and_v() {
        let c = chord(&[0.0, 4.0, 7.0]);
        assert_eq!(c.cycle(1).pitch_values(), &[4.0, 7.0, 0.0]);
        assert_eq!(c.cycle(-1).pitch_values(), &[7.0, 0.0, 4.0]);
        assert_eq!(c.v().pitch_values(), &[4.0, 7.0, 12.0]);

        let voicings = c.voicings();
        assert_eq!(voicings.len(), 3);
        assert_eq!(voicings[0].pitch_values(), &[0.0, 4.0, 7.0]);
        assert_eq!(voicings[2].pitch_values(), &[7.0, 12.0, 16.0]);
    }

    #[test]
    fn test_permutations() {
        let c = chord(&[0.0, 4.0, 7.0]);
        let perms = c.permutations();
        assert_eq!(perms.len(), 6);
        assert!(perms.iter().any(|p| p.pitch_values() == [7.0, 0.0, 4.0]));
    }

    #[test]
    fn test_geometry() {
        let c = chord(&[0.0, 4.0, 7.0]);
        assert_eq!(c.span(), 7.0);
        assert_eq!(c.layer(), 11.0);
        assert!(c.contains(4.0));
        assert!(!c.contains(5.0));
        assert_eq!(c.min_interval(), Some(3.0));
        assert_eq!(c.max_interval(), Some(7.0));
        assert_eq!(chord(&[0.0, 0.0, 5.0]).count(0.0), 2);

        let fractional = chord(&[0.5, 4.2, 6.9]);
        assert_eq!(fractional.floored().pitch_values(), &[0.0, 4.0, 6.0]);
        assert_eq!(fractional.ceiled().pitch_values(), &[1.0, 5.0, 7.0]);
    }

    #[test]
    fn test_k_range() {
        assert_eq!(Chord::k_range(12.0), (1, 12));
        assert_eq!(Chord::k_range(24.0), (1, 24));
    }

    #[test]
    fn test_neo_riemannian_triads() {
        let cm = chord(&[0.0, 4.0, 7.0]);
        // P exchanges parallel major and minor, and is an involution.
        assert_eq!(cm.nr_p(), chord(&[0.0, 3.0, 7.0]));
        assert_eq!(cm.nr_p().nr_p(), cm);
        // R reaches the relative minor, L the leading-tone exchange.
        assert_eq!(cm.nr_r().e_op(), chord(&[0.0, 4.0, 9.0]));
        assert_eq!(cm.nr_l().e_op(), chord(&[4.0, 7.0, 11.0]));
        // Slide, Nebenverwandt, hexatonic pole, dominant.
        assert_eq!(cm.nr_s().e_op(), chord(&[1.0, 4.0, 8.0]));
        assert_eq!(cm.nr_n().e_op(), chord(&[0.0, 5.0, 8.0]));
        assert_eq!(cm.nr_h().e_op(), chord(&[3.0, 8.0, 11.0]));
        assert_eq!(cm.nr_d().e_op(), chord(&[0.0, 5.0, 9.0]));
        // Non-triadic chords pass through unchanged.
        let cluster = chord(&[0.0, 1.0, 2.0]);
        assert_eq!(cluster.nr_p().e_op(), cluster.e_op());
        assert_eq!(chord(&[0.0, 7.0]).nr_p(), chord(&[0.0, 7.0]));
    }

    #[test]
    fn test_k_and_q_transforms() {
        let cm = chord(&[0.0, 4.0, 7.0]);
        // K reflects about the sum of the two lowest voices.
        assert_eq!(cm.nr_k().pitch_values(), &[4.0, 0.0, -3.0]);
        assert_eq!(cm.nr_k().e_op(), chord(&[0.0, 4.0, 9.0]));

        assert!(cm.is_t_form_of(&chord(&[2.0, 6.0, 9.0])));
        assert!(!cm.is_t_form_of(&chord(&[0.0, 3.0, 7.0])));
        assert!(chord(&[0.0, 3.0, 7.0]).is_i_form_of(&cm));

        // Q transposes T-forms up and I-forms down.
        assert_eq!(cm.q(2.0, &cm), cm.t(2.0));
        let am = chord(&[0.0, 3.0, 7.0]);
        assert_eq!(am.q(2.0, &cm), am.t(-2.0));
        // Chords in neither form are unchanged.
        let cluster = chord(&[0.0, 1.0, 2.0]);
        assert_eq!(cluster.q(2.0, &cm), cluster);
    }

    #[test]
    fn test_all_of_equivalence_class() {
        let ops = all_of_equivalence_class(2, "OP", Space::default()).unwrap();
        assert_eq!(ops.len(), 78);
        assert!(ops.iter().all(|c| c.is_e_op()));

        // Dyads reduce to the seven interval classes.
        let primes = all_of_equivalence_class(2, "OPTTI", Space::default()).unwrap();
        assert_eq!(primes.len(), 7);
        assert!(primes.iter().all(|c| c.is_e_optti()));
        assert_eq!(primes[0], chord(&[0.0, 0.0]));
        assert_eq!(primes[6], chord(&[0.0, 6.0]));

        assert!(all_of_equivalence_class(2, "XYZ", Space::default()).is_err());
        assert!(all_of_equivalence_class(0, "OP", Space::default()).is_err());
    }
}
