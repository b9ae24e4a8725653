//! Voice-leading distances, revoicing enumeration, and optimal transition
//! search between chords.
//!
//! Everything here is a free function: a voice leading is a property of a
//! pair of chords, not of either one. All searches are bounded
//! combinatorial loops; callers control cost through the register range.

use std::cmp::Ordering;

use crate::error::{ChordSpaceError, Result};

use super::chord::Chord;
use super::pitch;
use super::point::Tolerance;

/// Tie-break criteria for the bijective voice-leading search, in their
/// fixed priority order. The search starts at the requested criterion and
/// falls through the rest cyclically, ending at the revoicing index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Criterion {
    /// Minimize total absolute displacement (L1).
    Closer,
    /// Minimize the largest single-voice displacement.
    Smoother,
    /// Minimize the number of voices that move at all.
    Simpler,
    /// Minimize the spread (max - min) of the resulting pitches.
    ClosestRange,
}

impl Criterion {
    fn metric_index(self) -> usize {
        match self {
            Criterion::Closer => 0,
            Criterion::Smoother => 1,
            Criterion::Simpler => 2,
            Criterion::ClosestRange => 3,
        }
    }
}

fn check_paired(a: &Chord, b: &Chord) -> Result<()> {
    if a.space() != b.space() {
        return Err(ChordSpaceError::Domain(
            "chords live in different spaces".to_string(),
        ));
    }
    if a.k() != b.k() {
        return Err(ChordSpaceError::Domain(format!(
            "voice-count mismatch: {} vs {}",
            a.k(),
            b.k()
        )));
    }
    if a.is_empty() {
        return Err(ChordSpaceError::Domain(
            "voice leading requires at least one voice".to_string(),
        ));
    }
    Ok(())
}

/// Per-voice displacement vector moving `a` to `b`.
pub fn voiceleading(a: &Chord, b: &Chord) -> Result<Vec<f64>> {
    check_paired(a, b)?;
    a.point().displacement_to(b.point())
}

/// L2 distance over the displacement vector.
pub fn euclidean_distance(a: &Chord, b: &Chord) -> Result<f64> {
    check_paired(a, b)?;
    a.point().distance_to(b.point())
}

/// Total work: sum of absolute per-voice displacements (L1).
pub fn smoothness(a: &Chord, b: &Chord) -> Result<f64> {
    Ok(voiceleading(a, b)?.iter().map(|d| d.abs()).sum())
}

/// Largest single-voice displacement (L-infinity).
pub fn max_displacement(a: &Chord, b: &Chord) -> Result<f64> {
    Ok(voiceleading(a, b)?
        .iter()
        .map(|d| d.abs())
        .fold(0.0, f64::max))
}

/// Number of voices that move at all, within tolerance.
pub fn moving_voice_count(a: &Chord, b: &Chord) -> Result<usize> {
    let tol = a.tolerance();
    Ok(voiceleading(a, b)?
        .iter()
        .filter(|&&d| !tol.eq(d, 0.0))
        .count())
}

/// The realization of a pitch class nearest to a given pitch. Exactly
/// halfway between two realizations resolves downward.
pub fn closest_pitch(pitch: f64, pitch_class: f64, generator: f64) -> f64 {
    let pc = pitch::modulo(pitch_class, generator);
    let up = pitch + pitch::modulo(pc - pitch, generator);
    let down = up - generator;
    if up - pitch < pitch - down {
        up
    } else {
        down
    }
}

/// True when some voice pair moves by the same non-zero directed interval.
pub fn are_parallel(a: &Chord, b: &Chord) -> Result<bool> {
    Ok(parallel_pair(a, b)?.is_some())
}

/// True when some voice pair moves in parallel while standing a perfect
/// fifth apart (mod the generator). A post-hoc check only; the search
/// never rejects solutions on its own.
pub fn parallel_fifth(a: &Chord, b: &Chord) -> Result<bool> {
    const FIFTH: f64 = 7.0;
    let g = a.generator();
    let tol = a.tolerance();
    match parallel_pair(a, b)? {
        None => Ok(false),
        Some(pairs) => Ok(pairs.iter().any(|&(i, j)| {
            let interval = pitch::modulo(a.pitch_values()[j] - a.pitch_values()[i], g);
            tol.eq(interval, FIFTH) || tol.eq(interval, g - FIFTH)
        })),
    }
}

fn parallel_pair(a: &Chord, b: &Chord) -> Result<Option<Vec<(usize, usize)>>> {
    let d = voiceleading(a, b)?;
    let tol = a.tolerance();
    let mut pairs = Vec::new();
    for i in 0..d.len() {
        for j in i + 1..d.len() {
            if tol.eq(d[i], d[j]) && !tol.eq(d[i], 0.0) {
                pairs.push((i, j));
            }
        }
    }
    Ok(if pairs.is_empty() { None } else { Some(pairs) })
}

// ----------------------------------------------------------------------
// Octavewise revoicing enumeration
// ----------------------------------------------------------------------

/// Per-voice placement counts for octave shifts of the chord's O-reduction
/// within the closed register `[0, range]`. Voice order is preserved; each
/// voice's placements are counted against its own pitch class.
fn revoicing_radices(chord: &Chord, range: f64) -> Result<(Chord, Vec<u64>)> {
    if chord.is_empty() {
        return Err(ChordSpaceError::Domain(
            "revoicing enumeration requires at least one voice".to_string(),
        ));
    }
    if !range.is_finite() || range < 0.0 {
        return Err(ChordSpaceError::Range(format!(
            "register range must be finite and non-negative, got {}",
            range
        )));
    }
    let g = chord.generator();
    if !(g > 0.0) || !g.is_finite() {
        return Err(ChordSpaceError::Domain(format!(
            "generator must be positive and finite, got {}",
            g
        )));
    }
    let tol = chord.tolerance();
    let base = chord.e_o();
    let mut radices = Vec::with_capacity(base.k());
    for (voice, pc) in base.point().iter().enumerate() {
        // Highest octave step keeping pc + steps * g inside the register.
        let mut steps = ((range - pc) / g).round() as i64;
        if tol.gt(pc + steps as f64 * g, range) {
            steps -= 1;
        }
        if steps < 0 {
            return Err(ChordSpaceError::Domain(format!(
                "voice {} (pitch class {}) has no placement within [0, {}]",
                voice, pc, range
            )));
        }
        radices.push((steps + 1) as u64);
    }
    Ok((base, radices))
}

/// Number of chords octave-equivalent to the input with every voice inside
/// `[0, range]`: the product of per-voice placement counts.
pub fn octavewise_revoicings(chord: &Chord, range: f64) -> Result<u64> {
    let (_, radices) = revoicing_radices(chord, range)?;
    Ok(radices.iter().product())
}

/// The revoicing at a mixed-radix index, last voice least significant.
/// Exact inverse of `index_for_octavewise_revoicing`.
pub fn octavewise_revoicing(chord: &Chord, index: u64, range: f64) -> Result<Chord> {
    let (base, radices) = revoicing_radices(chord, range)?;
    let total: u64 = radices.iter().product();
    if index >= total {
        return Err(ChordSpaceError::Range(format!(
            "revoicing index {} out of bounds for {} revoicings",
            index, total
        )));
    }
    let g = chord.generator();
    let mut remaining = index;
    let mut digits = vec![0u64; radices.len()];
    for (digit, radix) in digits.iter_mut().zip(radices.iter()).rev() {
        *digit = remaining % radix;
        remaining /= radix;
    }
    let values: Vec<f64> = base
        .point()
        .iter()
        .zip(digits.iter())
        .map(|(pc, &d)| pc + d as f64 * g)
        .collect();
    Ok(base.with_pitch_values(values))
}

/// The mixed-radix index of a concrete revoicing within `[0, range]`.
/// A chord with any voice outside the register is a range error.
pub fn index_for_octavewise_revoicing(chord: &Chord, range: f64) -> Result<u64> {
    let (base, radices) = revoicing_radices(chord, range)?;
    let g = chord.generator();
    let mut index = 0u64;
    for voice in 0..chord.k() {
        let digit = ((chord.pitch_values()[voice] - base.pitch_values()[voice]) / g).round();
        if digit < 0.0 || digit as u64 >= radices[voice] {
            return Err(ChordSpaceError::Range(format!(
                "voice {} at pitch {} lies outside the register [0, {}]",
                voice,
                chord.pitch_values()[voice],
                range
            )));
        }
        index = index * radices[voice] + digit as u64;
    }
    Ok(index)
}

// ----------------------------------------------------------------------
// Optimal voice leading
// ----------------------------------------------------------------------

fn candidate_metrics(source: &Chord, candidate: &Chord, tol: Tolerance) -> Result<[f64; 4]> {
    let d = voiceleading(source, candidate)?;
    let l1 = d.iter().map(|x| x.abs()).sum();
    let linf = d.iter().map(|x| x.abs()).fold(0.0, f64::max);
    let moving = d.iter().filter(|&&x| !tol.eq(x, 0.0)).count() as f64;
    Ok([l1, linf, moving, candidate.span()])
}

fn metrics_less(a: &[f64; 4], b: &[f64; 4], start: usize, tol: Tolerance) -> bool {
    for offset in 0..4 {
        let i = (start + offset) % 4;
        match tol.cmp(a[i], b[i]) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => continue,
        }
    }
    false
}

/// Bijective voice leading: among every octavewise revoicing of the target
/// inside `[0, range]`, the one closest to the source under the requested
/// criterion, falling through the remaining criteria cyclically and
/// finally to the smallest revoicing index.
pub fn voicelead(
    source: &Chord,
    target: &Chord,
    range: f64,
    criterion: Criterion,
) -> Result<Chord> {
    check_paired(source, target)?;
    let total = octavewise_revoicings(target, range)?;
    log::debug!(
        "voicelead: scanning {} revoicings of {} voices within [0, {}]",
        total,
        target.k(),
        range
    );
    let tol = source.tolerance();
    let start = criterion.metric_index();
    let mut best: Option<([f64; 4], Chord)> = None;
    for index in 0..total {
        let candidate = octavewise_revoicing(target, index, range)?;
        let metrics = candidate_metrics(source, &candidate, tol)?;
        let better = match &best {
            None => true,
            Some((best_metrics, _)) => metrics_less(&metrics, best_metrics, start, tol),
        };
        if better {
            best = Some((metrics, candidate));
        }
    }
    best.map(|(_, chord)| chord).ok_or_else(|| {
        ChordSpaceError::Domain("no revoicing of the target exists in the register".to_string())
    })
}

/// Distinct pitch classes sounded by a chord, in first-appearance order.
fn distinct_pitch_classes(chord: &Chord) -> Vec<f64> {
    let tol = chord.tolerance();
    let g = chord.generator();
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for p in chord.point().iter() {
        let pc = pitch::modulo(p, g);
        let key = tol.quantize(pc);
        if !seen.contains(&key) {
            seen.push(key);
            out.push(pc);
        }
    }
    out
}

/// Voice leading between different cardinalities. With K >= M source
/// voices, each voice moves to the nearest realization of some target
/// pitch class, every class covered by at least one voice, minimizing
/// total displacement. With K < M, each target class recruits a source
/// voice (voices split), every voice used at least once; the result has M
/// voices. Exhaustive assignment search with cost pruning.
pub fn non_bijective_voicelead(source: &Chord, target: &Chord) -> Result<Chord> {
    if source.space() != target.space() {
        return Err(ChordSpaceError::Domain(
            "chords live in different spaces".to_string(),
        ));
    }
    if source.is_empty() || target.is_empty() {
        return Err(ChordSpaceError::Domain(
            "non-bijective voice leading requires non-empty chords".to_string(),
        ));
    }
    let g = source.generator();
    let classes = distinct_pitch_classes(target);
    let voices: Vec<f64> = source.point().iter().collect();

    if voices.len() >= classes.len() {
        // Cost of sending voice i to class j.
        let landing: Vec<Vec<f64>> = voices
            .iter()
            .map(|&p| classes.iter().map(|&pc| closest_pitch(p, pc, g)).collect())
            .collect();
        let assignment = assign_covering(&voices, &landing, classes.len()).ok_or_else(|| {
            ChordSpaceError::Domain("no covering assignment of voices to pitch classes".to_string())
        })?;
        let values: Vec<f64> = assignment
            .iter()
            .enumerate()
            .map(|(i, &j)| landing[i][j])
            .collect();
        Ok(source.with_pitch_values(values))
    } else {
        // Fewer voices than classes: each class recruits a voice.
        let landing: Vec<Vec<f64>> = classes
            .iter()
            .map(|&pc| voices.iter().map(|&p| closest_pitch(p, pc, g)).collect())
            .collect();
        let costs: Vec<Vec<f64>> = classes
            .iter()
            .enumerate()
            .map(|(j, _)| {
                voices
                    .iter()
                    .enumerate()
                    .map(|(i, &p)| (landing[j][i] - p).abs())
                    .collect()
            })
            .collect();
        let assignment = assign_covering_costs(&costs, voices.len()).ok_or_else(|| {
            ChordSpaceError::Domain("no covering assignment of pitch classes to voices".to_string())
        })?;
        let values: Vec<f64> = assignment
            .iter()
            .enumerate()
            .map(|(j, &i)| landing[j][i])
            .collect();
        Ok(Chord::from_pitches_in(values, source.space()))
    }
}

/// Minimum-cost assignment of each row to one column with every column
/// covered, by depth-first search with cost and feasibility pruning.
fn assign_covering(voices: &[f64], landing: &[Vec<f64>], columns: usize) -> Option<Vec<usize>> {
    let costs: Vec<Vec<f64>> = voices
        .iter()
        .enumerate()
        .map(|(i, &p)| (0..columns).map(|j| (landing[i][j] - p).abs()).collect())
        .collect();
    assign_covering_costs(&costs, columns)
}

fn assign_covering_costs(costs: &[Vec<f64>], columns: usize) -> Option<Vec<usize>> {
    let rows = costs.len();
    if rows < columns || columns == 0 || columns > 64 {
        return None;
    }
    let full: u64 = if columns == 64 {
        u64::MAX
    } else {
        (1u64 << columns) - 1
    };
    let mut best_cost = f64::INFINITY;
    let mut best: Option<Vec<usize>> = None;
    let mut current = vec![0usize; rows];

    fn recurse(
        costs: &[Vec<f64>],
        columns: usize,
        full: u64,
        row: usize,
        covered: u64,
        cost: f64,
        current: &mut Vec<usize>,
        best_cost: &mut f64,
        best: &mut Option<Vec<usize>>,
    ) {
        if cost >= *best_cost {
            return;
        }
        let rows = costs.len();
        if row == rows {
            if covered == full {
                *best_cost = cost;
                *best = Some(current.clone());
            }
            return;
        }
        // Feasibility: remaining rows must be able to cover missing columns.
        let missing = (full & !covered).count_ones() as usize;
        if missing > rows - row {
            return;
        }
        for j in 0..columns {
            current[row] = j;
            recurse(
                costs,
                columns,
                full,
                row + 1,
                covered | (1u64 << j),
                cost + costs[row][j],
                current,
                best_cost,
                best,
            );
        }
    }

    recurse(
        costs, columns, full, 0, 0, 0.0, &mut current, &mut best_cost, &mut best,
    );
    best
}

// ----------------------------------------------------------------------
// Conformance to pitch-class sets and scales
// ----------------------------------------------------------------------

/// Move every voice to the nearest realization of any pitch class sounded
/// by `pcs`. The set arrives as an ordinary chord (the scale-import
/// surface).
pub fn conform_to_pitch_class_set(chord: &Chord, pcs: &Chord) -> Result<Chord> {
    if pcs.is_empty() {
        return Err(ChordSpaceError::Domain(
            "cannot conform to an empty pitch-class set".to_string(),
        ));
    }
    let g = chord.generator();
    let classes = distinct_pitch_classes(pcs);
    let values: Vec<f64> = chord
        .point()
        .iter()
        .map(|p| {
            classes
                .iter()
                .map(|&pc| closest_pitch(p, pc, g))
                .min_by(|a, b| {
                    (a - p)
                        .abs()
                        .partial_cmp(&(b - p).abs())
                        .unwrap_or(Ordering::Equal)
                })
                .unwrap_or(p)
        })
        .collect();
    Ok(chord.with_pitch_values(values))
}

/// Move every voice to the nearest pitch actually sounded by `scale`
/// (register-sensitive, unlike `conform_to_pitch_class_set`).
pub fn conform_to_chord(chord: &Chord, scale: &Chord) -> Result<Chord> {
    if scale.is_empty() {
        return Err(ChordSpaceError::Domain(
            "cannot conform to an empty chord".to_string(),
        ));
    }
    let values: Vec<f64> = chord
        .point()
        .iter()
        .map(|p| {
            scale
                .point()
                .iter()
                .min_by(|a, b| {
                    (a - p)
                        .abs()
                        .partial_cmp(&(b - p).abs())
                        .unwrap_or(Ordering::Equal)
                })
                .unwrap_or(p)
        })
        .collect();
    Ok(chord.with_pitch_values(values))
}
