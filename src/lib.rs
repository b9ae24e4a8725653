//! # Chordspace
//!
//! Chord space equivalence classes, optimal voice leading, and PITV chord
//! coordinates for algorithmic composition.
//!
//! Chords are points in a geometric pitch space, one dimension per voice.
//! The library reduces chords to canonical representatives under octave,
//! permutation, transposition, inversion, and register equivalence,
//! searches octavewise revoicings for optimal voice leadings, and indexes
//! every chord of a cardinality with a (prime form, inversion,
//! transposition, voicing) coordinate.
//!
//! ## Features
//!
//! - **serde**: Enable serialization of the public value types
//! - **colored**: Enable colored terminal output for `Chord::information`
//!
//! ## Example
//!
//! ```
//! use chordspace::{Chord, Criterion};
//! use chordspace::types::voice_leading::voicelead;
//!
//! # fn main() -> chordspace::Result<()> {
//! let c_major: Chord = "C4 E4 G4".parse()?;
//! let d_minor: Chord = "2 5 9".parse()?;
//! let led = voicelead(&c_major, &d_minor, 72.0, Criterion::Closer)?;
//! assert_eq!(led.pitch_values(), &[62.0, 65.0, 69.0]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{ChordSpaceError, Result};
pub use types::{Chord, Criterion, Pitv, PitvCoordinate, Point, Space, Tolerance};
