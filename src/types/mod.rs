// src/types/mod.rs

pub mod chord;
pub mod pitch;
pub mod pitv;
pub mod point;
pub mod voice_leading;

pub use chord::{all_of_equivalence_class, Chord, Space};
pub use pitch::{parse_pitch, C4, DEFAULT_RANGE, MIDDLE_C, OCTAVE};
pub use pitv::{Pitv, PitvCoordinate};
pub use point::{Point, Tolerance};
pub use voice_leading::Criterion;
