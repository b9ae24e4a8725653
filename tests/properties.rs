#[cfg(test)]
mod tests {
    use anyhow::Result;
    use approx::assert_abs_diff_eq;
    use chordspace::types::voice_leading::{
        index_for_octavewise_revoicing, non_bijective_voicelead, octavewise_revoicing,
        octavewise_revoicings, parallel_fifth, smoothness, voicelead,
    };
    use chordspace::{Chord, Criterion, Pitv, Space};

    fn chord(pitches: &[f64]) -> Chord {
        Chord::from_pitches(pitches.to_vec())
    }

    fn sample_chords() -> Vec<Chord> {
        vec![
            chord(&[0.0, 4.0, 7.0]),
            chord(&[0.0, 3.0, 7.0]),
            chord(&[0.0, 5.0, 8.0]),
            chord(&[60.0, 64.0, 67.0]),
            chord(&[7.0, 0.0, 4.0]),
            chord(&[-3.0, 14.5, 21.0]),
            chord(&[0.0, 0.0, 7.0]),
            chord(&[2.0, 5.0, 9.0, 12.0]),
            chord(&[11.0, 11.0]),
            chord(&[5.0]),
            Chord::new(0),
        ]
    }

    /// Every canonicalization applied twice equals itself applied once.
    #[test]
    fn test_idempotence() {
        const RANGE: f64 = 24.0;
        for c in sample_chords() {
            let unary: Vec<(&str, Box<dyn Fn(&Chord) -> Chord>)> = vec![
                ("eO", Box::new(|c: &Chord| c.e_o())),
                ("eP", Box::new(|c: &Chord| c.e_p())),
                ("eT", Box::new(|c: &Chord| c.e_t())),
                ("eTT", Box::new(|c: &Chord| c.e_tt())),
                ("eI", Box::new(|c: &Chord| c.e_i())),
                ("eOP", Box::new(|c: &Chord| c.e_op())),
                ("eOPI", Box::new(|c: &Chord| c.e_opi())),
                ("eOPT", Box::new(|c: &Chord| c.e_opt())),
                ("eOPTT", Box::new(|c: &Chord| c.e_optt())),
                ("eOPTI", Box::new(|c: &Chord| c.e_opti())),
                ("eOPTTI", Box::new(|c: &Chord| c.e_optti())),
                ("eR", Box::new(|c: &Chord| c.e_r(RANGE))),
                ("eRP", Box::new(|c: &Chord| c.e_rp(RANGE))),
                ("eRPI", Box::new(|c: &Chord| c.e_rpi(RANGE))),
                ("eRPT", Box::new(|c: &Chord| c.e_rpt(RANGE))),
                ("eRPTT", Box::new(|c: &Chord| c.e_rptt(RANGE))),
                ("eRPTI", Box::new(|c: &Chord| c.e_rpti(RANGE))),
                ("eRPTTI", Box::new(|c: &Chord| c.e_rptti(RANGE))),
            ];
            for (tag, op) in unary {
                let once = op(&c);
                let twice = op(&once);
                assert_eq!(twice, once, "{} not idempotent on {}", tag, c);
            }
        }
    }

    /// `is_e_x` is true exactly on fixed points of `e_x`.
    #[test]
    fn test_fixed_point_correctness() {
        const RANGE: f64 = 24.0;
        for c in sample_chords() {
            assert_eq!(c.is_e_o(), c.e_o() == c);
            assert_eq!(c.is_e_p(), c.e_p() == c);
            assert_eq!(c.is_e_t(), c.e_t() == c);
            assert_eq!(c.is_e_tt(), c.e_tt() == c);
            assert_eq!(c.is_e_i(), c.e_i() == c);
            assert_eq!(c.is_e_op(), c.e_op() == c);
            assert_eq!(c.is_e_opt(), c.e_opt() == c);
            assert_eq!(c.is_e_optti(), c.e_optti() == c);
            assert_eq!(c.is_e_rp(RANGE), c.e_rp(RANGE) == c);
            assert_eq!(c.is_e_rpti(RANGE), c.e_rpti(RANGE) == c);
            // Canonical representatives report themselves canonical.
            assert!(c.e_op().is_e_op());
            assert!(c.e_optti().is_e_optti());
            assert!(c.e_rpt(RANGE).is_e_rpt(RANGE));
        }
    }

    #[test]
    fn test_prime_form_examples() {
        // The major and minor triads are already in normal order.
        assert_eq!(chord(&[0.0, 4.0, 7.0]).e_op(), chord(&[0.0, 4.0, 7.0]));
        assert_eq!(chord(&[0.0, 3.0, 7.0]).e_op(), chord(&[0.0, 3.0, 7.0]));
        // A triad and its inversion share one prime form.
        let major = chord(&[0.0, 4.0, 7.0]);
        let inverted = chord(&[0.0, 5.0, 8.0]);
        assert_eq!(major.e_opti(), inverted.e_opti());
        assert_eq!(major.e_optti(), inverted.e_optti());
        assert_eq!(major.e_optti(), chord(&[0.0, 3.0, 7.0]));
    }

    #[test]
    fn test_revoicing_bijection() -> Result<()> {
        for (pitches, range) in [
            (vec![0.0, 4.0, 7.0], 24.0),
            (vec![12.0, 4.0, 19.0], 36.0),
            (vec![11.0, 11.0], 24.0),
            (vec![5.0], 60.0),
        ] {
            let c = chord(&pitches);
            let total = octavewise_revoicings(&c, range)?;
            for index in 0..total {
                let revoiced = octavewise_revoicing(&c, index, range)?;
                assert_eq!(index_for_octavewise_revoicing(&revoiced, range)?, index);
            }
            // The chord itself maps back through its own index.
            let own = index_for_octavewise_revoicing(&c, range)?;
            assert_eq!(octavewise_revoicing(&c, own, range)?, c);
            // The index space is exactly the placement product.
            assert!(octavewise_revoicing(&c, total, range).is_err());
        }
        Ok(())
    }

    #[test]
    fn test_pitv_round_trip() -> Result<()> {
        for (voices, range) in [(1, 12.0), (2, 24.0), (3, 36.0)] {
            let pitv = Pitv::new(voices, Space::default(), range)?;
            assert_eq!(pitv.list().count() as u64, pitv.n());
            // Every cell representative round-trips through its coordinate.
            for cell in pitv.list() {
                let coordinate = pitv.from_chord(&cell)?;
                assert_eq!(pitv.to_chord(coordinate)?, cell);
            }
        }
        // And so do concrete registered chords.
        let pitv = Pitv::new(3, Space::default(), 72.0)?;
        for c in [
            chord(&[60.0, 64.0, 67.0]),
            chord(&[2.0, 17.0, 33.0]),
            chord(&[0.0, 0.0, 0.0]),
        ] {
            let coordinate = pitv.from_chord(&c)?;
            assert_eq!(pitv.to_chord(coordinate)?, c);
        }
        Ok(())
    }

    /// The "closer" criterion beats every bijection over the same
    /// revoicing set, checked exhaustively.
    #[test]
    fn test_voicelead_optimality() -> Result<()> {
        let source = chord(&[60.0, 64.0, 67.0]);
        let target = chord(&[2.0, 5.0, 9.0]);
        const RANGE: f64 = 72.0;

        let led = voicelead(&source, &target, RANGE, Criterion::Closer)?;
        let best = smoothness(&source, &led)?;
        assert_abs_diff_eq!(best, 5.0);

        let total = octavewise_revoicings(&target, RANGE)?;
        for index in 0..total {
            let candidate = octavewise_revoicing(&target, index, RANGE)?;
            assert!(smoothness(&source, &candidate)? >= best);
        }
        Ok(())
    }

    #[test]
    fn test_parallel_fifth_non_regression() -> Result<()> {
        assert!(parallel_fifth(&chord(&[0.0, 7.0]), &chord(&[2.0, 9.0]))?);
        assert!(!parallel_fifth(&chord(&[0.0, 7.0]), &chord(&[2.0, 7.0]))?);
        Ok(())
    }

    /// Non-bijective leading covers every target pitch class.
    #[test]
    fn test_non_bijective_coverage() -> Result<()> {
        let source = chord(&[60.0, 63.0, 67.0, 72.0, 74.0]);
        let target = chord(&[0.0, 4.0, 7.0]);
        let led = non_bijective_voicelead(&source, &target)?;
        assert_eq!(led.k(), source.k());
        for pc in [0.0, 4.0, 7.0] {
            assert!(
                led.point().iter().any(|p| led
                    .tolerance()
                    .eq(p.rem_euclid(led.generator()), pc)),
                "pitch class {} not covered by {}",
                pc,
                led
            );
        }
        Ok(())
    }

    #[test]
    fn test_text_round_trips() -> Result<()> {
        let numeric: Chord = "0, 4.5, 7".parse()?;
        let back: Chord = numeric.to_string().parse()?;
        assert_eq!(back, numeric);

        let named: Chord = "C4 E4 G4".parse()?;
        assert_eq!(named, chord(&[60.0, 64.0, 67.0]));
        assert_eq!(named.name(), "CM");

        let by_name = Chord::from_name("Dm7")?;
        assert_eq!(by_name.name(), "Dm7");
        Ok(())
    }

    /// Attributes ride along with their voices through sorting but never
    /// affect equivalence.
    #[test]
    fn test_attributes_survive_operators() -> Result<()> {
        let mut c = chord(&[7.0, 0.0, 4.0]);
        c.set_instrument(0, 9.0)?;
        c.set_pan(0, -1.0)?;
        let sorted = c.e_p();
        assert_eq!(sorted.instrument(2)?, 9.0);
        assert_eq!(sorted.pan(2)?, -1.0);
        assert_eq!(sorted, chord(&[0.0, 4.0, 7.0]));
        Ok(())
    }

    #[test]
    fn test_empty_chord_totality_and_search_rejection() {
        let empty = Chord::new(0);
        assert_eq!(empty.e_optti(), empty);
        assert!(empty.is_e_op());
        // Searches require at least one voice.
        assert!(octavewise_revoicings(&empty, 12.0).is_err());
        assert!(voicelead(&empty, &empty, 12.0, Criterion::Closer).is_err());
    }
}
