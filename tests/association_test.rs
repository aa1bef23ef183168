//! Integration tests: run the whole pipeline on small synthetic Pan-STARRS
//! fields, through both the CSV retriever and the in-memory retriever.

use std::fs;
use std::path::Path;

use hostpath::{
    box_halfwidth, export, parse_localization, run_association, AssociationConfig,
    AssociationRequest, CandidatePrior, CsvCatalog, EngineState, FilterRegistry, HostPathError,
    LocalGrid, OffsetPrior, PathEngine, PosteriorMethod, SkyLocalization, StaticCatalog,
    SurveyCandidate,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CENTER_RA: f64 = 128.68005;
const CENTER_DEC: f64 = 66.01075;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

fn localization() -> SkyLocalization {
    parse_localization("ellipse", "128.68005,66.01075", "11.,11.,0.").unwrap()
}

/// Offset the field center by (east, north) arcsec.
fn offset_position(east: f64, north: f64) -> (f64, f64) {
    let ra = CENTER_RA + east / 3600.0 / CENTER_DEC.to_radians().cos();
    let dec = CENTER_DEC + north / 3600.0;
    (ra, dec)
}

fn write_field(path: &Path, rows: &[(f64, f64, f64, &str, f64)]) {
    let mut text = String::from("objID,ra,dec,rKronRad,Pan-STARRS_r,rPSFLikelihood\n");
    for (i, (ra, dec, size, mag, psf)) in rows.iter().enumerate() {
        text.push_str(&format!("{i},{ra},{dec},{size},{mag},{psf}\n"));
    }
    fs::write(path, text).unwrap();
}

fn fast_request(p_u: f64) -> AssociationRequest {
    AssociationRequest {
        config: AssociationConfig {
            step_size: 0.5,
            ..AssociationConfig::with_unseen_prior(p_u)
        },
        ..AssociationRequest::new(localization())
    }
}

#[test]
fn single_surviving_galaxy_end_to_end() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("field.csv");

    let (g_ra, g_dec) = offset_position(4.0, -3.0);
    let (s_ra, s_dec) = offset_position(-20.0, 10.0);
    let (b_ra, b_dec) = offset_position(30.0, 30.0);
    let (z_ra, z_dec) = offset_position(-5.0, -40.0);
    let (far_ra, far_dec) = offset_position(900.0, 0.0);
    write_field(
        &catalog_path,
        &[
            // The only galaxy that survives the cuts.
            (g_ra, g_dec, 11.0, "19.4", 1e-4),
            // Point source.
            (s_ra, s_dec, 2.0, "20.1", 0.8),
            // Saturated.
            (b_ra, b_dec, 25.0, "13.2", 1e-6),
            // No Kron radius.
            (z_ra, z_dec, 0.0, "21.0", 1e-6),
            // Outside the 5' search cone.
            (far_ra, far_dec, 30.0, "18.0", 1e-6),
        ],
    );

    let request = fast_request(0.2);
    let catalog = CsvCatalog::new(&catalog_path);
    let result = run_association(&request, &catalog, &FilterRegistry::default()).unwrap();

    assert_eq!(result.box_hwidth, 110.0);
    assert_eq!(result.candidates.len(), 1);
    let best = result.best().unwrap();
    assert_eq!(best.candidate.ang_size, 11.0);
    assert!((best.p_o - 0.8).abs() < 1e-12);
    assert!((best.p_ox + result.p_ux - 1.0).abs() < 1e-9);
    assert!(best.p_ox > result.p_ux);

    let out = dir.path().join("ranked.csv");
    export(&result, &out).unwrap();
    let mut rdr = csv::Reader::from_path(&out).unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][2].parse::<f64>().unwrap(), 11.0);
    assert_eq!(rows[0][6].parse::<f64>().unwrap(), result.p_ux);
}

#[test]
fn posteriors_before_priors_fail_and_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never.csv");

    let (ra, dec) = offset_position(1.0, 1.0);
    let cands = vec![SurveyCandidate {
        ra_deg: ra,
        dec_deg: dec,
        ang_size: 11.0,
        mag: Some(19.0),
        quality: 1e-4,
    }];

    let mut engine = PathEngine::new();
    engine.init_localization(localization()).unwrap();
    engine.init_candidates(&cands).unwrap();
    engine
        .init_cand_prior(CandidatePrior {
            p_u: 0.2,
            ..CandidatePrior::default()
        })
        .unwrap();
    engine.init_offset_prior(OffsetPrior::default()).unwrap();

    let grid = LocalGrid {
        box_hwidth: 110.0,
        max_radius: 110.0,
        step_size: 0.5,
    };
    let outcome = engine.calc_posteriors(PosteriorMethod::Local, &grid).map(|_| ());
    match outcome {
        Err(HostPathError::OutOfOrderConfiguration { operation, state }) => {
            assert_eq!(operation, "calc_posteriors");
            assert_eq!(state, EngineState::PriorsConfigured);
        }
        other => panic!("expected an out-of-order error, got {other:?}"),
    }
    assert!(engine.posteriors().is_none());
    assert!(!out.exists());
}

fn random_field(seed: u64, n: usize) -> Vec<SurveyCandidate> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let (ra, dec) =
                offset_position(rng.gen_range(-90.0..90.0), rng.gen_range(-90.0..90.0));
            SurveyCandidate {
                ra_deg: ra,
                dec_deg: dec,
                ang_size: rng.gen_range(-0.5..6.0),
                mag: Some(rng.gen_range(12.0..24.5)),
                quality: 10f64.powf(rng.gen_range(-6.0..0.0)),
            }
        })
        .collect()
}

#[test]
fn identical_inputs_give_identical_rankings() {
    init_tracing();
    let rows = random_field(7, 40);
    let catalog = StaticCatalog::new(rows);
    let registry = FilterRegistry::default();
    let request = fast_request(0.1);

    let first = run_association(&request, &catalog, &registry).unwrap();
    let second = run_association(&request, &catalog, &registry).unwrap();
    assert_eq!(first, second);

    // Ranking is by descending posterior.
    for pair in first.candidates.windows(2) {
        assert!(pair[0].p_ox >= pair[1].p_ox);
    }
    let total: f64 = first.candidates.iter().map(|r| r.p_ox).sum::<f64>() + first.p_ux;
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn box_tracks_largest_filtered_galaxy() {
    let rows = random_field(11, 60);
    let filtered = FilterRegistry::default()
        .filter("Pan-STARRS", rows)
        .unwrap();
    assert!(!filtered.is_empty());
    let largest = filtered.iter().map(|c| c.ang_size).fold(0.0, f64::max);
    assert_eq!(box_halfwidth(&filtered).unwrap(), (10.0 * largest).max(30.0));

    let refiltered = FilterRegistry::default()
        .filter("Pan-STARRS", filtered.clone())
        .unwrap();
    assert_eq!(filtered, refiltered);
}

#[test]
fn unregistered_survey_is_fatal_even_with_matching_columns() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("field.csv");
    let (ra, dec) = offset_position(0.0, 0.0);
    write_field(&catalog_path, &[(ra, dec, 3.0, "20.0", 1e-5)]);

    let request = AssociationRequest {
        survey: "DES".to_string(),
        ..fast_request(0.0)
    };
    let err = run_association(
        &request,
        &CsvCatalog::new(&catalog_path),
        &FilterRegistry::default(),
    )
    .unwrap_err();
    assert!(matches!(err, HostPathError::UnsupportedSurvey(s) if s == "DES"));
}
