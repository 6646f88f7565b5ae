use std::io::{self, Cursor, Write};

use tempfile::tempdir;
use wilco_core::{to_canonical_json_bytes, WilcoError};
use wilco_sim::commands::{demo, g2, library, model, self_energy, verify};
use wilco_sim::{RunConfig, Session};

fn session() -> Session {
    Session::new(RunConfig::default()).expect("session")
}

#[test]
fn model_report_lists_the_single_vertex() {
    let report = model::build_report(&session()).expect("model");
    assert_eq!(report.feynman_rules.len(), 1);
    assert!(report.feynman_rules[0].starts_with("[mu_bar, mu, A]"));
    assert_eq!(report.model_hash.len(), 64);
}

#[test]
fn self_energy_report_needs_an_off_shell_point_for_numbers() {
    let report = self_energy::build_report(&session()).expect("self-energy");
    assert_eq!(report.diagrams.len(), 1);
    assert_eq!(report.wilson_coefficients.len(), 2);
    assert!(report.m_term.raw.contains("Ab_"));
    assert!(!report.m_term.evaluated.contains("Ab_"));
    assert!(report.m_term.numeric.is_none());

    let mut config = RunConfig::default();
    config.values.insert("p1_sq".to_string(), 0.5);
    let report = self_energy::build_report(&Session::new(config).expect("session")).expect("self-energy");
    assert!(report.m_term.numeric.map(f64::is_finite).unwrap_or(false));
}

#[test]
fn g2_report_reproduces_the_schwinger_term() {
    let report = g2::build_report(&session()).expect("g2");
    assert!(report.electric_dipole.is_none());
    assert!(report.relative_deviation < 1e-5, "{:?}", report.relative_deviation);
    let alpha = 0.302_822_12f64.powi(2) / (4.0 * std::f64::consts::PI);
    assert!((report.schwinger - alpha / (2.0 * std::f64::consts::PI)).abs() < 1e-15);
}

#[test]
fn library_command_emits_six_functions_and_cleans_reruns() {
    let dir = tempdir().expect("dir");
    let session = session();
    let first = library::build_report(&session, dir.path()).expect("first");
    assert_eq!(first.removed, 0);
    assert_eq!(
        first.manifest.functions,
        vec![
            "mu_self_e_mterm",
            "mu_self_e_pterm",
            "mu_self_e_squared",
            "mu_magnetic_vertex",
            "mu_magnetic_vertex_eval",
            "mu_magnetic_vertex_simpli",
        ]
    );
    let second = library::build_report(&session, dir.path()).expect("second");
    assert_eq!(second.removed, 8);
    assert_eq!(first.manifest, second.manifest);
}

#[test]
fn demo_prompts_once_per_stage_when_paused() {
    let dir = tempdir().expect("dir");
    let mut prompts = Vec::new();
    let mut pacer = demo::Pacer::new(true, Cursor::new("\n\n\n"), &mut prompts);
    let report = demo::build_report(&session(), dir.path(), &mut pacer).expect("demo");
    let text = String::from_utf8(prompts).expect("utf8");
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("library generation"));
    assert_eq!(report.library.manifest.functions.len(), 6);
}

struct ClosedTerminal;

impl Write for ClosedTerminal {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn pacing_failures_are_io_errors() {
    let mut pacer = demo::Pacer::new(true, Cursor::new("\n"), ClosedTerminal);
    let err = pacer.wait("library generation").expect_err("closed terminal");
    assert!(matches!(err, WilcoError::Io(_)));
    assert_eq!(err.code(), "pause");

    let mut idle = demo::Pacer::new(false, Cursor::new(""), ClosedTerminal);
    idle.wait("library generation").expect("disabled pacer never prompts");
}

#[test]
fn reports_are_reproducible() {
    let a = g2::build_report(&session()).expect("a");
    let b = g2::build_report(&session()).expect("b");
    assert_eq!(
        to_canonical_json_bytes(&a).expect("a bytes"),
        to_canonical_json_bytes(&b).expect("b bytes")
    );
}

#[test]
fn verification_passes_on_the_default_model() {
    let mut config = RunConfig::default();
    config.verify_trials = 2;
    let report = verify::build_report(&Session::new(config).expect("session")).expect("verify");
    assert!(report.passed, "{:?}", report.checks);
    assert!(report.checks.iter().any(|check| check.name == "vertex/round-trip"));
}
