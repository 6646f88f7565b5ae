use std::fs;

use tempfile::tempdir;
use wilco_amp::{Leg, LoopOrder, ProcessSpec};
use wilco_expr::{AbbreviationTable, Expr, LoopFunction};
use wilco_lib::Library;
use wilco_match::compute_wilson_coefficients;
use wilco_model::toy_qed;

fn self_energy_library() -> Library {
    let model = toy_qed("mu", -1, "m_mu").expect("model");
    let process = ProcessSpec::new(vec![
        Leg::incoming("mu").off_shell(),
        Leg::outgoing("mu").off_shell(),
    ]);
    let mut table = AbbreviationTable::new();
    let set = compute_wilson_coefficients(&model, LoopOrder::OneLoop, &process, &mut table)
        .expect("wilson set");
    let mut lib = Library::new("demolib").expect("lib");
    lib.add_function_with("mu_self_e_mterm", set[0].coefficient(), &table)
        .expect("mterm");
    lib.add_function_with("mu_self_e_pterm", set[1].coefficient(), &table)
        .expect("pterm");
    lib
}

#[test]
fn written_library_lists_every_generated_file() {
    let dir = tempdir().expect("dir");
    let lib = self_energy_library();
    let manifest = lib.write(dir.path()).expect("write");
    assert_eq!(manifest.functions, vec!["mu_self_e_mterm", "mu_self_e_pterm"]);
    assert_eq!(manifest.parameters, vec!["e", "m_mu", "p1_sq"]);
    assert!(manifest.loop_functions.contains(&"wilco_B0".to_string()));
    for file in manifest.files() {
        assert!(dir.path().join(&file.path).exists(), "{}", file.path);
    }
    let header = fs::read_to_string(dir.path().join("include/demolib.h")).expect("header");
    assert!(header.contains("struct demolib_params {"));
    assert!(header.contains("extern \"C\" double wilco_B0(double, double, double);"));
    assert!(header.contains("double mu_self_e_pterm(const demolib_params& params);"));
    let source = fs::read_to_string(dir.path().join("src/mu_self_e_mterm.cpp")).expect("source");
    assert!(source.contains("const double PV_0 = wilco_B0(params.p1_sq, 0.0, "));
    assert!(source.contains("return "));
}

#[test]
fn emission_is_deterministic() {
    let lib = self_energy_library();
    let a = tempdir().expect("a");
    let b = tempdir().expect("b");
    let first = lib.write(a.path()).expect("first");
    let second = self_energy_library().write(b.path()).expect("second");
    assert_eq!(first, second);
    assert_eq!(
        fs::read(a.path().join("demolib.manifest.json")).expect("manifest a"),
        fs::read(b.path().join("demolib.manifest.json")).expect("manifest b")
    );
}

#[test]
fn cleaning_removes_only_previous_outputs() {
    let dir = tempdir().expect("dir");
    let lib = self_energy_library();
    assert_eq!(lib.clean_existing_sources(dir.path()).expect("empty clean"), 0);
    lib.write(dir.path()).expect("write");
    let unrelated = dir.path().join("src/handwritten.cpp");
    fs::write(&unrelated, "// kept\n").expect("unrelated");

    let removed = lib.clean_existing_sources(dir.path()).expect("clean");
    assert_eq!(removed, 4);
    assert!(unrelated.exists());
    assert!(!dir.path().join("include/demolib.h").exists());
    assert!(!dir.path().join("demolib.manifest.json").exists());
}

#[test]
fn rewriting_after_cleaning_drops_stale_functions() {
    let dir = tempdir().expect("dir");
    let mut lib = Library::new("demolib").expect("lib");
    lib.add_function("old_fn", &Expr::param("e")).expect("old");
    lib.write(dir.path()).expect("first write");

    let mut next = Library::new("demolib").expect("lib");
    let c0 = Expr::loop_fn(
        LoopFunction::C0,
        vec![Expr::zero(), Expr::zero(), Expr::zero(), Expr::one(), Expr::one(), Expr::one()],
    );
    next.add_function("new_fn", &c0).expect("new");
    next.clean_existing_sources(dir.path()).expect("clean");
    let manifest = next.write(dir.path()).expect("second write");
    assert!(!dir.path().join("src/old_fn.cpp").exists());
    assert!(dir.path().join("src/new_fn.cpp").exists());
    assert_eq!(manifest.loop_functions, vec!["wilco_C0"]);
    assert!(manifest.parameters.is_empty());
}

#[test]
fn empty_libraries_and_bad_names_are_codegen_errors() {
    let dir = tempdir().expect("dir");
    let lib = Library::new("demolib").expect("lib");
    assert_eq!(lib.write(dir.path()).expect_err("empty").code(), "empty-library");
    assert_eq!(Library::new("demo-lib").expect_err("name").code(), "invalid-identifier");
}
