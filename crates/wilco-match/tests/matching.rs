use wilco_amp::{compute_amplitude, Leg, LoopOrder, ProcessSpec};
use wilco_expr::{evaluate, expand, expand_abbreviations, AbbreviationTable, EvalContext, Structure};
use wilco_match::{
    compute_wilson_coefficients, get_wilson_coefficient, get_wilson_coefficients, magnetic_operator,
    match_operator, reduce_to_basis, DiracCoupling, Operator,
};
use wilco_model::{toy_qed, Model};

const E: f64 = 0.302_822_12;

fn model() -> Model {
    toy_qed("mu", -1, "m_mu").expect("model")
}

fn self_energy() -> ProcessSpec {
    ProcessSpec::new(vec![
        Leg::incoming("mu").off_shell(),
        Leg::outgoing("mu").off_shell(),
    ])
}

fn vertex() -> ProcessSpec {
    ProcessSpec::new(vec![
        Leg::incoming("mu"),
        Leg::outgoing("mu"),
        Leg::outgoing("A"),
    ])
}

#[test]
fn self_energy_decomposes_into_mass_and_kinetic_terms() {
    let mut table = AbbreviationTable::new();
    let set = compute_wilson_coefficients(&model(), LoopOrder::OneLoop, &self_energy(), &mut table)
        .expect("wilson set");
    assert_eq!(set.len(), 2);
    assert_eq!(set[0].operator.name, "mass");
    assert_eq!(set[1].operator.name, "kinetic");
    assert!(set[0].coefficient.contains_abbreviation());
    let err = match_operator(&set, &Operator::pseudoscalar()).expect_err("no pseudoscalar");
    assert!(err.is_not_found());
}

#[test]
fn vertex_has_one_magnetic_coefficient_equal_to_schwinger_term() {
    let model = model();
    let mut table = AbbreviationTable::new();
    let set = compute_wilson_coefficients(&model, LoopOrder::OneLoop, &vertex(), &mut table)
        .expect("wilson set");
    let magnetic: Vec<_> = set
        .iter()
        .filter(|entry| entry.operator.structure == Structure::Magnetic)
        .collect();
    assert_eq!(magnetic.len(), 1);
    assert!(set
        .iter()
        .all(|entry| entry.operator.structure != Structure::ElectricDipole));

    let operators = magnetic_operator(&model, &set, DiracCoupling::S);
    assert_eq!(operators.len(), 1);
    let coefficient = get_wilson_coefficient(&set, &operators).expect("magnetic");
    let explicit = expand(&expand_abbreviations(&coefficient, &table).expect("expanded"));
    assert!(!explicit.contains_abbreviation());

    let mass = 1.0;
    let ctx = EvalContext::new().with_value("e", E).with_value("m_mu", mass);
    let c_t = evaluate(&explicit, &ctx).expect("numeric");
    // M ⊃ -eQ F2 iσq/(2m) with Q = -1
    let anomaly = 2.0 * mass * c_t / E;
    let alpha = E * E / (4.0 * std::f64::consts::PI);
    let schwinger = alpha / (2.0 * std::f64::consts::PI);
    assert!(
        ((anomaly - schwinger) / schwinger).abs() < 1e-5,
        "a = {anomaly}, expected {schwinger}"
    );
}

#[test]
fn electric_dipole_lookup_is_not_found() {
    let model = model();
    let mut table = AbbreviationTable::new();
    let set = compute_wilson_coefficients(&model, LoopOrder::OneLoop, &vertex(), &mut table)
        .expect("wilson set");
    let operators = magnetic_operator(&model, &set, DiracCoupling::P);
    assert_eq!(operators.len(), 1);
    let err = get_wilson_coefficient(&set, &operators).expect_err("no dipole");
    assert!(err.is_not_found());
    assert_eq!(err.code(), "operator-not-found");
}

#[test]
fn magnetic_lookups_with_other_couplings_are_not_found() {
    let mut table = AbbreviationTable::new();
    let set = compute_wilson_coefficients(&model(), LoopOrder::OneLoop, &vertex(), &mut table)
        .expect("wilson set");
    assert!(match_operator(&set, &Operator::magnetic(DiracCoupling::S)).is_ok());
    for coupling in [DiracCoupling::V, DiracCoupling::A, DiracCoupling::T] {
        let err = match_operator(&set, &Operator::magnetic(coupling)).expect_err("absent coupling");
        assert!(err.is_not_found(), "{:?}", coupling);
    }
}

fn off_shell_vertex() -> ProcessSpec {
    ProcessSpec::new(vec![
        Leg::incoming("mu").off_shell(),
        Leg::outgoing("mu"),
        Leg::outgoing("A"),
    ])
}

#[test]
fn off_shell_fermion_vertex_keeps_the_momentum_sum() {
    let mut table = AbbreviationTable::new();
    let set = compute_wilson_coefficients(&model(), LoopOrder::OneLoop, &off_shell_vertex(), &mut table)
        .expect("wilson set");
    let names = set_names(&set);
    assert!(names.contains(&"magnetic".to_string()), "{:?}", names);
    assert!(names.contains(&"momentum-sum".to_string()), "{:?}", names);
    assert!(!names.contains(&"electric-dipole".to_string()));
    assert!(!names.iter().any(|name| name.starts_with("momentum-transfer")));
}

#[test]
fn recombination_reproduces_the_reduced_amplitude() {
    for process in [self_energy(), vertex(), off_shell_vertex()] {
        let amplitude = compute_amplitude(&model(), LoopOrder::OneLoop, &process).expect("amplitude");
        let mut table = AbbreviationTable::new();
        let set = get_wilson_coefficients(&amplitude, &mut table).expect("wilson set");
        let recombined = expand_abbreviations(&set.recombine(), &table).expect("expanded");
        assert_eq!(expand(&recombined), reduce_to_basis(&amplitude).expect("reduced"));
    }
}

#[test]
fn matching_is_deterministic() {
    let amplitude = compute_amplitude(&model(), LoopOrder::OneLoop, &vertex()).expect("amplitude");
    let mut shared = AbbreviationTable::new();
    let first = get_wilson_coefficients(&amplitude, &mut shared).expect("first");
    let abbreviations = shared.len();
    let second = get_wilson_coefficients(&amplitude, &mut shared).expect("second");
    assert_eq!(first, second);
    assert_eq!(shared.len(), abbreviations);

    let mut fresh = AbbreviationTable::new();
    let third = get_wilson_coefficients(&amplitude, &mut fresh).expect("third");
    assert_eq!(first, third);
    let names: Vec<String> = set_names(&first);
    assert_eq!(names, set_names(&third));
}

fn set_names(set: &wilco_match::WilsonSet) -> Vec<String> {
    set.iter().map(|entry| entry.operator.name.clone()).collect()
}

#[test]
fn tree_vertex_has_only_the_vector_current() {
    let mut table = AbbreviationTable::new();
    let set = compute_wilson_coefficients(&model(), LoopOrder::Tree, &vertex(), &mut table)
        .expect("tree set");
    assert_eq!(set.len(), 1);
    assert_eq!(set[0].operator, Operator::vector_current().with_fields(vec![
        "mu_bar".to_string(),
        "mu".to_string(),
        "A".to_string(),
    ]));
    assert_eq!(set[0].coefficient, expand(&wilco_expr::Expr::param("e")));
    assert!(table.is_empty());
}
