use wilco_expr::{expand, Expr};
use wilco_model::{toy_qed, GroupKind, ModelBuilder, Particle};

#[test]
fn toy_qed_has_one_vertex_with_minus_e_q_coupling() {
    let model = toy_qed("mu ; \\mu", -1, "m_mu").expect("model");
    assert!(model.particle("A").is_some());
    assert!(model.particle("A_em").is_none());
    assert_eq!(model.vertices.len(), 1);
    let vertex = &model.vertices[0];
    assert_eq!(vertex.fermion, "mu");
    assert_eq!(vertex.boson, "A");
    assert_eq!(expand(&vertex.coupling), Expr::param("e"));
    let rules = model.feynman_rules();
    assert_eq!(rules[0].fields, vec!["mu_bar", "mu", "A"]);
    let listing = model.to_string();
    assert!(listing.contains("mu"));
    assert!(listing.contains("m_mu"));
}

#[test]
fn neutral_fermions_have_no_vertex() {
    let mut builder = ModelBuilder::new("neutral");
    builder
        .add_gauged_group(GroupKind::U1, "em", Expr::param("e"))
        .expect("group");
    builder.init().expect("init");
    builder
        .add_particle(Particle::dirac_fermion("nu").with_charge("em", 0))
        .expect("particle");
    let model = builder.finalize().expect("model");
    assert!(model.vertices.is_empty());
}

#[test]
fn invalid_builds_are_model_errors() {
    let mut builder = ModelBuilder::new("broken");
    builder
        .add_gauged_group(GroupKind::U1, "em", Expr::param("e"))
        .expect("group");
    let early = builder
        .add_particle(Particle::dirac_fermion("mu").with_charge("em", -1))
        .expect_err("charge before init");
    assert_eq!(early.code(), "charge-before-init");
    builder.init().expect("init");
    let unknown = builder
        .add_particle(Particle::dirac_fermion("mu").with_charge("weak", 1))
        .expect_err("unknown group");
    assert_eq!(unknown.code(), "unknown-group");
    builder
        .add_particle(Particle::dirac_fermion("mu").with_charge("em", -1))
        .expect("mu");
    let duplicate = builder
        .add_particle(Particle::dirac_fermion("mu"))
        .expect_err("duplicate");
    assert_eq!(duplicate.code(), "duplicate-particle");
    let collision = builder.rename_particle("A_em", "mu").expect_err("collision");
    assert_eq!(collision.code(), "rename-collision");
}

#[test]
fn models_round_trip_through_json() {
    let model = toy_qed("mu", -1, "m_mu").expect("model");
    let json = serde_json::to_string(&model).expect("encode");
    let restored: wilco_model::Model = serde_json::from_str(&json).expect("decode");
    assert_eq!(restored, model);
}
