use proptest::prelude::*;
use wilco_amp::{Amplitude, Kinematics, Leg, LoopOrder, ProcessSpec};
use wilco_expr::{
    expand, expand_abbreviations, structure_term, AbbreviationTable, Expr, LoopFunction, Structure,
};
use wilco_match::{get_wilson_coefficients, reduce_to_basis};
use wilco_model::toy_qed;

fn vertex_amplitude(expr: Expr) -> Amplitude {
    let model = toy_qed("mu", -1, "m_mu").expect("model");
    let process = ProcessSpec::new(vec![
        Leg::incoming("mu"),
        Leg::outgoing("mu"),
        Leg::outgoing("A"),
    ]);
    let kinematics = Kinematics::from_process(&model, &process).expect("kinematics");
    Amplitude::from_expr(process, LoopOrder::OneLoop, kinematics, expr)
}

fn coefficient(tree: i64, one_loop: i64) -> Expr {
    let b0 = Expr::loop_fn(
        LoopFunction::B0,
        vec![Expr::zero(), Expr::param("m_mu_sq"), Expr::param("m_mu_sq")],
    );
    Expr::add([
        Expr::mul([Expr::int(tree), Expr::param("e")]),
        Expr::mul([Expr::int(one_loop), Expr::param("e"), b0]),
    ])
}

fn arb_vertex_expr() -> impl Strategy<Value = Expr> {
    (
        prop::collection::vec((-3i64..4, -3i64..4), 4),
        prop::sample::subsequence(
            vec![
                Structure::Vector,
                Structure::MomentumSum,
                Structure::MomentumTransfer,
                Structure::Magnetic,
            ],
            1..=4,
        ),
    )
        .prop_map(|(coefficients, structures)| {
            Expr::add(
                structures
                    .into_iter()
                    .zip(coefficients)
                    .map(|(structure, (tree, one_loop))| structure_term(structure, coefficient(tree, one_loop))),
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn recombined_coefficients_reproduce_the_reduced_amplitude(expr in arb_vertex_expr()) {
        let amplitude = vertex_amplitude(expr);
        let mut table = AbbreviationTable::new();
        let set = get_wilson_coefficients(&amplitude, &mut table).expect("match");
        let recombined = expand_abbreviations(&set.recombine(), &table).expect("expand");
        prop_assert_eq!(expand(&recombined), reduce_to_basis(&amplitude).expect("reduce"));
    }

    #[test]
    fn reported_coefficients_are_never_zero(expr in arb_vertex_expr()) {
        let amplitude = vertex_amplitude(expr);
        let mut table = AbbreviationTable::new();
        let set = get_wilson_coefficients(&amplitude, &mut table).expect("match");
        for entry in set.iter() {
            prop_assert!(!entry.coefficient.is_zero());
            prop_assert!(entry.operator.structure != Structure::MomentumSum);
            prop_assert!(entry.operator.structure != Structure::MomentumTransfer);
        }
    }

    #[test]
    fn matching_twice_reuses_abbreviations(expr in arb_vertex_expr()) {
        let amplitude = vertex_amplitude(expr);
        let mut table = AbbreviationTable::new();
        let first = get_wilson_coefficients(&amplitude, &mut table).expect("first");
        let size = table.len();
        let second = get_wilson_coefficients(&amplitude, &mut table).expect("second");
        prop_assert_eq!(first, second);
        prop_assert_eq!(table.len(), size);
    }
}
