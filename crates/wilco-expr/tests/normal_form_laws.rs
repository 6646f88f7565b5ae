use proptest::prelude::*;
use wilco_core::RngHandle;
use wilco_expr::{
    canonicalize, expand, expand_abbreviations, numerically_equivalent, AbbreviationTable,
    EvalContext, Expr,
};

fn leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (-3i64..4).prop_map(Expr::int),
        prop::sample::select(vec!["a", "b", "m"]).prop_map(Expr::param),
    ]
}

fn positive(x: Expr) -> Expr {
    Expr::add([Expr::pow(x, 2), Expr::one()])
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(Expr::add),
            prop::collection::vec(inner.clone(), 2..3).prop_map(Expr::mul),
            (inner.clone(), 1i64..3).prop_map(|(base, exp)| Expr::pow(base, exp)),
            (inner.clone(), inner.clone())
                .prop_map(|(numer, denom)| Expr::div(numer, positive(denom))),
            inner.prop_map(|arg| Expr::log(positive(arg))),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn expand_is_idempotent(expr in arb_expr()) {
        let once = expand(&expr);
        prop_assert_eq!(expand(&once), once);
    }

    #[test]
    fn canonicalize_is_idempotent_and_faithful(expr in arb_expr(), seed in any::<u64>()) {
        let once = canonicalize(&expr);
        prop_assert_eq!(canonicalize(&once), once.clone());
        let mut rng = RngHandle::from_seed(seed);
        let report = numerically_equivalent(&expr, &once, &EvalContext::new(), &mut rng, 4, 1e-8)
            .expect("evaluate");
        prop_assert!(report.passed, "{:?}", report);
    }

    #[test]
    fn abbreviation_expansion_is_idempotent(body in arb_expr(), outer in arb_expr()) {
        let mut table = AbbreviationTable::new();
        let symbol = table.abbreviate(body.clone()).expect("abbreviate");
        let expr = Expr::add([Expr::mul([outer, symbol.clone()]), symbol]);
        let once = expand_abbreviations(&expr, &table).expect("expand");
        prop_assert!(!once.contains_abbreviation());
        prop_assert_eq!(expand_abbreviations(&once, &table).expect("expand"), once);
    }
}
