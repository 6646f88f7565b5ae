use criterion::{criterion_group, criterion_main, Criterion};
use wilco_expr::{canonicalize, expand, Expr, LoopFunction};

fn vertex_like() -> Expr {
    let m_sq = Expr::pow(Expr::param("m"), 2);
    let args = vec![m_sq.clone(), Expr::zero(), m_sq.clone(), Expr::zero(), m_sq.clone(), m_sq.clone()];
    let c1 = Expr::loop_fn(LoopFunction::C1, args.clone());
    let c11 = Expr::loop_fn(LoopFunction::C11, args.clone());
    let c12 = Expr::loop_fn(LoopFunction::C12, args);
    let sum = Expr::add([c1, c11, c12, Expr::param("e")]);
    Expr::div(
        Expr::pow(sum, 3),
        Expr::mul([Expr::int(16), Expr::pow(Expr::pi(), 2), Expr::param("m")]),
    )
}

fn bench_canonicalize(c: &mut Criterion) {
    let expr = vertex_like();
    let mut group = c.benchmark_group("canonicalize_throughput");
    group.bench_function("expand", |b| b.iter(|| expand(&expr)));
    group.bench_function("canonicalize", |b| b.iter(|| canonicalize(&expr)));
    group.finish();
}

criterion_group!(benches, bench_canonicalize);
criterion_main!(benches);
