use criterion::{criterion_group, criterion_main, Criterion};
use wilco_amp::{compute_amplitude, Leg, LoopOrder, ProcessSpec};
use wilco_expr::AbbreviationTable;
use wilco_match::get_wilson_coefficients;
use wilco_model::toy_qed;

fn bench_matching(c: &mut Criterion) {
    let model = toy_qed("mu", -1, "m_mu").expect("model");
    let vertex = ProcessSpec::new(vec![
        Leg::incoming("mu"),
        Leg::outgoing("mu"),
        Leg::outgoing("A"),
    ]);
    let amplitude = compute_amplitude(&model, LoopOrder::OneLoop, &vertex).expect("amplitude");
    let mut group = c.benchmark_group("matching_throughput");
    group.sample_size(20);
    group.bench_function("vertex_wilson_coefficients", |b| {
        b.iter(|| {
            let mut table = AbbreviationTable::new();
            get_wilson_coefficients(&amplitude, &mut table).expect("match")
        })
    });
    group.finish();
}

criterion_group!(benches, bench_matching);
criterion_main!(benches);
