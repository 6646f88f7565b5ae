use criterion::{criterion_group, criterion_main, Criterion};
use wilco_amp::{compute_amplitude, Leg, LoopOrder, ProcessSpec};
use wilco_model::toy_qed;

fn bench_amplitudes(c: &mut Criterion) {
    let model = toy_qed("mu", -1, "m_mu").expect("model");
    let self_energy = ProcessSpec::new(vec![Leg::incoming("mu").off_shell(), Leg::outgoing("mu")]);
    let vertex = ProcessSpec::new(vec![
        Leg::incoming("mu"),
        Leg::outgoing("mu"),
        Leg::outgoing("A"),
    ]);
    let mut group = c.benchmark_group("amplitude_throughput");
    group.sample_size(20);
    group.bench_function("self_energy", |b| {
        b.iter(|| compute_amplitude(&model, LoopOrder::OneLoop, &self_energy).expect("amplitude"))
    });
    group.bench_function("vertex", |b| {
        b.iter(|| compute_amplitude(&model, LoopOrder::OneLoop, &vertex).expect("amplitude"))
    });
    group.finish();
}

criterion_group!(benches, bench_amplitudes);
criterion_main!(benches);
