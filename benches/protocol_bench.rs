//! Protocol benchmarks
//!
//! One full prove-and-verify session for identity relations of growing
//! witness size, with and without the bound proof.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lattice_zkp::lattice::{IntVec, RingContext, TEST_CHAIN};
use lattice_zkp::relation::{ImmutLinearRelation, LinearEquation, LinearRelationBuilder};
use lattice_zkp::zk::{abp_public_parameters, execute, execute_with_bound_proof, generate_public_parameters, AbpConfig, Settings};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

fn identity_relation(ring: &std::sync::Arc<RingContext>, n: usize, rng: &mut ChaCha8Rng) -> ImmutLinearRelation {
    let s = IntVec::random_ternary(ring, n, rng);
    let mut eqn = LinearEquation::new(s.clone());
    eqn.append_vec_term(s).expect("shape");
    let mut builder = LinearRelationBuilder::new();
    builder.append(eqn);
    builder.build(ring).expect("valid")
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    group.sample_size(10);
    let mut rng = bench_rng();
    let ring = RingContext::from_chain(64, &TEST_CHAIN).expect("valid chain");

    for &n in &[64usize, 256, 1024] {
        let relation = identity_relation(&ring, n, &mut rng);
        let params = generate_public_parameters(&relation, Settings::TOY, b"bench").expect("params");

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("plain", n), &n, |bench, _| {
            bench.iter(|| execute(&params, &relation, &mut rng))
        });

        let config = AbpConfig::new(0..n / 2, 64);
        let abp_params = abp_public_parameters(&relation, &config, Settings::TOY, b"bench").expect("params");
        group.bench_with_input(BenchmarkId::new("bound_proof", n), &n, |bench, _| {
            bench.iter(|| execute_with_bound_proof(&abp_params, &relation, &config, &mut rng))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_execute);
criterion_main!(benches);
