//! Algebraic properties of the containers

use std::sync::Arc;

use lattice_zkp::lattice::{
    Automorphism, IdentityMatrix, IntMatrix, IntVec, Matrix, PartitionedIntMatrix, RingContext, TEST_CHAIN,
};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn test_ring(d: usize) -> Arc<RingContext> {
    RingContext::from_chain(d, &TEST_CHAIN).expect("valid chain")
}

/// Cut `n` into one or two parts.
fn split(n: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    if n >= 2 && rng.gen_bool(0.5) {
        let cut = rng.gen_range(1..n);
        vec![cut, n - cut]
    } else {
        vec![n]
    }
}

/// Random block matrix; cells are empty, dense, identity (when square) or,
/// while `depth > 0`, partitioned again.
fn random_partitioned(
    ring: &Arc<RingContext>,
    rows: Vec<usize>,
    cols: Vec<usize>,
    depth: usize,
    rng: &mut ChaCha8Rng,
) -> PartitionedIntMatrix {
    let mut p = PartitionedIntMatrix::with_sizes(ring, rows.clone(), cols.clone());
    for (i, &r) in rows.iter().enumerate() {
        for (j, &c) in cols.iter().enumerate() {
            let block: Arc<dyn Matrix> = match rng.gen_range(0..4) {
                0 => continue,
                1 if depth > 0 => {
                    let (sub_rows, sub_cols) = (split(r, rng), split(c, rng));
                    Arc::new(random_partitioned(ring, sub_rows, sub_cols, depth - 1, rng))
                }
                2 if r == c => Arc::new(IdentityMatrix::scaled(ring, r, rng.gen_range(-3..=3))),
                _ => Arc::new(IntMatrix::random_uniform(ring, r, c, rng)),
            };
            p.emplace(i, j, block).expect("block fits its cell");
        }
    }
    p
}

fn sizes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..6, 1..4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn block_product_matches_dense(rows in sizes(), cols in sizes(), seed in any::<u64>()) {
        let ring = test_ring(8);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let p = random_partitioned(&ring, rows, cols, 2, &mut rng);
        let v = IntVec::random_uniform(&ring, p.cols(), &mut rng);

        prop_assert_eq!(p.mul_vec(&v).expect("dims"), p.as_dense().mul_vec(&v).expect("dims"));
    }

    #[test]
    fn transpose_is_an_involution(rows in sizes(), cols in sizes(), seed in any::<u64>()) {
        let ring = test_ring(8);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let p = random_partitioned(&ring, rows, cols, 2, &mut rng);

        let t = p.transposed();
        prop_assert_eq!((t.rows(), t.cols()), (p.cols(), p.rows()));
        prop_assert!(t.transposed().eq_matrix(&p));
        prop_assert_eq!(&*t.as_dense(), &*p.as_dense().transpose_dense());
    }

    #[test]
    fn fast_product_matches_reference(rows in 1usize..12, cols in 1usize..70, seed in any::<u64>()) {
        let ring = test_ring(16);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let a = IntMatrix::random_uniform(&ring, rows, cols, &mut rng);
        let v = IntVec::random_uniform(&ring, cols, &mut rng);

        prop_assert_eq!(a.mul_vec(&v).expect("dims"), a.mul_vec_reference(&v).expect("dims"));
    }

    #[test]
    fn rebase_keeps_every_coefficient(len in 1usize..200, seed in any::<u64>()) {
        let big = test_ring(64);
        let small = test_ring(16);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let v = IntVec::random_uniform(&big, len, &mut rng);

        let rebased = v.rebase_lossless(&small).expect("16 divides 64");
        prop_assert_eq!(rebased.len(), len);
        prop_assert_eq!(rebased.lift(), v.lift());
    }
}

#[test]
fn permute_round_trip() {
    let ring = test_ring(64);
    let sigma = Automorphism::new(64, 4).expect("valid");
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let p = ring.sample_uniform(&mut rng);
    let two_d = 2 * ring.degree();

    for e in 1..=10_000usize {
        let g = (2 * e + 1) % two_d;
        let inverse = (1..two_d)
            .step_by(2)
            .find(|h| g * h % two_d == 1)
            .expect("odd elements are units mod 2d");
        assert_eq!(ring.permute(&ring.permute(&p, g), inverse), p, "galois element {g}");

        let exp = e as i64;
        assert_eq!(sigma.permute(&ring, &sigma.permute(&ring, &p, exp), -exp), p, "σ^{e}");
    }
}
