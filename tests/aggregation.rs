//! Aggregating polynomial evaluations through relation extensions

use std::sync::Arc;

use lattice_zkp::lattice::{IntVec, RingContext, TEST_CHAIN};
use lattice_zkp::relation::{ImmutLinearRelation, LinearEquation, LinearRelationBuilder};
use lattice_zkp::zk::{execute, PublicParams, Settings};
use num_bigint::BigInt;
use num_traits::Zero;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const T: i64 = 65537;
const POINT: i64 = 3;
/// Non-zero coefficients of each polynomial; the rest of the split is zero.
const DEGREE: usize = 16;

fn polynomial_relation(ring: &Arc<RingContext>, coeffs: &[i64]) -> ImmutLinearRelation {
    let mut padded = coeffs.to_vec();
    padded.resize(ring.degree(), 0);
    let s = IntVec::from_i64s(ring, &padded);
    let mut eqn = LinearEquation::new(s.clone());
    eqn.append_vec_term(s).expect("shape");
    let mut builder = LinearRelationBuilder::new();
    builder.append(eqn);
    builder.build(ring).expect("valid")
}

fn eval_mod(coeffs: &[i64], a: i64, t: i64) -> i64 {
    let acc = coeffs
        .iter()
        .rev()
        .fold(BigInt::zero(), |acc, &c| acc * BigInt::from(a) + BigInt::from(c));
    let r = acc % BigInt::from(t);
    let r: i64 = r.try_into().expect("fits");
    r.rem_euclid(t)
}

#[test]
fn test_sum_of_evaluations_matches_evaluation_of_sum() {
    let ring = RingContext::from_chain(64, &TEST_CHAIN).expect("valid chain");
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let polys: Vec<Vec<i64>> = (0..4)
        .map(|_| (0..DEGREE).map(|_| rng.gen_range(0..3)).collect())
        .collect();

    let mut aggregated = 0i64;
    for coeffs in &polys {
        let relation = polynomial_relation(&ring, coeffs);
        let extended = relation.extend_with_poly_eval(DEGREE, &[POINT]).expect("prefix fits");
        assert!(extended.is_valid());
        assert_eq!(extended.s().len(), ring.degree() + 1);

        let eval = extended.s().lift_at(ring.degree());
        let eval: i64 = eval.try_into().expect("small evaluation");
        aggregated = (aggregated + eval).rem_euclid(T);
    }

    let summed: Vec<i64> = (0..DEGREE).map(|i| polys.iter().map(|p| p[i]).sum()).collect();
    assert_eq!(aggregated, eval_mod(&summed, POINT, T));
}

#[test]
fn test_extended_relation_is_provable() {
    let ring = RingContext::from_chain(64, &TEST_CHAIN).expect("valid chain");
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let coeffs: Vec<i64> = (0..DEGREE).map(|_| rng.gen_range(0..3)).collect();

    let extended = polynomial_relation(&ring, &coeffs)
        .extend_with_poly_eval(DEGREE, &[POINT, -2])
        .expect("prefix fits");
    assert_eq!(extended.column_block_sizes(), &[64, 1, 1]);

    // The evaluations are not digits; only the first split is digit-proven.
    let params = PublicParams::for_relation(&extended, Settings::TOY, 1, b"aggregation").expect("params");
    assert_eq!(params.num_splits(), 2);
    assert_eq!(execute(&params, &extended, &mut rng), Ok(true));
}
