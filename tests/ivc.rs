//! End-to-end tests of the IVC driver over the step-circuit shape.
use ff::Field;
use halo2curves::{bn256::Fr, CurveAffine};
use novafold::{ivc::sha256_pad, ExpandCircuit, PedersenKey, R1CSShape, IVC};
use std::sync::OnceLock;

/// The step-circuit shape and keys are expensive to build; share them
/// across tests.
fn params() -> &'static (R1CSShape, PedersenKey, PedersenKey) {
  static PARAMS: OnceLock<(R1CSShape, PedersenKey, PedersenKey)> = OnceLock::new();
  PARAMS.get_or_init(|| {
    let shape = ExpandCircuit::shape().unwrap();
    let (pk_E, pk_W) = IVC::setup(&shape).unwrap();
    (shape, pk_E, pk_W)
  })
}

#[test]
fn test_single_block_chain() {
  // "abc" pads to a single block, so the chain is one base step plus the
  // trailing fold that absorbs it.
  let (shape, pk_E, pk_W) = params();

  let (U, comm_T) = IVC::prove(shape, pk_E, pk_W, b"abc").unwrap();

  // the folded instance satisfies the relaxed R1CS equation and both
  // commitments open correctly
  U.is_sat_relaxed(shape, pk_E, pk_W).unwrap();

  // one fold of the empty instance leaves the slack at the challenge value,
  // which is nonzero with overwhelming probability
  assert_ne!(U.u, Fr::ZERO);
  assert_eq!(U.X.len(), 3);
  assert!(bool::from(comm_T.is_on_curve()));
}

#[test]
fn test_multi_block_chain_runs() {
  // 100 bytes pad to two blocks; the driver must thread the hash state and
  // fold every step instance
  let inputs = [0x5au8; 100];
  assert_eq!(sha256_pad(&inputs).len(), 2);

  let (shape, pk_E, pk_W) = params();
  let (U, _comm_T) = IVC::prove(shape, pk_E, pk_W, &inputs).unwrap();
  assert_eq!(U.X.len(), 3);
}
