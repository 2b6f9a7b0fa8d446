//! The IVC driver: pads the input into SHA-256 blocks, runs the step
//! circuit once per block, and folds each step's instance into the running
//! relaxed instance.
#![allow(non_snake_case)]
use crate::{
  bellpepper::SatisfyingAssignment,
  circuit::{ExpandCircuit, InstanceAssignment},
  errors::NovaFoldError,
  mimc::mimc_hash,
  nifs::NIFS,
  pedersen::{jacobian_coords, PedersenKey},
  r1cs::{CommittedRelaxedInstance, CommittedRelaxedR1CS, R1CSShape},
};
use bellpepper_core::Circuit;
use halo2curves::bn256::{Fr, G1Affine};
use std::time::Instant;
use tracing::{debug, info};

/// The SHA-256 initial hash state.
pub const SHA256_IV: [u32; 8] = [
  0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Pads a message into 64-byte SHA-256 blocks: a 0x80 marker, zero fill,
/// and the bit length in big-endian in the last eight bytes.
pub fn sha256_pad(inputs: &[u8]) -> Vec<[u8; 64]> {
  let bit_len = (inputs.len() as u64) << 3;
  let mut padded = inputs.to_vec();
  padded.push(0x80);
  while padded.len() % 64 != 56 {
    padded.push(0);
  }
  padded.extend_from_slice(&bit_len.to_be_bytes());

  padded
    .chunks_exact(64)
    .map(|c| c.try_into().expect("chunks are 64 bytes"))
    .collect()
}

/// Applies the SHA-256 compression function to one block.
pub fn sha256_block(state: &[u32; 8], block: &[u8; 64]) -> [u32; 8] {
  let mut next = *state;
  sha2::compress256(&mut next, &[(*block).into()]);
  next
}

/// The running-hash digest for the step that produced `inst`:
/// `MiMC(idx + 1, Z0, Z_{idx+1}, inst fields)`.
fn step_digest(
  idx_next: u64,
  z0: &[u32; 8],
  state: &[u32; 8],
  inst: &CommittedRelaxedInstance,
) -> Result<Fr, NovaFoldError> {
  let assignment = InstanceAssignment::new(inst)?;
  let mut inputs = vec![Fr::from(idx_next)];
  inputs.extend(z0.iter().map(|w| Fr::from(u64::from(*w))));
  inputs.extend(state.iter().map(|w| Fr::from(u64::from(*w))));
  inputs.extend(assignment.comm_E);
  inputs.push(assignment.u);
  inputs.extend(assignment.comm_W);
  inputs.extend(assignment.X);
  Ok(mimc_hash(&inputs))
}

/// Solves the step circuit and commits the resulting standard instance.
fn synthesize_step(
  shape: &R1CSShape,
  circuit: ExpandCircuit,
  pk_E: &PedersenKey,
  pk_W: &PedersenKey,
) -> Result<CommittedRelaxedR1CS, NovaFoldError> {
  let mut solver = SatisfyingAssignment::new();
  circuit.synthesize(&mut solver)?;
  CommittedRelaxedR1CS::from_instance(shape, &solver.augmented_witness(), pk_E, pk_W)
}

/// The incrementally verifiable computation over repeated SHA-256 blocks.
pub struct IVC;

impl IVC {
  /// Samples the two Pedersen keys for a step-circuit shape: one sized to
  /// the error vector (one entry per constraint), one to the private wires.
  pub fn setup(shape: &R1CSShape) -> Result<(PedersenKey, PedersenKey), NovaFoldError> {
    let t = Instant::now();
    let pk_E = PedersenKey::setup(shape.num_cons())?;
    let pk_W = PedersenKey::setup(shape.num_vars())?;
    info!(elapsed_ms = %t.elapsed().as_millis(), "ivc_setup");
    Ok((pk_E, pk_W))
  }

  /// Proves the SHA-256 hash chain over `inputs`, returning the final
  /// running instance and cross-term commitment.
  ///
  /// Each 64-byte block gets one step instance; every instance, the last
  /// included, is folded into the running instance, so `N` blocks mean `N`
  /// folds.
  pub fn prove(
    shape: &R1CSShape,
    pk_E: &PedersenKey,
    pk_W: &PedersenKey,
    inputs: &[u8],
  ) -> Result<(CommittedRelaxedR1CS, G1Affine), NovaFoldError> {
    let blocks = sha256_pad(inputs);
    if blocks.is_empty() {
      return Err(NovaFoldError::InvalidParameter {
        reason: "no blocks to prove".to_string(),
      });
    }
    let t = Instant::now();
    info!(num_blocks = blocks.len(), "ivc_prove");

    let num_total = shape.num_io() + 1 + shape.num_vars();
    let mut big =
      CommittedRelaxedR1CS::new(shape.num_cons(), num_total, shape.num_io(), pk_E, pk_W)?;
    let mut comm_T = big.comm_E;

    let z0 = SHA256_IV;
    let mut state = z0;

    // base step over the empty running instance
    let next_state = sha256_block(&state, &blocks[0]);
    let circuit = ExpandCircuit {
      big: InstanceAssignment::new(&big.instance())?,
      small: InstanceAssignment::new(&big.instance())?,
      z0,
      zi: state,
      wi: blocks[0],
      comm_T: jacobian_coords(&comm_T),
      idx: 0,
      x_out: step_digest(1, &z0, &next_state, &big.instance())?,
    };
    let mut small = synthesize_step(shape, circuit, pk_E, pk_W)?;
    state = next_state;

    for (i, block) in blocks.iter().enumerate().skip(1) {
      let step_t = Instant::now();
      // fold the previous step's instance, then assign the next step
      // against the pre-fold running instance so the hash chain closes
      let big_prev = InstanceAssignment::new(&big.instance())?;
      let (folded, nifs) = NIFS::prove(shape, pk_E, &big, &small)?;
      big = folded;
      comm_T = nifs.comm_T;

      let next_state = sha256_block(&state, block);
      let circuit = ExpandCircuit {
        big: big_prev,
        small: InstanceAssignment::new(&small.instance())?,
        z0,
        zi: state,
        wi: *block,
        comm_T: jacobian_coords(&comm_T),
        idx: i as u64,
        x_out: step_digest(i as u64 + 1, &z0, &next_state, &big.instance())?,
      };
      small = synthesize_step(shape, circuit, pk_E, pk_W)?;
      state = next_state;
      debug!(step = i, elapsed_ms = %step_t.elapsed().as_millis(), "ivc_step");
    }

    // the trailing fold absorbs the last step's instance
    let (folded, nifs) = NIFS::prove(shape, pk_E, &big, &small)?;
    info!(elapsed_ms = %t.elapsed().as_millis(), "ivc_prove_done");
    Ok((folded, nifs.comm_T))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pad_lengths() {
    assert_eq!(sha256_pad(b"").len(), 1);
    assert_eq!(sha256_pad(b"abc").len(), 1);
    assert_eq!(sha256_pad(&[0u8; 55]).len(), 1);
    assert_eq!(sha256_pad(&[0u8; 56]).len(), 2);
    assert_eq!(sha256_pad(&[0u8; 64]).len(), 2);
    assert_eq!(sha256_pad(&[0u8; 120]).len(), 2);
    assert_eq!(sha256_pad(&[0u8; 121]).len(), 3);
  }

  #[test]
  fn test_padded_chain_matches_reference_digest() {
    use sha2::{Digest, Sha256};
    for msg in [&b"abc"[..], &[0x5au8; 100][..], b""] {
      let mut state = SHA256_IV;
      for block in sha256_pad(msg) {
        state = sha256_block(&state, &block);
      }
      let digest = state.iter().flat_map(|w| w.to_be_bytes()).collect::<Vec<_>>();
      assert_eq!(digest, Sha256::digest(msg).to_vec());
    }
  }

  #[test]
  fn test_single_block_digest_value() {
    let blocks = sha256_pad(b"abc");
    assert_eq!(blocks.len(), 1);
    let state = sha256_block(&SHA256_IV, &blocks[0]);
    let digest = state.iter().flat_map(|w| w.to_be_bytes()).collect::<Vec<_>>();
    assert_eq!(
      hex::encode(digest),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }
}
