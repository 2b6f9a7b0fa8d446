// Copyright (c) The novafold authors.
// SPDX-License-Identifier: MIT
// This file is part of the novafold project.
// See the LICENSE file in the project root for full license information.

//! The SHA-256 compression function over 64-byte chunks, as a circuit.
//!
//! State words are field elements in `[0, 2^32)`; the chunk is 64 byte-valued
//! field elements. Words are handled as little-endian Boolean vectors;
//! rotations and shifts reorder wires, modular additions go through a wide
//! bit decomposition whose low 32 bits are kept.
use crate::gadgets::utils::bits_to_num;
use bellpepper_core::{
  boolean::{AllocatedBit, Boolean},
  num::AllocatedNum,
  ConstraintSystem, LinearCombination, SynthesisError,
};
use ff::{PrimeField, PrimeFieldBits};

/// SHA-256 round constants K[0..63].
const ROUND_CONSTANTS: [u32; 64] = [
  0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
  0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
  0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
  0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
  0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
  0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
  0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
  0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

/// A 32-bit word as little-endian Booleans.
type Word = Vec<Boolean>;

fn word_lc<F: PrimeField, CS: ConstraintSystem<F>>(word: &[Boolean]) -> LinearCombination<F> {
  let mut lc = LinearCombination::zero();
  let mut coeff = F::ONE;
  for bit in word {
    lc = lc + &bit.lc(CS::one(), coeff);
    coeff = coeff.double();
  }
  lc
}

fn word_value(word: &[Boolean]) -> Option<u64> {
  word.iter().rev().try_fold(0u64, |acc, bit| {
    bit.get_value().map(|b| (acc << 1) | u64::from(b))
  })
}

fn rotr(word: &[Boolean], by: usize) -> Word {
  [&word[by..], &word[..by]].concat()
}

fn shr(word: &[Boolean], by: usize) -> Word {
  let mut out = word[by..].to_vec();
  out.resize(32, Boolean::Constant(false));
  out
}

fn xor3<F: PrimeField, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  a: &[Boolean],
  b: &[Boolean],
  c: &[Boolean],
) -> Result<Word, SynthesisError> {
  (0..32)
    .map(|i| {
      let t = Boolean::xor(cs.namespace(|| format!("xor1_{i}")), &a[i], &b[i])?;
      Boolean::xor(cs.namespace(|| format!("xor2_{i}")), &t, &c[i])
    })
    .collect()
}

/// sigma0(x) = rotr7 ^ rotr18 ^ shr3
fn small_sigma_0<F: PrimeField, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  x: &[Boolean],
) -> Result<Word, SynthesisError> {
  xor3(cs, &rotr(x, 7), &rotr(x, 18), &shr(x, 3))
}

/// sigma1(x) = rotr17 ^ rotr19 ^ shr10
fn small_sigma_1<F: PrimeField, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  x: &[Boolean],
) -> Result<Word, SynthesisError> {
  xor3(cs, &rotr(x, 17), &rotr(x, 19), &shr(x, 10))
}

/// Sigma0(x) = rotr2 ^ rotr13 ^ rotr22
fn big_sigma_0<F: PrimeField, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  x: &[Boolean],
) -> Result<Word, SynthesisError> {
  xor3(cs, &rotr(x, 2), &rotr(x, 13), &rotr(x, 22))
}

/// Sigma1(x) = rotr6 ^ rotr11 ^ rotr25
fn big_sigma_1<F: PrimeField, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  x: &[Boolean],
) -> Result<Word, SynthesisError> {
  xor3(cs, &rotr(x, 6), &rotr(x, 11), &rotr(x, 25))
}

/// Ch(e, f, g) = (e & f) ^ (!e & g)
fn ch<F: PrimeField, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  e: &[Boolean],
  f: &[Boolean],
  g: &[Boolean],
) -> Result<Word, SynthesisError> {
  (0..32)
    .map(|i| {
      let ef = Boolean::and(cs.namespace(|| format!("ef_{i}")), &e[i], &f[i])?;
      let neg = Boolean::and(cs.namespace(|| format!("neg_{i}")), &e[i].not(), &g[i])?;
      Boolean::xor(cs.namespace(|| format!("ch_{i}")), &ef, &neg)
    })
    .collect()
}

/// Maj(a, b, c) = (a & b) ^ (a & c) ^ (b & c)
fn maj<F: PrimeField, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  a: &[Boolean],
  b: &[Boolean],
  c: &[Boolean],
) -> Result<Word, SynthesisError> {
  (0..32)
    .map(|i| {
      let ab = Boolean::and(cs.namespace(|| format!("ab_{i}")), &a[i], &b[i])?;
      let ac = Boolean::and(cs.namespace(|| format!("ac_{i}")), &a[i], &c[i])?;
      let bc = Boolean::and(cs.namespace(|| format!("bc_{i}")), &b[i], &c[i])?;
      let t = Boolean::xor(cs.namespace(|| format!("maj1_{i}")), &ab, &ac)?;
      Boolean::xor(cs.namespace(|| format!("maj2_{i}")), &t, &bc)
    })
    .collect()
}

/// Adds the words (plus an optional round constant) modulo 2^32 by taking
/// the low 32 bits of a wide decomposition of the field sum.
fn mod32_add<F: PrimeFieldBits, CS: ConstraintSystem<F>>(
  mut cs: CS,
  terms: &[&[Boolean]],
  constant: Option<u32>,
) -> Result<Word, SynthesisError> {
  let n_terms = terms.len() + usize::from(constant.is_some());
  // enough bits for the unreduced sum of n 32-bit terms
  let nbits = 32 + (usize::BITS - (n_terms - 1).leading_zeros()) as usize;

  let sum_value = terms.iter().try_fold(u64::from(constant.unwrap_or(0)), |acc, w| {
    word_value(w).map(|v| acc + v)
  });

  let bits = (0..nbits)
    .map(|i| {
      AllocatedBit::alloc(
        cs.namespace(|| format!("sum_bit_{i}")),
        sum_value.map(|v| (v >> i) & 1 == 1),
      )
      .map(Boolean::from)
    })
    .collect::<Result<Vec<_>, _>>()?;

  // the decomposition reproduces the sum of the term combinations
  let mut sum_lc = LinearCombination::<F>::zero();
  for w in terms {
    sum_lc = sum_lc + &word_lc::<F, CS>(w);
  }
  if let Some(c) = constant {
    sum_lc = sum_lc + (F::from(u64::from(c)), CS::one());
  }
  cs.enforce(
    || "wide decomposition of the sum",
    |_| word_lc::<F, CS>(&bits),
    |lc| lc + CS::one(),
    |_| sum_lc,
  );

  Ok(bits[..32].to_vec())
}

/// Decomposes a word-valued number into its 32 little-endian bits.
fn num_to_word<F: PrimeFieldBits, CS: ConstraintSystem<F>>(
  mut cs: CS,
  num: &AllocatedNum<F>,
  nbits: usize,
) -> Result<Word, SynthesisError> {
  crate::gadgets::utils::num_to_bits_le(cs.namespace(|| "word bits"), num, nbits)
}

/// The SHA-256 compression function over one or more 64-byte chunks.
///
/// `state` is the 8-word hash state, `message` a whole number of 64-byte
/// chunks as byte-valued numbers; returns the final 8-word state. The byte
/// and state inputs are range-constrained by their decompositions.
pub fn sha256_block<F: PrimeFieldBits, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  state: &[AllocatedNum<F>],
  message: &[AllocatedNum<F>],
) -> Result<Vec<AllocatedNum<F>>, SynthesisError> {
  assert_eq!(state.len(), 8);
  assert_eq!(message.len() % 64, 0);

  let mut state = state.to_vec();
  for (n, chunk) in message.chunks_exact(64).enumerate() {
    state = compress(&mut cs.namespace(|| format!("chunk_{n}")), &state, chunk)?;
  }
  Ok(state)
}

/// One application of the compression function.
fn compress<F: PrimeFieldBits, CS: ConstraintSystem<F>>(
  cs: &mut CS,
  state: &[AllocatedNum<F>],
  chunk: &[AllocatedNum<F>],
) -> Result<Vec<AllocatedNum<F>>, SynthesisError> {
  // bytes to big-endian words, as little-endian bit vectors
  let byte_bits = chunk
    .iter()
    .enumerate()
    .map(|(i, b)| num_to_word(cs.namespace(|| format!("byte_{i}")), b, 8))
    .collect::<Result<Vec<_>, _>>()?;
  let mut w = (0..16)
    .map(|t| {
      [
        byte_bits[4 * t + 3].as_slice(),
        byte_bits[4 * t + 2].as_slice(),
        byte_bits[4 * t + 1].as_slice(),
        byte_bits[4 * t].as_slice(),
      ]
      .concat()
    })
    .collect::<Vec<Word>>();

  // message schedule
  for t in 16..64 {
    let s0 = small_sigma_0(&mut cs.namespace(|| format!("s0_{t}")), &w[t - 15])?;
    let s1 = small_sigma_1(&mut cs.namespace(|| format!("s1_{t}")), &w[t - 2])?;
    let next = mod32_add(
      cs.namespace(|| format!("schedule_{t}")),
      &[&w[t - 16], &s0, &w[t - 7], &s1],
      None,
    )?;
    w.push(next);
  }

  // working registers from the incoming state
  let mut regs = state
    .iter()
    .enumerate()
    .map(|(i, s)| num_to_word(cs.namespace(|| format!("state_{i}")), s, 32))
    .collect::<Result<Vec<_>, _>>()?;

  for t in 0..64 {
    let [a, b, c, d, e, f, g, h] = [
      &regs[0], &regs[1], &regs[2], &regs[3], &regs[4], &regs[5], &regs[6], &regs[7],
    ];

    let big_s1 = big_sigma_1(&mut cs.namespace(|| format!("S1_{t}")), e)?;
    let ch_efg = ch(&mut cs.namespace(|| format!("ch_{t}")), e, f, g)?;
    let big_s0 = big_sigma_0(&mut cs.namespace(|| format!("S0_{t}")), a)?;
    let maj_abc = maj(&mut cs.namespace(|| format!("maj_{t}")), a, b, c)?;

    // new_a = t1 + t2, new_e = d + t1, both mod 2^32
    let new_a = mod32_add(
      cs.namespace(|| format!("new_a_{t}")),
      &[h, &big_s1, &ch_efg, &w[t], &big_s0, &maj_abc],
      Some(ROUND_CONSTANTS[t]),
    )?;
    let new_e = mod32_add(
      cs.namespace(|| format!("new_e_{t}")),
      &[d, h, &big_s1, &ch_efg, &w[t]],
      Some(ROUND_CONSTANTS[t]),
    )?;

    regs = vec![
      new_a,
      regs[0].clone(),
      regs[1].clone(),
      regs[2].clone(),
      new_e,
      regs[4].clone(),
      regs[5].clone(),
      regs[6].clone(),
    ];
  }

  // feed-forward into the output state
  let state_bits = state
    .iter()
    .enumerate()
    .map(|(i, s)| num_to_word(cs.namespace(|| format!("ff_state_{i}")), s, 32))
    .collect::<Result<Vec<_>, _>>()?;
  (0..8)
    .map(|i| {
      let out = mod32_add(
        cs.namespace(|| format!("out_{i}")),
        &[&state_bits[i], &regs[i]],
        None,
      )?;
      bits_to_num(cs.namespace(|| format!("out_num_{i}")), &out)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use bellpepper_core::test_cs::TestConstraintSystem;
  use halo2curves::bn256::Fr;
  use sha2::compress256;

  /// The standard initial hash state.
  pub const IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
  ];

  fn run_block(state: [u32; 8], message: &[u8]) -> Vec<u32> {
    let mut cs = TestConstraintSystem::<Fr>::new();
    let state_nums = state
      .iter()
      .enumerate()
      .map(|(i, s)| {
        AllocatedNum::alloc(cs.namespace(|| format!("state_{i}")), || {
          Ok(Fr::from(u64::from(*s)))
        })
        .unwrap()
      })
      .collect::<Vec<_>>();
    let message_nums = message
      .iter()
      .enumerate()
      .map(|(i, b)| {
        AllocatedNum::alloc(cs.namespace(|| format!("byte_{i}")), || {
          Ok(Fr::from(u64::from(*b)))
        })
        .unwrap()
      })
      .collect::<Vec<_>>();

    let out = sha256_block(&mut cs, &state_nums, &message_nums).unwrap();
    assert!(cs.is_satisfied());

    out
      .iter()
      .map(|n| {
        let repr = n.get_value().unwrap().to_repr();
        u32::from_le_bytes(repr.as_ref()[..4].try_into().unwrap())
      })
      .collect()
  }

  #[test]
  fn test_block_matches_reference() {
    // "abc" padded to a single chunk
    let mut chunk = [0u8; 64];
    chunk[..3].copy_from_slice(b"abc");
    chunk[3] = 0x80;
    chunk[63] = 24;

    let circuit_out = run_block(IV, &chunk);

    let mut expected = IV;
    compress256(&mut expected, &[chunk.into()]);
    assert_eq!(circuit_out, expected.to_vec());

    // the well-known digest of "abc"
    let digest = expected
      .iter()
      .flat_map(|w| w.to_be_bytes())
      .collect::<Vec<_>>();
    assert_eq!(
      hex::encode(digest),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn test_block_on_random_chunk() {
    let chunk: [u8; 64] = core::array::from_fn(|i| (i * 37 + 11) as u8);
    let state = [0x01234567, 0x89abcdef, 0xdeadbeef, 0xcafef00d, 1, 2, 3, 4];
    let circuit_out = run_block(state, &chunk);

    let mut expected = state;
    compress256(&mut expected, &[chunk.into()]);
    assert_eq!(circuit_out, expected.to_vec());
  }

  #[test]
  fn test_two_chunk_message() {
    let message: [u8; 128] = core::array::from_fn(|i| (i * 29 + 5) as u8);
    let circuit_out = run_block(IV, &message);

    let mut expected = IV;
    let (lo, hi) = message.split_at(64);
    compress256(
      &mut expected,
      &[
        <[u8; 64]>::try_from(lo).unwrap().into(),
        <[u8; 64]>::try_from(hi).unwrap().into(),
      ],
    );
    assert_eq!(circuit_out, expected.to_vec());
  }
}
