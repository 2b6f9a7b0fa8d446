//! MiMC over the BN254 scalar field, in native and in-circuit form.
//!
//! The same permutation backs the Fiat-Shamir challenge of the folding
//! scheme and the running-hash chain of the step circuit, so the native
//! function and the gadget must agree bit-for-bit: both use the round
//! constants derived here and the Miyaguchi-Preneel mode
//! `h' = perm_h(m) + h + m` with `perm_h(x)` iterating `x <- (x + h + c)^5`.
use bellpepper_core::{num::AllocatedNum, ConstraintSystem, LinearCombination, SynthesisError};
use digest::{ExtendableOutput, Update, XofReader};
use ff::{Field, FromUniformBytes};
use halo2curves::bn256::Fr;
use once_cell::sync::Lazy;
use sha3::Shake256;

/// Number of rounds of the degree-5 MiMC permutation at 128-bit security.
const MIMC_ROUNDS: usize = 110;

/// Round constants, expanded from a fixed seed with SHAKE-256.
static MIMC_CONSTANTS: Lazy<Vec<Fr>> = Lazy::new(|| {
  let mut shake = Shake256::default();
  shake.update(b"novafold mimc bn254");
  let mut reader = shake.finalize_xof();
  (0..MIMC_ROUNDS)
    .map(|_| {
      let mut uniform_bytes = [0u8; 64];
      reader.read(&mut uniform_bytes);
      Fr::from_uniform_bytes(&uniform_bytes)
    })
    .collect()
});

/// One absorption: Miyaguchi-Preneel with the running state as the key.
fn mimc_block(h: &Fr, m: &Fr) -> Fr {
  let mut x = *m;
  for c in MIMC_CONSTANTS.iter() {
    let t = x + h + c;
    let t2 = t.square();
    x = t2.square() * t;
  }
  x + h + m
}

/// A MiMC sponge over field elements.
#[derive(Clone, Debug, Default)]
pub struct MiMC {
  state: Fr,
}

impl MiMC {
  /// Creates a sponge with the all-zero initial state.
  pub fn new() -> Self {
    Self::default()
  }

  /// Absorbs one field element.
  pub fn write(&mut self, m: &Fr) {
    self.state = mimc_block(&self.state, m);
  }

  /// Returns the current digest.
  pub fn sum(&self) -> Fr {
    self.state
  }
}

/// Hashes a slice of field elements in one call.
pub fn mimc_hash(inputs: &[Fr]) -> Fr {
  let mut h = MiMC::new();
  for m in inputs {
    h.write(m);
  }
  h.sum()
}

/// The in-circuit mirror of [`MiMC`].
pub struct MiMCGadget {
  state: Option<AllocatedNum<Fr>>,
}

impl MiMCGadget {
  /// Creates a sponge gadget with the all-zero initial state.
  pub fn new() -> Self {
    Self { state: None }
  }

  /// Absorbs one allocated field element.
  pub fn write<CS: ConstraintSystem<Fr>>(
    &mut self,
    mut cs: CS,
    m: &AllocatedNum<Fr>,
  ) -> Result<(), SynthesisError> {
    // state == None encodes the zero state without an allocation
    let h_val = self
      .state
      .as_ref()
      .map_or(Some(Fr::ZERO), |h| h.get_value());
    let h_lc = self.state.as_ref().map_or_else(LinearCombination::zero, |h| {
      LinearCombination::zero() + h.get_variable()
    });

    // x <- (x + h + c)^5, carried as a linear combination over the previous x
    let mut x_lc = LinearCombination::zero() + m.get_variable();
    let mut x_val = m.get_value();
    for (i, c) in MIMC_CONSTANTS.iter().enumerate() {
      let t_lc = x_lc + &h_lc + (*c, CS::one());
      let t_val = x_val.and_then(|x| h_val.map(|h| x + h + c));

      let t2 = AllocatedNum::alloc(cs.namespace(|| format!("t2_{i}")), || {
        t_val.map(|t| t.square()).ok_or(SynthesisError::AssignmentMissing)
      })?;
      cs.enforce(
        || format!("t2_{i} = t * t"),
        |lc| lc + &t_lc,
        |lc| lc + &t_lc,
        |lc| lc + t2.get_variable(),
      );
      let t4 = t2.square(cs.namespace(|| format!("t4_{i}")))?;
      let t5 = AllocatedNum::alloc(cs.namespace(|| format!("t5_{i}")), || {
        t_val
          .and_then(|t| t4.get_value().map(|t4| t4 * t))
          .ok_or(SynthesisError::AssignmentMissing)
      })?;
      cs.enforce(
        || format!("t5_{i} = t4 * t"),
        |lc| lc + t4.get_variable(),
        |lc| lc + &t_lc,
        |lc| lc + t5.get_variable(),
      );

      x_lc = LinearCombination::zero() + t5.get_variable();
      x_val = t5.get_value();
    }

    // h' = x + h + m
    let h_next = AllocatedNum::alloc(cs.namespace(|| "h_next"), || {
      x_val
        .and_then(|x| h_val.map(|h| m.get_value().map(|m| x + h + m)))
        .flatten()
        .ok_or(SynthesisError::AssignmentMissing)
    })?;
    cs.enforce(
      || "h_next = x + h + m",
      |lc| lc + &x_lc + &h_lc + m.get_variable(),
      |lc| lc + CS::one(),
      |lc| lc + h_next.get_variable(),
    );

    self.state = Some(h_next);
    Ok(())
  }

  /// Absorbs a sequence of allocated field elements.
  pub fn write_many<CS: ConstraintSystem<Fr>>(
    &mut self,
    cs: &mut CS,
    ms: &[AllocatedNum<Fr>],
  ) -> Result<(), SynthesisError> {
    for (i, m) in ms.iter().enumerate() {
      self.write(cs.namespace(|| format!("absorb_{i}")), m)?;
    }
    Ok(())
  }

  /// Returns the current digest as an allocated number.
  pub fn sum<CS: ConstraintSystem<Fr>>(
    &self,
    mut cs: CS,
  ) -> Result<AllocatedNum<Fr>, SynthesisError> {
    match &self.state {
      Some(h) => Ok(h.clone()),
      None => {
        // the empty digest is the zero state
        let zero = AllocatedNum::alloc(cs.namespace(|| "zero"), || Ok(Fr::ZERO))?;
        cs.enforce(
          || "zero is zero",
          |lc| lc + zero.get_variable(),
          |lc| lc + CS::one(),
          |lc| lc,
        );
        Ok(zero)
      }
    }
  }
}

impl Default for MiMCGadget {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bellpepper_core::test_cs::TestConstraintSystem;
  use rand_core::OsRng;

  #[test]
  fn test_mimc_constants_are_fixed() {
    // the sponge must be deterministic across processes
    assert_eq!(MIMC_CONSTANTS.len(), MIMC_ROUNDS);
    assert_ne!(MIMC_CONSTANTS[0], Fr::ZERO);
    assert_eq!(mimc_hash(&[Fr::ONE]), mimc_hash(&[Fr::ONE]));
    assert_ne!(mimc_hash(&[Fr::ONE]), mimc_hash(&[Fr::ZERO]));
  }

  #[test]
  fn test_mimc_gadget_matches_native() {
    let inputs = (0..5).map(|_| Fr::random(OsRng)).collect::<Vec<_>>();
    let expected = mimc_hash(&inputs);

    let mut cs = TestConstraintSystem::<Fr>::new();
    let allocated = inputs
      .iter()
      .enumerate()
      .map(|(i, x)| AllocatedNum::alloc(cs.namespace(|| format!("in_{i}")), || Ok(*x)).unwrap())
      .collect::<Vec<_>>();

    let mut h = MiMCGadget::new();
    h.write_many(&mut cs, &allocated).unwrap();
    let digest = h.sum(cs.namespace(|| "sum")).unwrap();

    assert!(cs.is_satisfied());
    assert_eq!(digest.get_value().unwrap(), expected);
  }
}
