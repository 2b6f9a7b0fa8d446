//! Low-level number gadgets shared by the point and hash circuits.
use bellpepper_core::{
  boolean::{AllocatedBit, Boolean},
  num::AllocatedNum,
  ConstraintSystem, SynthesisError,
};
use ff::{PrimeField, PrimeFieldBits};

/// Allocates a number pinned to a constant value.
pub fn alloc_constant<F: PrimeField, CS: ConstraintSystem<F>>(
  mut cs: CS,
  val: F,
) -> Result<AllocatedNum<F>, SynthesisError> {
  let num = AllocatedNum::alloc(cs.namespace(|| "constant"), || Ok(val))?;
  cs.enforce(
    || "constant is pinned",
    |lc| lc + num.get_variable(),
    |lc| lc + CS::one(),
    |lc| lc + (val, CS::one()),
  );
  Ok(num)
}

/// Allocates `a - b`.
pub fn sub<F: PrimeField, CS: ConstraintSystem<F>>(
  mut cs: CS,
  a: &AllocatedNum<F>,
  b: &AllocatedNum<F>,
) -> Result<AllocatedNum<F>, SynthesisError> {
  let res = AllocatedNum::alloc(cs.namespace(|| "diff"), || {
    Ok(a.get_value().ok_or(SynthesisError::AssignmentMissing)? - b.get_value().ok_or(SynthesisError::AssignmentMissing)?)
  })?;
  cs.enforce(
    || "diff = a - b",
    |lc| lc + a.get_variable() - b.get_variable(),
    |lc| lc + CS::one(),
    |lc| lc + res.get_variable(),
  );
  Ok(res)
}

/// Allocates the zero-test of `x`: one if `x == 0`, zero otherwise.
///
/// Uses the inverse-hint construction: `x * inv = 1 - flag` forces the flag
/// to zero whenever `x` is invertible, and `x * flag = 0` forces it to one
/// on a zero input.
pub fn alloc_is_zero<F: PrimeField, CS: ConstraintSystem<F>>(
  mut cs: CS,
  x: &AllocatedNum<F>,
) -> Result<AllocatedNum<F>, SynthesisError> {
  let x_val = x.get_value();
  let flag = AllocatedNum::alloc(cs.namespace(|| "is_zero"), || {
    x_val
      .map(|x| if x.is_zero().into() { F::ONE } else { F::ZERO })
      .ok_or(SynthesisError::AssignmentMissing)
  })?;
  let inv = AllocatedNum::alloc(cs.namespace(|| "inv"), || {
    x_val
      .map(|x| x.invert().unwrap_or(F::ZERO))
      .ok_or(SynthesisError::AssignmentMissing)
  })?;
  cs.enforce(
    || "x * inv = 1 - is_zero",
    |lc| lc + x.get_variable(),
    |lc| lc + inv.get_variable(),
    |lc| lc + CS::one() - flag.get_variable(),
  );
  cs.enforce(
    || "x * is_zero = 0",
    |lc| lc + x.get_variable(),
    |lc| lc + flag.get_variable(),
    |lc| lc,
  );
  Ok(flag)
}

/// Allocates the equality test of `a` and `b` as a zero/one number.
pub fn alloc_num_equals<F: PrimeField, CS: ConstraintSystem<F>>(
  mut cs: CS,
  a: &AllocatedNum<F>,
  b: &AllocatedNum<F>,
) -> Result<AllocatedNum<F>, SynthesisError> {
  let diff = sub(cs.namespace(|| "a - b"), a, b)?;
  alloc_is_zero(cs.namespace(|| "diff is zero"), &diff)
}

/// Selects `a` if the zero/one number `cond` is one, `b` otherwise.
pub fn conditionally_select<F: PrimeField, CS: ConstraintSystem<F>>(
  mut cs: CS,
  cond: &AllocatedNum<F>,
  a: &AllocatedNum<F>,
  b: &AllocatedNum<F>,
) -> Result<AllocatedNum<F>, SynthesisError> {
  let res = AllocatedNum::alloc(cs.namespace(|| "select"), || {
    let c = cond.get_value().ok_or(SynthesisError::AssignmentMissing)?;
    if c.is_zero().into() {
      b.get_value().ok_or(SynthesisError::AssignmentMissing)
    } else {
      a.get_value().ok_or(SynthesisError::AssignmentMissing)
    }
  })?;
  // cond * (a - b) = res - b
  cs.enforce(
    || "select constraint",
    |lc| lc + cond.get_variable(),
    |lc| lc + a.get_variable() - b.get_variable(),
    |lc| lc + res.get_variable() - b.get_variable(),
  );
  Ok(res)
}

/// Selects `a` if the Boolean `cond` holds, `b` otherwise.
pub fn conditionally_select_boolean<F: PrimeField, CS: ConstraintSystem<F>>(
  mut cs: CS,
  cond: &Boolean,
  a: &AllocatedNum<F>,
  b: &AllocatedNum<F>,
) -> Result<AllocatedNum<F>, SynthesisError> {
  let res = AllocatedNum::alloc(cs.namespace(|| "select"), || {
    if cond.get_value().ok_or(SynthesisError::AssignmentMissing)? {
      a.get_value().ok_or(SynthesisError::AssignmentMissing)
    } else {
      b.get_value().ok_or(SynthesisError::AssignmentMissing)
    }
  })?;
  cs.enforce(
    || "select constraint",
    |_| cond.lc(CS::one(), F::ONE),
    |lc| lc + a.get_variable() - b.get_variable(),
    |lc| lc + res.get_variable() - b.get_variable(),
  );
  Ok(res)
}

/// Decomposes `x` into `nbits` little-endian bits, each boolean-constrained,
/// with the weighted sum enforced to reproduce `x`.
pub fn num_to_bits_le<F: PrimeFieldBits, CS: ConstraintSystem<F>>(
  mut cs: CS,
  x: &AllocatedNum<F>,
  nbits: usize,
) -> Result<Vec<Boolean>, SynthesisError> {
  let bit_values = match x.get_value() {
    Some(v) => v
      .to_le_bits()
      .iter()
      .take(nbits)
      .map(|b| Some(*b))
      .collect::<Vec<_>>(),
    None => vec![None; nbits],
  };

  let bits = bit_values
    .into_iter()
    .enumerate()
    .map(|(i, b)| {
      AllocatedBit::alloc(cs.namespace(|| format!("bit_{i}")), b).map(Boolean::from)
    })
    .collect::<Result<Vec<_>, _>>()?;

  // sum_i 2^i * bit_i = x
  let mut packed = bellpepper_core::LinearCombination::zero();
  let mut coeff = F::ONE;
  for bit in &bits {
    packed = packed + &bit.lc(CS::one(), coeff);
    coeff = coeff.double();
  }
  cs.enforce(
    || "bits pack to x",
    |_| packed,
    |lc| lc + CS::one(),
    |lc| lc + x.get_variable(),
  );

  Ok(bits)
}

/// Packs little-endian bits into an allocated number.
pub fn bits_to_num<F: PrimeField, CS: ConstraintSystem<F>>(
  mut cs: CS,
  bits: &[Boolean],
) -> Result<AllocatedNum<F>, SynthesisError> {
  let value = bits.iter().rev().try_fold(F::ZERO, |acc, bit| {
    bit
      .get_value()
      .map(|b| acc.double() + if b { F::ONE } else { F::ZERO })
  });
  let num = AllocatedNum::alloc(cs.namespace(|| "packed"), || {
    value.ok_or(SynthesisError::AssignmentMissing)
  })?;

  let mut packed = bellpepper_core::LinearCombination::zero();
  let mut coeff = F::ONE;
  for bit in bits {
    packed = packed + &bit.lc(CS::one(), coeff);
    coeff = coeff.double();
  }
  cs.enforce(
    || "bits pack to num",
    |_| packed,
    |lc| lc + CS::one(),
    |lc| lc + num.get_variable(),
  );
  Ok(num)
}

#[cfg(test)]
mod tests {
  use super::*;
  use bellpepper_core::test_cs::TestConstraintSystem;
  use ff::Field;
  use halo2curves::bn256::Fr;

  #[test]
  fn test_is_zero_and_select() {
    let mut cs = TestConstraintSystem::<Fr>::new();
    let zero = AllocatedNum::alloc(cs.namespace(|| "zero"), || Ok(Fr::ZERO)).unwrap();
    let five = AllocatedNum::alloc(cs.namespace(|| "five"), || Ok(Fr::from(5))).unwrap();
    let seven = AllocatedNum::alloc(cs.namespace(|| "seven"), || Ok(Fr::from(7))).unwrap();

    let z_flag = alloc_is_zero(cs.namespace(|| "z flag"), &zero).unwrap();
    let f_flag = alloc_is_zero(cs.namespace(|| "f flag"), &five).unwrap();
    assert_eq!(z_flag.get_value().unwrap(), Fr::ONE);
    assert_eq!(f_flag.get_value().unwrap(), Fr::ZERO);

    let sel = conditionally_select(cs.namespace(|| "sel"), &z_flag, &five, &seven).unwrap();
    assert_eq!(sel.get_value().unwrap(), Fr::from(5));
    assert!(cs.is_satisfied());
  }

  #[test]
  fn test_bit_roundtrip() {
    let mut cs = TestConstraintSystem::<Fr>::new();
    let x = AllocatedNum::alloc(cs.namespace(|| "x"), || Ok(Fr::from(0xdeadbeefu64))).unwrap();
    let bits = num_to_bits_le(cs.namespace(|| "bits"), &x, 254).unwrap();
    let packed = bits_to_num(cs.namespace(|| "packed"), &bits).unwrap();
    assert_eq!(packed.get_value(), x.get_value());
    assert!(cs.is_satisfied());
  }
}
