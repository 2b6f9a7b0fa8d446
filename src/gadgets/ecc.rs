// Copyright (c) The novafold authors.
// SPDX-License-Identifier: MIT
// This file is part of the novafold project.
// See the LICENSE file in the project root for full license information.

//! In-circuit Jacobian group law for the BN254 G1 curve `y^2 = x^3 + 3`.
//!
//! Points are `(X, Y, Z)` with the affine point `(X/Z^2, Y/Z^3)`; the
//! identity is any triple with `Z = 0`, canonically `(1, 1, 0)`. Every
//! branch of the group law is computed and muxed, so the constraint shape
//! is independent of the assignment.
//!
//! The gadget is generic over the circuit field. Over the curve's base
//! field it implements the actual group law (which is how it is tested);
//! the step circuit instantiates it over the scalar field, where the
//! coordinates live as wide-reduced embeddings.
use crate::gadgets::utils::{
  alloc_constant, alloc_is_zero, conditionally_select, conditionally_select_boolean, sub,
};
use bellpepper_core::{boolean::Boolean, num::AllocatedNum, ConstraintSystem, SynthesisError};
use ff::PrimeField;

/// The `b` coefficient of the curve equation.
const CURVE_B: u64 = 3;

/// An allocated point in Jacobian coordinates.
#[derive(Clone)]
pub struct AllocatedPoint<F: PrimeField> {
  /// Jacobian X coordinate
  pub x: AllocatedNum<F>,
  /// Jacobian Y coordinate
  pub y: AllocatedNum<F>,
  /// Jacobian Z coordinate
  pub z: AllocatedNum<F>,
}

impl<F: PrimeField> AllocatedPoint<F> {
  /// Allocates a point from a coordinate triple.
  pub fn alloc<CS: ConstraintSystem<F>>(
    mut cs: CS,
    coords: (F, F, F),
  ) -> Result<Self, SynthesisError> {
    let x = AllocatedNum::alloc(cs.namespace(|| "x"), || Ok(coords.0))?;
    let y = AllocatedNum::alloc(cs.namespace(|| "y"), || Ok(coords.1))?;
    let z = AllocatedNum::alloc(cs.namespace(|| "z"), || Ok(coords.2))?;
    Ok(Self { x, y, z })
  }

  /// Allocates the canonical identity `(1, 1, 0)` as pinned constants.
  pub fn identity<CS: ConstraintSystem<F>>(mut cs: CS) -> Result<Self, SynthesisError> {
    let x = alloc_constant(cs.namespace(|| "identity x"), F::ONE)?;
    let y = alloc_constant(cs.namespace(|| "identity y"), F::ONE)?;
    let z = alloc_constant(cs.namespace(|| "identity z"), F::ZERO)?;
    Ok(Self { x, y, z })
  }

  /// Returns the coordinate triple if the assignment is known.
  pub fn get_coords(&self) -> Option<(F, F, F)> {
    Some((
      self.x.get_value()?,
      self.y.get_value()?,
      self.z.get_value()?,
    ))
  }

  /// Enforces the Jacobian curve equation `Y^2 = X^3 + b * Z^6`.
  pub fn assert_on_curve<CS: ConstraintSystem<F>>(
    &self,
    mut cs: CS,
  ) -> Result<(), SynthesisError> {
    let x_sq = self.x.square(cs.namespace(|| "x_sq"))?;
    let x_cu = x_sq.mul(cs.namespace(|| "x_cu"), &self.x)?;
    let y_sq = self.y.square(cs.namespace(|| "y_sq"))?;
    let z_sq = self.z.square(cs.namespace(|| "z_sq"))?;
    let z_4 = z_sq.square(cs.namespace(|| "z_4"))?;
    let z_6 = z_4.mul(cs.namespace(|| "z_6"), &z_sq)?;
    cs.enforce(
      || "y^2 = x^3 + b z^6",
      |lc| lc + x_cu.get_variable() + (F::from(CURVE_B), z_6.get_variable()),
      |lc| lc + CS::one(),
      |lc| lc + y_sq.get_variable(),
    );
    Ok(())
  }

  /// Point doubling: `w = 3X^2`, `s = YZ`, `b = XY^2`, `h = w^2 - 8b`,
  /// `X' = 2sh`, `Y' = w(4b - h) - 8Y^4`, `Z' = 2Ys`.
  pub fn double<CS: ConstraintSystem<F>>(&self, mut cs: CS) -> Result<Self, SynthesisError> {
    let x_sq = self.x.square(cs.namespace(|| "x_sq"))?;
    let y_sq = self.y.square(cs.namespace(|| "y_sq"))?;
    let y_4 = y_sq.square(cs.namespace(|| "y_4"))?;
    let s = self.y.mul(cs.namespace(|| "s"), &self.z)?;
    let b = self.x.mul(cs.namespace(|| "b"), &y_sq)?;

    // w = 3 x_sq is kept as a linear combination
    let three = F::from(3);
    let eight = F::from(8);
    let four = F::from(4);

    let w_sq = AllocatedNum::alloc(cs.namespace(|| "w_sq"), || {
      let x_sq = x_sq.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let w = three * x_sq;
      Ok(w * w)
    })?;
    cs.enforce(
      || "w_sq = w * w",
      |lc| lc + (three, x_sq.get_variable()),
      |lc| lc + (three, x_sq.get_variable()),
      |lc| lc + w_sq.get_variable(),
    );

    // h = w_sq - 8b; x3 = 2 s h
    let x3 = AllocatedNum::alloc(cs.namespace(|| "x3"), || {
      let w_sq = w_sq.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let b = b.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let s = s.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      Ok(s.double() * (w_sq - eight * b))
    })?;
    cs.enforce(
      || "x3 = 2 s h",
      |lc| lc + (F::from(2), s.get_variable()),
      |lc| lc + w_sq.get_variable() - (eight, b.get_variable()),
      |lc| lc + x3.get_variable(),
    );

    // y3 = w (4b - h) - 8 y_4
    let y3 = AllocatedNum::alloc(cs.namespace(|| "y3"), || {
      let x_sq = x_sq.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let w_sq = w_sq.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let b = b.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let y_4 = y_4.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let w = three * x_sq;
      let h = w_sq - eight * b;
      Ok(w * (four * b - h) - eight * y_4)
    })?;
    cs.enforce(
      || "y3 + 8 y_4 = w (4b - h)",
      |lc| lc + (three, x_sq.get_variable()),
      |lc| lc + (four, b.get_variable()) - w_sq.get_variable() + (eight, b.get_variable()),
      |lc| lc + y3.get_variable() + (eight, y_4.get_variable()),
    );

    // z3 = 2 y s
    let z3 = AllocatedNum::alloc(cs.namespace(|| "z3"), || {
      let y = self.y.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let s = s.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      Ok(y.double() * s)
    })?;
    cs.enforce(
      || "z3 = 2 y s",
      |lc| lc + (F::from(2), self.y.get_variable()),
      |lc| lc + s.get_variable(),
      |lc| lc + z3.get_variable(),
    );

    Ok(Self {
      x: x3,
      y: y3,
      z: z3,
    })
  }

  /// General Jacobian addition with constant-shape handling of the edge
  /// cases: either operand at infinity, equal points (doubling), and
  /// inverse points (the canonical identity).
  pub fn add<CS: ConstraintSystem<F>>(
    &self,
    mut cs: CS,
    other: &Self,
  ) -> Result<Self, SynthesisError> {
    let z1_sq = self.z.square(cs.namespace(|| "z1_sq"))?;
    let z1_cu = z1_sq.mul(cs.namespace(|| "z1_cu"), &self.z)?;
    let z2_sq = other.z.square(cs.namespace(|| "z2_sq"))?;
    let z2_cu = z2_sq.mul(cs.namespace(|| "z2_cu"), &other.z)?;

    let u1 = self.x.mul(cs.namespace(|| "u1"), &z2_sq)?;
    let u2 = other.x.mul(cs.namespace(|| "u2"), &z1_sq)?;
    let s1 = self.y.mul(cs.namespace(|| "s1"), &z2_cu)?;
    let s2 = other.y.mul(cs.namespace(|| "s2"), &z1_cu)?;

    let h = sub(cs.namespace(|| "h"), &u2, &u1)?;
    let r = sub(cs.namespace(|| "r"), &s2, &s1)?;

    let h_sq = h.square(cs.namespace(|| "h_sq"))?;
    let h_cu = h_sq.mul(cs.namespace(|| "h_cu"), &h)?;
    let r_sq = r.square(cs.namespace(|| "r_sq"))?;
    let u1h2 = u1.mul(cs.namespace(|| "u1h2"), &h_sq)?;
    let s1h3 = s1.mul(cs.namespace(|| "s1h3"), &h_cu)?;

    // x3 = r^2 - h^3 - 2 u1 h^2
    let x3 = AllocatedNum::alloc(cs.namespace(|| "x3"), || {
      let r_sq = r_sq.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let h_cu = h_cu.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let u1h2 = u1h2.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      Ok(r_sq - h_cu - u1h2.double())
    })?;
    cs.enforce(
      || "x3 = r^2 - h^3 - 2 u1 h^2",
      |lc| lc + r_sq.get_variable() - h_cu.get_variable() - (F::from(2), u1h2.get_variable()),
      |lc| lc + CS::one(),
      |lc| lc + x3.get_variable(),
    );

    // y3 = r (u1 h^2 - x3) - s1 h^3
    let y3 = AllocatedNum::alloc(cs.namespace(|| "y3"), || {
      let r = r.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let u1h2 = u1h2.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let x3 = x3.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      let s1h3 = s1h3.get_value().ok_or(SynthesisError::AssignmentMissing)?;
      Ok(r * (u1h2 - x3) - s1h3)
    })?;
    cs.enforce(
      || "y3 + s1 h^3 = r (u1 h^2 - x3)",
      |lc| lc + r.get_variable(),
      |lc| lc + u1h2.get_variable() - x3.get_variable(),
      |lc| lc + y3.get_variable() + s1h3.get_variable(),
    );

    // z3 = h z1 z2
    let z1z2 = self.z.mul(cs.namespace(|| "z1z2"), &other.z)?;
    let z3 = h.mul(cs.namespace(|| "z3"), &z1z2)?;

    // edge-case flags; equal and inverse operands both make h vanish and
    // are told apart by r
    let p_inf = alloc_is_zero(cs.namespace(|| "p at infinity"), &self.z)?;
    let q_inf = alloc_is_zero(cs.namespace(|| "q at infinity"), &other.z)?;
    let h_zero = alloc_is_zero(cs.namespace(|| "h zero"), &h)?;
    let r_zero = alloc_is_zero(cs.namespace(|| "r zero"), &r)?;
    let eq_flag = h_zero.mul(cs.namespace(|| "equal points"), &r_zero)?;
    let inv_flag = sub(cs.namespace(|| "inverse points"), &h_zero, &eq_flag)?;

    let doubled = self.double(cs.namespace(|| "doubled"))?;
    let one = alloc_constant(cs.namespace(|| "one"), F::ONE)?;
    let zero = alloc_constant(cs.namespace(|| "zero"), F::ZERO)?;

    // mux the branches, later selections taking precedence; the operand-at-
    // infinity cases come last because a zero X coordinate of an infinity
    // representative also makes h vanish
    let mut x3 = conditionally_select(cs.namespace(|| "x if equal"), &eq_flag, &doubled.x, &x3)?;
    let mut y3 = conditionally_select(cs.namespace(|| "y if equal"), &eq_flag, &doubled.y, &y3)?;
    let mut z3 = conditionally_select(cs.namespace(|| "z if equal"), &eq_flag, &doubled.z, &z3)?;

    x3 = conditionally_select(cs.namespace(|| "x if inverse"), &inv_flag, &one, &x3)?;
    y3 = conditionally_select(cs.namespace(|| "y if inverse"), &inv_flag, &one, &y3)?;
    z3 = conditionally_select(cs.namespace(|| "z if inverse"), &inv_flag, &zero, &z3)?;

    x3 = conditionally_select(cs.namespace(|| "x if q inf"), &q_inf, &self.x, &x3)?;
    y3 = conditionally_select(cs.namespace(|| "y if q inf"), &q_inf, &self.y, &y3)?;
    z3 = conditionally_select(cs.namespace(|| "z if q inf"), &q_inf, &self.z, &z3)?;

    x3 = conditionally_select(cs.namespace(|| "x if p inf"), &p_inf, &other.x, &x3)?;
    y3 = conditionally_select(cs.namespace(|| "y if p inf"), &p_inf, &other.y, &y3)?;
    z3 = conditionally_select(cs.namespace(|| "z if p inf"), &p_inf, &other.z, &z3)?;

    Ok(Self {
      x: x3,
      y: y3,
      z: z3,
    })
  }

  /// Selects `self` if the Boolean `cond` holds, `other` otherwise.
  pub fn conditionally_select<CS: ConstraintSystem<F>>(
    &self,
    mut cs: CS,
    cond: &Boolean,
    other: &Self,
  ) -> Result<Self, SynthesisError> {
    let x = conditionally_select_boolean(cs.namespace(|| "x"), cond, &self.x, &other.x)?;
    let y = conditionally_select_boolean(cs.namespace(|| "y"), cond, &self.y, &other.y)?;
    let z = conditionally_select_boolean(cs.namespace(|| "z"), cond, &self.z, &other.z)?;
    Ok(Self { x, y, z })
  }

  /// Double-and-add over little-endian scalar bits, most significant first,
  /// starting from the canonical identity. Both the doubled accumulator and
  /// the sum are computed at every step; the bit picks one.
  pub fn scalar_mul<CS: ConstraintSystem<F>>(
    &self,
    mut cs: CS,
    bits: &[Boolean],
  ) -> Result<Self, SynthesisError> {
    let mut acc = Self::identity(cs.namespace(|| "acc"))?;
    for (i, bit) in bits.iter().rev().enumerate() {
      acc = acc.double(cs.namespace(|| format!("double_{i}")))?;
      let sum = acc.add(cs.namespace(|| format!("add_{i}")), self)?;
      acc = sum.conditionally_select(cs.namespace(|| format!("select_{i}")), bit, &acc)?;
    }
    Ok(acc)
  }

  /// Maps the point back to its `Z = 1` representative (or the canonical
  /// identity), asserting `X * Zinv^2 = x_a` and `Y * Zinv^3 = y_a` with a
  /// hinted inverse.
  pub fn normalize<CS: ConstraintSystem<F>>(&self, mut cs: CS) -> Result<Self, SynthesisError> {
    let is_inf = alloc_is_zero(cs.namespace(|| "is infinity"), &self.z)?;
    let z_inv = AllocatedNum::alloc(cs.namespace(|| "z_inv"), || {
      self
        .z
        .get_value()
        .map(|z| z.invert().unwrap_or(F::ZERO))
        .ok_or(SynthesisError::AssignmentMissing)
    })?;
    // z * z_inv = 1 unless the point is at infinity
    cs.enforce(
      || "z * z_inv = 1 - is_inf",
      |lc| lc + self.z.get_variable(),
      |lc| lc + z_inv.get_variable(),
      |lc| lc + CS::one() - is_inf.get_variable(),
    );

    let z_inv_sq = z_inv.square(cs.namespace(|| "z_inv_sq"))?;
    let z_inv_cu = z_inv_sq.mul(cs.namespace(|| "z_inv_cu"), &z_inv)?;
    let x_affine = self.x.mul(cs.namespace(|| "x_affine"), &z_inv_sq)?;
    let y_affine = self.y.mul(cs.namespace(|| "y_affine"), &z_inv_cu)?;

    let one = alloc_constant(cs.namespace(|| "one"), F::ONE)?;
    let x = conditionally_select(cs.namespace(|| "x norm"), &is_inf, &one, &x_affine)?;
    let y = conditionally_select(cs.namespace(|| "y norm"), &is_inf, &one, &y_affine)?;
    // z = 1 - is_inf
    let z = AllocatedNum::alloc(cs.namespace(|| "z norm"), || {
      is_inf
        .get_value()
        .map(|f| F::ONE - f)
        .ok_or(SynthesisError::AssignmentMissing)
    })?;
    cs.enforce(
      || "z norm = 1 - is_inf",
      |lc| lc + CS::one() - is_inf.get_variable(),
      |lc| lc + CS::one(),
      |lc| lc + z.get_variable(),
    );

    Ok(Self { x, y, z })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gadgets::utils::num_to_bits_le;
  use bellpepper_core::test_cs::TestConstraintSystem;
  use ff::{Field, FromUniformBytes};
  use group::{Curve, Group};
  use halo2curves::bn256::{Fq, Fr, G1Affine, G1};
  use rand_core::OsRng;

  fn alloc_native<CS: ConstraintSystem<Fq>>(mut cs: CS, p: &G1) -> AllocatedPoint<Fq> {
    let affine: G1Affine = p.to_affine();
    let coords = if bool::from(G1::is_identity(p)) {
      (Fq::ONE, Fq::ONE, Fq::ZERO)
    } else {
      (affine.x, affine.y, Fq::ONE)
    };
    AllocatedPoint::alloc(cs.namespace(|| "point"), coords).unwrap()
  }

  /// Projective equality X1 Z2^2 = X2 Z1^2, Y1 Z2^3 = Y2 Z1^3 against a
  /// native point.
  fn assert_matches(p: &AllocatedPoint<Fq>, expected: &G1) {
    let (x1, y1, z1) = p.get_coords().unwrap();
    if bool::from(G1::is_identity(expected)) {
      assert_eq!(z1, Fq::ZERO);
      return;
    }
    let e = expected.to_affine();
    let (z1_sq, z1_cu) = (z1.square(), z1.square() * z1);
    assert_eq!(x1, e.x * z1_sq);
    assert_eq!(y1, e.y * z1_cu);
  }

  #[test]
  fn test_add_and_double_match_native() {
    let mut cs = TestConstraintSystem::<Fq>::new();
    let p = G1::random(OsRng);
    let q = G1::random(OsRng);

    let p_alloc = alloc_native(cs.namespace(|| "p"), &p);
    let q_alloc = alloc_native(cs.namespace(|| "q"), &q);
    p_alloc.assert_on_curve(cs.namespace(|| "p on curve")).unwrap();

    let sum = p_alloc.add(cs.namespace(|| "p + q"), &q_alloc).unwrap();
    assert_matches(&sum, &(p + q));

    let dbl = p_alloc.double(cs.namespace(|| "2p")).unwrap();
    assert_matches(&dbl, &p.double());

    // equal operands route through doubling
    let same = p_alloc.add(cs.namespace(|| "p + p"), &p_alloc).unwrap();
    assert_matches(&same, &p.double());

    // inverse operands give the canonical identity
    let neg = alloc_native(cs.namespace(|| "-p"), &(-p));
    let inf = p_alloc.add(cs.namespace(|| "p - p"), &neg).unwrap();
    let (x, y, z) = inf.get_coords().unwrap();
    assert_eq!((x, y, z), (Fq::ONE, Fq::ONE, Fq::ZERO));

    // identity is the neutral element on both sides
    let id = AllocatedPoint::identity(cs.namespace(|| "id")).unwrap();
    let left = id.add(cs.namespace(|| "0 + q"), &q_alloc).unwrap();
    assert_matches(&left, &q);
    let right = p_alloc.add(cs.namespace(|| "p + 0"), &id).unwrap();
    assert_matches(&right, &p);

    assert!(cs.is_satisfied());
  }

  #[test]
  fn test_scalar_mul_matches_native() {
    let mut cs = TestConstraintSystem::<Fq>::new();
    let p = G1::random(OsRng);
    let k = Fr::random(OsRng);

    // feed the scalar's little-endian bits directly
    let k_num = AllocatedNum::alloc(cs.namespace(|| "k"), || {
      let mut wide = [0u8; 64];
      wide[..32].copy_from_slice(&k.to_bytes());
      Ok(Fq::from_uniform_bytes(&wide))
    })
    .unwrap();
    let bits = num_to_bits_le(cs.namespace(|| "k bits"), &k_num, 254).unwrap();

    let p_alloc = alloc_native(cs.namespace(|| "p"), &p);
    let res = p_alloc.scalar_mul(cs.namespace(|| "k p"), &bits).unwrap();
    assert_matches(&res, &(p * k));
    assert!(cs.is_satisfied());
  }

  #[test]
  fn test_scalar_mul_edge_scalars() {
    let mut cs = TestConstraintSystem::<Fq>::new();
    let g = G1::generator();
    let g_alloc = alloc_native(cs.namespace(|| "g"), &g);

    for (label, k, expected) in [
      ("zero", Fr::ZERO, G1::identity()),
      ("one", Fr::ONE, g),
      ("order minus one", -Fr::ONE, -g),
    ] {
      let k_num = AllocatedNum::alloc(cs.namespace(|| format!("k {label}")), || {
        let mut wide = [0u8; 64];
        wide[..32].copy_from_slice(&k.to_bytes());
        Ok(Fq::from_uniform_bytes(&wide))
      })
      .unwrap();
      let bits = num_to_bits_le(cs.namespace(|| format!("bits {label}")), &k_num, 254).unwrap();
      let res = g_alloc
        .scalar_mul(cs.namespace(|| format!("mul {label}")), &bits)
        .unwrap();
      assert_matches(&res, &expected);
    }
    assert!(cs.is_satisfied());
  }

  #[test]
  fn test_normalize() {
    let mut cs = TestConstraintSystem::<Fq>::new();
    let p = G1::random(OsRng);
    let p_alloc = alloc_native(cs.namespace(|| "p"), &p);

    // push the point into a non-trivial representative, then normalize
    let dbl = p_alloc.double(cs.namespace(|| "2p")).unwrap();
    let norm = dbl.normalize(cs.namespace(|| "normalized")).unwrap();
    let e = p.double().to_affine();
    let (x, y, z) = norm.get_coords().unwrap();
    assert_eq!((x, y, z), (e.x, e.y, Fq::ONE));

    let id = AllocatedPoint::identity(cs.namespace(|| "id")).unwrap();
    let norm_id = id.normalize(cs.namespace(|| "normalized id")).unwrap();
    let (x, y, z) = norm_id.get_coords().unwrap();
    assert_eq!((x, y, z), (Fq::ONE, Fq::ONE, Fq::ZERO));

    assert!(cs.is_satisfied());
  }
}
