//! This module defines R1CS related types: the constraint shape and the
//! committed relaxed instance-witness pairs the folding scheme operates on.
//!
//! The augmented witness is laid out as `z = (X || u || W)`: the `num_io`
//! public wires first (the constant-one wire is `X[0]`), then the slack
//! wire `u` at column `num_io`, then the private wires. The slack column is
//! declared but never referenced by constraints, which is what lets a
//! standard instance relax under folding.
#![allow(non_snake_case)]
use crate::{
  errors::NovaFoldError,
  pedersen::PedersenKey,
};
use ff::Field;
use halo2curves::bn256::{Fr, G1Affine};
use rand_core::OsRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A sparse matrix in compressed-sparse-row form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseMatrix {
  num_rows: usize,
  num_cols: usize,
  indptr: Vec<usize>,
  indices: Vec<usize>,
  vals: Vec<Fr>,
}

impl SparseMatrix {
  /// Creates a matrix from `(row, col, val)` triples, which must be sorted
  /// by row.
  pub fn new(
    entries: &[(usize, usize, Fr)],
    num_rows: usize,
    num_cols: usize,
  ) -> Result<Self, NovaFoldError> {
    for &(row, col, _val) in entries {
      if row >= num_rows || col >= num_cols {
        return Err(NovaFoldError::InvalidIndex);
      }
    }

    let mut indptr = Vec::with_capacity(num_rows + 1);
    let mut indices = Vec::with_capacity(entries.len());
    let mut vals = Vec::with_capacity(entries.len());
    indptr.push(0);
    let mut row = 0;
    for &(r, c, v) in entries {
      if r < row {
        return Err(NovaFoldError::InvalidIndex);
      }
      while row < r {
        indptr.push(indices.len());
        row += 1;
      }
      indices.push(c);
      vals.push(v);
    }
    while row < num_rows {
      indptr.push(indices.len());
      row += 1;
    }

    Ok(Self {
      num_rows,
      num_cols,
      indptr,
      indices,
      vals,
    })
  }

  /// Computes the matrix-vector product `M * z`, parallelized over rows.
  pub fn multiply_vec(&self, z: &[Fr]) -> Result<Vec<Fr>, NovaFoldError> {
    if z.len() != self.num_cols {
      return Err(NovaFoldError::InvalidWitness {
        reason: format!(
          "vector of length {} against matrix with {} columns",
          z.len(),
          self.num_cols
        ),
      });
    }

    let two = Fr::from(2);
    let minus_one = -Fr::ONE;
    Ok(
      (0..self.num_rows)
        .into_par_iter()
        .map(|row| {
          let mut acc = Fr::ZERO;
          for i in self.indptr[row]..self.indptr[row + 1] {
            let (col, val) = (self.indices[i], &self.vals[i]);
            // fast paths for the coefficients the builder emits most
            if *val == Fr::ONE {
              acc += z[col];
            } else if *val == two {
              acc += z[col].double();
            } else if *val == minus_one {
              acc -= z[col];
            } else if *val != Fr::ZERO {
              acc += *val * z[col];
            }
          }
          acc
        })
        .collect(),
    )
  }
}

/// A type that holds the shape of the R1CS matrices
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct R1CSShape {
  pub(crate) num_cons: usize,
  pub(crate) num_vars: usize,
  pub(crate) num_io: usize,
  pub(crate) A: SparseMatrix,
  pub(crate) B: SparseMatrix,
  pub(crate) C: SparseMatrix,
}

impl R1CSShape {
  /// Create an object of type `R1CSShape` from the explicitly specified R1CS matrices
  pub fn new(
    num_cons: usize,
    num_vars: usize,
    num_io: usize,
    A: SparseMatrix,
    B: SparseMatrix,
    C: SparseMatrix,
  ) -> Result<Self, NovaFoldError> {
    let num_cols = num_io + 1 + num_vars;
    for M in [&A, &B, &C] {
      if M.num_rows != num_cons || M.num_cols != num_cols {
        return Err(NovaFoldError::InvalidIndex);
      }
    }
    Ok(Self {
      num_cons,
      num_vars,
      num_io,
      A,
      B,
      C,
    })
  }

  /// Returns the number of constraints.
  pub fn num_cons(&self) -> usize {
    self.num_cons
  }

  /// Returns the number of private wires.
  pub fn num_vars(&self) -> usize {
    self.num_vars
  }

  /// Returns the number of public wires (the constant wire included).
  pub fn num_io(&self) -> usize {
    self.num_io
  }

  /// Computes `(A*z, B*z, C*z)` for an augmented witness `z`.
  pub fn multiply_vec(
    &self,
    z: &[Fr],
  ) -> Result<(Vec<Fr>, Vec<Fr>, Vec<Fr>), NovaFoldError> {
    let (Az, (Bz, Cz)) = rayon::join(
      || self.A.multiply_vec(z),
      || rayon::join(|| self.B.multiply_vec(z), || self.C.multiply_vec(z)),
    );
    Ok((Az?, Bz?, Cz?))
  }
}

/// The public part of a committed relaxed R1CS instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRelaxedInstance {
  /// Commitment to the error vector `E`
  pub comm_E: G1Affine,
  /// The relaxation slack
  pub u: Fr,
  /// Commitment to the private wires `W`
  pub comm_W: G1Affine,
  /// The public IO, constant wire first
  pub X: Vec<Fr>,
}

/// A committed relaxed R1CS instance-witness pair.
///
/// A *standard* pair additionally has `u = 1`, `E = 0`, and `r_E = 0`, so
/// its `comm_E` is the identity commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRelaxedR1CS {
  /// Commitment to the error vector `E`
  pub comm_E: G1Affine,
  /// The relaxation slack
  pub u: Fr,
  /// Commitment to the private wires `W`
  pub comm_W: G1Affine,
  /// The public IO, constant wire first
  pub X: Vec<Fr>,
  pub(crate) E: Vec<Fr>,
  pub(crate) W: Vec<Fr>,
  pub(crate) r_E: Fr,
  pub(crate) r_W: Fr,
}

impl CommittedRelaxedR1CS {
  /// Creates the all-zero relaxed pair for an R1CS with `num_cons`
  /// constraints, `num_total` wires and `num_io` public wires. Both
  /// commitments are the identity.
  pub fn new(
    num_cons: usize,
    num_total: usize,
    num_io: usize,
    pk_E: &PedersenKey,
    pk_W: &PedersenKey,
  ) -> Result<Self, NovaFoldError> {
    if num_total < num_io + 1 {
      return Err(NovaFoldError::InvalidParameter {
        reason: "fewer wires than public inputs".to_string(),
      });
    }
    let E = vec![Fr::ZERO; num_cons];
    let W = vec![Fr::ZERO; num_total - num_io - 1];
    let comm_E = pk_E.commit(&E, &Fr::ZERO)?;
    let comm_W = pk_W.commit(&W, &Fr::ZERO)?;
    Ok(Self {
      comm_E,
      u: Fr::ZERO,
      comm_W,
      X: vec![Fr::ZERO; num_io],
      E,
      W,
      r_E: Fr::ZERO,
      r_W: Fr::ZERO,
    })
  }

  /// Creates a standard (unrelaxed) pair from a solved augmented witness
  /// `z = (X || u || W)`.
  ///
  /// The slack entry must be one; `E` is zero with a zero blind (the
  /// committed vector is public, so hiding is not needed), and `W` gets a
  /// fresh blind.
  pub fn from_instance(
    shape: &R1CSShape,
    z: &[Fr],
    pk_E: &PedersenKey,
    pk_W: &PedersenKey,
  ) -> Result<Self, NovaFoldError> {
    if z.len() != shape.num_io + 1 + shape.num_vars {
      return Err(NovaFoldError::InvalidWitness {
        reason: format!(
          "augmented witness of length {} against shape with {} wires",
          z.len(),
          shape.num_io + 1 + shape.num_vars
        ),
      });
    }
    let u = z[shape.num_io];
    if u != Fr::ONE {
      return Err(NovaFoldError::InvalidWitness {
        reason: "u is not equal to 1".to_string(),
      });
    }
    let X = z[..shape.num_io].to_vec();
    let W = z[shape.num_io + 1..].to_vec();

    let E = vec![Fr::ZERO; shape.num_cons];
    let r_E = Fr::ZERO;
    let r_W = Fr::random(OsRng);
    let comm_E = pk_E.commit(&E, &r_E)?;
    let comm_W = pk_W.commit(&W, &r_W)?;

    Ok(Self {
      comm_E,
      u,
      comm_W,
      X,
      E,
      W,
      r_E,
      r_W,
    })
  }

  /// Returns the public part of the pair.
  pub fn instance(&self) -> CommittedRelaxedInstance {
    CommittedRelaxedInstance {
      comm_E: self.comm_E,
      u: self.u,
      comm_W: self.comm_W,
      X: self.X.clone(),
    }
  }

  /// The augmented witness `z = (X || u || W)`.
  pub(crate) fn z(&self) -> Vec<Fr> {
    [self.X.clone(), vec![self.u], self.W.clone()].concat()
  }

  /// Checks the relaxed R1CS equation `Az o Bz = u * Cz + E` and that both
  /// commitments open to the held vectors.
  pub fn is_sat_relaxed(
    &self,
    shape: &R1CSShape,
    pk_E: &PedersenKey,
    pk_W: &PedersenKey,
  ) -> Result<(), NovaFoldError> {
    if self.X.len() != shape.num_io
      || self.W.len() != shape.num_vars
      || self.E.len() != shape.num_cons
    {
      return Err(NovaFoldError::InvalidWitness {
        reason: "instance does not match the shape".to_string(),
      });
    }

    let (Az, Bz, Cz) = shape.multiply_vec(&self.z())?;
    let unsat = (0..shape.num_cons)
      .into_par_iter()
      .filter(|&i| Az[i] * Bz[i] != self.u * Cz[i] + self.E[i])
      .count();
    if unsat != 0 {
      return Err(NovaFoldError::UnSat {
        reason: format!("{unsat} constraints violated"),
      });
    }

    pk_E.verify(&self.E, &self.r_E, &self.comm_E)?;
    pk_W.verify(&self.W, &self.r_W, &self.comm_W)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tiny_shape() -> R1CSShape {
    // one constraint over z = (one, x, u, w): w * w = x
    let num_io = 2;
    let num_vars = 1;
    let cols = num_io + 1 + num_vars;
    let A = SparseMatrix::new(&[(0, 3, Fr::ONE)], 1, cols).unwrap();
    let B = SparseMatrix::new(&[(0, 3, Fr::ONE)], 1, cols).unwrap();
    let C = SparseMatrix::new(&[(0, 1, Fr::ONE)], 1, cols).unwrap();
    R1CSShape::new(1, num_vars, num_io, A, B, C).unwrap()
  }

  #[test]
  fn test_empty_instance_is_canonical() {
    let pk_E = PedersenKey::setup(1).unwrap();
    let pk_W = PedersenKey::setup(0).unwrap();
    let inst = CommittedRelaxedR1CS::new(1, 4, 3, &pk_E, &pk_W).unwrap();
    assert_eq!(inst.comm_E, pk_E.commit(&[Fr::ZERO], &Fr::ZERO).unwrap());
    assert_eq!(inst.comm_W, pk_W.commit(&[], &Fr::ZERO).unwrap());
    assert_eq!(inst.u, Fr::ZERO);
    assert_eq!(inst.X, vec![Fr::ZERO; 3]);
  }

  #[test]
  fn test_from_instance_requires_unit_slack() {
    let shape = tiny_shape();
    let pk_E = PedersenKey::setup(shape.num_cons()).unwrap();
    let pk_W = PedersenKey::setup(shape.num_vars()).unwrap();

    let three = Fr::from(3);
    let z = vec![Fr::ONE, three * three, Fr::ONE, three];
    let inst = CommittedRelaxedR1CS::from_instance(&shape, &z, &pk_E, &pk_W).unwrap();
    assert!(inst.is_sat_relaxed(&shape, &pk_E, &pk_W).is_ok());

    let z_bad = vec![Fr::ONE, three * three, Fr::from(2), three];
    assert!(matches!(
      CommittedRelaxedR1CS::from_instance(&shape, &z_bad, &pk_E, &pk_W),
      Err(NovaFoldError::InvalidWitness { .. })
    ));
  }

  #[test]
  fn test_multiply_vec_fast_paths() {
    let two = Fr::from(2);
    let m = SparseMatrix::new(
      &[
        (0, 0, Fr::ONE),
        (0, 1, two),
        (1, 0, -Fr::ONE),
        (1, 2, Fr::from(5)),
      ],
      2,
      3,
    )
    .unwrap();
    let z = vec![Fr::from(7), Fr::from(11), Fr::from(13)];
    let res = m.multiply_vec(&z).unwrap();
    assert_eq!(res[0], Fr::from(7 + 22));
    assert_eq!(res[1], Fr::from(65 - 7));
  }
}
