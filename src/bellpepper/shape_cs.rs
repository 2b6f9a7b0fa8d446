// Copyright (c) The novafold authors.
// SPDX-License-Identifier: MIT
// This file is part of the novafold project.
// See the LICENSE file in the project root for full license information.

//! Support for generating the R1CS shape of a circuit with bellpepper.
use crate::{
  errors::NovaFoldError,
  r1cs::{R1CSShape, SparseMatrix},
};
use bellpepper_core::{ConstraintSystem, Index, LinearCombination, SynthesisError, Variable};
use halo2curves::bn256::Fr;

/// `ShapeCS` is a `ConstraintSystem` that records the constraint matrices of
/// a circuit without evaluating any witness.
pub struct ShapeCS {
  /// All constraints added to the `ShapeCS`.
  constraints: Vec<(
    LinearCombination<Fr>,
    LinearCombination<Fr>,
    LinearCombination<Fr>,
  )>,
  num_inputs: usize,
  num_aux: usize,
}

impl ShapeCS {
  /// Create a new, default `ShapeCS`. The constant `ONE` wire is input 0.
  pub fn new() -> Self {
    ShapeCS {
      constraints: vec![],
      num_inputs: 1,
      num_aux: 0,
    }
  }

  /// Returns the number of constraints defined for this `ShapeCS`.
  pub fn num_constraints(&self) -> usize {
    self.constraints.len()
  }

  /// Returns the number of inputs defined for this `ShapeCS`.
  pub fn num_inputs(&self) -> usize {
    self.num_inputs
  }

  /// Returns the number of aux variables defined for this `ShapeCS`.
  pub fn num_aux(&self) -> usize {
    self.num_aux
  }

  /// Extracts the R1CS shape, laying columns out as `(X || u || W)`: public
  /// wires first, then the (never referenced) slack column, then the aux
  /// wires.
  pub fn r1cs_shape(&self) -> Result<R1CSShape, NovaFoldError> {
    let num_cols = self.num_inputs + 1 + self.num_aux;
    let col_of = |var: &Variable| match var.get_unchecked() {
      Index::Input(i) => i,
      Index::Aux(i) => self.num_inputs + 1 + i,
    };

    let mut entries_a = Vec::new();
    let mut entries_b = Vec::new();
    let mut entries_c = Vec::new();
    for (row, (a, b, c)) in self.constraints.iter().enumerate() {
      for (var, coeff) in a.iter() {
        entries_a.push((row, col_of(&var), *coeff));
      }
      for (var, coeff) in b.iter() {
        entries_b.push((row, col_of(&var), *coeff));
      }
      for (var, coeff) in c.iter() {
        entries_c.push((row, col_of(&var), *coeff));
      }
    }

    let num_cons = self.constraints.len();
    let A = SparseMatrix::new(&entries_a, num_cons, num_cols)?;
    let B = SparseMatrix::new(&entries_b, num_cons, num_cols)?;
    let C = SparseMatrix::new(&entries_c, num_cons, num_cols)?;

    R1CSShape::new(num_cons, self.num_aux, self.num_inputs, A, B, C)
  }
}

impl Default for ShapeCS {
  fn default() -> Self {
    Self::new()
  }
}

impl ConstraintSystem<Fr> for ShapeCS {
  type Root = Self;

  fn alloc<F, A, AR>(&mut self, _annotation: A, _f: F) -> Result<Variable, SynthesisError>
  where
    F: FnOnce() -> Result<Fr, SynthesisError>,
    A: FnOnce() -> AR,
    AR: Into<String>,
  {
    self.num_aux += 1;
    Ok(Variable::new_unchecked(Index::Aux(self.num_aux - 1)))
  }

  fn alloc_input<F, A, AR>(&mut self, _annotation: A, _f: F) -> Result<Variable, SynthesisError>
  where
    F: FnOnce() -> Result<Fr, SynthesisError>,
    A: FnOnce() -> AR,
    AR: Into<String>,
  {
    self.num_inputs += 1;
    Ok(Variable::new_unchecked(Index::Input(self.num_inputs - 1)))
  }

  fn enforce<A, AR, LA, LB, LC>(&mut self, _annotation: A, a: LA, b: LB, c: LC)
  where
    A: FnOnce() -> AR,
    AR: Into<String>,
    LA: FnOnce(LinearCombination<Fr>) -> LinearCombination<Fr>,
    LB: FnOnce(LinearCombination<Fr>) -> LinearCombination<Fr>,
    LC: FnOnce(LinearCombination<Fr>) -> LinearCombination<Fr>,
  {
    let a = a(LinearCombination::zero());
    let b = b(LinearCombination::zero());
    let c = c(LinearCombination::zero());
    self.constraints.push((a, b, c));
  }

  fn push_namespace<NR, N>(&mut self, _name_fn: N)
  where
    NR: Into<String>,
    N: FnOnce() -> NR,
  {
  }

  fn pop_namespace(&mut self) {}

  fn get_root(&mut self) -> &mut Self::Root {
    self
  }
}
