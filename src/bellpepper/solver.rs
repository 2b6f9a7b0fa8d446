//! Witness generation: a `ConstraintSystem` that evaluates the allocation
//! closures and records the assignment, ignoring the constraints.
use bellpepper_core::{ConstraintSystem, Index, LinearCombination, SynthesisError, Variable};
use ff::Field;
use halo2curves::bn256::Fr;

/// A `ConstraintSystem` which calculates witness values for a concrete
/// instance of an R1CS circuit.
pub struct SatisfyingAssignment {
  input_assignment: Vec<Fr>,
  aux_assignment: Vec<Fr>,
}

impl SatisfyingAssignment {
  /// Create a new assignment; the constant `ONE` wire is input 0.
  pub fn new() -> Self {
    Self {
      input_assignment: vec![Fr::ONE],
      aux_assignment: vec![],
    }
  }

  /// The augmented witness `z = (X || u || W)` with the slack wire spliced
  /// in at its declared column with value one.
  pub fn augmented_witness(&self) -> Vec<Fr> {
    [
      self.input_assignment.clone(),
      vec![Fr::ONE],
      self.aux_assignment.clone(),
    ]
    .concat()
  }
}

impl Default for SatisfyingAssignment {
  fn default() -> Self {
    Self::new()
  }
}

impl ConstraintSystem<Fr> for SatisfyingAssignment {
  type Root = Self;

  fn alloc<F, A, AR>(&mut self, _annotation: A, f: F) -> Result<Variable, SynthesisError>
  where
    F: FnOnce() -> Result<Fr, SynthesisError>,
    A: FnOnce() -> AR,
    AR: Into<String>,
  {
    self.aux_assignment.push(f()?);
    Ok(Variable::new_unchecked(Index::Aux(
      self.aux_assignment.len() - 1,
    )))
  }

  fn alloc_input<F, A, AR>(&mut self, _annotation: A, f: F) -> Result<Variable, SynthesisError>
  where
    F: FnOnce() -> Result<Fr, SynthesisError>,
    A: FnOnce() -> AR,
    AR: Into<String>,
  {
    self.input_assignment.push(f()?);
    Ok(Variable::new_unchecked(Index::Input(
      self.input_assignment.len() - 1,
    )))
  }

  fn enforce<A, AR, LA, LB, LC>(&mut self, _annotation: A, _a: LA, _b: LB, _c: LC)
  where
    A: FnOnce() -> AR,
    AR: Into<String>,
    LA: FnOnce(LinearCombination<Fr>) -> LinearCombination<Fr>,
    LB: FnOnce(LinearCombination<Fr>) -> LinearCombination<Fr>,
    LC: FnOnce(LinearCombination<Fr>) -> LinearCombination<Fr>,
  {
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
