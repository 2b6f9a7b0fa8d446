//! This module defines errors returned by the library.
use thiserror::Error;

/// Errors returned by novafold
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum NovaFoldError {
  /// returned if the supplied row or col in (row,col,val) tuple is out of range
  #[error("InvalidIndex")]
  InvalidIndex,
  /// returned if a supplied witness does not match the shape, or the slack
  /// wire of a freshly solved instance is not one
  #[error("InvalidWitness: {reason}")]
  InvalidWitness {
    /// The reason the witness was rejected
    reason: String,
  },
  /// returned if a commitment has the wrong length, fails the subgroup check,
  /// or does not open to the claimed vector
  #[error("InvalidCommitment: {reason}")]
  InvalidCommitment {
    /// The reason the commitment was rejected
    reason: String,
  },
  /// returned if the OS entropy source fails during key generation
  #[error("RandomnessFailure")]
  RandomnessFailure,
  /// returned if a caller-supplied parameter is out of range
  #[error("InvalidParameter: {reason}")]
  InvalidParameter {
    /// The reason the parameter was rejected
    reason: String,
  },
  /// returned when an instance does not satisfy the (relaxed) R1CS equation
  #[error("UnSat: {reason}")]
  UnSat {
    /// The reason for the satisfiability failure
    reason: String,
  },
  /// return when error during synthesis
  #[error("SynthesisError: {reason}")]
  SynthesisError {
    /// The reason for circuit synthesis failure
    reason: String,
  },
  /// returned when an in-circuit assertion is violated by the back-end
  #[error("InternalError")]
  InternalError,
}

impl From<bellpepper_core::SynthesisError> for NovaFoldError {
  fn from(err: bellpepper_core::SynthesisError) -> Self {
    Self::SynthesisError {
      reason: err.to_string(),
    }
  }
}
