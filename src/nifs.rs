//! Non-Interactive Folding Scheme (NIFS) for committed relaxed R1CS.
#![allow(non_snake_case)]

use crate::{
  errors::NovaFoldError,
  mimc::mimc_hash,
  pedersen::{jacobian_coords, PedersenKey},
  r1cs::{CommittedRelaxedInstance, CommittedRelaxedR1CS, R1CSShape},
};
use ff::Field;
use group::Curve;
use halo2curves::bn256::{Fr, G1Affine, G1};
use rand_core::OsRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// NIFS proof containing the commitment to the cross-term `T`.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NIFS {
  pub(crate) comm_T: G1Affine,
}

/// The Fiat-Shamir challenge: a MiMC digest of the Jacobian coordinate
/// triple of the cross-term commitment. The step circuit derives the same
/// challenge from the same triple.
pub(crate) fn fold_challenge(comm_T: &G1Affine) -> Fr {
  mimc_hash(&jacobian_coords(comm_T))
}

impl NIFS {
  /// Folds a standard pair `secondary` into the relaxed pair `primary`,
  /// returning the new relaxed pair and the cross-term commitment.
  ///
  /// `secondary` is expected to be standard (`u = 1`, `E = 0`); the fold is
  /// still well-defined otherwise, but the step circuit only accepts
  /// standard secondaries.
  pub fn prove(
    S: &R1CSShape,
    pk_E: &PedersenKey,
    primary: &CommittedRelaxedR1CS,
    secondary: &CommittedRelaxedR1CS,
  ) -> Result<(CommittedRelaxedR1CS, Self), NovaFoldError> {
    let z1 = primary.z();
    let z2 = secondary.z();

    // The six products are independent and write-disjoint; fork-join them,
    // with each one parallelized over its rows.
    let ((Az1, Az2), ((Bz1, Bz2), (Cz1, Cz2))) = rayon::join(
      || {
        rayon::join(
          || S.A.multiply_vec(&z1),
          || S.A.multiply_vec(&z2),
        )
      },
      || {
        rayon::join(
          || {
            rayon::join(
              || S.B.multiply_vec(&z1),
              || S.B.multiply_vec(&z2),
            )
          },
          || {
            rayon::join(
              || S.C.multiply_vec(&z1),
              || S.C.multiply_vec(&z2),
            )
          },
        )
      },
    );
    let (Az1, Az2, Bz1, Bz2, Cz1, Cz2) = (Az1?, Az2?, Bz1?, Bz2?, Cz1?, Cz2?);

    // T = Az1 o Bz2 + Az2 o Bz1 - u1 * Cz2 - u2 * Cz1
    let (u1, u2) = (primary.u, secondary.u);
    let T = (0..S.num_cons())
      .into_par_iter()
      .map(|i| Az1[i] * Bz2[i] + Az2[i] * Bz1[i] - u1 * Cz2[i] - u2 * Cz1[i])
      .collect::<Vec<Fr>>();

    let r_T = Fr::random(OsRng);
    let comm_T = pk_E.commit(&T, &r_T)?;

    let r = fold_challenge(&comm_T);
    let r_square = r.square();
    debug!(num_cons = S.num_cons(), "folding instances");

    let comm_E = (G1::from(primary.comm_E)
      + G1::from(comm_T) * r
      + G1::from(secondary.comm_E) * r_square)
      .to_affine();
    let comm_W = (G1::from(primary.comm_W) + G1::from(secondary.comm_W) * r).to_affine();

    let X = primary
      .X
      .par_iter()
      .zip(secondary.X.par_iter())
      .map(|(x1, x2)| *x1 + r * *x2)
      .collect();
    let E = primary
      .E
      .par_iter()
      .zip(T.par_iter())
      .zip(secondary.E.par_iter())
      .map(|((e1, t), e2)| *e1 + r * *t + r_square * *e2)
      .collect();
    let W = primary
      .W
      .par_iter()
      .zip(secondary.W.par_iter())
      .map(|(w1, w2)| *w1 + r * *w2)
      .collect();

    let folded = CommittedRelaxedR1CS {
      comm_E,
      u: u1 + r * u2,
      comm_W,
      X,
      E,
      W,
      r_E: primary.r_E + r * r_T + r_square * secondary.r_E,
      r_W: primary.r_W + r * secondary.r_W,
    };

    Ok((folded, Self { comm_T }))
  }

  /// Recomputes the folded public instance from the two public instances
  /// and the cross-term commitment. Must agree with [`NIFS::prove`] on
  /// every public field.
  pub fn verify(
    &self,
    primary: &CommittedRelaxedInstance,
    secondary: &CommittedRelaxedInstance,
  ) -> CommittedRelaxedInstance {
    let r = fold_challenge(&self.comm_T);
    let r_square = r.square();

    let comm_E = (G1::from(primary.comm_E)
      + G1::from(self.comm_T) * r
      + G1::from(secondary.comm_E) * r_square)
      .to_affine();
    let comm_W = (G1::from(primary.comm_W) + G1::from(secondary.comm_W) * r).to_affine();
    let X = primary
      .X
      .iter()
      .zip(secondary.X.iter())
      .map(|(x1, x2)| *x1 + r * *x2)
      .collect();

    CommittedRelaxedInstance {
      comm_E,
      u: primary.u + r * secondary.u,
      comm_W,
      X,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::r1cs::SparseMatrix;

  /// A shape with a few constraints over z = (one, x1, x2, u, w1, w2, w3):
  /// w1 * w1 = w2, w2 * w1 = x1, (w1 + x2) * one = w3.
  fn test_shape() -> R1CSShape {
    let num_io = 3;
    let num_vars = 3;
    let cols = num_io + 1 + num_vars;
    let A = SparseMatrix::new(
      &[(0, 4, Fr::ONE), (1, 5, Fr::ONE), (2, 4, Fr::ONE), (2, 2, Fr::ONE)],
      3,
      cols,
    )
    .unwrap();
    let B = SparseMatrix::new(
      &[(0, 4, Fr::ONE), (1, 4, Fr::ONE), (2, 0, Fr::ONE)],
      3,
      cols,
    )
    .unwrap();
    let C = SparseMatrix::new(
      &[(0, 5, Fr::ONE), (1, 1, Fr::ONE), (2, 6, Fr::ONE)],
      3,
      cols,
    )
    .unwrap();
    R1CSShape::new(3, num_vars, num_io, A, B, C).unwrap()
  }

  fn solve(shape: &R1CSShape, w1: u64, x2: u64) -> Vec<Fr> {
    let (w1, x2) = (Fr::from(w1), Fr::from(x2));
    let w2 = w1 * w1;
    let x1 = w2 * w1;
    let w3 = w1 + x2;
    let z = vec![Fr::ONE, x1, x2, Fr::ONE, w1, w2, w3];
    assert_eq!(z.len(), shape.num_io() + 1 + shape.num_vars());
    z
  }

  #[test]
  fn test_fold_preserves_satisfaction() {
    let shape = test_shape();
    let pk_E = PedersenKey::setup(shape.num_cons()).unwrap();
    let pk_W = PedersenKey::setup(shape.num_vars()).unwrap();

    let running = CommittedRelaxedR1CS::new(
      shape.num_cons(),
      shape.num_io() + 1 + shape.num_vars(),
      shape.num_io(),
      &pk_E,
      &pk_W,
    )
    .unwrap();
    assert!(running.is_sat_relaxed(&shape, &pk_E, &pk_W).is_ok());

    let u_a =
      CommittedRelaxedR1CS::from_instance(&shape, &solve(&shape, 3, 7), &pk_E, &pk_W).unwrap();
    let u_b =
      CommittedRelaxedR1CS::from_instance(&shape, &solve(&shape, 5, 2), &pk_E, &pk_W).unwrap();

    let (folded, _) = NIFS::prove(&shape, &pk_E, &running, &u_a).unwrap();
    assert!(folded.is_sat_relaxed(&shape, &pk_E, &pk_W).is_ok());

    // fold a second standard instance into the now honestly-relaxed pair
    let (folded2, _) = NIFS::prove(&shape, &pk_E, &folded, &u_b).unwrap();
    assert!(folded2.is_sat_relaxed(&shape, &pk_E, &pk_W).is_ok());
    assert_ne!(folded2.u, Fr::ONE);
  }

  #[test]
  fn test_verify_matches_prove() {
    let shape = test_shape();
    let pk_E = PedersenKey::setup(shape.num_cons()).unwrap();
    let pk_W = PedersenKey::setup(shape.num_vars()).unwrap();

    let running = CommittedRelaxedR1CS::new(
      shape.num_cons(),
      shape.num_io() + 1 + shape.num_vars(),
      shape.num_io(),
      &pk_E,
      &pk_W,
    )
    .unwrap();
    let u_a =
      CommittedRelaxedR1CS::from_instance(&shape, &solve(&shape, 2, 9), &pk_E, &pk_W).unwrap();

    let (folded, nifs) = NIFS::prove(&shape, &pk_E, &running, &u_a).unwrap();
    let verified = nifs.verify(&running.instance(), &u_a.instance());
    assert_eq!(verified, folded.instance());
  }
}
