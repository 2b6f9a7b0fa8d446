//! This module provides a Pedersen vector commitment over BN254 G1, along
//! with the small field/curve adapters the rest of the library shares.
use crate::errors::NovaFoldError;
use ff::{Field, FromUniformBytes};
use group::{cofactor::CofactorCurveAffine, Curve, Group};
use halo2curves::{
  bn256::{Fq, Fr, G1Affine, G1},
  msm::msm_best,
  CurveAffine, CurveExt,
};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// Domain separator for hashing commitment generators onto G1.
const PEDERSEN_DST: &str = "random on g1";

/// A type that holds Pedersen commitment generators: a basis for the
/// committed vector and one extra blinding generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedersenKey {
  basis: Vec<G1Affine>,
  h: G1Affine,
}

/// Samples one generator by hashing fresh OS randomness to the curve.
fn random_on_g1() -> Result<G1Affine, NovaFoldError> {
  let mut seed = [0u8; 32];
  OsRng
    .try_fill_bytes(&mut seed)
    .map_err(|_| NovaFoldError::RandomnessFailure)?;
  let hasher = G1::hash_to_curve(PEDERSEN_DST);
  Ok(hasher(&seed).to_affine())
}

impl PedersenKey {
  /// Samples a new commitment key for vectors of length `n`.
  pub fn setup(n: usize) -> Result<Self, NovaFoldError> {
    let basis = (0..n)
      .map(|_| random_on_g1())
      .collect::<Result<Vec<_>, _>>()?;
    let h = random_on_g1()?;
    Ok(Self { basis, h })
  }

  /// Commits to `v` with blind `r`: `sum_i v[i] * basis[i] + r * h`.
  pub fn commit(&self, v: &[Fr], r: &Fr) -> Result<G1Affine, NovaFoldError> {
    if v.len() != self.basis.len() {
      return Err(NovaFoldError::InvalidCommitment {
        reason: format!(
          "unexpected number of values: got {}, key holds {}",
          v.len(),
          self.basis.len()
        ),
      });
    }
    let msm = if v.is_empty() {
      G1::identity()
    } else {
      msm_best(v, &self.basis)
    };
    Ok((msm + G1::from(self.h) * r).to_affine())
  }

  /// Checks that `comm` lies in the group and opens to `(v, r)`.
  pub fn verify(&self, v: &[Fr], r: &Fr, comm: &G1Affine) -> Result<(), NovaFoldError> {
    // BN254 G1 has cofactor one, so the subgroup check is the curve check.
    if !bool::from(comm.is_on_curve()) {
      return Err(NovaFoldError::InvalidCommitment {
        reason: "subgroup check failed".to_string(),
      });
    }
    let expected = self.commit(v, r)?;
    if expected != *comm {
      return Err(NovaFoldError::InvalidCommitment {
        reason: "commitment verification failed".to_string(),
      });
    }
    Ok(())
  }
}

/// Reduces a base-field element into the scalar field via wide reduction of
/// its canonical little-endian bytes.
pub(crate) fn fq_to_fr(x: &Fq) -> Fr {
  let mut wide = [0u8; 64];
  wide[..32].copy_from_slice(&x.to_bytes());
  Fr::from_uniform_bytes(&wide)
}

/// The Jacobian coordinate triple of an affine point, as scalar-field
/// elements. Finite points take the `Z = 1` representative; the identity
/// takes the canonical `(1, 1, 0)`.
pub(crate) fn jacobian_coords(p: &G1Affine) -> [Fr; 3] {
  if bool::from(p.is_identity()) {
    [Fr::ONE, Fr::ONE, Fr::ZERO]
  } else {
    [fq_to_fr(&p.x), fq_to_fr(&p.y), Fr::ONE]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_commit_verify() {
    let n = 8;
    let pk = PedersenKey::setup(n).unwrap();
    let v = (0..n).map(|_| Fr::random(OsRng)).collect::<Vec<_>>();
    let r = Fr::random(OsRng);
    let comm = pk.commit(&v, &r).unwrap();
    assert!(pk.verify(&v, &r, &comm).is_ok());

    // a wrong opening must be rejected
    let r_bad = r + Fr::ONE;
    assert!(pk.verify(&v, &r_bad, &comm).is_err());
  }

  #[test]
  fn test_commit_homomorphism() {
    let n = 4;
    let pk = PedersenKey::setup(n).unwrap();
    let v1 = (0..n).map(|_| Fr::random(OsRng)).collect::<Vec<_>>();
    let v2 = (0..n).map(|_| Fr::random(OsRng)).collect::<Vec<_>>();
    let (r1, r2, alpha) = (Fr::random(OsRng), Fr::random(OsRng), Fr::random(OsRng));

    let v = v1
      .iter()
      .zip(v2.iter())
      .map(|(a, b)| *a + alpha * *b)
      .collect::<Vec<_>>();
    let lhs = pk.commit(&v, &(r1 + alpha * r2)).unwrap();

    let c1 = pk.commit(&v1, &r1).unwrap();
    let c2 = pk.commit(&v2, &r2).unwrap();
    let rhs = (G1::from(c1) + G1::from(c2) * alpha).to_affine();
    assert_eq!(lhs, rhs);
  }

  #[test]
  fn test_commit_length_mismatch() {
    let pk = PedersenKey::setup(3).unwrap();
    let v = vec![Fr::ONE; 4];
    assert!(matches!(
      pk.commit(&v, &Fr::ZERO),
      Err(NovaFoldError::InvalidCommitment { .. })
    ));
  }

  #[test]
  fn test_verify_rejects_off_curve() {
    let pk = PedersenKey::setup(2).unwrap();
    let v = vec![Fr::ONE, Fr::ONE];
    let r = Fr::random(OsRng);
    let comm = pk.commit(&v, &r).unwrap();

    // nudge the point off the curve
    let bad = G1Affine {
      x: comm.x + Fq::ONE,
      y: comm.y,
    };
    assert_eq!(
      pk.verify(&v, &r, &bad),
      Err(NovaFoldError::InvalidCommitment {
        reason: "subgroup check failed".to_string(),
      })
    );
  }

  #[test]
  fn test_identity_commitment() {
    let pk = PedersenKey::setup(2).unwrap();
    let comm = pk.commit(&[Fr::ZERO, Fr::ZERO], &Fr::ZERO).unwrap();
    assert!(bool::from(comm.is_identity()));
    assert_eq!(jacobian_coords(&comm), [Fr::ONE, Fr::ONE, Fr::ZERO]);
  }
}
