//! This library implements a Nova-style folding scheme and IVC prover for
//! committed relaxed R1CS over the BN254 scalar field.
//!
//! The building blocks, leaves first: a Pedersen vector commitment over G1
//! ([`pedersen`]), the committed relaxed R1CS data model ([`r1cs`]), the
//! non-interactive folding scheme ([`nifs`]), the augmented step circuit
//! that replays one folding transition in-circuit ([`circuit`]), and the
//! driver that chains steps over SHA-256 blocks ([`ivc`]).
//!
//! The step function is the SHA-256 compression function; the public IO of
//! each step is a running MiMC hash over the step state and the folded
//! instance. The final `(instance, cross-term commitment)` pair returned by
//! [`ivc::IVC::prove`] is what an outer SNARK would attest to; producing
//! that proof is out of scope here.
#![deny(
  future_incompatible,
  nonstandard_style,
  rust_2018_idioms,
  missing_docs
)]
#![allow(non_snake_case)]
#![allow(clippy::type_complexity)]
#![forbid(unsafe_code)]

// private modules
mod bellpepper;

// public modules
pub mod circuit;
pub mod errors;
pub mod gadgets;
pub mod ivc;
pub mod mimc;
pub mod nifs;
pub mod pedersen;
pub mod r1cs;

pub use circuit::ExpandCircuit;
pub use errors::NovaFoldError;
pub use ivc::IVC;
pub use nifs::NIFS;
pub use pedersen::PedersenKey;
pub use r1cs::{CommittedRelaxedInstance, CommittedRelaxedR1CS, R1CSShape};
