//! In-circuit building blocks: number utilities, the Jacobian group law,
//! and the SHA-256 compression function.
pub mod ecc;
pub mod sha256;
pub mod utils;
