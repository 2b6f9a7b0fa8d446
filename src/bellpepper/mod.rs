//! Support for generating R1CS shapes and witnesses from [bellpepper].
//!
//! [bellpepper]: https://github.com/argumentcomputer/bellpepper
pub mod shape_cs;
pub mod solver;

pub use shape_cs::ShapeCS;
pub use solver::SatisfyingAssignment;
