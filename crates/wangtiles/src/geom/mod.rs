//! Planar geometry for tile placement.
//!
//! Purpose
//! - Axis-aligned boxes with the half-open membership convention used by queries.
//! - The dihedral group of the square (`Symmetry`) and similarity maps
//!   (`Similarity2`) that place a template's local unit square in the world.
//!
//! Numerics
//! - Symmetries compose exactly (group table, integer matrix entries) and
//!   scales multiply, so only translations accumulate rounding across levels.
//!
//! Code cross-refs: `tileset::ChildSlot`, `query::PointIter`.

mod similarity;
mod symmetry;
mod types;

pub use similarity::{child_placement, compose, Similarity2};
pub use symmetry::Symmetry;
pub use types::{Box2, EPS};

#[cfg(test)]
mod tests;
