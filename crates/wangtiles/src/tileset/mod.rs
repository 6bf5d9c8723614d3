//! Tile Template Store: immutable templates, base instances, and loading.
//!
//! Purpose
//! - Hold the precomputed Wang-tile hierarchy: per-template points with ranks,
//!   edge colours, and the self-similar child layout.
//! - Validate a set once (`TemplateSet::new`) so traversal can trust every
//!   reference, and precompute the per-template rank floors used for pruning.
//! - Read the binary `.dat` tile format (`load_tiles`, `load_tiles_file`).
//!
//! Ownership
//! - A `TemplateSet` is plain owned data (`Send + Sync`); share it by `&` or `Arc`.
//! - `TileInstance`s are `Copy` values created per query and never stored here.
//!
//! Code cross-refs: `geom::{Similarity2, Symmetry}`, `query::PointIter`.

mod build;
mod load;
mod types;

pub use load::{load_tiles, load_tiles_file};
pub use types::{
    scaled_rank, BaseInstance, ChildSlot, DatasetFormatError, EdgeColors, LoadCfg, LocalPoint,
    Result, TemplateId, TemplateSet, TemplateSpec, TileInstance, TileTemplate,
};
