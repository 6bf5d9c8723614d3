//! Progressive blue-noise point sets from a hierarchical Wang-tile dataset.
//!
//! A `TemplateSet` holds a small number of tile templates, each with ranked local
//! points and a self-similar subdivision into smaller transformed templates.
//! Querying a box with a rank threshold walks the implied infinite hierarchy,
//! pruning subtrees by area and by rank, and streams the surviving points in
//! batches. Keeping all points with `rank <= max_rank` yields a blue-noise set
//! whose density grows with `max_rank`.
//!
//! Layout
//! - `geom`: boxes, square symmetries, similarity transforms and their composition.
//! - `tileset`: templates, validation, rank floors, the `.dat` loader.
//! - `query`: pruning, batching, base layouts, and the traversal (`PointIter`).
//! - `synth`: seeded synthetic datasets for tests and benches.

pub mod api;
pub mod geom;
pub mod query;
pub mod synth;
pub mod tileset;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use geom::{Box2, Similarity2, Symmetry};
pub use query::{PointBatch, PointIter, QueryCfg, QueryError};
pub use tileset::{load_tiles, load_tiles_file, DatasetFormatError, TemplateSet};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::geom::{Box2, Similarity2, Symmetry};
    pub use crate::query::{
        collect_points, max_rank_from_signed, BaseLayout, Lattice, PointBatch, PointIter,
        QueryCfg, QueryError, SinglePeriod,
    };
    pub use crate::synth::{synth_tileset, SynthCfg};
    pub use crate::tileset::{
        load_tiles, load_tiles_file, BaseInstance, ChildSlot, DatasetFormatError, LoadCfg,
        LocalPoint, TemplateId, TemplateSet, TemplateSpec,
    };
    pub use nalgebra::Vector2 as Vec2;
}
