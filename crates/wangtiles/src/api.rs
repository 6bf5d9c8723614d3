//! Curated surface for embedding callers.
//!
//! Everything a host needs to load a dataset once and serve queries from many
//! threads: loading, the query entry points, and the types they exchange.

// Store
pub use crate::tileset::{
    load_tiles, load_tiles_file, scaled_rank, BaseInstance, ChildSlot, DatasetFormatError,
    EdgeColors, LoadCfg, LocalPoint, TemplateId, TemplateSet, TemplateSpec, TileInstance,
    TileTemplate,
};
// Queries
pub use crate::query::{
    collect_points, max_rank_from_signed, validate_bounds, BaseLayout, BatchEmitter, Lattice,
    PointBatch, PointIter, PrunePolicy, QueryCfg, QueryError, SinglePeriod, TraversalStats,
    Verdict, DEFAULT_BATCH_CAPACITY, MAX_LATTICE_ROOTS,
};
// Placement math
pub use crate::geom::{child_placement, compose, Box2, Similarity2, Symmetry};
// Fixtures
pub use crate::synth::{synth_tileset, SynthCfg};
