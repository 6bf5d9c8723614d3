//! Point queries over a template set: pruning, batching, traversal.
//!
//! Purpose
//! - `TemplateSet::point_iter(bounds, max_rank)` streams every point with
//!   `rank <= max_rank` inside the half-open box, in batches.
//! - The walk is an explicit-stack depth-first descent over freshly composed
//!   `TileInstance`s; nothing shared is mutated, so queries run concurrently.
//!
//! Contract
//! - Each call is finite and yields each qualifying point exactly once.
//! - Batches are never empty; `max_rank = 0` or an empty box yields none.
//! - Order follows the tile hierarchy (depth-first, children in slot order) and is
//!   neither rank order nor spatial order. Callers must not rely on it.
//! - Dropping the iterator cancels the query and frees its stack and buffers.
//!
//! Code cross-refs: `tileset::{TemplateSet, TileInstance}`, `geom::Similarity2`.

mod batch;
mod iter;
mod layout;
mod prune;

pub use batch::{BatchEmitter, PointBatch};
pub use iter::{PointIter, TraversalStats};
pub use layout::{BaseLayout, Lattice, SinglePeriod, MAX_LATTICE_ROOTS};
pub use prune::{PrunePolicy, Verdict};

use nalgebra::Vector2;
use thiserror::Error;

use crate::geom::{Box2, EPS};
use crate::tileset::TemplateSet;

/// Default number of points per batch.
pub const DEFAULT_BATCH_CAPACITY: usize = 4096;

/// Errors raised before any traversal work.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("query bounds must be finite, got {bounds:?}")]
    NonFiniteBounds { bounds: [f64; 4] },
    #[error("query bounds inverted on the {axis} axis: min {min} > max {max}")]
    InvertedBounds { axis: char, min: f64, max: f64 },
    #[error("max_rank must be non-negative, got {0}")]
    NegativeRank(i64),
    #[error("lattice period must be positive and finite, got ({x}, {y})")]
    InvalidPeriod { x: f64, y: f64 },
    #[error("query box spans {cells} lattice cells, more than the limit of {limit}")]
    LatticeSpan { cells: f64, limit: usize },
    #[error("lattice cell index {index} is too large to place tiles exactly")]
    LatticeOffset { index: f64 },
}

/// Per-query tuning. Neither field changes which points are returned.
#[derive(Clone, Copy, Debug)]
pub struct QueryCfg {
    /// Points per batch (at least 1).
    pub batch_capacity: usize,
    /// Slack on tile bounds for spatial pruning, relative to the tile's scale.
    pub bounds_eps: f64,
}

impl Default for QueryCfg {
    fn default() -> Self {
        Self {
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            bounds_eps: EPS,
        }
    }
}

/// Check `[min_x, min_y, max_x, max_y]` and build the query box.
///
/// `min == max` is legal and selects nothing.
pub fn validate_bounds(bounds: [f64; 4]) -> Result<Box2, QueryError> {
    if !bounds.iter().all(|v| v.is_finite()) {
        return Err(QueryError::NonFiniteBounds { bounds });
    }
    for (axis, lo, hi) in [('x', bounds[0], bounds[2]), ('y', bounds[1], bounds[3])] {
        if lo > hi {
            return Err(QueryError::InvertedBounds {
                axis,
                min: lo,
                max: hi,
            });
        }
    }
    Ok(Box2::from_bounds(bounds))
}

/// Accept a signed rank threshold from callers that do not hold a `u64`.
pub fn max_rank_from_signed(max_rank: i64) -> Result<u64, QueryError> {
    u64::try_from(max_rank).map_err(|_| QueryError::NegativeRank(max_rank))
}

impl TemplateSet {
    /// All points with `rank <= max_rank` in the half-open box `bounds`, in batches,
    /// over the dataset's own base instances.
    pub fn point_iter(&self, bounds: [f64; 4], max_rank: u64) -> Result<PointIter<'_>, QueryError> {
        self.point_iter_with(bounds, max_rank, &SinglePeriod, QueryCfg::default())
    }

    /// As `point_iter`, with an explicit base layout and configuration.
    pub fn point_iter_with<L: BaseLayout + ?Sized>(
        &self,
        bounds: [f64; 4],
        max_rank: u64,
        layout: &L,
        cfg: QueryCfg,
    ) -> Result<PointIter<'_>, QueryError> {
        let bounds = validate_bounds(bounds)?;
        let mut roots = Vec::new();
        if max_rank > 0 && !bounds.is_empty() {
            layout.roots(self, &bounds, &mut roots)?;
        }
        Ok(PointIter::new(self, bounds, max_rank, roots, cfg))
    }
}

/// Flatten batches into `(position, rank)` pairs.
pub fn collect_points<I>(batches: I) -> Vec<(Vector2<f64>, u64)>
where
    I: IntoIterator<Item = PointBatch>,
{
    let mut out = Vec::new();
    for batch in batches {
        out.extend(batch.iter());
    }
    out
}

#[cfg(test)]
mod tests;
