//! Rank/area pruning predicates.
//!
//! Both tests are conservative: a pruned subtree provably holds no point with
//! `rank <= max_rank` inside the query box.
//! - Spatial: the instance's closed world square (grown by a relative slack)
//!   cannot hold a point passing the half-open box test.
//! - Rank: a lower bound on every rank in the subtree, mapped to world ranks by
//!   `scaled_rank`, exceeds `max_rank`. Overflow counts as exceeding.

use crate::geom::Box2;
use crate::tileset::{scaled_rank, TileInstance, TileTemplate};

/// Outcome of judging one instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Visit,
    RankPruned,
    SpatialPruned,
}

/// Pruning context of one query.
#[derive(Clone, Copy, Debug)]
pub struct PrunePolicy {
    bounds: Box2,
    max_rank: u64,
    eps: f64,
}

impl PrunePolicy {
    pub fn new(bounds: Box2, max_rank: u64, eps: f64) -> Self {
        Self {
            bounds,
            max_rank,
            eps: eps.max(0.0),
        }
    }

    #[inline]
    pub fn bounds(&self) -> &Box2 {
        &self.bounds
    }

    #[inline]
    pub fn max_rank(&self) -> u64 {
        self.max_rank
    }

    /// Can a local rank bound `rank` under `scale` still qualify?
    #[inline]
    pub fn rank_admits(&self, rank: u64, scale: u64) -> bool {
        matches!(scaled_rank(rank, scale), Some(r) if r <= self.max_rank)
    }

    /// World rank of a local point, if it qualifies.
    #[inline]
    pub fn world_rank(&self, local: u64, scale: u64) -> Option<u64> {
        scaled_rank(local, scale).filter(|r| *r <= self.max_rank)
    }

    #[inline]
    pub fn spatially_admits(&self, inst: &TileInstance) -> bool {
        let tile = inst.world_bounds().expanded(self.eps * inst.transform.scale);
        self.bounds.may_contain_any_of(&tile)
    }

    /// Rank first (no geometry needed), then space.
    #[inline]
    pub fn judge(&self, template: &TileTemplate, inst: &TileInstance) -> Verdict {
        if !self.rank_admits(template.min_reach(), inst.rank_scale) {
            Verdict::RankPruned
        } else if !self.spatially_admits(inst) {
            Verdict::SpatialPruned
        } else {
            Verdict::Visit
        }
    }

    /// May any descendant of `inst` qualify on rank?
    #[inline]
    pub fn descend(&self, template: &TileTemplate, inst: &TileInstance) -> bool {
        !template.is_terminal() && self.rank_admits(template.level_rank_floor, inst.rank_scale)
    }
}
