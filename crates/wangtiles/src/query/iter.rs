//! Depth-first traversal engine.

use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::geom::Box2;
use crate::tileset::{TemplateSet, TileInstance};

use super::batch::{BatchEmitter, PointBatch};
use super::prune::{PrunePolicy, Verdict};
use super::QueryCfg;

/// Diagnostics of one traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub instances_visited: u64,
    pub spatial_pruned: u64,
    /// Includes children whose rank scale overflowed.
    pub rank_pruned: u64,
    pub points_emitted: u64,
    pub batches: u64,
    pub max_depth: u32,
}

/// Instance whose own points are being emitted; survives a full batch.
#[derive(Clone, Copy, Debug)]
struct Cursor {
    inst: TileInstance,
    next: usize,
}

/// Lazy, finite, non-restartable stream of point batches for one query.
///
/// See the module docs for the ordering contract.
#[derive(Debug)]
pub struct PointIter<'a> {
    set: &'a TemplateSet,
    policy: PrunePolicy,
    stack: Vec<TileInstance>,
    cursor: Option<Cursor>,
    emitter: BatchEmitter,
    stats: TraversalStats,
    finished: bool,
}

impl<'a> PointIter<'a> {
    pub(crate) fn new(
        set: &'a TemplateSet,
        bounds: Box2,
        max_rank: u64,
        mut roots: Vec<TileInstance>,
        cfg: QueryCfg,
    ) -> Self {
        trace!(
            bounds = ?bounds.to_bounds(),
            max_rank,
            roots = roots.len(),
            "point query"
        );
        // LIFO: the first root is walked first
        roots.reverse();
        Self {
            set,
            policy: PrunePolicy::new(bounds, max_rank, cfg.bounds_eps),
            stack: roots,
            cursor: None,
            emitter: BatchEmitter::new(cfg.batch_capacity),
            stats: TraversalStats::default(),
            finished: false,
        }
    }

    #[inline]
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    #[inline]
    pub fn bounds(&self) -> &Box2 {
        self.policy.bounds()
    }

    #[inline]
    pub fn max_rank(&self) -> u64 {
        self.policy.max_rank()
    }

    /// Prune or expand one instance: queue its children, arm the cursor for its points.
    fn visit(&mut self, inst: TileInstance) {
        let set = self.set;
        let template = set.template(inst.template);
        match self.policy.judge(template, &inst) {
            Verdict::RankPruned => {
                self.stats.rank_pruned += 1;
                return;
            }
            Verdict::SpatialPruned => {
                self.stats.spatial_pruned += 1;
                return;
            }
            Verdict::Visit => {}
        }
        self.stats.instances_visited += 1;
        self.stats.max_depth = self.stats.max_depth.max(inst.depth);

        if self.policy.descend(template, &inst) {
            // reversed so slot 0 is popped first
            for slot in template.children.iter().rev() {
                match inst.child(slot) {
                    Some(child) => self.stack.push(child),
                    None => self.stats.rank_pruned += 1,
                }
            }
        }
        if self.policy.rank_admits(template.min_own_rank, inst.rank_scale) {
            self.cursor = Some(Cursor { inst, next: 0 });
        }
    }

    /// Emit qualifying own points from `cur`; returns a batch as soon as one fills.
    fn drain(&mut self, mut cur: Cursor) -> Option<PointBatch> {
        let set = self.set;
        let points = &set.template(cur.inst.template).own_points;
        while cur.next < points.len() {
            let p = points[cur.next];
            cur.next += 1;
            let Some(rank) = self.policy.world_rank(p.rank, cur.inst.rank_scale) else {
                continue;
            };
            let pos = cur.inst.transform.apply(p.pos);
            if !self.policy.bounds().contains(pos) {
                continue;
            }
            self.stats.points_emitted += 1;
            if let Some(full) = self.emitter.push(pos, rank, cur.inst.depth) {
                if cur.next < points.len() {
                    self.cursor = Some(cur);
                }
                return Some(full);
            }
        }
        None
    }

    fn finish(&mut self) -> Option<PointBatch> {
        self.finished = true;
        self.stack = Vec::new();
        let last = self.emitter.finish();
        if last.is_some() {
            self.stats.batches += 1;
        }
        let s = &self.stats;
        debug!(
            visited = s.instances_visited,
            spatial_pruned = s.spatial_pruned,
            rank_pruned = s.rank_pruned,
            points = s.points_emitted,
            batches = s.batches,
            max_depth = s.max_depth,
            "point query finished"
        );
        last
    }
}

impl Iterator for PointIter<'_> {
    type Item = PointBatch;

    fn next(&mut self) -> Option<PointBatch> {
        if self.finished {
            return None;
        }
        loop {
            if let Some(cur) = self.cursor.take() {
                if let Some(batch) = self.drain(cur) {
                    self.stats.batches += 1;
                    return Some(batch);
                }
                continue;
            }
            match self.stack.pop() {
                Some(inst) => self.visit(inst),
                None => return self.finish(),
            }
        }
    }
}

impl FusedIterator for PointIter<'_> {}
