//! Data types of the template store and its error taxonomy.

use nalgebra::Vector2;
use thiserror::Error;

use crate::geom::{child_placement, Box2, Similarity2, Symmetry};

/// Dense index into `TemplateSet::templates()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub usize);

/// Symbolic edge colours; only the dataset's construction rules interpret them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EdgeColors {
    pub north: u32,
    pub east: u32,
    pub south: u32,
    pub west: u32,
}

/// A sample in template-local coordinates: `pos ∈ [0, 1)²`, `rank >= 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalPoint {
    pub pos: Vector2<f64>,
    pub rank: u64,
}

impl LocalPoint {
    #[inline]
    pub fn new(x: f64, y: f64, rank: u64) -> Self {
        Self {
            pos: Vector2::new(x, y),
            rank,
        }
    }
}

/// One cell of a template's subdivision.
///
/// `rect` is a square inside the parent's unit square; `symmetry` acts about the
/// child square's centre. `rank_scale` is the density boost of the finer level:
/// it multiplies every zero-based rank in the child subtree (see `scaled_rank`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChildSlot {
    pub template: TemplateId,
    pub rect: Box2,
    pub symmetry: Symmetry,
    pub rank_scale: u64,
}

impl ChildSlot {
    /// Child local square → parent local square.
    #[inline]
    pub fn placement(&self) -> Similarity2 {
        child_placement(&self.rect, self.symmetry)
    }
}

/// Rank of a point with local rank `local` in an instance of cumulative
/// `scale`: `1 + (local - 1) · scale`.
///
/// Ranks counted from zero are multiplied, so rank 1 stays 1 and a scale of 1
/// is the identity. `None` when the result does not fit in `u64`.
#[inline]
pub fn scaled_rank(local: u64, scale: u64) -> Option<u64> {
    local.saturating_sub(1).checked_mul(scale)?.checked_add(1)
}

/// Template as supplied by a loader, before validation and precomputation.
#[derive(Clone, Debug, Default)]
pub struct TemplateSpec {
    pub id: usize,
    pub edge_colors: EdgeColors,
    pub points: Vec<LocalPoint>,
    pub children: Vec<ChildSlot>,
}

/// Validated, immutable template shared by all of its instances.
#[derive(Clone, Debug)]
pub struct TileTemplate {
    pub id: TemplateId,
    pub edge_colors: EdgeColors,
    /// Not sorted by rank.
    pub own_points: Vec<LocalPoint>,
    /// Empty only for terminal templates.
    pub children: Vec<ChildSlot>,
    /// Lower bound (in this template's rank units) on every rank strictly below
    /// this template. `u64::MAX` if nothing is reachable.
    pub level_rank_floor: u64,
    /// `u64::MAX` for a template without points.
    pub min_own_rank: u64,
    /// 0 for a template without points.
    pub max_own_rank: u64,
}

impl TileTemplate {
    /// Lower bound on every rank in the subtree rooted at an instance of this template.
    #[inline]
    pub fn min_reach(&self) -> u64 {
        self.min_own_rank.min(self.level_rank_floor)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }
}

/// One root of the base layout: a template placed in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseInstance {
    pub template: TemplateId,
    pub transform: Similarity2,
    pub rank_scale: u64,
}

impl BaseInstance {
    /// Template placed on the canonical unit square.
    pub fn unit(template: TemplateId) -> Self {
        Self {
            template,
            transform: Similarity2::identity(),
            rank_scale: 1,
        }
    }
}

/// A placed template during one traversal.
///
/// World rank of a local point is `scaled_rank(point.rank, rank_scale)`.
/// `depth` is diagnostic only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileInstance {
    pub template: TemplateId,
    pub transform: Similarity2,
    pub rank_scale: u64,
    pub depth: u32,
}

impl TileInstance {
    #[inline]
    pub fn root(base: &BaseInstance) -> Self {
        Self {
            template: base.template,
            transform: base.transform,
            rank_scale: base.rank_scale,
            depth: 0,
        }
    }

    /// Instance for `slot` of this instance's template.
    ///
    /// `None` when the child's rank scale overflows `u64`: every rank in that
    /// subtree would exceed any representable `max_rank`.
    #[inline]
    pub fn child(&self, slot: &ChildSlot) -> Option<TileInstance> {
        Some(TileInstance {
            template: slot.template,
            transform: self.transform.compose(&slot.placement()),
            rank_scale: self.rank_scale.checked_mul(slot.rank_scale)?,
            depth: self.depth + 1,
        })
    }

    /// Closed world bounds of the instance's unit square.
    #[inline]
    pub fn world_bounds(&self) -> Box2 {
        self.transform.unit_bounds()
    }
}

/// Load-time options.
#[derive(Clone, Copy, Debug)]
pub struct LoadCfg {
    /// Reject sets whose ranks decrease with depth (`RankOrderViolation`).
    /// Pruning stays correct either way; the check guards the progressive ordering.
    pub verify_rank_order: bool,
}

impl Default for LoadCfg {
    fn default() -> Self {
        Self {
            verify_rank_order: cfg!(debug_assertions),
        }
    }
}

/// The load-once dataset: validated templates plus the base layout of one period.
#[derive(Clone, Debug)]
pub struct TemplateSet {
    pub(crate) templates: Vec<TileTemplate>,
    pub(crate) base_instances: Vec<BaseInstance>,
}

impl TemplateSet {
    #[inline]
    pub fn templates(&self) -> &[TileTemplate] {
        &self.templates
    }

    /// Panics on a dangling id; ids from a validated set never dangle.
    #[inline]
    pub fn template(&self, id: TemplateId) -> &TileTemplate {
        &self.templates[id.0]
    }

    #[inline]
    pub fn base_instances(&self) -> &[BaseInstance] {
        &self.base_instances
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Smallest world rank the base layout can produce.
    pub fn min_rank(&self) -> u64 {
        self.base_instances
            .iter()
            .map(|b| {
                scaled_rank(self.template(b.template).min_reach(), b.rank_scale)
                    .unwrap_or(u64::MAX)
            })
            .min()
            .unwrap_or(u64::MAX)
    }
}

/// Errors surfaced while reading or validating a tile dataset.
#[derive(Debug, Error)]
pub enum DatasetFormatError {
    #[error("i/o error reading tile data: {0}")]
    Io(#[from] std::io::Error),
    #[error("end of file reached while reading {what}")]
    UnexpectedEof { what: &'static str },
    #[error("dataset has no {what}")]
    Empty { what: &'static str },
    #[error("header field {field} has invalid value {value}")]
    BadHeader { field: &'static str, value: u32 },
    #[error("template at position {index} declares id {found}")]
    TemplateIdMismatch { index: usize, found: usize },
    #[error("template {target} referenced by {referrer} does not exist")]
    DanglingTemplate { target: usize, referrer: String },
    #[error("point {index} of template {template} at ({x}, {y}) lies outside the half-open unit square [0, 1)²")]
    PointOutOfTile {
        template: usize,
        index: usize,
        x: f64,
        y: f64,
    },
    #[error("point {index} of template {template} has rank 0 (ranks start at 1)")]
    ZeroRank { template: usize, index: usize },
    #[error("child slot {slot} of template {template}: {reason}")]
    BadChildRect {
        template: usize,
        slot: usize,
        reason: &'static str,
    },
    #[error("child slot {slot} of template {template} has rank_scale 0")]
    ZeroRankScale { template: usize, slot: usize },
    #[error("base instance {index}: {reason}")]
    BadBaseInstance { index: usize, reason: &'static str },
    #[error("template {template} repeats below itself without its ranks growing (recursion never deepens rank)")]
    UnboundedRecursion { template: usize },
    #[error("template {template}: descendants start at rank {floor} below its own max rank {max_own}")]
    RankOrderViolation {
        template: usize,
        max_own: u64,
        floor: u64,
    },
}

pub type Result<T> = std::result::Result<T, DatasetFormatError>;
