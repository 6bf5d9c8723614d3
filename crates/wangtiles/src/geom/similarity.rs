//! Similarity maps `x ↦ t + s·S(x)` (positive uniform scale, square symmetry, shift).
//!
//! These are the only transforms that ever place a tile: no shear, so point
//! spacing is preserved up to the uniform scale.

use nalgebra::Vector2;

use super::{Box2, Symmetry};

/// `x ↦ t + scale · symmetry(x)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Similarity2 {
    pub scale: f64,
    pub symmetry: Symmetry,
    pub t: Vector2<f64>,
}

impl Default for Similarity2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Similarity2 {
    #[inline]
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            symmetry: Symmetry::Identity,
            t: Vector2::zeros(),
        }
    }

    /// Axis-aligned placement of the unit square at `origin` with side `scale`.
    #[inline]
    pub fn placed(origin: Vector2<f64>, scale: f64) -> Self {
        Self {
            scale,
            symmetry: Symmetry::Identity,
            t: origin,
        }
    }

    #[inline]
    pub fn apply(&self, p: Vector2<f64>) -> Vector2<f64> {
        self.t + self.symmetry.apply(p) * self.scale
    }

    /// `self ∘ inner` (apply `inner` first).
    #[inline]
    pub fn compose(&self, inner: &Similarity2) -> Similarity2 {
        Similarity2 {
            scale: self.scale * inner.scale,
            symmetry: self.symmetry.compose(inner.symmetry),
            t: self.apply(inner.t),
        }
    }

    /// World bounds of the local unit square (closed).
    #[inline]
    pub fn unit_bounds(&self) -> Box2 {
        Box2::spanning(
            self.apply(Vector2::zeros()),
            self.apply(Vector2::new(1.0, 1.0)),
        )
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.scale.is_finite() && self.scale > 0.0 && self.t.x.is_finite() && self.t.y.is_finite()
    }
}

/// Map from a child's local unit square onto `rect` of its parent's local square.
///
/// `symmetry` acts about the child square's centre, so the image is exactly `rect`
/// for every element. `rect` must be square; its width is used as the scale.
#[inline]
pub fn child_placement(rect: &Box2, symmetry: Symmetry) -> Similarity2 {
    let w = rect.width();
    let c = Vector2::new(0.5, 0.5);
    Similarity2 {
        scale: w,
        symmetry,
        t: rect.min + (c - symmetry.apply(c)) * w,
    }
}

/// World transform of a child: `parent ∘ child_placement(rect, symmetry)`.
#[inline]
pub fn compose(parent: &Similarity2, rect: &Box2, symmetry: Symmetry) -> Similarity2 {
    parent.compose(&child_placement(rect, symmetry))
}
