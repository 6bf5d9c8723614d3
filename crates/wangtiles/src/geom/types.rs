//! Basic 2D types and the shared tolerance.
//!
//! - `Box2`: axis-aligned rectangle; point membership is half-open `[min, max)`.

use nalgebra::Vector2;

/// Slack for geometric comparisons on O(1) local coordinates.
pub const EPS: f64 = 1e-9;

/// Axis-aligned rectangle `[min.x, max.x) × [min.y, max.y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box2 {
    pub min: Vector2<f64>,
    pub max: Vector2<f64>,
}

impl Box2 {
    #[inline]
    pub fn new(min: Vector2<f64>, max: Vector2<f64>) -> Self {
        Self { min, max }
    }

    /// The canonical unit square.
    #[inline]
    pub fn unit() -> Self {
        Self::new(Vector2::zeros(), Vector2::new(1.0, 1.0))
    }

    /// From `[min_x, min_y, max_x, max_y]` without checks.
    #[inline]
    pub fn from_bounds(b: [f64; 4]) -> Self {
        Self::new(Vector2::new(b[0], b[1]), Vector2::new(b[2], b[3]))
    }

    #[inline]
    pub fn to_bounds(&self) -> [f64; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    /// Smallest box holding both points.
    #[inline]
    pub fn spanning(a: Vector2<f64>, b: Vector2<f64>) -> Self {
        Self::new(a.inf(&b), a.sup(&b))
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// True if no point satisfies the half-open membership test.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.min.x < self.max.x && self.min.y < self.max.y)
    }

    /// Half-open membership: `min <= p < max` on both axes.
    #[inline]
    pub fn contains(&self, p: Vector2<f64>) -> bool {
        self.min.x <= p.x && p.x < self.max.x && self.min.y <= p.y && p.y < self.max.y
    }

    /// Open-interior overlap (shared edges do not count).
    #[inline]
    pub fn overlaps(&self, other: &Box2) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// Could a point of the closed box `closed` pass `self.contains`?
    #[inline]
    pub fn may_contain_any_of(&self, closed: &Box2) -> bool {
        closed.min.x < self.max.x
            && self.min.x <= closed.max.x
            && closed.min.y < self.max.y
            && self.min.y <= closed.max.y
    }

    /// Grow by `eps` on every side.
    #[inline]
    pub fn expanded(&self, eps: f64) -> Self {
        let d = Vector2::new(eps, eps);
        Self::new(self.min - d, self.max + d)
    }

    /// Closed containment of `other` with tolerance `eps`.
    #[inline]
    pub fn encloses_eps(&self, other: &Box2, eps: f64) -> bool {
        other.min.x >= self.min.x - eps
            && other.min.y >= self.min.y - eps
            && other.max.x <= self.max.x + eps
            && other.max.y <= self.max.y + eps
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.to_bounds().iter().all(|v| v.is_finite())
    }

    #[inline]
    pub fn translated(&self, d: Vector2<f64>) -> Self {
        Self::new(self.min + d, self.max + d)
    }
}
