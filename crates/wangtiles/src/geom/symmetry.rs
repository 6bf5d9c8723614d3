//! Dihedral group of the square (order 8).
//!
//! Every element is written `R^k ∘ F^m`: an optional mirror `F: (x, y) ↦ (-x, y)`
//! followed by `k` counter-clockwise quarter turns. With `F R = R⁻¹ F` the product
//! of two elements stays in this normal form, so composition never touches floats.

use nalgebra::{matrix, Matrix2, Vector2};

/// One of the 8 symmetries of the square.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Symmetry {
    #[default]
    Identity,
    /// Quarter turn counter-clockwise.
    Rot90,
    Rot180,
    Rot270,
    /// `(x, y) ↦ (-x, y)`
    MirrorX,
    /// `(x, y) ↦ (-y, -x)`
    AntiDiagonal,
    /// `(x, y) ↦ (x, -y)`
    MirrorY,
    /// `(x, y) ↦ (y, x)`
    Diagonal,
}

impl Symmetry {
    /// All elements, ordered by `index()`.
    pub const ALL: [Symmetry; 8] = [
        Symmetry::Identity,
        Symmetry::Rot90,
        Symmetry::Rot180,
        Symmetry::Rot270,
        Symmetry::MirrorX,
        Symmetry::AntiDiagonal,
        Symmetry::MirrorY,
        Symmetry::Diagonal,
    ];

    /// `R^quarter_turns ∘ F^mirrored`.
    #[inline]
    pub fn from_parts(quarter_turns: u8, mirrored: bool) -> Self {
        Self::ALL[(quarter_turns % 4) as usize + if mirrored { 4 } else { 0 }]
    }

    /// Element by position in `ALL` (taken mod 8).
    #[inline]
    pub fn from_index(i: usize) -> Self {
        Self::ALL[i % 8]
    }

    #[inline]
    pub fn index(self) -> usize {
        self.quarter_turns() as usize + if self.is_mirrored() { 4 } else { 0 }
    }

    #[inline]
    pub fn quarter_turns(self) -> u8 {
        match self {
            Symmetry::Identity | Symmetry::MirrorX => 0,
            Symmetry::Rot90 | Symmetry::AntiDiagonal => 1,
            Symmetry::Rot180 | Symmetry::MirrorY => 2,
            Symmetry::Rot270 | Symmetry::Diagonal => 3,
        }
    }

    /// Orientation-reversing?
    #[inline]
    pub fn is_mirrored(self) -> bool {
        matches!(
            self,
            Symmetry::MirrorX | Symmetry::AntiDiagonal | Symmetry::MirrorY | Symmetry::Diagonal
        )
    }

    /// `self ∘ inner` (apply `inner` first).
    #[inline]
    pub fn compose(self, inner: Symmetry) -> Symmetry {
        let k = self.quarter_turns();
        let j = inner.quarter_turns();
        // R^k F^a R^j F^b = R^(k ± j) F^(a xor b)
        let turns = if self.is_mirrored() { k + 4 - j } else { k + j };
        Symmetry::from_parts(turns, self.is_mirrored() != inner.is_mirrored())
    }

    #[inline]
    pub fn inverse(self) -> Symmetry {
        if self.is_mirrored() {
            self
        } else {
            Symmetry::from_parts(4 - self.quarter_turns(), false)
        }
    }

    /// Linear action about the origin.
    #[inline]
    pub fn apply(self, v: Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (v.x, v.y);
        match self {
            Symmetry::Identity => Vector2::new(x, y),
            Symmetry::Rot90 => Vector2::new(-y, x),
            Symmetry::Rot180 => Vector2::new(-x, -y),
            Symmetry::Rot270 => Vector2::new(y, -x),
            Symmetry::MirrorX => Vector2::new(-x, y),
            Symmetry::AntiDiagonal => Vector2::new(-y, -x),
            Symmetry::MirrorY => Vector2::new(x, -y),
            Symmetry::Diagonal => Vector2::new(y, x),
        }
    }

    /// Action on the unit square about its centre `(½, ½)`; maps `[0,1]²` onto itself.
    #[inline]
    pub fn apply_unit(self, p: Vector2<f64>) -> Vector2<f64> {
        let c = Vector2::new(0.5, 0.5);
        c + self.apply(p - c)
    }

    /// Orthogonal matrix with entries in {-1, 0, 1}.
    pub fn matrix(self) -> Matrix2<f64> {
        match self {
            Symmetry::Identity => matrix![1.0, 0.0; 0.0, 1.0],
            Symmetry::Rot90 => matrix![0.0, -1.0; 1.0, 0.0],
            Symmetry::Rot180 => matrix![-1.0, 0.0; 0.0, -1.0],
            Symmetry::Rot270 => matrix![0.0, 1.0; -1.0, 0.0],
            Symmetry::MirrorX => matrix![-1.0, 0.0; 0.0, 1.0],
            Symmetry::AntiDiagonal => matrix![0.0, -1.0; -1.0, 0.0],
            Symmetry::MirrorY => matrix![1.0, 0.0; 0.0, -1.0],
            Symmetry::Diagonal => matrix![0.0, 1.0; 1.0, 0.0],
        }
    }
}
