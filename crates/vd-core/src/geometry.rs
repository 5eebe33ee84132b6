//! Geometry kernel: affine composition/decomposition, bounding areas and
//! angle helpers.
//!
//! Points, vectors and matrices are `kurbo` types. An `Affine` holds the six
//! coefficients `[a, b, c, d, e, f]` mapping `(x, y)` to
//! `(a·x + c·y + e, b·x + d·y + f)`.

use kurbo::{Affine, Point, Rect, Vec2};

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

// ─── Affine helpers ──────────────────────────────────────────────────────

/// Compose matrices in application order: the rightmost is applied first.
///
/// `compose(&[a, b, c])` maps `p` to `a * (b * (c * p))`.
pub fn compose(matrices: &[Affine]) -> Affine {
    matrices
        .iter()
        .fold(Affine::IDENTITY, |acc, m| acc * *m)
}

/// Invert a matrix, refusing singular ones instead of producing NaN.
pub fn invert(m: Affine) -> Option<Affine> {
    if m.determinant().abs() < SINGULAR_EPSILON {
        return None;
    }
    let inv = m.inverse();
    inv.as_coeffs()
        .iter()
        .all(|c| c.is_finite())
        .then_some(inv)
}

/// `translate(p) * m * translate(-p)`: apply `m` about the pivot `p`.
pub fn about(pivot: Point, m: Affine) -> Affine {
    Affine::translate(pivot.to_vec2()) * m * Affine::translate(-pivot.to_vec2())
}

/// Translation / rotation / scale parts of an affine matrix.
///
/// Skew is discarded. A reflection shows up as a negative `scale.y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub translation: Vec2,
    /// Rotation in radians, in `(-π, π]`.
    pub rotation: f64,
    pub scale: Vec2,
}

impl Decomposed {
    /// Rebuild `translate * rotate * scale`.
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.translation)
            * Affine::rotate(self.rotation)
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
    }

    /// The same decomposition with scale reduced to its signs, so that only
    /// translation, rotation and flips remain.
    pub fn without_scale(&self) -> Decomposed {
        Decomposed {
            translation: self.translation,
            rotation: self.rotation,
            scale: Vec2::new(sign(self.scale.x), sign(self.scale.y)),
        }
    }
}

/// Translation–rotation–scale decomposition.
///
/// For `m = T · R(θ) · S(sx, sy)` with `sx > 0` this recovers `θ`, `sx`, `sy`.
/// A degenerate first column yields zero rotation and zero x-scale.
pub fn decompose(m: Affine) -> Decomposed {
    let [a, b, c, d, e, f] = m.as_coeffs();
    let sx = a.hypot(b);
    if sx < SINGULAR_EPSILON {
        return Decomposed {
            translation: Vec2::new(e, f),
            rotation: 0.0,
            scale: Vec2::new(0.0, c.hypot(d)),
        };
    }
    let rotation = b.atan2(a);
    let sy = (a * d - b * c) / sx;
    Decomposed {
        translation: Vec2::new(e, f),
        rotation,
        scale: Vec2::new(sx, sy),
    }
}

/// Rotation angle of a matrix in degrees, in `[0, 360)`.
pub fn rotation_degree(m: Affine) -> f64 {
    normalize_degree(rad_to_deg(decompose(m).rotation))
}

/// Whether the matrix mirrors its input.
pub fn is_flipped(m: Affine) -> bool {
    m.determinant() < 0.0
}

fn sign(v: f64) -> f64 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

// ─── Angles ──────────────────────────────────────────────────────────────

pub fn deg_to_rad(deg: f64) -> f64 {
    deg.to_radians()
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad.to_degrees()
}

/// Map any angle in degrees into `[0, 360)`.
pub fn normalize_degree(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

/// Signed angle in radians from `from` to `to`, in `(-π, π]`.
///
/// Returns `None` when either vector has zero length.
pub fn signed_angle(from: Vec2, to: Vec2) -> Option<f64> {
    if from.hypot2() < SINGULAR_EPSILON || to.hypot2() < SINGULAR_EPSILON {
        return None;
    }
    let mut delta = to.atan2() - from.atan2();
    if delta > std::f64::consts::PI {
        delta -= std::f64::consts::TAU;
    } else if delta <= -std::f64::consts::PI {
        delta += std::f64::consts::TAU;
    }
    Some(delta)
}

/// Round to `places` decimal places. More than 15 places leaves `value`
/// unchanged.
pub fn round_to(value: f64, places: u32) -> f64 {
    if places > 15 {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

// ─── Bounding areas ──────────────────────────────────────────────────────

/// Axis-aligned rectangle `{left, top, right, bottom}`.
///
/// The default value is the empty area, which is the identity for `union`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingArea {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Default for BoundingArea {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingArea {
    pub const EMPTY: BoundingArea = BoundingArea {
        left: f64::INFINITY,
        top: f64::INFINITY,
        right: f64::NEG_INFINITY,
        bottom: f64::NEG_INFINITY,
    };

    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Smallest area covering every point. Empty for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        points.into_iter().fold(Self::EMPTY, |acc, p| Self {
            left: acc.left.min(p.x),
            top: acc.top.min(p.y),
            right: acc.right.max(p.x),
            bottom: acc.bottom.max(p.y),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Whether any corner has been set (a zero-size point area still counts).
    fn is_unset(&self) -> bool {
        self.left > self.right || self.top > self.bottom
    }

    pub fn width(&self) -> f64 {
        if self.is_unset() { 0.0 } else { self.right - self.left }
    }

    pub fn height(&self) -> f64 {
        if self.is_unset() { 0.0 } else { self.bottom - self.top }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn union(&self, other: &BoundingArea) -> BoundingArea {
        BoundingArea {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Overlap of two areas; empty when they are disjoint.
    pub fn intersect(&self, other: &BoundingArea) -> BoundingArea {
        let r = BoundingArea {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if r.is_empty() { BoundingArea::EMPTY } else { r }
    }

    pub fn intersects(&self, other: &BoundingArea) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Edge-inclusive point test.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    pub fn contains(&self, other: &BoundingArea) -> bool {
        !other.is_unset()
            && other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// Grow every side by `amount`.
    pub fn inflate(&self, amount: f64) -> BoundingArea {
        if self.is_unset() {
            return *self;
        }
        BoundingArea::new(
            self.left - amount,
            self.top - amount,
            self.right + amount,
            self.bottom + amount,
        )
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }

    /// Transform the four corners and take the axis-aligned extrema.
    pub fn transform(&self, m: Affine) -> BoundingArea {
        if self.is_unset() {
            return *self;
        }
        BoundingArea::from_points(self.corners().map(|p| m * p))
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right, self.bottom)
    }
}

impl From<Rect> for BoundingArea {
    fn from(r: Rect) -> Self {
        let r = r.abs();
        BoundingArea::new(r.x0, r.y0, r.x1, r.y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    #[test]
    fn compose_applies_rightmost_first() {
        let m = compose(&[Affine::translate((10.0, 0.0)), Affine::scale(2.0)]);
        let p = m * Point::new(1.0, 1.0);
        assert!((p.x - 12.0).abs() < EPS);
        assert!((p.y - 2.0).abs() < EPS);
    }

    #[test]
    fn decompose_recovers_rotation_and_scale() {
        let m = compose(&[
            Affine::translate((3.0, -4.0)),
            Affine::rotate(FRAC_PI_2),
            Affine::scale_non_uniform(2.0, 0.5),
        ]);
        let d = decompose(m);
        assert!((d.translation.x - 3.0).abs() < EPS);
        assert!((d.translation.y + 4.0).abs() < EPS);
        assert!((d.rotation - FRAC_PI_2).abs() < EPS);
        assert!((d.scale.x - 2.0).abs() < EPS);
        assert!((d.scale.y - 0.5).abs() < EPS);
    }

    #[test]
    fn decompose_reports_flip_as_negative_y_scale() {
        let d = decompose(Affine::scale_non_uniform(1.0, -3.0));
        assert!((d.scale.y + 3.0).abs() < EPS);
        assert_eq!(d.without_scale().scale, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn invert_refuses_singular() {
        assert!(invert(Affine::scale_non_uniform(0.0, 1.0)).is_none());
        assert!(invert(Affine::translate((1.0, 2.0))).is_some());
    }

    #[test]
    fn normalize_degree_wraps() {
        assert_eq!(normalize_degree(360.0), 0.0);
        assert_eq!(normalize_degree(-90.0), 270.0);
        assert_eq!(normalize_degree(725.0), 5.0);
        assert_eq!(normalize_degree(-1e-18), 0.0);
    }

    #[test]
    fn signed_angle_handles_wraparound() {
        let a = signed_angle(Vec2::new(-1.0, 0.1), Vec2::new(-1.0, -0.1)).unwrap();
        assert!(a.abs() < 0.3);
        assert!(signed_angle(Vec2::ZERO, Vec2::new(1.0, 0.0)).is_none());
    }

    #[test]
    fn round_to_survives_huge_precision() {
        assert_eq!(round_to(12.346, 2), 12.35);
        assert_eq!(round_to(12.345, u32::MAX), 12.345);
        assert!(round_to(0.1, 15).is_finite());
    }

    #[test]
    fn bounding_area_algebra() {
        let a = BoundingArea::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingArea::new(5.0, 5.0, 20.0, 15.0);
        assert_eq!(a.union(&b), BoundingArea::new(0.0, 0.0, 20.0, 15.0));
        assert_eq!(a.intersect(&b), BoundingArea::new(5.0, 5.0, 10.0, 10.0));
        assert!(a.intersect(&BoundingArea::new(30.0, 30.0, 40.0, 40.0)).is_empty());
        assert!(a.contains_point(Point::new(10.0, 0.0)));
        assert!(!a.contains(&b));
        assert!(a.union(&b).contains(&b));
        assert_eq!(a.center(), Point::new(5.0, 5.0));
        assert_eq!(b.area(), 150.0);
    }

    #[test]
    fn empty_is_union_identity() {
        let a = BoundingArea::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(BoundingArea::EMPTY.union(&a), a);
        assert!(BoundingArea::EMPTY.is_empty());
        assert_eq!(BoundingArea::EMPTY.width(), 0.0);
    }

    #[test]
    fn transform_stays_axis_aligned() {
        let a = BoundingArea::new(0.0, 0.0, 10.0, 10.0);
        let r = a.transform(about(a.center(), Affine::rotate(std::f64::consts::FRAC_PI_4)));
        let half_diag = 50f64.sqrt();
        assert!((r.left - (5.0 - half_diag)).abs() < EPS);
        assert!((r.right - (5.0 + half_diag)).abs() < EPS);
    }
}
