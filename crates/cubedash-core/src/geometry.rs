use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in tile units. `(x, y)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// The unit tile whose bottom-left corner is `(x, y)`.
    pub const fn tile(x: f32, y: f32) -> Self {
        Self::new(x, y, 1.0, 1.0)
    }

    /// Smallest rect spanning both points.
    pub fn from_points(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1.min(x2), y1.min(y2), (x1 - x2).abs(), (y1 - y2).abs())
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Strict intersection test. Rects that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    /// Sub-rectangle whose origin and size are fractions of this rect.
    pub fn relative(&self, fx: f32, fy: f32, fw: f32, fh: f32) -> Rect {
        Rect::new(
            self.x + self.w * fx,
            self.y + self.h * fy,
            self.w * fw,
            self.h * fh,
        )
    }

    /// Rotate the two defining corners about `(cx, cy)` by `degrees`
    /// (clockwise-positive in screen space) and return their bounding box.
    pub fn rotate_around(&self, degrees: f32, cx: f32, cy: f32) -> Rect {
        if degrees == 0.0 {
            return *self;
        }
        let (ax, ay) = rotate_point(cx, cy, self.x, self.y, degrees);
        let (bx, by) = rotate_point(cx, cy, self.right(), self.top(), degrees);
        Rect::from_points(ax, ay, bx, by)
    }

    /// Rotate about the center of the unit tile at `(tile_x, tile_y)`.
    /// This is how rotated obstacle art keeps a tight collision box.
    pub fn rotate_in_tile(&self, degrees: f32, tile_x: f32, tile_y: f32) -> Rect {
        self.rotate_around(degrees, tile_x + 0.5, tile_y + 0.5)
    }

    /// A rect with any NaN or infinite component cannot be collided or drawn.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.w.is_finite()
            && self.h.is_finite()
            && self.w >= 0.0
            && self.h >= 0.0
    }
}

fn rotate_point(cx: f32, cy: f32, x: f32, y: f32, degrees: f32) -> (f32, f32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let nx = cos * (x - cx) + sin * (y - cy) + cx;
    let ny = cos * (y - cy) - sin * (x - cx) + cy;
    (nx, ny)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &Rect, b: &Rect, eps: f32) -> bool {
        (a.x - b.x).abs() < eps
            && (a.y - b.y).abs() < eps
            && (a.w - b.w).abs() < eps
            && (a.h - b.h).abs() < eps
    }

    #[test]
    fn edge_touch_is_not_overlap() {
        let a = Rect::tile(0.0, 0.0);
        let b = Rect::tile(1.0, 0.0);
        let c = Rect::tile(0.0, 1.0);
        assert!(!a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn partial_overlap_detected() {
        let a = Rect::tile(0.0, 0.0);
        let b = Rect::tile(0.9, 0.5);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn relative_spike_box() {
        let spike = Rect::tile(3.0, 2.0).relative(0.2, 0.0, 0.6, 0.8);
        assert!((spike.x - 3.2).abs() < 1e-6);
        assert!((spike.y - 2.0).abs() < 1e-6);
        assert!((spike.w - 0.6).abs() < 1e-6);
        assert!((spike.h - 0.8).abs() < 1e-6);
    }

    #[test]
    fn rotate_zero_is_identity() {
        let r = Rect::new(1.0, 2.0, 0.5, 0.25);
        assert_eq!(r.rotate_around(0.0, 7.0, -3.0), r);
    }

    #[test]
    fn half_block_rotated_180_moves_to_bottom() {
        let half = Rect::tile(4.0, 0.0).relative(0.0, 0.5, 1.0, 0.5);
        let rotated = half.rotate_in_tile(180.0, 4.0, 0.0);
        let expected = Rect::new(4.0, 0.0, 1.0, 0.5);
        assert!(approx_eq(&rotated, &expected, 1e-5), "got {rotated:?}");
    }

    #[test]
    fn spike_rotated_90_lies_on_its_side() {
        let spike = Rect::tile(0.0, 0.0).relative(0.2, 0.0, 0.6, 0.8);
        let rotated = spike.rotate_in_tile(90.0, 0.0, 0.0);
        assert!((rotated.w - 0.8).abs() < 1e-5, "got {rotated:?}");
        assert!((rotated.h - 0.6).abs() < 1e-5, "got {rotated:?}");
    }

    #[test]
    fn invalid_rect_detected() {
        assert!(Rect::tile(0.0, 0.0).is_valid());
        assert!(!Rect::new(f32::NAN, 0.0, 1.0, 1.0).is_valid());
        assert!(!Rect::new(0.0, 0.0, f32::INFINITY, 1.0).is_valid());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn rect() -> impl Strategy<Value = Rect> {
            (-50.0f32..50.0, -50.0f32..50.0, 0.0f32..5.0, 0.0f32..5.0)
                .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
        }

        proptest! {
            #[test]
            fn overlap_is_symmetric(a in rect(), b in rect()) {
                prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
            }

            #[test]
            fn rotation_round_trips(
                r in rect(),
                quarter in 0u8..4,
                cx in -10.0f32..10.0,
                cy in -10.0f32..10.0,
            ) {
                let degrees = quarter as f32 * 90.0;
                let back = r.rotate_around(degrees, cx, cy).rotate_around(-degrees, cx, cy);
                prop_assert!(approx_eq(&back, &r, 1e-3), "{:?} -> {:?}", r, back);
            }
        }
    }
}
