#![forbid(unsafe_code)]

//! Geometric primitives in CSS pixel space.

/// A point in CSS pixels.
///
/// Whether the point is in viewport (client) or document (page) space is
/// decided by the caller; the two differ by the current scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise offset by another point.
    #[inline]
    pub fn offset(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }

    /// Component-wise difference `self - other`.
    #[inline]
    pub fn delta_from(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// An axis-aligned rectangle, as returned by `getBoundingClientRect()`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: f64,
    /// Top edge (inclusive).
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub const fn left(&self) -> f64 {
        self.x
    }

    #[inline]
    pub const fn top(&self) -> f64 {
        self.y
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if the rectangle has zero (or negative) area.
    ///
    /// Elements hidden with `display: none` report an all-zero rect.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// The same rectangle shifted by `by`.
    #[inline]
    pub fn translate(&self, by: Point) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }

    /// Convert a viewport-space rect into document space given the current
    /// scroll offset.
    #[inline]
    pub fn to_document(&self, scroll: Point) -> Rect {
        self.translate(scroll)
    }

    /// Check if `point` lies within the `size` x `size` square anchored at the
    /// bottom-right corner.
    pub fn in_bottom_right_corner(&self, point: Point, size: f64) -> bool {
        self.contains(point) && point.x >= self.right() - size && point.y >= self.bottom() - size
    }
}

/// Format a CSS pixel length, dropping a redundant fractional part.
pub(crate) fn px(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}px", value as i64)
    } else {
        format!("{value}px")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(29.9, 14.9)));
        assert!(!r.contains(Point::new(30.0, 12.0)));
        assert!(!r.contains(Point::new(12.0, 15.0)));
    }

    #[test]
    fn empty_rect_detection() {
        assert!(Rect::default().is_empty());
        assert!(Rect::new(5.0, 5.0, 0.0, 10.0).is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn document_space_adds_scroll() {
        let r = Rect::new(40.0, 60.0, 320.0, 180.0);
        let doc = r.to_document(Point::new(0.0, 500.0));
        assert_eq!(doc, Rect::new(40.0, 560.0, 320.0, 180.0));
    }

    #[test]
    fn bottom_right_corner_hit() {
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(r.in_bottom_right_corner(Point::new(95.0, 95.0), 16.0));
        assert!(!r.in_bottom_right_corner(Point::new(50.0, 95.0), 16.0));
        assert!(!r.in_bottom_right_corner(Point::new(101.0, 101.0), 16.0));
    }

    #[test]
    fn px_formatting() {
        assert_eq!(px(320.0), "320px");
        assert_eq!(px(12.5), "12.5px");
        assert_eq!(px(-4.0), "-4px");
    }
}
