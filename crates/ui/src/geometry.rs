//! Overlay geometry in viewport pixels

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Measured extent of a rendered element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A zero size is what an element reports before layout.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 && self.height <= 0.0
    }
}

/// Axis-aligned rectangle with a top-left origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Edges are inclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Grow by `dx` on the left and right and `dy` on the top and bottom.
    pub fn inflate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.left - dx, self.top - dy, self.width + 2.0 * dx, self.height + 2.0 * dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.bottom(), 70.0);
        assert_eq!(rect.center_x(), 60.0);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(!rect.contains(Point::new(10.1, 5.0)));
    }

    #[test]
    fn test_inflate() {
        let rect = Rect::new(100.0, 100.0, 50.0, 20.0).inflate(60.0, 30.0);
        assert_eq!(rect, Rect::new(40.0, 70.0, 170.0, 80.0));
    }

    #[test]
    fn test_empty_size() {
        assert!(Size::default().is_empty());
        assert!(!Size::new(0.0, 12.0).is_empty());
    }
}
