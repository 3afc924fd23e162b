/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 14/03/2024
Last Modified: 11/09/2024
License: MIT
*/

use super::Point2D;

/// An axis-aligned rectangular extent. A default-constructed box is
/// inverted (min > max) so that the first `expand_to*` call initializes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for BoundingBox {
    fn default() -> BoundingBox {
        BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_points(points: &[Point2D]) -> BoundingBox {
        let mut bb = BoundingBox::default();
        for p in points {
            bb.expand_to_point(p);
        }
        bb
    }

    /// True once at least one point or box has been folded in.
    pub fn initialized(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    pub fn expand_to_point(&mut self, p: &Point2D) {
        if p.x < self.min_x {
            self.min_x = p.x;
        }
        if p.y < self.min_y {
            self.min_y = p.y;
        }
        if p.x > self.max_x {
            self.max_x = p.x;
        }
        if p.y > self.max_y {
            self.max_y = p.y;
        }
    }

    pub fn expand_to(&mut self, other: BoundingBox) {
        if other.min_x < self.min_x {
            self.min_x = other.min_x;
        }
        if other.min_y < self.min_y {
            self.min_y = other.min_y;
        }
        if other.max_x > self.max_x {
            self.max_x = other.max_x;
        }
        if other.max_y > self.max_y {
            self.max_y = other.max_y;
        }
    }
}

#[cfg(test)]
mod test {
    use super::BoundingBox;
    use crate::structures::Point2D;

    #[test]
    fn test_from_points() {
        let bb = BoundingBox::from_points(&[
            Point2D::new(2.0, -1.0),
            Point2D::new(-3.0, 4.0),
            Point2D::new(0.5, 0.5),
        ]);
        assert_eq!(bb, BoundingBox::new(-3.0, -1.0, 2.0, 4.0));
    }

    #[test]
    fn test_default_is_uninitialized() {
        let mut bb = BoundingBox::default();
        assert!(!bb.initialized());
        bb.expand_to_point(&Point2D::new(1.0, 1.0));
        assert!(bb.initialized());
    }

    #[test]
    fn test_expand_to() {
        let mut bb = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        bb.expand_to(BoundingBox::new(-1.0, 0.5, 0.5, 2.0));
        assert_eq!(bb, BoundingBox::new(-1.0, 0.0, 1.0, 2.0));
    }
}
