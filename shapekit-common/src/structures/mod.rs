/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 14/03/2024
Last Modified: 11/09/2024
License: MIT
*/

// private sub-modules defined in other files
mod bounding_box;
mod point2d;

// exports identifiers from private sub-modules in the current module namespace
pub use self::bounding_box::BoundingBox;
pub use self::point2d::Point2D;
