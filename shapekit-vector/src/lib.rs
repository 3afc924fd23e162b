/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 14/03/2024
Last Modified: 02/06/2025
License: MIT
*/

// private sub-module defined in other files
pub mod shapefile;

// exports identifiers from private sub-modules in the current module namespace
pub use crate::shapefile::attributes::*;
pub use crate::shapefile::error::{Result, ShapefileError};
pub use crate::shapefile::geometry::*;
pub use crate::shapefile::index::ShxRecord;
pub use crate::shapefile::{
    write_partitioned, ReadOptions, Shapefile, ShapefileHeader, ShapefileReader,
};
