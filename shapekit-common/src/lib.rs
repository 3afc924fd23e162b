/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 14/03/2024
Last Modified: 02/06/2025
License: MIT
*/

pub mod spatial_ref_system;
pub mod structures;
pub mod utils;
