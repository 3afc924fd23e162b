/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 22/05/2024
Last Modified: 02/06/2025
License: MIT
*/

use std::io;
use thiserror::Error;

/// Error type for Shapefile reading and writing.
///
/// Decoding is deliberately lenient: a truncated file or a structurally bad
/// record stops the whole-file read with everything decoded so far, and an
/// unparseable attribute cell degrades to a blank value. The variants below
/// are what a single-record or write-path call can surface.
#[derive(Debug, Error)]
pub enum ShapefileError {
    /// File open/read/write failure. Write-path errors (disk full,
    /// permissions) are not recoverable and propagate as this variant.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A structural violation: bad magic number, inconsistent header
    /// lengths, a record that consumed more or fewer bytes than its
    /// declared content length, a bad field descriptor.
    #[error("format error: {0}")]
    Format(String),

    /// An on-wire shape-type tag outside the ESRI-defined set.
    #[error("unsupported shape type code: {0}")]
    UnsupportedShapeType(i32),

    /// The attribute table's row count does not match the geometry count.
    /// The whole-file read path recovers from this by dropping the
    /// attribute table rather than failing.
    #[error("attribute table has {rows} rows for {geometries} geometries")]
    SchemaMismatch { geometries: usize, rows: usize },
}

/// Result type alias for Shapefile operations.
pub type Result<T> = std::result::Result<T, ShapefileError>;
