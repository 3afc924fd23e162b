/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 21/03/2024
Last Modified: 02/06/2025
License: MIT
*/

use super::error::Result;
use super::geometry::ShapefileGeometry;
use super::ShapefileHeader;
use byteorder::{BigEndian, WriteBytesExt};
use log::warn;
use shapekit_common::utils::{ByteOrderReader, Endianness};
use std::io::{Read, Seek, Write};

/// One entry of the spatial index: where a geometry record starts in the
/// .shp file and how long its content is, both already converted from the
/// on-disk 16-bit-word units to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShxRecord {
    pub offset: usize,
    pub content_length: usize,
}

/// Reads the .shx file: the shared 100-byte header, then one fixed 8-byte
/// big-endian (offset, content length) pair per geometry record.
pub(crate) fn read_shx<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
) -> Result<(ShapefileHeader, Vec<ShxRecord>)> {
    let header = ShapefileHeader::read_from(bor)?;
    let declared = header.file_length as usize * 2;
    if declared != bor.len() {
        warn!(
            "index declares {} bytes but the file holds {}",
            declared,
            bor.len()
        );
    }
    let end = declared.min(bor.len());

    bor.set_byte_order(Endianness::BigEndian);
    let mut records = vec![];
    while bor.pos() + 8 <= end {
        let offset = bor.read_i32()? as usize * 2;
        let content_length = bor.read_i32()? as usize * 2;
        records.push(ShxRecord {
            offset,
            content_length,
        });
    }
    Ok((header, records))
}

/// Writes the .shx file for a record list: offsets are the running byte
/// position each record's header lands at in the .shp stream.
pub(crate) fn write_shx<W: Write>(
    writer: &mut W,
    header: &ShapefileHeader,
    records: &[ShapefileGeometry],
) -> Result<()> {
    let file_length = (100 + 8 * records.len()) as i32 / 2; // in 16-bit words
    header.write_to(writer, file_length)?;

    let mut pos = 100i32;
    for record in records {
        writer.write_i32::<BigEndian>(pos / 2)?;
        writer.write_i32::<BigEndian>(record.get_length() / 2)?;
        pos += 8 + record.get_length();
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{read_shx, write_shx, ShxRecord};
    use crate::shapefile::geometry::{ShapeType, ShapefileGeometry};
    use crate::shapefile::ShapefileHeader;
    use shapekit_common::structures::Point2D;
    use shapekit_common::utils::{ByteOrderReader, Endianness};
    use std::io::Cursor;

    #[test]
    fn test_index_roundtrip() {
        let mut g1 = ShapefileGeometry::new(ShapeType::Point);
        g1.add_point(Point2D::new(1.0, 2.0));
        let mut g2 = ShapefileGeometry::new(ShapeType::Point);
        g2.add_point(Point2D::new(3.0, 4.0));

        let mut header = ShapefileHeader::default();
        header.file_code = 9994;
        header.shape_type = ShapeType::Point;

        let mut buf = vec![];
        write_shx(&mut buf, &header, &[g1.clone(), g2]).unwrap();
        assert_eq!(buf.len(), 100 + 2 * 8);

        let mut bor = ByteOrderReader::new(Cursor::new(buf), Endianness::BigEndian).unwrap();
        let (back_header, records) = read_shx(&mut bor).unwrap();
        assert_eq!(back_header.shape_type, ShapeType::Point);
        assert_eq!(
            records,
            vec![
                ShxRecord {
                    offset: 100,
                    content_length: g1.get_length() as usize
                },
                ShxRecord {
                    offset: 100 + 8 + g1.get_length() as usize,
                    content_length: g1.get_length() as usize
                },
            ]
        );
    }
}
