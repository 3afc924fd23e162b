/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 21/03/2024
Last Modified: 02/06/2025
License: MIT
*/

use super::error::{Result, ShapefileError};
use byteorder::{LittleEndian, WriteBytesExt};
use shapekit_common::spatial_ref_system::GeoCoordTransform;
use shapekit_common::structures::{BoundingBox, Point2D};
use shapekit_common::utils::ByteOrderReader;
use std::fmt;
use std::io::{Read, Seek, Write};

/// The closed set of ESRI shape-type tags. The on-wire integer appears in
/// the file header and again at the start of every record's content; only
/// `Null` may differ from the header's type within a file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    #[default]
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
}

impl ShapeType {
    pub fn from_int(value: i32) -> Result<ShapeType> {
        match value {
            0 => Ok(ShapeType::Null),
            1 => Ok(ShapeType::Point),
            3 => Ok(ShapeType::PolyLine),
            5 => Ok(ShapeType::Polygon),
            8 => Ok(ShapeType::MultiPoint),
            11 => Ok(ShapeType::PointZ),
            13 => Ok(ShapeType::PolyLineZ),
            15 => Ok(ShapeType::PolygonZ),
            18 => Ok(ShapeType::MultiPointZ),
            21 => Ok(ShapeType::PointM),
            23 => Ok(ShapeType::PolyLineM),
            25 => Ok(ShapeType::PolygonM),
            28 => Ok(ShapeType::MultiPointM),
            _ => Err(ShapefileError::UnsupportedShapeType(value)),
        }
    }

    pub fn to_int(&self) -> i32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
            ShapeType::PointZ => 11,
            ShapeType::PolyLineZ => 13,
            ShapeType::PolygonZ => 15,
            ShapeType::MultiPointZ => 18,
            ShapeType::PointM => 21,
            ShapeType::PolyLineM => 23,
            ShapeType::PolygonM => 25,
            ShapeType::MultiPointM => 28,
        }
    }

    /// The 2-D type this type reduces to once Z/M data is set aside.
    pub fn base(&self) -> ShapeType {
        match self {
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => ShapeType::Point,
            ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => {
                ShapeType::PolyLine
            }
            ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => ShapeType::Polygon,
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
                ShapeType::MultiPoint
            }
            ShapeType::Null => ShapeType::Null,
        }
    }

    pub fn is_z(&self) -> bool {
        matches!(
            self,
            ShapeType::PointZ | ShapeType::PolyLineZ | ShapeType::PolygonZ | ShapeType::MultiPointZ
        )
    }

    /// True only for the measured (M) types, not the Z types that may also
    /// carry measures.
    pub fn is_m(&self) -> bool {
        matches!(
            self,
            ShapeType::PointM | ShapeType::PolyLineM | ShapeType::PolygonM | ShapeType::MultiPointM
        )
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One geometry record of a Shapefile: a point, multipoint, polyline or
/// polygon, possibly multi-part, possibly carrying Z and/or M arrays.
#[derive(Default, Clone, Debug)]
pub struct ShapefileGeometry {
    pub shape_type: ShapeType,
    pub bbox: BoundingBox,
    pub num_parts: i32,
    pub num_points: i32,
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
    pub z_min: f64,
    pub z_max: f64,
    pub z_array: Vec<f64>,
    pub m_min: f64,
    pub m_max: f64,
    pub m_array: Vec<f64>,
}

impl ShapefileGeometry {
    pub fn new(shape_type: ShapeType) -> ShapefileGeometry {
        ShapefileGeometry {
            shape_type,
            bbox: BoundingBox::default(),
            ..Default::default()
        }
    }

    pub fn add_point(&mut self, p: Point2D) {
        self.bbox.expand_to_point(&p);
        self.points.push(p);
        self.num_points += 1;
    }

    pub fn add_point_m(&mut self, p: Point2D, m: f64) {
        self.add_point(p);
        if self.m_array.is_empty() {
            self.m_min = m;
            self.m_max = m;
        } else {
            self.m_min = self.m_min.min(m);
            self.m_max = self.m_max.max(m);
        }
        self.m_array.push(m);
    }

    pub fn add_point_z(&mut self, p: Point2D, z: f64) {
        self.add_point(p);
        if self.z_array.is_empty() {
            self.z_min = z;
            self.z_max = z;
        } else {
            self.z_min = self.z_min.min(z);
            self.z_max = self.z_max.max(z);
        }
        self.z_array.push(z);
    }

    pub fn add_point_zm(&mut self, p: Point2D, z: f64, m: f64) {
        self.add_point_z(p, z);
        if self.m_array.is_empty() {
            self.m_min = m;
            self.m_max = m;
        } else {
            self.m_min = self.m_min.min(m);
            self.m_max = self.m_max.max(m);
        }
        self.m_array.push(m);
    }

    /// Appends a new part made of `points`, recording its starting vertex
    /// index in the part-offset array.
    pub fn add_part(&mut self, points: &[Point2D]) {
        self.parts.push(self.num_points);
        self.num_parts += 1;
        for p in points {
            self.add_point(*p);
        }
    }

    /// True when a Z-type record carries the optional measure block.
    pub fn has_m_data(&self) -> bool {
        !self.m_array.is_empty()
    }

    /// The record's content length in bytes, including the 4-byte
    /// shape-type tag, as written to the record header (÷2 for words).
    pub fn get_length(&self) -> i32 {
        let n = self.points.len() as i32;
        let p = self.parts.len() as i32;
        match self.shape_type {
            ShapeType::Null => 4,
            ShapeType::Point => 20,
            ShapeType::PointM => 28,
            ShapeType::PointZ => {
                if self.has_m_data() {
                    36
                } else {
                    28
                }
            }
            ShapeType::MultiPoint => 40 + 16 * n,
            ShapeType::MultiPointM => 40 + 16 * n + 16 + 8 * n,
            ShapeType::MultiPointZ => {
                let mut length = 40 + 16 * n + 16 + 8 * n;
                if self.has_m_data() {
                    length += 16 + 8 * n;
                }
                length
            }
            ShapeType::PolyLine | ShapeType::Polygon => 44 + 4 * p + 16 * n,
            ShapeType::PolyLineM | ShapeType::PolygonM => 44 + 4 * p + 16 * n + 16 + 8 * n,
            ShapeType::PolyLineZ | ShapeType::PolygonZ => {
                let mut length = 44 + 4 * p + 16 * n + 16 + 8 * n;
                if self.has_m_data() {
                    length += 16 + 8 * n;
                }
                length
            }
        }
    }

    /// Slices the flat point array into its parts, using consecutive
    /// part-offset differences; the last part runs to `num_points`.
    pub fn part_slices(&self) -> Vec<&[Point2D]> {
        if self.parts.is_empty() {
            if self.points.is_empty() {
                return vec![];
            }
            return vec![&self.points[..]];
        }
        let mut slices = Vec::with_capacity(self.parts.len());
        for i in 0..self.parts.len() {
            let start = self.parts[i] as usize;
            let end = if i < self.parts.len() - 1 {
                self.parts[i + 1] as usize
            } else {
                self.points.len()
            };
            slices.push(&self.points[start..end]);
        }
        slices
    }

    /// The parts as closed rings: any part whose last vertex does not
    /// coincide with its first is closed by appending a copy of the first.
    pub fn rings(&self) -> Vec<Vec<Point2D>> {
        self.part_slices()
            .iter()
            .map(|part| {
                let mut ring = part.to_vec();
                if ring.len() > 1 && ring[0] != ring[ring.len() - 1] {
                    ring.push(ring[0]);
                }
                ring
            })
            .collect()
    }

    /// Decodes one record body. The caller has already consumed the 4-byte
    /// shape-type tag; `content_length` is the record's declared content
    /// length in bytes including that tag, and is what makes the optional
    /// trailing M block detectable.
    pub(crate) fn read_from<R: Read + Seek>(
        bor: &mut ByteOrderReader<R>,
        shape_type: ShapeType,
        content_length: usize,
        transform: Option<&dyn GeoCoordTransform>,
    ) -> Result<ShapefileGeometry> {
        match shape_type {
            ShapeType::Null => Ok(ShapefileGeometry::new(ShapeType::Null)),
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => {
                Self::read_point_family(bor, shape_type, content_length, transform)
            }
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
                Self::read_multipoint_family(bor, shape_type, content_length, transform)
            }
            ShapeType::PolyLine
            | ShapeType::Polygon
            | ShapeType::PolyLineZ
            | ShapeType::PolygonZ
            | ShapeType::PolyLineM
            | ShapeType::PolygonM => {
                Self::read_poly_family(bor, shape_type, content_length, transform)
            }
        }
    }

    fn read_point_family<R: Read + Seek>(
        bor: &mut ByteOrderReader<R>,
        shape_type: ShapeType,
        content_length: usize,
        transform: Option<&dyn GeoCoordTransform>,
    ) -> Result<ShapefileGeometry> {
        let mut sfg = ShapefileGeometry::new(shape_type);
        let p = read_point(bor, transform)?;
        sfg.add_point(p);
        match shape_type {
            ShapeType::PointM => {
                let m = bor.read_f64()?;
                sfg.m_min = m;
                sfg.m_max = m;
                sfg.m_array.push(m);
            }
            ShapeType::PointZ => {
                let z = bor.read_f64()?;
                sfg.z_min = z;
                sfg.z_max = z;
                sfg.z_array.push(z);
                // the measure is optional; 36 bytes means x, y, z and m
                if content_length == 36 {
                    let m = bor.read_f64()?;
                    sfg.m_min = m;
                    sfg.m_max = m;
                    sfg.m_array.push(m);
                }
            }
            _ => {}
        }
        Ok(sfg)
    }

    fn read_multipoint_family<R: Read + Seek>(
        bor: &mut ByteOrderReader<R>,
        shape_type: ShapeType,
        content_length: usize,
        transform: Option<&dyn GeoCoordTransform>,
    ) -> Result<ShapefileGeometry> {
        let mut sfg = ShapefileGeometry::new(shape_type);
        sfg.bbox = read_bbox(bor)?;
        let num_points = bor.read_i32()?;
        if num_points < 0 {
            return Err(ShapefileError::Format(format!(
                "negative point count {}",
                num_points
            )));
        }
        for _ in 0..num_points {
            let p = read_point(bor, transform)?;
            sfg.points.push(p);
        }
        sfg.num_points = num_points;
        if transform.is_some() {
            // the stored extent is in file coordinates
            sfg.bbox = BoundingBox::from_points(&sfg.points);
        }

        match shape_type {
            ShapeType::MultiPointM => {
                read_measure_block(bor, num_points, &mut sfg.m_min, &mut sfg.m_max, &mut sfg.m_array)?;
            }
            ShapeType::MultiPointZ => {
                let length_without_m = (40 + 16 * num_points + 16 + 8 * num_points) as usize;
                let contains_m = content_length != length_without_m;
                read_measure_block(bor, num_points, &mut sfg.z_min, &mut sfg.z_max, &mut sfg.z_array)?;
                if contains_m {
                    read_measure_block(bor, num_points, &mut sfg.m_min, &mut sfg.m_max, &mut sfg.m_array)?;
                }
            }
            _ => {}
        }
        Ok(sfg)
    }

    fn read_poly_family<R: Read + Seek>(
        bor: &mut ByteOrderReader<R>,
        shape_type: ShapeType,
        content_length: usize,
        transform: Option<&dyn GeoCoordTransform>,
    ) -> Result<ShapefileGeometry> {
        let mut sfg = ShapefileGeometry::new(shape_type);
        sfg.bbox = read_bbox(bor)?;
        let num_parts = bor.read_i32()?;
        let num_points = bor.read_i32()?;
        if num_parts < 0 || num_points < 0 {
            return Err(ShapefileError::Format(format!(
                "negative part ({}) or point ({}) count",
                num_parts, num_points
            )));
        }

        let mut prev = 0i32;
        for i in 0..num_parts {
            let offset = bor.read_i32()?;
            if offset < prev || offset > num_points {
                return Err(ShapefileError::Format(format!(
                    "part offset {} at slot {} is outside 0..={} or out of order",
                    offset, i, num_points
                )));
            }
            prev = offset;
            sfg.parts.push(offset);
        }
        sfg.num_parts = num_parts;

        for _ in 0..num_points {
            let p = read_point(bor, transform)?;
            sfg.points.push(p);
        }
        sfg.num_points = num_points;
        if transform.is_some() {
            // the stored extent is in file coordinates
            sfg.bbox = BoundingBox::from_points(&sfg.points);
        }

        match shape_type {
            ShapeType::PolyLineM | ShapeType::PolygonM => {
                read_measure_block(bor, num_points, &mut sfg.m_min, &mut sfg.m_max, &mut sfg.m_array)?;
            }
            ShapeType::PolyLineZ | ShapeType::PolygonZ => {
                let length_without_m =
                    (44 + 4 * num_parts + 16 * num_points + 16 + 8 * num_points) as usize;
                let contains_m = content_length != length_without_m;
                read_measure_block(bor, num_points, &mut sfg.z_min, &mut sfg.z_max, &mut sfg.z_array)?;
                if contains_m {
                    read_measure_block(bor, num_points, &mut sfg.m_min, &mut sfg.m_max, &mut sfg.m_array)?;
                }
            }
            _ => {}
        }
        Ok(sfg)
    }

    /// Writes the record content: the little-endian shape-type tag followed
    /// by the type-specific body. The big-endian record header is the
    /// caller's concern.
    pub(crate) fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(self.shape_type.to_int())?;
        match self.shape_type {
            ShapeType::Null => {}
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => {
                writer.write_f64::<LittleEndian>(self.points[0].x)?;
                writer.write_f64::<LittleEndian>(self.points[0].y)?;
                if self.shape_type == ShapeType::PointZ {
                    writer.write_f64::<LittleEndian>(self.z_array[0])?;
                }
                if self.shape_type == ShapeType::PointM
                    || (self.shape_type == ShapeType::PointZ && self.has_m_data())
                {
                    writer.write_f64::<LittleEndian>(self.m_array[0])?;
                }
            }
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
                self.write_bbox(writer)?;
                writer.write_i32::<LittleEndian>(self.num_points)?;
                for pt in &self.points {
                    writer.write_f64::<LittleEndian>(pt.x)?;
                    writer.write_f64::<LittleEndian>(pt.y)?;
                }
                self.write_trailing_blocks(writer)?;
            }
            ShapeType::PolyLine
            | ShapeType::Polygon
            | ShapeType::PolyLineZ
            | ShapeType::PolygonZ
            | ShapeType::PolyLineM
            | ShapeType::PolygonM => {
                self.write_bbox(writer)?;
                writer.write_i32::<LittleEndian>(self.num_parts)?;
                writer.write_i32::<LittleEndian>(self.num_points)?;
                for part in &self.parts {
                    writer.write_i32::<LittleEndian>(*part)?;
                }
                for pt in &self.points {
                    writer.write_f64::<LittleEndian>(pt.x)?;
                    writer.write_f64::<LittleEndian>(pt.y)?;
                }
                self.write_trailing_blocks(writer)?;
            }
        }
        Ok(())
    }

    fn write_bbox<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f64::<LittleEndian>(self.bbox.min_x)?;
        writer.write_f64::<LittleEndian>(self.bbox.min_y)?;
        writer.write_f64::<LittleEndian>(self.bbox.max_x)?;
        writer.write_f64::<LittleEndian>(self.bbox.max_y)?;
        Ok(())
    }

    fn write_trailing_blocks<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.shape_type.is_z() {
            writer.write_f64::<LittleEndian>(self.z_min)?;
            writer.write_f64::<LittleEndian>(self.z_max)?;
            for z in &self.z_array {
                writer.write_f64::<LittleEndian>(*z)?;
            }
        }
        if self.shape_type.is_m() || (self.shape_type.is_z() && self.has_m_data()) {
            writer.write_f64::<LittleEndian>(self.m_min)?;
            writer.write_f64::<LittleEndian>(self.m_max)?;
            for m in &self.m_array {
                writer.write_f64::<LittleEndian>(*m)?;
            }
        }
        Ok(())
    }
}

fn read_point<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
    transform: Option<&dyn GeoCoordTransform>,
) -> Result<Point2D> {
    let x = bor.read_f64()?;
    let y = bor.read_f64()?;
    Ok(match transform {
        Some(t) => {
            let (x, y) = t.inverse(x, y);
            Point2D::new(x, y)
        }
        None => Point2D::new(x, y),
    })
}

fn read_bbox<R: Read + Seek>(bor: &mut ByteOrderReader<R>) -> Result<BoundingBox> {
    let min_x = bor.read_f64()?;
    let min_y = bor.read_f64()?;
    let max_x = bor.read_f64()?;
    let max_y = bor.read_f64()?;
    Ok(BoundingBox::new(min_x, min_y, max_x, max_y))
}

/// Reads a (min, max, values[n]) block, the layout shared by the Z and M
/// sections of measured record types.
fn read_measure_block<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
    num_points: i32,
    min: &mut f64,
    max: &mut f64,
    values: &mut Vec<f64>,
) -> Result<()> {
    *min = bor.read_f64()?;
    *max = bor.read_f64()?;
    for _ in 0..num_points {
        values.push(bor.read_f64()?);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{ShapeType, ShapefileGeometry};
    use crate::shapefile::error::ShapefileError;
    use shapekit_common::structures::Point2D;
    use shapekit_common::utils::{ByteOrderReader, Endianness};
    use std::io::Cursor;

    fn roundtrip(sfg: &ShapefileGeometry) -> ShapefileGeometry {
        let mut buf = vec![];
        sfg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), sfg.get_length() as usize);
        let mut bor =
            ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        let tag = bor.read_i32().unwrap();
        let shape_type = ShapeType::from_int(tag).unwrap();
        ShapefileGeometry::read_from(&mut bor, shape_type, sfg.get_length() as usize, None)
            .unwrap()
    }

    #[test]
    fn test_shape_type_codes() {
        for code in [0, 1, 3, 5, 8, 11, 13, 15, 18, 21, 23, 25, 28] {
            assert_eq!(ShapeType::from_int(code).unwrap().to_int(), code);
        }
        assert!(matches!(
            ShapeType::from_int(2),
            Err(ShapefileError::UnsupportedShapeType(2))
        ));
        assert!(matches!(
            ShapeType::from_int(99),
            Err(ShapefileError::UnsupportedShapeType(99))
        ));
    }

    #[test]
    fn test_point_roundtrip() {
        let mut sfg = ShapefileGeometry::new(ShapeType::Point);
        sfg.add_point(Point2D::new(-63.1, 45.5));
        let back = roundtrip(&sfg);
        assert_eq!(back.points, sfg.points);
    }

    #[test]
    fn test_pointz_with_measure() {
        let mut sfg = ShapefileGeometry::new(ShapeType::PointZ);
        sfg.add_point_zm(Point2D::new(1.0, 2.0), 3.0, 4.0);
        assert_eq!(sfg.get_length(), 36);
        let back = roundtrip(&sfg);
        assert_eq!(back.z_array, vec![3.0]);
        assert_eq!(back.m_array, vec![4.0]);
    }

    #[test]
    fn test_pointz_without_measure() {
        let mut sfg = ShapefileGeometry::new(ShapeType::PointZ);
        sfg.add_point_z(Point2D::new(1.0, 2.0), 3.0);
        assert_eq!(sfg.get_length(), 28);
        let back = roundtrip(&sfg);
        assert_eq!(back.z_array, vec![3.0]);
        assert!(back.m_array.is_empty());
    }

    #[test]
    fn test_polylinez_measure_inferred_from_length() {
        // no m block: content length is the z-only layout size
        let mut sfg = ShapefileGeometry::new(ShapeType::PolyLineZ);
        sfg.add_part(&[
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 0.5),
        ]);
        sfg.z_min = 5.0;
        sfg.z_max = 7.0;
        sfg.z_array = vec![5.0, 6.0, 7.0];
        let back = roundtrip(&sfg);
        assert_eq!(back.z_array, vec![5.0, 6.0, 7.0]);
        assert!(!back.has_m_data());

        // with the m block the same record decodes both arrays
        sfg.m_min = 0.1;
        sfg.m_max = 0.3;
        sfg.m_array = vec![0.1, 0.2, 0.3];
        let back = roundtrip(&sfg);
        assert_eq!(back.z_array, vec![5.0, 6.0, 7.0]);
        assert_eq!(back.m_array, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_multipoint_roundtrip() {
        let mut sfg = ShapefileGeometry::new(ShapeType::MultiPoint);
        sfg.add_point(Point2D::new(10.0, 10.0));
        sfg.add_point(Point2D::new(20.0, 5.0));
        let back = roundtrip(&sfg);
        assert_eq!(back.num_points, 2);
        assert_eq!(back.points, sfg.points);
        assert_eq!(back.bbox, sfg.bbox);
    }

    #[test]
    fn test_polygon_parts_and_rings() {
        // three parts with offsets [0, 4, 9] over 12 points; the first two
        // are already closed, the third is open and must be force-closed
        let ring1 = [
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 0.0),
        ];
        let ring2 = [
            Point2D::new(2.0, 2.0),
            Point2D::new(4.0, 2.0),
            Point2D::new(4.0, 4.0),
            Point2D::new(2.0, 4.0),
            Point2D::new(2.0, 2.0),
        ];
        let ring3 = [
            Point2D::new(6.0, 6.0),
            Point2D::new(8.0, 6.0),
            Point2D::new(7.0, 8.0),
        ];
        let mut sfg = ShapefileGeometry::new(ShapeType::Polygon);
        sfg.add_part(&ring1);
        sfg.add_part(&ring2);
        sfg.add_part(&ring3);
        assert_eq!(sfg.parts, vec![0, 4, 9]);
        assert_eq!(sfg.num_points, 12);

        let back = roundtrip(&sfg);
        let rings = back.rings();
        assert_eq!(rings.len(), 3);
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[1].len(), 5);
        assert_eq!(rings[2].len(), 4);
        for ring in &rings {
            assert_eq!(ring[0], ring[ring.len() - 1]);
        }
    }

    #[test]
    fn test_bad_part_offsets_rejected() {
        let mut buf = vec![];
        let mut sfg = ShapefileGeometry::new(ShapeType::PolyLine);
        sfg.add_part(&[Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)]);
        sfg.parts[0] = 5; // beyond num_points
        sfg.write_to(&mut buf).unwrap();
        let mut bor =
            ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        bor.inc_pos(4).unwrap(); // past the tag
        let result = ShapefileGeometry::read_from(
            &mut bor,
            ShapeType::PolyLine,
            sfg.get_length() as usize,
            None,
        );
        assert!(matches!(result, Err(ShapefileError::Format(_))));
    }

    #[test]
    fn test_coordinate_transform_applied() {
        let mut sfg = ShapefileGeometry::new(ShapeType::Point);
        sfg.add_point(Point2D::new(500000.0, 4649776.0));
        let mut buf = vec![];
        sfg.write_to(&mut buf).unwrap();
        let mut bor =
            ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        bor.inc_pos(4).unwrap();
        let scale = |x: f64, y: f64| (x / 1000.0, y / 1000.0);
        let back = ShapefileGeometry::read_from(&mut bor, ShapeType::Point, 20, Some(&scale))
            .unwrap();
        assert_eq!(back.points[0], Point2D::new(500.0, 4649.776));
    }
}
