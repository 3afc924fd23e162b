/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 21/03/2024
Last Modified: 02/06/2025
License: MIT

Notes: The logic behind working with the ESRI Shapefile format.
*/

pub mod attributes;
pub mod error;
pub mod geometry;
pub mod index;

use self::attributes::*;
use self::error::{Result, ShapefileError};
use self::geometry::*;
use self::index::ShxRecord;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use log::warn;
use shapekit_common::spatial_ref_system::GeoCoordTransform;
use shapekit_common::structures::BoundingBox;
use shapekit_common::utils::{ByteOrderReader, Endianness};
use std::fmt;
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter, Cursor, Error, ErrorKind};
use std::path::Path;

const FILE_CODE: i32 = 9994;
const VERSION: i32 = 1000;
const HEADER_LENGTH: usize = 100;

/// The fixed 100-byte header shared by the .shp and .shx files.
///
/// Note: the format uses mixed endianness — the file code and length are
/// big-endian, everything from the version onward is little-endian.
#[derive(Debug, Default, Clone)]
pub struct ShapefileHeader {
    pub file_code: i32,        // BigEndian; value is 9994
    pub file_length: i32,      // BigEndian; in 16-bit words
    pub version: i32,          // LittleEndian
    pub shape_type: ShapeType, // LittleEndian
    pub x_min: f64,            // LittleEndian
    pub y_min: f64,            // LittleEndian
    pub x_max: f64,            // LittleEndian
    pub y_max: f64,            // LittleEndian
    pub z_min: f64,            // LittleEndian; 0f64 unless a Z type
    pub z_max: f64,            // LittleEndian; 0f64 unless a Z type
    pub m_min: f64,            // LittleEndian; 0f64 unless a Z or M type
    pub m_max: f64,            // LittleEndian; 0f64 unless a Z or M type
}

impl ShapefileHeader {
    /// The declared file length in byte units.
    pub fn file_length_bytes(&self) -> usize {
        self.file_length as usize * 2
    }

    pub(crate) fn read_from<R: Read + Seek>(
        bor: &mut ByteOrderReader<R>,
    ) -> Result<ShapefileHeader> {
        let mut header = ShapefileHeader::default();
        bor.seek(0)?;
        bor.set_byte_order(Endianness::BigEndian);
        header.file_code = bor.read_i32()?;
        if header.file_code != FILE_CODE {
            return Err(ShapefileError::Format(format!(
                "wrong file code: found {}, expected {}",
                header.file_code, FILE_CODE
            )));
        }
        bor.seek(24)?;
        header.file_length = bor.read_i32()?;

        // the rest of the header is in LittleEndian format
        bor.set_byte_order(Endianness::LittleEndian);
        header.version = bor.read_i32()?;
        if header.version != VERSION {
            warn!(
                "unexpected shapefile version {} (expected {})",
                header.version, VERSION
            );
        }
        header.shape_type = ShapeType::from_int(bor.read_i32()?)?;

        header.x_min = bor.read_f64()?;
        header.y_min = bor.read_f64()?;
        header.x_max = bor.read_f64()?;
        header.y_max = bor.read_f64()?;
        header.z_min = bor.read_f64()?;
        header.z_max = bor.read_f64()?;
        header.m_min = bor.read_f64()?;
        header.m_max = bor.read_f64()?;
        Ok(header)
    }

    pub(crate) fn write_to<W: Write>(&self, writer: &mut W, file_length: i32) -> Result<()> {
        writer.write_i32::<BigEndian>(FILE_CODE)?;
        // unused header bytes
        for _ in 0..5 {
            writer.write_i32::<BigEndian>(0i32)?;
        }
        writer.write_i32::<BigEndian>(file_length)?;
        writer.write_i32::<LittleEndian>(VERSION)?;
        writer.write_i32::<LittleEndian>(self.shape_type.to_int())?;
        writer.write_f64::<LittleEndian>(self.x_min)?;
        writer.write_f64::<LittleEndian>(self.y_min)?;
        writer.write_f64::<LittleEndian>(self.x_max)?;
        writer.write_f64::<LittleEndian>(self.y_max)?;
        writer.write_f64::<LittleEndian>(self.z_min)?;
        writer.write_f64::<LittleEndian>(self.z_max)?;
        writer.write_f64::<LittleEndian>(self.m_min)?;
        writer.write_f64::<LittleEndian>(self.m_max)?;
        Ok(())
    }
}

impl fmt::Display for ShapefileHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = format!(
            "file_code: {}
file_length: {}
version: {}
shape_type: {}
x_min: {}
x_max: {}
y_min: {}
y_max: {}
z_min: {}
z_max: {}
m_min: {}
m_max: {}",
            self.file_code,
            self.file_length,
            self.version,
            self.shape_type,
            self.x_min,
            self.x_max,
            self.y_min,
            self.y_max,
            self.z_min,
            self.z_max,
            self.m_min,
            self.m_max
        );
        write!(f, "{}", s)
    }
}

/// Per-call read configuration. Masked and unmasked reads are independent:
/// an options value never mutates the file's schema or any reader state.
#[derive(Clone, Copy, Default)]
pub struct ReadOptions<'a> {
    /// Which attribute columns to decode; `None` keeps them all. Must have
    /// one entry per column of the full schema.
    pub column_mask: Option<&'a [bool]>,
    /// Applied to every (x, y) pair as it is decoded.
    pub transform: Option<&'a dyn GeoCoordTransform>,
    /// Diagnostic mode: keep reading past the header's declared file
    /// length, to the physical end of file, to expose a corrupt length
    /// field.
    pub ignore_declared_length: bool,
}

/// `Shapefile` is an in-memory ESRI Shapefile: the geometry records of the
/// .shp file, the offset index of the .shx file and the attribute table of
/// the .dbf file, positionally aligned by 0-based record index.
///
/// Examples:
///
/// ```ignore
/// // Read a Shapefile from a file.
/// let input = Shapefile::read(&input_file)?;
///
/// // Create a new output Shapefile
/// let mut output = Shapefile::initialize_using_file(&output_file, &input, ShapeType::PolyLine, true)?;
///
/// // add attributes
/// let fid = AttributeField::new("FID", FieldDataType::Numeric, 8u8, 0u8);
/// let val = AttributeField::new("Value", FieldDataType::Numeric, 12u8, 4u8);
/// output.attributes.add_field(&fid);
/// output.attributes.add_field(&val);
/// ```
#[derive(Default, Clone)]
pub struct Shapefile {
    pub file_name: String,
    pub file_mode: String,
    pub header: ShapefileHeader,
    pub num_records: usize,
    pub records: Vec<ShapefileGeometry>,
    pub attributes: ShapefileAttributes,
    pub projection: String,
}

impl Shapefile {
    pub fn read(file_name: &str) -> Result<Shapefile> {
        Shapefile::read_with_options(file_name, &ReadOptions::default())
    }

    pub fn read_with_options(file_name: &str, options: &ReadOptions) -> Result<Shapefile> {
        let mut sf = Shapefile {
            file_name: file_name.to_string(),
            file_mode: "r".to_string(),
            ..Default::default()
        };
        sf.read_file(options)?;
        Ok(sf)
    }

    pub fn new(file_name: &str, shape_type: ShapeType) -> Result<Shapefile> {
        let new_file_name = if file_name.contains('.') {
            file_name.to_string()
        } else {
            // likely no extension provided; default to .shp
            format!("{}.shp", file_name)
        };
        let mut sf = Shapefile {
            file_name: new_file_name,
            file_mode: "w".to_string(),
            ..Default::default()
        };
        sf.header.shape_type = shape_type;
        Ok(sf)
    }

    /// Creates an empty output Shapefile that borrows its projection, and
    /// optionally its attribute schema, from an existing one.
    pub fn initialize_using_file(
        file_name: &str,
        other: &Shapefile,
        shape_type: ShapeType,
        copy_fields: bool,
    ) -> Result<Shapefile> {
        let mut sf = Shapefile::new(file_name, shape_type)?;
        sf.projection = other.projection.clone();
        if copy_fields {
            sf.attributes.fields = other.attributes.fields.clone();
            sf.attributes.header.num_fields = sf.attributes.fields.len() as u32;
        }
        Ok(sf)
    }

    pub fn get_total_num_parts(&self) -> usize {
        self.records.iter().map(|r| r.num_parts as usize).sum()
    }

    pub fn get_total_num_points(&self) -> usize {
        self.records.iter().map(|r| r.num_points as usize).sum()
    }

    /// Returns the ShapefileGeometry for a specified index, starting at zero.
    pub fn get_record(&self, index: usize) -> &ShapefileGeometry {
        &self.records[index]
    }

    /// Adds a new ShapefileGeometry. Null records may be interspersed with
    /// records of the file's shape type; anything else is rejected.
    pub fn add_record(&mut self, geometry: ShapefileGeometry) -> Result<()> {
        if self.file_mode == "r" {
            return Err(ShapefileError::Io(Error::new(
                ErrorKind::Other,
                "The file was opened in read-only mode.",
            )));
        }
        if geometry.shape_type != self.header.shape_type && geometry.shape_type != ShapeType::Null
        {
            return Err(ShapefileError::Format(format!(
                "cannot add a {} record to a {} file",
                geometry.shape_type, self.header.shape_type
            )));
        }
        self.records.push(geometry);
        self.num_records += 1;
        Ok(())
    }

    fn read_file(&mut self, options: &ReadOptions) -> Result<()> {
        // read the geometry file into memory
        let buffer = fs::read(&self.file_name)?;
        let mut bor = ByteOrderReader::new(Cursor::new(buffer), Endianness::BigEndian)?;
        self.header = ShapefileHeader::read_from(&mut bor)?;

        if self.header.file_length_bytes() != bor.len() {
            warn!(
                "{} declares {} bytes but holds {}",
                self.file_name,
                self.header.file_length_bytes(),
                bor.len()
            );
        }

        // the index file gives direct access to each record; without it,
        // the record headers are scanned to build the same table
        let shx_file = Path::new(&self.file_name).with_extension("shx");
        let shx_records = match fs::read(&shx_file) {
            Ok(buf) => {
                let mut shx_bor =
                    ByteOrderReader::new(Cursor::new(buf), Endianness::BigEndian)?;
                match index::read_shx(&mut shx_bor) {
                    Ok((_, records)) => Some(records),
                    Err(e) => {
                        warn!("unreadable index file {}: {}", shx_file.display(), e);
                        None
                    }
                }
            }
            Err(_) => {
                warn!("index file not located; scanning record headers instead");
                None
            }
        };
        let offsets = match shx_records {
            Some(records) => records,
            None => scan_record_offsets(&mut bor, &self.header, options)?,
        };

        self.records = read_geometries(&mut bor, &offsets, options);
        self.num_records = self.records.len();

        self.read_projection_file();
        self.read_attributes_file(options);

        Ok(())
    }

    fn read_projection_file(&mut self) {
        let prj_file = Path::new(&self.file_name).with_extension("prj");
        match fs::read_to_string(&prj_file) {
            Ok(contents) => self.projection = contents,
            Err(_) => warn!("projection file not located"),
        }
    }

    /// Reads the sibling .dbf. A missing table, a mismatched row count or a
    /// structural error leaves the attribute table empty rather than
    /// failing the whole read.
    fn read_attributes_file(&mut self, options: &ReadOptions) {
        let dbf_file = Path::new(&self.file_name).with_extension("dbf");
        let buffer = match fs::read(&dbf_file) {
            Ok(buf) => buf,
            Err(_) => {
                warn!("attribute file not located");
                return;
            }
        };
        let result = (|| -> Result<ShapefileAttributes> {
            let mut bor = ByteOrderReader::new(Cursor::new(buffer), Endianness::LittleEndian)?;
            let (header, fields) = read_dbf_header(&mut bor)?;
            if header.num_records as usize != self.num_records {
                return Err(ShapefileError::SchemaMismatch {
                    geometries: self.num_records,
                    rows: header.num_records as usize,
                });
            }
            let (records, deleted_flags) = read_dbf_range(
                &mut bor,
                &header,
                &fields,
                0,
                header.num_records as usize,
                options.column_mask,
            )?;

            let mut attributes = ShapefileAttributes::default();
            attributes.header = header;
            attributes.header.num_records = 0;
            attributes.fields = match options.column_mask {
                Some(mask) => mask_fields(&fields, mask)?,
                None => fields,
            };
            attributes.header.num_fields = attributes.fields.len() as u32;
            attributes.header.bytes_in_record = 1 + attributes
                .fields
                .iter()
                .map(|f| f.field_length as u16)
                .sum::<u16>();
            for (record, deleted) in records.into_iter().zip(deleted_flags) {
                attributes.add_record(record, deleted)?;
            }
            Ok(attributes)
        })();
        match result {
            Ok(attributes) => self.attributes = attributes,
            Err(e) => warn!("attribute table unavailable: {}", e),
        }
    }

    pub fn write(&mut self) -> Result<()> {
        if self.file_mode == "r" {
            return Err(ShapefileError::Io(Error::new(
                ErrorKind::Other,
                "The file was opened in read-only mode.",
            )));
        }

        self.num_records = self.records.len(); // make sure they are the same
        if self.num_records == 0 {
            return Err(ShapefileError::Io(Error::new(
                ErrorKind::Other,
                "The file does not currently contain any record data.",
            )));
        }
        if self.attributes.num_records() != 0 && self.attributes.num_records() != self.num_records
        {
            warn!(
                "{}",
                ShapefileError::SchemaMismatch {
                    geometries: self.num_records,
                    rows: self.attributes.num_records(),
                }
            );
        }

        self.calculate_extent();

        let f = File::create(&self.file_name)?;
        let mut writer = BufWriter::new(f);
        self.write_shp_to(&mut writer)?;

        let index_file = Path::new(&self.file_name).with_extension("shx");
        let f = File::create(&index_file)?;
        let mut writer = BufWriter::new(f);
        index::write_shx(&mut writer, &self.header, &self.records)?;

        if !self.projection.is_empty() {
            let prj_file = Path::new(&self.file_name).with_extension("prj");
            let f = File::create(&prj_file)?;
            let mut writer = BufWriter::new(f);
            writer.write_all(self.projection.as_bytes())?;
        }

        let dbf_file = Path::new(&self.file_name).with_extension("dbf");
        let f = File::create(&dbf_file)?;
        let mut writer = BufWriter::new(f);
        write_dbf(&mut writer, &self.attributes)?;

        Ok(())
    }

    fn write_shp_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut size = 100i32; // initialized to the size of the file header
        for record in &self.records {
            size += 8 + record.get_length();
        }
        self.header.write_to(writer, size / 2)?;

        for (i, record) in self.records.iter().enumerate() {
            writer.write_i32::<BigEndian>(i as i32 + 1)?; // record number
            writer.write_i32::<BigEndian>(record.get_length() / 2)?; // content length in 16-bit words
            record.write_to(writer)?;
        }
        Ok(())
    }

    fn calculate_extent(&mut self) {
        let mut bbox = BoundingBox::default();
        let mut z_min = f64::INFINITY;
        let mut z_max = f64::NEG_INFINITY;
        let mut m_min = f64::INFINITY;
        let mut m_max = f64::NEG_INFINITY;
        for sg in &self.records {
            if sg.shape_type == ShapeType::Null {
                continue;
            }
            bbox.expand_to(sg.bbox);
            if !sg.z_array.is_empty() {
                z_min = z_min.min(sg.z_min);
                z_max = z_max.max(sg.z_max);
            }
            if !sg.m_array.is_empty() {
                m_min = m_min.min(sg.m_min);
                m_max = m_max.max(sg.m_max);
            }
        }

        if bbox.initialized() {
            self.header.x_min = bbox.min_x;
            self.header.y_min = bbox.min_y;
            self.header.x_max = bbox.max_x;
            self.header.y_max = bbox.max_y;
        } else {
            self.header.x_min = 0f64;
            self.header.y_min = 0f64;
            self.header.x_max = 0f64;
            self.header.y_max = 0f64;
        }
        if self.header.shape_type.is_z() && z_min <= z_max {
            self.header.z_min = z_min;
            self.header.z_max = z_max;
        } else {
            self.header.z_min = 0f64;
            self.header.z_max = 0f64;
        }
        if (self.header.shape_type.is_z() || self.header.shape_type.is_m()) && m_min <= m_max {
            self.header.m_min = m_min;
            self.header.m_max = m_max;
        } else {
            self.header.m_min = 0f64;
            self.header.m_max = 0f64;
        }
    }
}

/// Reads one record at a byte offset: the big-endian record header, the
/// little-endian body, and a check that the body consumed exactly the
/// declared content length.
fn read_record_at<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
    offset: usize,
    options: &ReadOptions,
) -> Result<ShapefileGeometry> {
    bor.seek(offset)?;
    bor.set_byte_order(Endianness::BigEndian);
    bor.inc_pos(4)?; // the record number; records are re-indexed from zero
    let content_length = bor.read_i32()? as usize * 2; // in bytes

    bor.set_byte_order(Endianness::LittleEndian);
    let start = bor.pos();
    let shape_type = ShapeType::from_int(bor.read_i32()?)?;
    let geometry =
        ShapefileGeometry::read_from(bor, shape_type, content_length, options.transform)?;
    let consumed = bor.pos() - start;
    if consumed != content_length {
        return Err(ShapefileError::Format(format!(
            "record consumed {} bytes of a declared {}",
            consumed, content_length
        )));
    }
    Ok(geometry)
}

/// Builds the (offset, content length) table by scanning record headers,
/// for files with no usable .shx. Stops cleanly at a truncated tail.
fn scan_record_offsets<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
    header: &ShapefileHeader,
    options: &ReadOptions,
) -> Result<Vec<ShxRecord>> {
    let end = if options.ignore_declared_length {
        bor.len()
    } else {
        header.file_length_bytes().min(bor.len())
    };

    let mut records = vec![];
    bor.seek(HEADER_LENGTH)?;
    bor.set_byte_order(Endianness::BigEndian);
    while bor.pos() + 8 <= end {
        let offset = bor.pos();
        bor.inc_pos(4)?;
        let content_length = bor.read_i32()? as usize * 2;
        if bor.pos() + content_length > bor.len() {
            warn!(
                "file ends mid-record; indexed {} whole records",
                records.len()
            );
            break;
        }
        records.push(ShxRecord {
            offset,
            content_length,
        });
        bor.inc_pos(content_length)?;
    }
    Ok(records)
}

/// Decodes geometries for every indexed record, preferring partial results
/// over total failure: the first structurally bad or truncated record stops
/// the loop, keeping everything decoded before it.
fn read_geometries<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
    offsets: &[ShxRecord],
    options: &ReadOptions,
) -> Vec<ShapefileGeometry> {
    let mut records = vec![];
    for shx_record in offsets {
        match read_record_at(bor, shx_record.offset, options) {
            Ok(geometry) => records.push(geometry),
            Err(ShapefileError::Io(ref e)) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!(
                    "file ends mid-record; keeping the {} records already decoded",
                    records.len()
                );
                break;
            }
            Err(e) => {
                warn!(
                    "stopping at record {} ({}); keeping prior records",
                    records.len(),
                    e
                );
                break;
            }
        }
    }
    records
}

/// A random-access handle over the three sibling files, for reading
/// individual records without materializing the whole file. Seeks are
/// served by the .shx offset table, or by a one-time scan of the record
/// headers when no index file exists. Dropping the reader releases both
/// file handles; a handle must not be shared across threads — open one
/// per thread instead.
pub struct ShapefileReader {
    shp: ByteOrderReader<BufReader<File>>,
    header: ShapefileHeader,
    index: Vec<ShxRecord>,
    dbf: Option<DbfHandle>,
}

struct DbfHandle {
    bor: ByteOrderReader<BufReader<File>>,
    header: AttributeHeader,
    fields: Vec<AttributeField>,
}

impl ShapefileReader {
    pub fn open(file_name: &str) -> Result<ShapefileReader> {
        let f = File::open(file_name)?;
        let mut shp = ByteOrderReader::new(BufReader::new(f), Endianness::BigEndian)?;
        let header = ShapefileHeader::read_from(&mut shp)?;

        let shx_file = Path::new(file_name).with_extension("shx");
        let index = match File::open(&shx_file) {
            Ok(f) => {
                let mut shx_bor =
                    ByteOrderReader::new(BufReader::new(f), Endianness::BigEndian)?;
                match index::read_shx(&mut shx_bor) {
                    Ok((_, records)) => records,
                    Err(e) => {
                        warn!("unreadable index file {}: {}", shx_file.display(), e);
                        scan_record_offsets(&mut shp, &header, &ReadOptions::default())?
                    }
                }
            }
            Err(_) => scan_record_offsets(&mut shp, &header, &ReadOptions::default())?,
        };

        let dbf_file = Path::new(file_name).with_extension("dbf");
        let dbf = match File::open(&dbf_file) {
            Ok(f) => {
                let result = (|| -> Result<DbfHandle> {
                    let mut bor =
                        ByteOrderReader::new(BufReader::new(f), Endianness::LittleEndian)?;
                    let (header, fields) = read_dbf_header(&mut bor)?;
                    Ok(DbfHandle {
                        bor,
                        header,
                        fields,
                    })
                })();
                match result {
                    Ok(handle) => {
                        if handle.header.num_records as usize != index.len() {
                            warn!(
                                "{}",
                                ShapefileError::SchemaMismatch {
                                    geometries: index.len(),
                                    rows: handle.header.num_records as usize,
                                }
                            );
                            None
                        } else {
                            Some(handle)
                        }
                    }
                    Err(e) => {
                        warn!("attribute table unavailable: {}", e);
                        None
                    }
                }
            }
            Err(_) => None,
        };

        Ok(ShapefileReader {
            shp,
            header,
            index,
            dbf,
        })
    }

    pub fn header(&self) -> &ShapefileHeader {
        &self.header
    }

    pub fn num_records(&self) -> usize {
        self.index.len()
    }

    /// Reads the geometry at `index`, 0-based.
    pub fn read_record(&mut self, index: usize) -> Result<ShapefileGeometry> {
        self.read_record_with(index, &ReadOptions::default())
    }

    pub fn read_record_with(
        &mut self,
        index: usize,
        options: &ReadOptions,
    ) -> Result<ShapefileGeometry> {
        let shx_record = self.index.get(index).ok_or_else(|| {
            ShapefileError::Format(format!(
                "record index {} is out of range for a {}-record file",
                index,
                self.index.len()
            ))
        })?;
        read_record_at(&mut self.shp, shx_record.offset, options)
    }

    /// The attribute schema, empty when no usable .dbf accompanies the file.
    pub fn attribute_fields(&self) -> &[AttributeField] {
        match &self.dbf {
            Some(handle) => &handle.fields,
            None => &[],
        }
    }

    pub fn read_attribute_row(
        &mut self,
        index: usize,
        options: &ReadOptions,
    ) -> Result<Vec<FieldData>> {
        let handle = self.dbf.as_mut().ok_or_else(|| {
            ShapefileError::Format("no attribute table is available".to_string())
        })?;
        let (record, _) = read_dbf_record(
            &mut handle.bor,
            &handle.header,
            &handle.fields,
            index,
            options.column_mask,
        )?;
        Ok(record)
    }

    pub fn read_attribute_range(
        &mut self,
        start: usize,
        count: usize,
        options: &ReadOptions,
    ) -> Result<Vec<Vec<FieldData>>> {
        let handle = self.dbf.as_mut().ok_or_else(|| {
            ShapefileError::Format("no attribute table is available".to_string())
        })?;
        let (records, _) = read_dbf_range(
            &mut handle.bor,
            &handle.header,
            &handle.fields,
            start,
            count,
            options.column_mask,
        )?;
        Ok(records)
    }
}

/// Writes a mixed collection of geometries as one shapefile per concrete
/// shape type, since a single file can only hold one. The first type keeps
/// the given file name; the others get a type suffix. Null geometries join
/// the first partition. Attribute rows follow their geometry into its
/// partition when the table's row count matches; otherwise each partition
/// gets a default single-column FID schema.
pub fn write_partitioned(
    records: &[ShapefileGeometry],
    attributes: Option<&ShapefileAttributes>,
    file_name: &str,
) -> Result<Vec<String>> {
    if records.is_empty() {
        return Err(ShapefileError::Io(Error::new(
            ErrorKind::Other,
            "The file does not currently contain any record data.",
        )));
    }

    let mut groups: Vec<(ShapeType, Vec<usize>)> = vec![];
    let mut nulls = vec![];
    for (i, record) in records.iter().enumerate() {
        if record.shape_type == ShapeType::Null {
            nulls.push(i);
        } else if let Some(group) = groups.iter_mut().find(|(t, _)| *t == record.shape_type) {
            group.1.push(i);
        } else {
            groups.push((record.shape_type, vec![i]));
        }
    }
    if groups.is_empty() {
        groups.push((ShapeType::Null, vec![]));
    }
    groups[0].1.extend(nulls);
    groups[0].1.sort_unstable();

    let rows_usable = attributes.map_or(false, |a| a.num_records() == records.len());
    if attributes.is_some() && !rows_usable {
        warn!("attribute row count does not match the geometry count; writing FID columns");
    }

    let parent = Path::new(file_name)
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .to_path_buf();
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("partition")
        .to_string();

    let mut paths = vec![];
    for (k, (shape_type, indices)) in groups.iter().enumerate() {
        let path = if k == 0 {
            file_name.to_string()
        } else {
            parent
                .join(format!(
                    "{}_{}.shp",
                    stem,
                    shape_type.to_string().to_lowercase()
                ))
                .to_string_lossy()
                .to_string()
        };

        let mut sf = Shapefile::new(&path, *shape_type)?;
        match attributes {
            Some(table) if rows_usable => {
                sf.attributes.fields = table.fields.clone();
                sf.attributes.header.num_fields = table.fields.len() as u32;
                for &i in indices {
                    sf.attributes
                        .add_record(table.get_record(i).to_vec(), table.is_deleted[i])?;
                }
            }
            _ => {
                sf.attributes
                    .add_field(&AttributeField::new("FID", FieldDataType::Numeric, 8, 0));
                for (fid, _) in indices.iter().enumerate() {
                    sf.attributes
                        .add_record(vec![FieldData::Int(fid as i32 + 1)], false)?;
                }
            }
        }
        for &i in indices {
            sf.add_record(records[i].clone())?;
        }
        sf.write()?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod test {
    use super::*;
    use shapekit_common::structures::Point2D;

    fn point_record(x: f64, y: f64) -> ShapefileGeometry {
        let mut sfg = ShapefileGeometry::new(ShapeType::Point);
        sfg.add_point(Point2D::new(x, y));
        sfg
    }

    fn shp_bytes(records: &[ShapefileGeometry], shape_type: ShapeType) -> Vec<u8> {
        let mut sf = Shapefile::new("unused.shp", shape_type).unwrap();
        for record in records {
            sf.add_record(record.clone()).unwrap();
        }
        sf.num_records = sf.records.len();
        sf.calculate_extent();
        let mut buf = vec![];
        sf.write_shp_to(&mut buf).unwrap();
        buf
    }

    fn reader_over(buf: Vec<u8>) -> ByteOrderReader<Cursor<Vec<u8>>> {
        ByteOrderReader::new(Cursor::new(buf), Endianness::BigEndian).unwrap()
    }

    #[test]
    fn test_header_roundtrip() {
        let buf = shp_bytes(&[point_record(-63.0, 45.0), point_record(10.0, 20.0)], ShapeType::Point);
        let mut bor = reader_over(buf);
        let header = ShapefileHeader::read_from(&mut bor).unwrap();
        assert_eq!(header.file_code, 9994);
        assert_eq!(header.version, 1000);
        assert_eq!(header.shape_type, ShapeType::Point);
        assert_eq!(header.file_length_bytes(), 100 + 2 * (8 + 20));
        assert_eq!(header.x_min, -63.0);
        assert_eq!(header.x_max, 10.0);
        assert_eq!(header.y_min, 20.0);
        assert_eq!(header.y_max, 45.0);
    }

    #[test]
    fn test_sequential_scan_and_decode() {
        let buf = shp_bytes(
            &[point_record(1.0, 2.0), point_record(3.0, 4.0)],
            ShapeType::Point,
        );
        let mut bor = reader_over(buf);
        let header = ShapefileHeader::read_from(&mut bor).unwrap();
        let offsets = scan_record_offsets(&mut bor, &header, &ReadOptions::default()).unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0].offset, 100);
        assert_eq!(offsets[1].offset, 100 + 8 + 20);

        let records = read_geometries(&mut bor, &offsets, &ReadOptions::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].points[0], Point2D::new(3.0, 4.0));
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let mut buf = vec![];
        let header = ShapefileHeader {
            shape_type: ShapeType::Polygon,
            ..Default::default()
        };
        header.write_to(&mut buf, 50).unwrap(); // 100 bytes, no records
        let mut bor = reader_over(buf);
        let header = ShapefileHeader::read_from(&mut bor).unwrap();
        assert_eq!(header.file_length_bytes(), 100);
        let offsets = scan_record_offsets(&mut bor, &header, &ReadOptions::default()).unwrap();
        assert!(offsets.is_empty());
    }

    #[test]
    fn test_record_byte_budget_enforced() {
        let mut buf = shp_bytes(&[point_record(1.0, 2.0)], ShapeType::Point);
        // inflate the record's declared content length by one word
        let declared = i32::from_be_bytes([buf[104], buf[105], buf[106], buf[107]]);
        buf[104..108].copy_from_slice(&(declared + 1).to_be_bytes());
        // pad so the inflated record fits inside the file
        buf.extend_from_slice(&[0u8; 2]);
        let mut bor = reader_over(buf);
        let result = read_record_at(&mut bor, 100, &ReadOptions::default());
        assert!(matches!(result, Err(ShapefileError::Format(_))));
    }

    #[test]
    fn test_truncated_file_keeps_prior_records() {
        let mut buf = shp_bytes(
            &[point_record(1.0, 2.0), point_record(3.0, 4.0)],
            ShapeType::Point,
        );
        buf.truncate(buf.len() - 10); // lose the tail of the second record
        let mut bor = reader_over(buf);
        let header = ShapefileHeader::read_from(&mut bor).unwrap();
        let offsets = scan_record_offsets(&mut bor, &header, &ReadOptions::default()).unwrap();
        assert_eq!(offsets.len(), 1);
        let records = read_geometries(&mut bor, &offsets, &ReadOptions::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].points[0], Point2D::new(1.0, 2.0));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = vec![];
        ShapefileHeader::default().write_to(&mut buf, 50).unwrap();
        buf[0] = 0; // corrupt the file code
        let mut bor = reader_over(buf);
        assert!(matches!(
            ShapefileHeader::read_from(&mut bor),
            Err(ShapefileError::Format(_))
        ));
    }

    #[test]
    fn test_null_records_interspersed() {
        let records = vec![
            point_record(1.0, 2.0),
            ShapefileGeometry::new(ShapeType::Null),
            point_record(3.0, 4.0),
        ];
        let buf = shp_bytes(&records, ShapeType::Point);
        let mut bor = reader_over(buf);
        let header = ShapefileHeader::read_from(&mut bor).unwrap();
        let offsets = scan_record_offsets(&mut bor, &header, &ReadOptions::default()).unwrap();
        let decoded = read_geometries(&mut bor, &offsets, &ReadOptions::default());
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[1].shape_type, ShapeType::Null);
        assert_eq!(decoded[2].points[0], Point2D::new(3.0, 4.0));
    }

    #[test]
    fn test_add_record_type_checked() {
        let mut sf = Shapefile::new("unused.shp", ShapeType::Point).unwrap();
        assert!(sf.add_record(point_record(0.0, 0.0)).is_ok());
        assert!(sf.add_record(ShapefileGeometry::new(ShapeType::Null)).is_ok());
        let mut line = ShapefileGeometry::new(ShapeType::PolyLine);
        line.add_part(&[Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)]);
        assert!(matches!(
            sf.add_record(line),
            Err(ShapefileError::Format(_))
        ));
    }
}
