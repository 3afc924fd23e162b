/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 21/03/2024
Last Modified: 02/06/2025
License: MIT
*/

use super::error::{Result, ShapefileError};
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::prelude::*;
use log::warn;
use shapekit_common::utils::ByteOrderReader;
use std::fmt;
use std::io::{Read, Seek, Write};

/// The dBASE table header that precedes the field descriptors.
#[derive(Debug, Default, Clone)]
pub struct AttributeHeader {
    pub version: u8,
    pub year: u32,
    pub month: u8,
    pub day: u8,
    pub num_records: u32,
    pub num_fields: u32, // derived from bytes_in_header
    pub bytes_in_header: u16,
    pub bytes_in_record: u16,
    pub incomplete_transaction: u8,
    pub encryption_flag: u8,
    pub mdx_flag: u8,
    pub language_driver_id: u8,
}

/// The closed set of dBASE field type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDataType {
    Character,
    Numeric,
    Date,
    Logical,
    Memo,
    Float,
    Double,
    Long,
    AutoIncrement,
    Binary,
    Ole,
    Timestamp,
}

impl FieldDataType {
    pub fn from_char(c: char) -> Result<FieldDataType> {
        match c {
            'C' => Ok(FieldDataType::Character),
            'N' => Ok(FieldDataType::Numeric),
            'D' => Ok(FieldDataType::Date),
            'L' => Ok(FieldDataType::Logical),
            'M' => Ok(FieldDataType::Memo),
            'F' => Ok(FieldDataType::Float),
            'O' => Ok(FieldDataType::Double),
            'I' => Ok(FieldDataType::Long),
            '+' => Ok(FieldDataType::AutoIncrement),
            'B' => Ok(FieldDataType::Binary),
            'G' => Ok(FieldDataType::Ole),
            '@' => Ok(FieldDataType::Timestamp),
            _ => Err(ShapefileError::Format(format!(
                "unknown field type code '{}'",
                c
            ))),
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            FieldDataType::Character => 'C',
            FieldDataType::Numeric => 'N',
            FieldDataType::Date => 'D',
            FieldDataType::Logical => 'L',
            FieldDataType::Memo => 'M',
            FieldDataType::Float => 'F',
            FieldDataType::Double => 'O',
            FieldDataType::Long => 'I',
            FieldDataType::AutoIncrement => '+',
            FieldDataType::Binary => 'B',
            FieldDataType::Ole => 'G',
            FieldDataType::Timestamp => '@',
        }
    }
}

/// One column of the attribute table.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeField {
    pub name: String,
    pub field_type: FieldDataType,
    pub field_length: u8,
    pub decimal_count: u8,
}

impl AttributeField {
    pub fn new(name: &str, field_type: FieldDataType, field_length: u8, decimal_count: u8) -> AttributeField {
        AttributeField {
            name: name.to_string(),
            field_type,
            field_length,
            decimal_count,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateData {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for DateData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // the dBASE on-disk form, YYYYMMDD
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// A decoded attribute cell. `Null` is a blank cell — for numeric columns
/// this is dBASE's "no data" convention and must stay distinguishable from
/// a literal zero.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Null,
    Int(i32),
    Real(f64),
    Text(String),
    Date(DateData),
    Bool(bool),
}

impl fmt::Display for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldData::Null => write!(f, "null"),
            FieldData::Int(v) => write!(f, "{}", v),
            FieldData::Real(v) => write!(f, "{}", v),
            FieldData::Text(v) => write!(f, "{}", v),
            FieldData::Date(v) => write!(f, "{}", v),
            FieldData::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// An in-memory attribute table: the schema as a single ordered list of
/// field descriptors, plus row-major records aligned by index with the
/// geometry records of the owning Shapefile.
#[derive(Default, Clone, Debug)]
pub struct ShapefileAttributes {
    pub header: AttributeHeader,
    pub fields: Vec<AttributeField>,
    data: Vec<Vec<FieldData>>,
    pub is_deleted: Vec<bool>,
}

impl ShapefileAttributes {
    pub fn get_fields(&self) -> &[AttributeField] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Appends a field to the schema, adding a blank cell to every record.
    pub fn add_field(&mut self, field: &AttributeField) {
        self.fields.push(field.clone());
        self.header.num_fields += 1;
        for record in &mut self.data {
            record.push(FieldData::Null);
        }
    }

    /// Removes a field from the schema and its slot from every record.
    pub fn delete_field(&mut self, name: &str) -> Result<()> {
        let index = self.field_index(name).ok_or_else(|| {
            ShapefileError::Format(format!("no attribute field named '{}'", name))
        })?;
        self.fields.remove(index);
        self.header.num_fields -= 1;
        for record in &mut self.data {
            record.remove(index);
        }
        Ok(())
    }

    pub fn add_record(&mut self, record: Vec<FieldData>, deleted: bool) -> Result<()> {
        if record.len() != self.fields.len() {
            return Err(ShapefileError::Format(format!(
                "record has {} cells for a {}-field schema",
                record.len(),
                self.fields.len()
            )));
        }
        self.data.push(record);
        self.is_deleted.push(deleted);
        self.header.num_records += 1;
        Ok(())
    }

    pub fn num_records(&self) -> usize {
        self.data.len()
    }

    pub fn get_record(&self, index: usize) -> &[FieldData] {
        &self.data[index]
    }

    pub fn get_value(&self, record_index: usize, field_name: &str) -> FieldData {
        match self.field_index(field_name) {
            Some(i) => self.data[record_index][i].clone(),
            None => FieldData::Null,
        }
    }

    /// Derives the schema a column mask selects. Pure: the table is not
    /// modified, so applying the same mask any number of times yields the
    /// same descriptor list.
    pub fn masked_fields(&self, column_mask: &[bool]) -> Result<Vec<AttributeField>> {
        mask_fields(&self.fields, column_mask)
    }
}

pub(crate) fn mask_fields(
    fields: &[AttributeField],
    column_mask: &[bool],
) -> Result<Vec<AttributeField>> {
    if column_mask.len() != fields.len() {
        return Err(ShapefileError::Format(format!(
            "column mask has {} entries for {} fields",
            column_mask.len(),
            fields.len()
        )));
    }
    Ok(fields
        .iter()
        .zip(column_mask)
        .filter(|(_, &keep)| keep)
        .map(|(f, _)| f.clone())
        .collect())
}

/// Reads the table header and the field descriptor array.
pub(crate) fn read_dbf_header<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
) -> Result<(AttributeHeader, Vec<AttributeField>)> {
    bor.seek(0)?;
    let mut header = AttributeHeader {
        version: bor.read_u8()?,
        year: 1900u32 + bor.read_u8()? as u32,
        month: bor.read_u8()?,
        day: bor.read_u8()?,
        num_records: bor.read_u32()?,
        bytes_in_header: bor.read_u16()?,
        bytes_in_record: bor.read_u16()?,
        ..Default::default()
    };
    // reserved bytes
    bor.inc_pos(2)?;
    header.incomplete_transaction = bor.read_u8()?;
    header.encryption_flag = bor.read_u8()?;
    // free record thread (LAN only) and multi-user reserved bytes
    bor.inc_pos(12)?;
    header.mdx_flag = bor.read_u8()?;
    header.language_driver_id = bor.read_u8()?;
    // reserved bytes
    bor.inc_pos(2)?;

    if header.bytes_in_header < 33 {
        return Err(ShapefileError::Format(format!(
            "header length {} is shorter than the fixed preamble",
            header.bytes_in_header
        )));
    }
    header.num_fields = (header.bytes_in_header as u32 - 32 - 1) / 32;

    let mut fields = Vec::with_capacity(header.num_fields as usize);
    for _ in 0..header.num_fields {
        let raw_name = bor.read_utf8(11)?;
        // a name ends at its first embedded NUL
        let name = match raw_name.find('\0') {
            Some(i) => raw_name[..i].to_string(),
            None => raw_name,
        }
        .trim()
        .to_string();
        let field_type = FieldDataType::from_char(char::from(bor.read_u8()?))?;
        bor.inc_pos(4)?;
        let field_length = bor.read_u8()?;
        let decimal_count = bor.read_u8()?;
        // remaining descriptor bytes: multi-user dBASE work area, set
        // field flag and index flag
        bor.inc_pos(14)?;
        fields.push(AttributeField {
            name,
            field_type,
            field_length,
            decimal_count,
        });
    }

    // field descriptor terminator; tolerate its absence
    if bor.peek_u8()? == 0x0d {
        bor.inc_pos(1)?;
    } else {
        warn!("attribute table is missing the 0x0D descriptor terminator");
    }

    let record_bytes: u16 = 1 + fields.iter().map(|f| f.field_length as u16).sum::<u16>();
    if record_bytes != header.bytes_in_record {
        return Err(ShapefileError::Format(format!(
            "field lengths sum to {} bytes per record but the header declares {}",
            record_bytes, header.bytes_in_record
        )));
    }

    Ok((header, fields))
}

/// Reads one record by index, decoding unmasked cells and skipping over
/// masked-out ones without interpreting their bytes. Returns the cells and
/// the record's deleted flag.
pub(crate) fn read_dbf_record<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
    header: &AttributeHeader,
    fields: &[AttributeField],
    index: usize,
    column_mask: Option<&[bool]>,
) -> Result<(Vec<FieldData>, bool)> {
    if index >= header.num_records as usize {
        return Err(ShapefileError::Format(format!(
            "record index {} is out of range for a {}-record table",
            index, header.num_records
        )));
    }
    if let Some(mask) = column_mask {
        if mask.len() != fields.len() {
            return Err(ShapefileError::Format(format!(
                "column mask has {} entries for {} fields",
                mask.len(),
                fields.len()
            )));
        }
    }

    bor.seek(header.bytes_in_header as usize + index * header.bytes_in_record as usize)?;
    let deleted = bor.read_u8()? == 0x2a;

    let mut record = vec![];
    for (j, field) in fields.iter().enumerate() {
        if column_mask.map_or(true, |mask| mask[j]) {
            let raw = bor.read_utf8(field.field_length as usize)?;
            record.push(decode_cell(&raw, field));
        } else {
            bor.inc_pos(field.field_length as usize)?;
        }
    }
    Ok((record, deleted))
}

/// Reads a run of records. `start` and `count` are clamped to the table's
/// bounds rather than rejected.
pub(crate) fn read_dbf_range<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
    header: &AttributeHeader,
    fields: &[AttributeField],
    start: usize,
    count: usize,
    column_mask: Option<&[bool]>,
) -> Result<(Vec<Vec<FieldData>>, Vec<bool>)> {
    let num_records = header.num_records as usize;
    let start = start.min(num_records);
    let count = count.min(num_records - start);

    let mut records = Vec::with_capacity(count);
    let mut deleted_flags = Vec::with_capacity(count);
    for index in start..start + count {
        let (record, deleted) = read_dbf_record(bor, header, fields, index, column_mask)?;
        records.push(record);
        deleted_flags.push(deleted);
    }
    Ok((records, deleted_flags))
}

/// Decodes one fixed-width cell. Numeric parse failures degrade to `Null`
/// — a blank on write-back — rather than erroring, so that "no data" and
/// zero stay distinct.
fn decode_cell(raw: &str, field: &AttributeField) -> FieldData {
    let trimmed = raw.replace(char::from(0), "");
    let trimmed = trimmed.trim();
    if trimmed.is_empty() {
        return FieldData::Null;
    }
    match field.field_type {
        FieldDataType::Numeric | FieldDataType::Float => {
            let parsed = if field.decimal_count == 0 {
                trimmed.parse::<i32>().map(FieldData::Int).ok()
            } else {
                trimmed.parse::<f64>().map(FieldData::Real).ok()
            };
            parsed.unwrap_or_else(|| {
                warn!(
                    "unparseable value '{}' in numeric field '{}'; treating as blank",
                    trimmed, field.name
                );
                FieldData::Null
            })
        }
        FieldDataType::Long | FieldDataType::AutoIncrement => {
            trimmed.parse::<i32>().map(FieldData::Int).unwrap_or_else(|_| {
                warn!(
                    "unparseable value '{}' in integer field '{}'; treating as blank",
                    trimmed, field.name
                );
                FieldData::Null
            })
        }
        FieldDataType::Double => {
            trimmed.parse::<f64>().map(FieldData::Real).unwrap_or_else(|_| {
                warn!(
                    "unparseable value '{}' in double field '{}'; treating as blank",
                    trimmed, field.name
                );
                FieldData::Null
            })
        }
        FieldDataType::Date => {
            if trimmed.len() == 8 {
                FieldData::Date(DateData {
                    year: trimmed[0..4].parse::<u16>().unwrap_or(0),
                    month: trimmed[4..6].parse::<u8>().unwrap_or(0),
                    day: trimmed[6..8].parse::<u8>().unwrap_or(0),
                })
            } else {
                FieldData::Null
            }
        }
        FieldDataType::Logical => match trimmed.chars().next() {
            Some('t') | Some('T') | Some('y') | Some('Y') => FieldData::Bool(true),
            Some('f') | Some('F') | Some('n') | Some('N') => FieldData::Bool(false),
            _ => FieldData::Null,
        },
        // everything else stays a fixed-width string, trimmed
        _ => FieldData::Text(trimmed.to_string()),
    }
}

/// Formats a cell to its fixed on-disk width: numerics right-justified with
/// the column's decimal count, text left-justified, overflow truncated from
/// the right (lossy, as the format dictates).
fn format_cell(data: &FieldData, field: &AttributeField) -> String {
    let width = field.field_length as usize;
    let body = match data {
        FieldData::Null => String::new(),
        FieldData::Int(v) => v.to_string(),
        FieldData::Real(v) => format!("{:.*}", field.decimal_count as usize, v),
        FieldData::Text(v) => v.clone(),
        FieldData::Date(v) => format!("{}", v),
        FieldData::Bool(v) => if *v { "T" } else { "F" }.to_string(),
    };

    let mut s = body;
    if s.len() > width {
        s.truncate(width);
        return s;
    }
    let pad: String = " ".repeat(width - s.len());
    match data {
        FieldData::Int(_) | FieldData::Real(_) => format!("{}{}", pad, s),
        _ => {
            s.push_str(&pad);
            s
        }
    }
}

/// Serializes the table: header, field descriptor array, fixed-width
/// records, and the 0x0D / 0x1A terminator bytes.
pub(crate) fn write_dbf<W: Write>(writer: &mut W, attributes: &ShapefileAttributes) -> Result<()> {
    writer.write_u8(3u8)?; // dBASE III, no memo

    let now = Local::now();
    writer.write_u8((now.year() - 1900) as u8)?;
    writer.write_u8(now.month() as u8)?;
    writer.write_u8(now.day() as u8)?;

    writer.write_u32::<LittleEndian>(attributes.num_records() as u32)?;
    let header_size = 32u16 + attributes.fields.len() as u16 * 32u16 + 1u16;
    writer.write_u16::<LittleEndian>(header_size)?;

    let mut bytes_in_record = 1u16;
    for field in &attributes.fields {
        bytes_in_record += field.field_length as u16;
    }
    writer.write_u16::<LittleEndian>(bytes_in_record)?;

    // reserved or unused bytes
    for _ in 0..20 {
        writer.write_u8(0u8)?;
    }

    // field descriptor array
    for field in &attributes.fields {
        let mut s = field.name.clone();
        s.truncate(10);
        for _ in s.len()..11 {
            s.push(char::from(0));
        }
        writer.write_all(s.as_bytes())?;
        writer.write_u8(field.field_type.to_char() as u8)?;
        for _ in 0..4 {
            writer.write_u8(0u8)?;
        }
        writer.write_u8(field.field_length)?;
        writer.write_u8(field.decimal_count)?;
        for _ in 0..14 {
            writer.write_u8(0u8)?;
        }
    }
    writer.write_u8(0x0d)?; // descriptor terminator

    for i in 0..attributes.num_records() {
        if attributes.is_deleted[i] {
            writer.write_u8(0x2a)?;
        } else {
            writer.write_u8(0x20)?;
        }
        let record = attributes.get_record(i);
        for (j, field) in attributes.fields.iter().enumerate() {
            writer.write_all(format_cell(&record[j], field).as_bytes())?;
        }
    }
    writer.write_u8(0x1a)?; // file terminator

    Ok(())
}
