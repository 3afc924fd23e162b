/*
This code is part of the ShapeKit geospatial vector I/O library.
Authors: ShapeKit Contributors
Created: 14/03/2024
Last Modified: 02/06/2025
License: MIT
*/

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::prelude::*;
use std::io::{Result, SeekFrom};

/// A positioned binary reader with a switchable byte order.
///
/// Several geospatial formats mix endianness within a single file, so the
/// byte order is state that the caller toggles between call sequences
/// rather than a type parameter. Every read advances `pos()`; a read past
/// the end of the underlying stream fails with `UnexpectedEof`, which
/// callers use to detect truncated files.
pub struct ByteOrderReader<R: Read + Seek> {
    is_le: bool,
    reader: R,
    pos: usize,
    len: usize,
}

impl<R: Read + Seek> ByteOrderReader<R> {
    pub fn new(mut reader: R, byte_order: Endianness) -> Result<ByteOrderReader<R>> {
        let len = reader.seek(SeekFrom::End(0))? as usize;
        reader.seek(SeekFrom::Start(0))?;
        Ok(ByteOrderReader {
            reader,
            is_le: byte_order == Endianness::LittleEndian,
            pos: 0usize,
            len,
        })
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.is_le = byte_order == Endianness::LittleEndian;
    }

    pub fn get_byte_order(&self) -> Endianness {
        if self.is_le {
            return Endianness::LittleEndian;
        }
        Endianness::BigEndian
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        self.pos = position;
        self.reader.seek(SeekFrom::Start(self.pos as u64))?;
        Ok(())
    }

    /// Skips `skip` bytes without interpreting them.
    pub fn inc_pos(&mut self, skip: usize) -> Result<()> {
        self.pos += skip;
        self.reader.seek(SeekFrom::Start(self.pos as u64))?;
        Ok(())
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads exactly `length` bytes as fixed-width text, decoding lossily.
    /// The caller is responsible for trimming padding.
    pub fn read_utf8(&mut self, length: usize) -> Result<String> {
        let mut bytes = vec![0u8; length];
        self.reader.read_exact(&mut bytes)?;
        self.pos += length;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.pos += 1;
        self.reader.read_u8()
    }

    pub fn peek_u8(&mut self) -> Result<u8> {
        let val = self.reader.read_u8();
        self.seek(self.pos)?;
        val
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.pos += buf.len();
        self.reader.read_exact(buf)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.pos += 2;
        if self.is_le {
            return self.reader.read_u16::<LittleEndian>();
        }
        self.reader.read_u16::<BigEndian>()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.pos += 4;
        if self.is_le {
            return self.reader.read_u32::<LittleEndian>();
        }
        self.reader.read_u32::<BigEndian>()
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.pos += 2;
        if self.is_le {
            return self.reader.read_i16::<LittleEndian>();
        }
        self.reader.read_i16::<BigEndian>()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.pos += 4;
        if self.is_le {
            return self.reader.read_i32::<LittleEndian>();
        }
        self.reader.read_i32::<BigEndian>()
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.pos += 8;
        if self.is_le {
            return self.reader.read_f64::<LittleEndian>();
        }
        self.reader.read_f64::<BigEndian>()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Endianness {
    LittleEndian,
    BigEndian,
}

impl Default for Endianness {
    fn default() -> Endianness {
        Endianness::LittleEndian
    }
}

#[cfg(test)]
mod test {
    use super::{ByteOrderReader, Endianness};
    use std::io::Cursor;

    #[test]
    fn test_mixed_endian_reads() {
        // 0x00000001 BE followed by 0x00000001 LE
        let buf = vec![0u8, 0, 0, 1, 1, 0, 0, 0];
        let mut bor = ByteOrderReader::new(Cursor::new(buf), Endianness::BigEndian).unwrap();
        assert_eq!(bor.read_i32().unwrap(), 1);
        bor.set_byte_order(Endianness::LittleEndian);
        assert_eq!(bor.read_i32().unwrap(), 1);
        assert_eq!(bor.pos(), 8);
    }

    #[test]
    fn test_read_f64() {
        let mut buf = vec![];
        buf.extend_from_slice(&1.5f64.to_le_bytes());
        let mut bor = ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        assert_eq!(bor.read_f64().unwrap(), 1.5);
    }

    #[test]
    fn test_read_past_end_is_eof() {
        let buf = vec![0u8, 1];
        let mut bor = ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        let err = bor.read_i32().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_seek_and_peek() {
        let buf = vec![10u8, 20, 30, 40];
        let mut bor = ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        bor.seek(2).unwrap();
        assert_eq!(bor.peek_u8().unwrap(), 30);
        // peek must not advance
        assert_eq!(bor.pos(), 2);
        assert_eq!(bor.read_u8().unwrap(), 30);
        bor.inc_pos(1).unwrap();
        assert_eq!(bor.pos(), 4);
    }

    #[test]
    fn test_read_utf8_fixed_width() {
        let buf = b"ABC       ".to_vec();
        let mut bor = ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        let s = bor.read_utf8(10).unwrap();
        assert_eq!(s.trim(), "ABC");
        assert_eq!(bor.pos(), 10);
    }
}
