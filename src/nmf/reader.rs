//! NMF file reader and parser

use super::data::{
    cmp_notes, Basis, NmfData, Note, MAX_ART, MAX_NOTES, MAX_PITCH, MAX_SECTIONS, MIN_PITCH,
};
use super::{BIAS16, BIAS32, SIG_PRIMARY, SIG_SECONDARY};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// NMF file reader.
///
/// Reads sequentially from the current position; any data after the NMF
/// payload is left unread.
pub struct NmfReader<R: Read> {
    inner: R,
}

impl<R: Read> NmfReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Parse the stream as an NMF file.
    ///
    /// Signatures, the basis, counts, section ordering, and every note field
    /// are validated; note order within the table is not.
    pub fn parse(&mut self) -> Result<NmfData> {
        self.parse_inner(false)
    }

    /// Parse the stream as an NMF file and additionally require the note
    /// table to be in canonical sorted order.
    pub fn parse_sorted(&mut self) -> Result<NmfData> {
        self.parse_inner(true)
    }

    fn parse_inner(&mut self, require_sorted: bool) -> Result<NmfData> {
        if self.read_uint32()? != SIG_PRIMARY {
            return Err(Error::NmfFormat("invalid primary signature".into()));
        }
        if self.read_uint32()? != SIG_SECONDARY {
            return Err(Error::NmfFormat("invalid secondary signature".into()));
        }

        let basis = Basis::from_raw(self.read_uint16()?)
            .ok_or_else(|| Error::NmfFormat("invalid quantum basis".into()))?;

        let sect_count = self.read_uint16()? as usize;
        if sect_count < 1 || sect_count > MAX_SECTIONS {
            return Err(Error::NmfFormat("invalid section count".into()));
        }
        let note_count = self.read_uint32()? as usize;
        if note_count < 1 || note_count > MAX_NOTES {
            return Err(Error::NmfFormat("invalid note count".into()));
        }

        let mut sections = Vec::with_capacity(sect_count);
        for i in 0..sect_count {
            let offset = self.read_uint32()?;
            if i == 0 {
                if offset != 0 {
                    return Err(Error::NmfFormat("first section offset must be zero".into()));
                }
            } else if offset < sections[i - 1] {
                return Err(Error::NmfFormat("section offsets out of order".into()));
            }
            sections.push(offset);
        }

        let mut notes = Vec::with_capacity(note_count);
        for _ in 0..note_count {
            let note = Note {
                t: self.read_uint32()?,
                dur: self.read_bias32()?,
                pitch: self.read_bias16()?,
                art: self.read_uint16()?,
                sect: self.read_uint16()?,
                layer_i: self.read_uint16()?,
            };

            if note.pitch < MIN_PITCH || note.pitch > MAX_PITCH {
                return Err(Error::NmfFormat("note pitch out of range".into()));
            }
            if note.art > MAX_ART {
                return Err(Error::NmfFormat("note articulation out of range".into()));
            }
            if note.sect as usize >= sect_count {
                return Err(Error::NmfFormat("note references undefined section".into()));
            }
            if note.t < sections[note.sect as usize] {
                return Err(Error::NmfFormat("note starts before its section".into()));
            }
            if require_sorted {
                if let Some(prev) = notes.last() {
                    if cmp_notes(prev, &note) == Ordering::Greater {
                        return Err(Error::NmfFormat("note table out of order".into()));
                    }
                }
            }
            notes.push(note);
        }

        Ok(NmfData::from_parts(basis, sections, notes))
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => Ok(buf[0]),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(Error::NmfFormat("unexpected end of file".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_raw32(&mut self) -> Result<u32> {
        let mut v = 0u32;
        for _ in 0..4 {
            v = (v << 8) | self.read_byte()? as u32;
        }
        Ok(v)
    }

    fn read_raw16(&mut self) -> Result<u16> {
        let hi = self.read_byte()? as u16;
        let lo = self.read_byte()? as u16;
        Ok((hi << 8) | lo)
    }

    /// Unsigned 32-bit field; the most significant bit is reserved and must
    /// be zero.
    fn read_uint32(&mut self) -> Result<i32> {
        let raw = self.read_raw32()?;
        if raw > i32::MAX as u32 {
            return Err(Error::NmfFormat("32-bit field out of range".into()));
        }
        Ok(raw as i32)
    }

    fn read_uint16(&mut self) -> Result<u16> {
        self.read_raw16()
    }

    /// Biased 32-bit field; raw zero is reserved.
    fn read_bias32(&mut self) -> Result<i32> {
        let raw = self.read_raw32()?;
        if raw < 1 {
            return Err(Error::NmfFormat("reserved biased 32-bit value".into()));
        }
        Ok((raw as i64 - BIAS32) as i32)
    }

    /// Biased 16-bit field; raw zero is reserved.
    fn read_bias16(&mut self) -> Result<i16> {
        let raw = self.read_raw16()?;
        if raw < 1 {
            return Err(Error::NmfFormat("reserved biased 16-bit value".into()));
        }
        Ok((raw as i32 - BIAS16) as i16)
    }
}

/// Parse an NMF file from a path.
pub fn parse_file(path: &Path) -> Result<NmfData> {
    let file = File::open(path)?;
    NmfReader::new(BufReader::new(file)).parse()
}
