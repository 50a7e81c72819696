//! NMF file writer

use super::data::NmfData;
use super::{BIAS16, BIAS32, SIG_PRIMARY, SIG_SECONDARY};
use crate::error::{Error, Result};
use std::io::Write;

/// NMF file writer.
///
/// Writing is fully sequential.  The caller is responsible for sorting the
/// note table first if canonical order is wanted.
pub struct NmfWriter<W: Write> {
    inner: W,
}

impl<W: Write> NmfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Serialize the data object.  Fails if it contains no notes.
    pub fn serialize(&mut self, data: &NmfData) -> Result<()> {
        if data.note_count() == 0 {
            return Err(Error::NmfFormat("cannot serialize NMF with no notes".into()));
        }

        self.write_uint32(SIG_PRIMARY)?;
        self.write_uint32(SIG_SECONDARY)?;

        self.write_uint16(data.basis().raw())?;
        self.write_uint16(data.section_count() as u16)?;
        self.write_uint32(data.note_count() as i32)?;

        for &offset in data.offsets() {
            self.write_uint32(offset)?;
        }

        for note in data.notes() {
            self.write_uint32(note.t)?;
            self.write_bias32(note.dur)?;
            self.write_bias16(note.pitch)?;
            self.write_uint16(note.art)?;
            self.write_uint16(note.sect)?;
            self.write_uint16(note.layer_i)?;
        }

        self.inner.flush()?;
        Ok(())
    }

    fn write_uint32(&mut self, v: i32) -> Result<()> {
        assert!(v >= 0);
        self.inner.write_all(&(v as u32).to_be_bytes())?;
        Ok(())
    }

    fn write_uint16(&mut self, v: u16) -> Result<()> {
        self.inner.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_bias32(&mut self, v: i32) -> Result<()> {
        let raw = v as i64 + BIAS32;
        assert!(raw >= 1 && raw <= u32::MAX as i64);
        self.inner.write_all(&(raw as u32).to_be_bytes())?;
        Ok(())
    }

    fn write_bias16(&mut self, v: i16) -> Result<()> {
        let raw = v as i32 + BIAS16;
        assert!(raw >= 1 && raw <= u16::MAX as i32);
        self.inner.write_all(&(raw as u16).to_be_bytes())?;
        Ok(())
    }
}
