//! Position-tracking reader over a byte slice.
//!
//! Container parsing works directly on `&[u8]`; [`SliceReader`] gives it the
//! small subset of `std::io::Cursor` it needs, returning
//! [`MuxError::UnexpectedEof`] instead of I/O errors when the data runs out.

use byteorder_lite::{ByteOrder, LittleEndian};
use core::fmt;

use crate::mux::MuxError;

/// A reader that wraps a byte slice and tracks the current position.
#[derive(Clone)]
pub(crate) struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the slice.
    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Seek to a position from the start.
    #[inline]
    pub(crate) fn seek_from_start(&mut self, pos: usize) -> Result<(), MuxError> {
        if pos > self.data.len() {
            return Err(MuxError::UnexpectedEof);
        }
        self.pos = pos;
        Ok(())
    }

    /// Skip `n` bytes forward.
    #[inline]
    pub(crate) fn skip(&mut self, n: usize) -> Result<(), MuxError> {
        let pos = self.pos.checked_add(n).ok_or(MuxError::UnexpectedEof)?;
        self.seek_from_start(pos)
    }

    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8], MuxError> {
        let end = self.pos.checked_add(n).ok_or(MuxError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(MuxError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a four-character code.
    #[inline]
    pub(crate) fn read_fourcc(&mut self) -> Result<[u8; 4], MuxError> {
        let mut fourcc = [0u8; 4];
        fourcc.copy_from_slice(self.take(4)?);
        Ok(fourcc)
    }

    #[inline]
    pub(crate) fn read_u8(&mut self) -> Result<u8, MuxError> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub(crate) fn read_u16_le(&mut self) -> Result<u16, MuxError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    #[inline]
    pub(crate) fn read_u24_le(&mut self) -> Result<u32, MuxError> {
        Ok(LittleEndian::read_u24(self.take(3)?))
    }

    #[inline]
    pub(crate) fn read_u32_le(&mut self) -> Result<u32, MuxError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }
}

impl fmt::Debug for SliceReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceReader")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}
