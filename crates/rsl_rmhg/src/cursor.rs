//! Position tracking readers and writers over in-memory buffers.
//!
//! Both sides carry a runtime [`Endian`] so a single code path serves the little endian `RMHG`
//! containers and the big endian `GHMR` legacy variant.

use std::io::{Cursor, Seek, SeekFrom, Write};

use binrw::{BinRead, BinWrite, Endian};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// A reader over a borrowed byte buffer.
///
/// ```
/// use rsl_rmhg::cursor::ByteCursor;
/// use std::io::SeekFrom;
///
/// let data = [0x01, 0x00, 0x00, 0x00, b'h', b'i', 0x00];
/// let mut cursor = ByteCursor::new(&data);
///
/// assert_eq!(cursor.read_u32().unwrap(), 1);
/// let name = cursor.scoped(SeekFrom::Start(4), |c| c.read_cstring()).unwrap();
/// assert_eq!(name, b"hi");
/// assert_eq!(cursor.position(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    inner: Cursor<&'a [u8]>,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    /// Create a little endian reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_endian(data, Endian::Little)
    }

    /// Create a reader with an explicit byte order.
    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            inner: Cursor::new(data),
            endian,
        }
    }

    /// The byte order used for integer reads.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Change the byte order used for subsequent integer reads.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Current absolute position.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    /// Whether the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bytes between the current position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position() as usize)
    }

    /// The whole underlying buffer.
    pub fn get_ref(&self) -> &'a [u8] {
        self.inner.get_ref()
    }

    /// Move the cursor. Seeking past the end is allowed, the next read will fail.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    /// Seek, run `f`, then restore both the previous position and byte order.
    ///
    /// The state is restored whether `f` succeeds or fails.
    pub fn scoped<T, F>(&mut self, pos: SeekFrom, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position();
        let saved_endian = self.endian;

        let result = self.seek(pos).and_then(|_| f(self));

        self.inner.set_position(saved_position);
        self.endian = saved_endian;
        result
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if available < needed {
            return Err(Error::UnexpectedEof {
                offset: self.position(),
                needed,
                available,
            });
        }
        Ok(())
    }

    /// Borrow the next `count` bytes without moving the cursor.
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        self.ensure(count)?;
        let start = (self.position() as usize).min(self.len());
        let data: &'a [u8] = self.inner.get_ref();
        Ok(&data[start..start + count])
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.inner.set_position(self.position() + count as u64);
        Ok(bytes)
    }

    /// Read bytes up to (not including) the next zero byte, or to the end of the buffer.
    ///
    /// The terminator is consumed when present.
    pub fn read_cstring(&mut self) -> Result<&'a [u8]> {
        let start = (self.position() as usize).min(self.len());
        let data: &'a [u8] = self.inner.get_ref();
        let tail = &data[start..];

        let (value, consumed) = match tail.iter().position(|b| *b == 0) {
            Some(end) => (&tail[..end], end + 1),
            None => (tail, tail.len()),
        };
        self.inner.set_position((start + consumed) as u64);
        Ok(value)
    }

    /// Read a fixed length string that must be valid UTF-8.
    pub fn read_fixed_str(&mut self, length: usize) -> Result<&'a str> {
        let bytes = self.read_bytes(length)?;
        std::str::from_utf8(bytes).map_err(|e| Error::CustomError(e.to_string()))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(match self.endian {
            Endian::Little => self.inner.read_u32::<LittleEndian>()?,
            Endian::Big => self.inner.read_u32::<BigEndian>()?,
        })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(match self.endian {
            Endian::Little => self.inner.read_i32::<LittleEndian>()?,
            Endian::Big => self.inner.read_i32::<BigEndian>()?,
        })
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(match self.endian {
            Endian::Little => self.inner.read_u64::<LittleEndian>()?,
            Endian::Big => self.inner.read_u64::<BigEndian>()?,
        })
    }

    /// Read a fixed layout record using the cursor's byte order.
    pub fn read<T>(&mut self) -> Result<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let start = self.position();
        T::read_options(&mut self.inner, self.endian, ()).map_err(|e| {
            self.inner.set_position(start);
            Error::from(e)
        })
    }
}

/// A growable output buffer with a write cursor.
///
/// Writes overwrite existing bytes at the cursor and grow the buffer when they run past its end,
/// which allows fields to be reserved first and backfilled once their value is known.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    inner: Cursor<Vec<u8>>,
    endian: Endian,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new(Endian::Little)
    }
}

impl ByteWriter {
    pub fn new(endian: Endian) -> Self {
        Self {
            inner: Cursor::new(Vec::new()),
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    /// Seek, run `f`, then restore the previous position and byte order.
    pub fn scoped<T, F>(&mut self, pos: SeekFrom, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position();
        let saved_endian = self.endian;

        let result = self.seek(pos).and_then(|_| f(self));

        self.inner.set_position(saved_position);
        self.endian = saved_endian;
        result
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        match self.endian {
            Endian::Little => self.inner.write_u32::<LittleEndian>(value)?,
            Endian::Big => self.inner.write_u32::<BigEndian>(value)?,
        }
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        match self.endian {
            Endian::Little => self.inner.write_i32::<LittleEndian>(value)?,
            Endian::Big => self.inner.write_i32::<BigEndian>(value)?,
        }
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        match self.endian {
            Endian::Little => self.inner.write_u64::<LittleEndian>(value)?,
            Endian::Big => self.inner.write_u64::<BigEndian>(value)?,
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write `value` followed by a zero terminator.
    pub fn write_cstring(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())?;
        self.inner.write_u8(0)?;
        Ok(())
    }

    /// Splice a finished sub-buffer in at the cursor and advance past it.
    pub fn extend(&mut self, other: ByteWriter) -> Result<()> {
        self.write_bytes(&other.into_inner())
    }

    /// Overwrite a previously reserved 32-bit field without moving the cursor.
    pub fn patch_u32(&mut self, at: u64, value: u32) -> Result<()> {
        self.scoped(SeekFrom::Start(at), |w| w.write_u32(value))
    }

    /// Write a fixed layout record using the writer's byte order.
    pub fn write<T>(&mut self, value: &T) -> Result<()>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        value.write_options(&mut self.inner, self.endian, ())?;
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}
