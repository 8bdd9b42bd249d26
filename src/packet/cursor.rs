//! Little-endian cursor over a datagram.
//!
//! Per-car arrays are read as a sequence of fixed-size records. Taking a
//! record performs one bounds check for the whole record and hands back a
//! cursor scoped to exactly those bytes, so a field layout that is too long
//! can never read into the next slot.

use crate::DecodeError;

/// A fixed-size, little-endian record on the wire.
pub trait WireRecord: Sized {
    /// Exact encoded size in bytes.
    const SIZE: usize;

    /// Name used in [`DecodeError::Malformed`] contexts.
    const NAME: &'static str;

    /// Read the record from a cursor scoped to exactly [`Self::SIZE`] bytes.
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self, DecodeError>;
}

/// Cursor-style byte reader for little-endian binary data.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` within the datagram, for error reporting.
    base: usize,
    context: &'static str,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0, context: "packet" }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len()).ok_or(
            DecodeError::Malformed { context: self.context, offset: self.base + self.pos },
        )?;
        let data = self.data;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8, DecodeError> {
        self.u8().map(|v| v as i8)
    }

    #[inline]
    pub fn u16_le(&mut self) -> Result<u16, DecodeError> {
        self.take_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn i16_le(&mut self) -> Result<i16, DecodeError> {
        self.take_array().map(i16::from_le_bytes)
    }

    #[inline]
    pub fn u32_le(&mut self) -> Result<u32, DecodeError> {
        self.take_array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn u64_le(&mut self) -> Result<u64, DecodeError> {
        self.take_array().map(u64::from_le_bytes)
    }

    /// Reads the raw IEEE-754 bits; non-finite values are passed through.
    #[inline]
    pub fn f32_le(&mut self) -> Result<f32, DecodeError> {
        self.take_array().map(f32::from_le_bytes)
    }

    pub fn u8_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        self.take_array()
    }

    pub fn u16_le_array<const N: usize>(&mut self) -> Result<[u16; N], DecodeError> {
        let mut arr = [0u16; N];
        for item in arr.iter_mut() {
            *item = self.u16_le()?;
        }
        Ok(arr)
    }

    pub fn f32_le_array<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        let mut arr = [0.0f32; N];
        for item in arr.iter_mut() {
            *item = self.f32_le()?;
        }
        Ok(arr)
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> &'a [u8] {
        let data = self.data;
        let bytes = &data[self.pos.min(data.len())..];
        self.pos = data.len();
        bytes
    }

    /// Read one record, advancing by exactly `T::SIZE` bytes.
    pub fn record<T: WireRecord>(&mut self) -> Result<T, DecodeError> {
        let start = self.pos;
        let bytes = self
            .take(T::SIZE)
            .map_err(|_| DecodeError::Malformed { context: T::NAME, offset: self.base + start })?;

        let mut scoped =
            ByteCursor { data: bytes, pos: 0, base: self.base + start, context: T::NAME };
        let record = T::read(&mut scoped)?;
        debug_assert_eq!(scoped.pos, T::SIZE, "{} layout does not fill its record", T::NAME);
        Ok(record)
    }

    /// Read `count` consecutive records of the same type.
    pub fn records<T: WireRecord>(&mut self, count: usize) -> Result<Vec<T>, DecodeError> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.record::<T>()?);
        }
        Ok(out)
    }
}
