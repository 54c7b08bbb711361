use crate::error::DecodeError;

use bytes::{BufMut, Bytes, BytesMut};
use nom::number::complete::{be_i16, be_u16, be_u32};

type NomError<'a> = nom::error::Error<&'a [u8]>;

/// Read-only view over a holding register response.
///
/// Offsets passed to the `read_*` methods are counted in registers from the
/// start of the block, not in bytes and not as absolute addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterBuffer {
    start: u16,
    data: Bytes,
}

impl RegisterBuffer {
    pub fn new(start: u16, data: impl Into<Bytes>) -> Self {
        Self {
            start,
            data: data.into(),
        }
    }

    pub fn from_words(start: u16, words: &[u16]) -> Self {
        let mut buf = BytesMut::with_capacity(words.len() * 2);
        for word in words {
            buf.put_u16(*word);
        }
        Self::new(start, buf.freeze())
    }

    /// Absolute address of the first register.
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Number of complete registers held. A trailing odd byte is ignored.
    pub fn len(&self) -> usize {
        self.data.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ensure_len(&self, required: usize) -> Result<(), DecodeError> {
        if self.len() < required {
            return Err(DecodeError::ShortBuffer {
                required,
                actual: self.len(),
            });
        }
        Ok(())
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, DecodeError> {
        let input = self.slice(offset, 1)?;
        let (_, value) = be_u16::<_, NomError<'_>>(input).map_err(|_| self.out_of_range(offset, 1))?;
        Ok(value)
    }

    pub fn read_i16(&self, offset: usize) -> Result<i16, DecodeError> {
        let input = self.slice(offset, 1)?;
        let (_, value) = be_i16::<_, NomError<'_>>(input).map_err(|_| self.out_of_range(offset, 1))?;
        Ok(value)
    }

    /// Two consecutive registers, high word first.
    pub fn read_u32(&self, offset: usize) -> Result<u32, DecodeError> {
        let input = self.slice(offset, 2)?;
        let (_, value) = be_u32::<_, NomError<'_>>(input).map_err(|_| self.out_of_range(offset, 2))?;
        Ok(value)
    }

    /// Packed ASCII, two characters per register, trailing NUL/space removed.
    pub fn read_string(&self, offset: usize, count: usize) -> Result<String, DecodeError> {
        let raw = self.slice(offset, count)?;
        let end = raw
            .iter()
            .rposition(|b| *b != 0 && *b != b' ')
            .map_or(0, |p| p + 1);
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    fn slice(&self, offset: usize, count: usize) -> Result<&[u8], DecodeError> {
        let end = offset
            .checked_add(count)
            .ok_or_else(|| self.out_of_range(offset, count))?;
        if end > self.len() {
            return Err(self.out_of_range(offset, count));
        }
        Ok(&self.data[offset * 2..end * 2])
    }

    fn out_of_range(&self, offset: usize, count: usize) -> DecodeError {
        DecodeError::OutOfRange {
            offset,
            count,
            len: self.len(),
        }
    }
}

/// Packs `text` into `count` registers the way the device does, NUL padded and
/// truncated at the field width.
#[cfg(test)]
pub(crate) fn pack_string(text: &str, count: usize) -> Vec<u16> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(count * 2, 0);
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}
