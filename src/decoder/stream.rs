use std::iter::Take;

use crate::{error::GribError, helpers::num_octets};

/// Returns an iterator over `length` unsigned integers packed with `nbit` bits
/// each, most significant bit first, with no padding between values.
///
/// When `nbit` is 0, `length` zeros are returned without reading `data`.
pub(crate) fn unpack_bits(
    data: &[u8],
    nbit: u8,
    length: usize,
) -> Result<BitStream<&[u8]>, GribError> {
    let nbit = usize::from(nbit);
    if nbit == 0 {
        return Ok(BitStream::ZeroSized(FixedValueIterator::new(0, length)));
    }

    let required = length
        .checked_mul(nbit)
        .map(num_octets)
        .ok_or(GribError::TruncatedInput)?;
    let data = data.get(..required).ok_or(GribError::TruncatedInput)?;
    let iter = NBitwiseIterator::new(data, nbit).take(length);
    Ok(BitStream::NonZeroSized(iter))
}

pub(crate) enum BitStream<T> {
    ZeroSized(FixedValueIterator<u32>),
    NonZeroSized(Take<NBitwiseIterator<T>>),
}

impl<T> Iterator for BitStream<T>
where
    T: AsRef<[u8]>,
{
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::ZeroSized(z) => z.next(),
            Self::NonZeroSized(n) => n.next(),
        }
    }
}

pub(crate) struct FixedValueIterator<T> {
    val: T,
    length: usize,
    pos: usize,
}

impl<T> FixedValueIterator<T> {
    pub(crate) fn new(val: T, length: usize) -> Self {
        Self {
            val,
            length,
            pos: 0,
        }
    }
}

impl<T> Iterator for FixedValueIterator<T>
where
    T: Copy,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.length {
            self.pos += 1;
            Some(self.val)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.length - self.pos;
        (size, Some(size))
    }
}

#[derive(Clone)]
pub(crate) struct NBitwiseIterator<T> {
    data: T,
    size: usize,
    pos: usize,
    offset: usize,
}

impl<T> NBitwiseIterator<T> {
    pub(crate) fn new(data: T, size: usize) -> Self {
        Self {
            data,
            size,
            pos: 0,
            offset: 0,
        }
    }
}

impl<T> Iterator for NBitwiseIterator<T>
where
    T: AsRef<[u8]>,
{
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let new_offset = self.offset + self.size;
        let (new_pos, new_offset) = (self.pos + new_offset / 8, new_offset % 8);
        let slice = self.data.as_ref();

        if self.size == 0
            || self.pos >= slice.len()
            || new_pos > slice.len()
            || (new_pos == slice.len() && new_offset > 0)
        {
            return None;
        }

        let val = slice[self.pos] << self.offset >> self.offset;
        let mut val: u32 = u32::from(val);
        if new_pos == self.pos {
            val >>= 8 - new_offset;
        } else {
            let mut pos = self.pos + 1;
            while pos < new_pos {
                val = (val << 8) | u32::from(slice[pos]);
                pos += 1;
            }
            if new_offset > 0 {
                let shift = 8 - new_offset;
                let last_val = u32::from(slice[pos]) >> shift;
                val = (val << new_offset) | last_val;
            }
        }

        self.pos = new_pos;
        self.offset = new_offset;
        Some(val)
    }
}
