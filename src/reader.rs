use std::io::Read;

use log::trace;

use crate::{error::GribError, helpers::TryFromSlice};

/// Size of the common header of sections 1-7: a 4-octet section length
/// followed by a 1-octet section number.
pub const SECT_HEADER_SIZE: usize = 5;

/// A variable-length section read from a stream.
///
/// The body holds the octets following the 5-octet common header, i.e.
/// exactly `length - 5` octets, so that later decoding stages cannot read
/// past the end of the section. A section whose content is not understood can
/// simply be read and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionEnvelope {
    num: u8,
    body: Box<[u8]>,
}

impl SectionEnvelope {
    /// Reads any section, whatever its number is.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, GribError> {
        let (size, num) = read_sect_meta(reader)?;
        check_size(size, 0)?;
        let body = read_body(reader, size - SECT_HEADER_SIZE)?;
        trace!("read section {num} ({size} octets)");
        Ok(Self { num, body })
    }

    /// Reads a section which is expected to be section `num` with at least
    /// `min_body_size` octets of fixed fields after the common header.
    ///
    /// The declared length is checked against the minimum before any body
    /// octet is consumed.
    pub fn read_section<R: Read>(
        reader: &mut R,
        num: u8,
        min_body_size: usize,
    ) -> Result<Self, GribError> {
        let (size, actual_num) = read_sect_meta(reader)?;
        check_size(size, min_body_size)?;
        check_num(actual_num, num)?;
        let body = read_body(reader, size - SECT_HEADER_SIZE)?;
        trace!("read section {num} ({size} octets)");
        Ok(Self { num, body })
    }

    /// Checks that this is section `num` with at least `min_body_size` octets
    /// of fixed fields after the common header.
    ///
    /// This applies the checks of [`SectionEnvelope::read_section`] to
    /// envelopes built by the caller.
    pub fn expect(&self, num: u8, min_body_size: usize) -> Result<(), GribError> {
        check_size(self.size(), min_body_size)?;
        check_num(self.num, num)
    }

    /// Builds an envelope from a section number and its body octets.
    pub fn from_body(num: u8, body: Box<[u8]>) -> Self {
        Self { num, body }
    }

    /// Section number.
    pub fn num(&self) -> u8 {
        self.num
    }

    /// Total length of the section in octets, including the common header.
    pub fn size(&self) -> usize {
        self.body.len() + SECT_HEADER_SIZE
    }

    /// Octets following the common header.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the whole body as a record of type `T`.
    ///
    /// Octets left over after the record fails the decoding, since they are
    /// not described by any field.
    pub fn parse<T: TryFromSlice>(&self) -> Result<T, GribError> {
        let mut pos = 0;
        let record = T::try_from_slice(&self.body, &mut pos)?;
        ensure_fully_consumed(&self.body, pos)?;
        Ok(record)
    }
}

pub(crate) fn ensure_fully_consumed(body: &[u8], pos: usize) -> Result<(), GribError> {
    if pos != body.len() {
        return Err(GribError::SectionLengthMismatch {
            expected: pos + SECT_HEADER_SIZE,
            actual: body.len() + SECT_HEADER_SIZE,
        });
    }
    Ok(())
}

/// Reads the common header of sections 1-7 and returns the section size and
/// number.
fn read_sect_meta<R: Read>(reader: &mut R) -> Result<(usize, u8), GribError> {
    let mut buf = [0; SECT_HEADER_SIZE];
    reader.read_exact(&mut buf[..])?;

    let mut pos = 0;
    let size = u32::try_from_slice(&buf, &mut pos)? as usize;
    let num = u8::try_from_slice(&buf, &mut pos)?;
    Ok((size, num))
}

fn check_size(size: usize, min_body_size: usize) -> Result<(), GribError> {
    let min_size = SECT_HEADER_SIZE + min_body_size;
    if size < min_size {
        return Err(GribError::SectionLengthMismatch {
            expected: min_size,
            actual: size,
        });
    }
    Ok(())
}

fn check_num(actual: u8, expected: u8) -> Result<(), GribError> {
    if actual != expected {
        return Err(GribError::MalformedHeader(format!(
            "expected section {expected}, found section {actual}"
        )));
    }
    Ok(())
}

fn read_body<R: Read>(reader: &mut R, len: usize) -> Result<Box<[u8]>, GribError> {
    // The declared length is not trusted for the allocation size.
    let mut body = Vec::new();
    reader.take(len as u64).read_to_end(&mut body)?;
    if body.len() != len {
        return Err(GribError::TruncatedInput);
    }
    Ok(body.into_boxed_slice())
}
