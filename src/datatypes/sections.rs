use std::io::Read;

#[cfg(feature = "time-calculation")]
use chrono::{DateTime, TimeZone, Utc};

use crate::{error::GribError, helpers::TryFromSlice, reader::SectionEnvelope};

const SECT0_IS_MAGIC: &[u8] = b"GRIB";
pub const SECT0_IS_SIZE: usize = 16;
const IDENTIFICATION_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Indicator {
    /// Reserved octets following the "GRIB" magic
    pub reserved: u16,
    /// Discipline - GRIB Master Table Number (see Code Table 0.0)
    pub discipline: u8,
    /// GRIB edition number (always 2)
    pub edition: u8,
    /// Total length of GRIB message in octets (including Section 0)
    pub total_length: u64,
}

impl Indicator {
    /// Reads the 16-octet Indicator Section.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self, GribError> {
        let mut buf = [0; SECT0_IS_SIZE];
        reader.read_exact(&mut buf[..])?;
        let mut pos = 0;
        Self::try_from_slice(&buf, &mut pos)
    }
}

impl TryFromSlice for Indicator {
    fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<Self, GribError> {
        let mut cursor = *pos;
        let magic = <[u8; 4]>::try_from_slice(slice, &mut cursor)?;
        let reserved = u16::try_from_slice(slice, &mut cursor)?;
        let discipline = u8::try_from_slice(slice, &mut cursor)?;
        let edition = u8::try_from_slice(slice, &mut cursor)?;
        let total_length = u64::try_from_slice(slice, &mut cursor)?;

        if magic != SECT0_IS_MAGIC {
            return Err(GribError::MalformedHeader(format!(
                "not GRIB data (magic: {magic:02x?})"
            )));
        }
        if edition != 2 {
            return Err(GribError::MalformedHeader(format!(
                "not GRIB edition 2: {edition}"
            )));
        }
        if total_length < SECT0_IS_SIZE as u64 {
            return Err(GribError::MalformedHeader(format!(
                "total length {total_length} is smaller than the Indicator Section"
            )));
        }

        *pos = cursor;
        Ok(Self {
            reserved,
            discipline,
            edition,
            total_length,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identification {
    /// Identification of originating/generating centre (see Common Code Table
    /// C-1)
    pub centre_id: u16,
    /// Identification of originating/generating sub-centre (allocated by
    /// originating/generating centre)
    pub subcentre_id: u16,
    /// GRIB Master Tables Version Number (see Code Table 1.0)
    pub master_table_version: u8,
    /// GRIB Local Tables Version Number (see Code Table 1.1)
    pub local_table_version: u8,
    /// Significance of Reference Time (see Code Table 1.2)
    pub ref_time_significance: u8,
    /// Reference time of data
    pub ref_time: RefTime,
    /// Production status of processed data in this GRIB message
    /// (see Code Table 1.3)
    pub prod_status: u8,
    /// Type of processed data in this GRIB message (see Code Table 1.4)
    pub data_type: u8,
}

impl Identification {
    /// Reads the Identification Section including its common header.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self, GribError> {
        let sect = SectionEnvelope::read_section(reader, 1, IDENTIFICATION_SIZE)?;
        Self::from_envelope(&sect)
    }

    pub fn from_envelope(sect: &SectionEnvelope) -> Result<Self, GribError> {
        sect.expect(1, IDENTIFICATION_SIZE)?;
        sect.parse()
    }
}

impl TryFromSlice for Identification {
    fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<Self, GribError> {
        let mut cursor = *pos;
        let identification = Self {
            centre_id: u16::try_from_slice(slice, &mut cursor)?,
            subcentre_id: u16::try_from_slice(slice, &mut cursor)?,
            master_table_version: u8::try_from_slice(slice, &mut cursor)?,
            local_table_version: u8::try_from_slice(slice, &mut cursor)?,
            ref_time_significance: u8::try_from_slice(slice, &mut cursor)?,
            ref_time: RefTime::try_from_slice(slice, &mut cursor)?,
            prod_status: u8::try_from_slice(slice, &mut cursor)?,
            data_type: u8::try_from_slice(slice, &mut cursor)?,
        };
        *pos = cursor;
        Ok(identification)
    }
}

/// Reference time as encoded in octets 13-19 of the Identification Section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl RefTime {
    fn validate(&self) -> Result<(), GribError> {
        let Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        } = self;
        let in_range = (1..=12).contains(month)
            && (1..=31).contains(day)
            && *hour < 24
            && *minute < 60
            && *second < 60;
        if in_range {
            Ok(())
        } else {
            Err(GribError::MalformedHeader(format!(
                "invalid reference time: {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            )))
        }
    }

    /// Converts the reference time into a calendar date and time.
    ///
    /// Dates passing the range checks of individual fields but not existing in
    /// the calendar, such as February 30, are rejected here.
    #[cfg(feature = "time-calculation")]
    pub fn to_date_time(&self) -> Result<DateTime<Utc>, GribError> {
        Utc.with_ymd_and_hms(
            self.year.into(),
            self.month.into(),
            self.day.into(),
            self.hour.into(),
            self.minute.into(),
            self.second.into(),
        )
        .single()
        .ok_or_else(|| GribError::MalformedHeader(format!("invalid date time: {self:?}")))
    }
}

impl TryFromSlice for RefTime {
    fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<Self, GribError> {
        let mut cursor = *pos;
        let time = Self {
            year: u16::try_from_slice(slice, &mut cursor)?,
            month: u8::try_from_slice(slice, &mut cursor)?,
            day: u8::try_from_slice(slice, &mut cursor)?,
            hour: u8::try_from_slice(slice, &mut cursor)?,
            minute: u8::try_from_slice(slice, &mut cursor)?,
            second: u8::try_from_slice(slice, &mut cursor)?,
        };
        time.validate()?;
        *pos = cursor;
        Ok(time)
    }
}

/// Bit-map Section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitmap {
    /// Bit-map indicator (see Code Table 6.0)
    pub indicator: u8,
    bitmap: Box<[u8]>,
}

impl Bitmap {
    pub const INDICATOR_PRESENT: u8 = 0x00;
    pub const INDICATOR_ABSENT: u8 = 0xff;

    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self, GribError> {
        let sect = SectionEnvelope::read_section(reader, 6, 1)?;
        Self::from_envelope(&sect)
    }

    pub fn from_envelope(sect: &SectionEnvelope) -> Result<Self, GribError> {
        sect.expect(6, 1)?;
        let body = sect.body();
        let mut pos = 0;
        let indicator = u8::try_from_slice(body, &mut pos)?;
        Ok(Self {
            indicator,
            bitmap: body[pos..].into(),
        })
    }

    /// A section stating that no bit map applies to the data.
    pub fn absent() -> Self {
        Self {
            indicator: Self::INDICATOR_ABSENT,
            bitmap: Box::new([]),
        }
    }

    /// Octets of the bit map following the indicator.
    pub fn bits(&self) -> &[u8] {
        &self.bitmap
    }
}
