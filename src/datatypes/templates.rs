use std::io::Read;

use log::debug;
use num_enum::TryFromPrimitive;

use crate::{
    decoder::TemplateRegistry,
    error::GribError,
    helpers::TryFromSlice,
    reader::{SectionEnvelope, ensure_fully_consumed},
};

/// Octets of the fixed part of Section 5 following the common header: the
/// number of encoded points, the template number and the fields shared by all
/// templates.
const SECT5_MIN_BODY_SIZE: usize = 6 + SimplePackingParam::SIZE;

/// Data Representation Section.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprDefinition {
    /// Number of data points where one or more values are specified in Section
    /// 7 when a bit map is present, total number of data points when a bit map
    /// is absent.
    pub num_encoded_points: u32,
    /// Data representation template number (see Code Table 5.0).
    pub template_num: u16,
    /// Fields common to all supported templates.
    pub simple: SimplePackingParam,
    /// Template-specific fields following the common ones.
    pub template: TemplateParam,
    /// Octets following the template-specific fields, for templates carrying
    /// their data inside Section 5 (the code stream of template 40). Empty
    /// otherwise.
    pub trailer: Box<[u8]>,
}

impl ReprDefinition {
    /// Reads Section 5 and decodes it with the template registered in
    /// `registry`.
    pub fn from_reader<R: Read>(
        registry: &TemplateRegistry,
        reader: &mut R,
    ) -> Result<Self, GribError> {
        let sect = SectionEnvelope::read_section(reader, 5, SECT5_MIN_BODY_SIZE)?;
        Self::from_envelope(registry, &sect)
    }

    pub fn from_envelope(
        registry: &TemplateRegistry,
        sect: &SectionEnvelope,
    ) -> Result<Self, GribError> {
        sect.expect(5, SECT5_MIN_BODY_SIZE)?;
        let body = sect.body();
        let mut pos = 0;
        let num_encoded_points = u32::try_from_slice(body, &mut pos)?;
        let template_num = u16::try_from_slice(body, &mut pos)?;
        let template = registry.get(template_num)?;

        let simple = SimplePackingParam::try_from_slice(body, &mut pos)?;
        let template_param = template.read_param(body, &mut pos)?;
        let trailer: Box<[u8]> = if template.accepts_trailer() {
            body[pos..].into()
        } else {
            ensure_fully_consumed(body, pos)?;
            Box::default()
        };

        debug!(
            "data representation template {template_num}: {num_encoded_points} points, \
             {} bits per value, {} trailing octets",
            simple.num_bits,
            trailer.len()
        );
        Ok(Self {
            num_encoded_points,
            template_num,
            simple,
            template: template_param,
            trailer,
        })
    }

    pub fn num_encoded_points(&self) -> usize {
        self.num_encoded_points as usize
    }
}

/// Fields of data representation templates following the common
/// [`SimplePackingParam`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateParam {
    /// No template-specific fields.
    Simple,
    /// Fields of the image compression template (template 40).
    ImageCompression(ImageCompressionParam),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimplePackingParam {
    /// Reference value (R) (IEEE 32-bit floating-point value).
    pub ref_val: f32,
    /// Binary scale factor (E).
    pub exp: i16,
    /// Decimal scale factor (D).
    pub dec: i16,
    /// Number of bits used for each packed value.
    pub num_bits: u8,
    /// Type of original field values (see Code Table 5.1).
    pub orig_field_type: OriginalFieldType,
}

impl SimplePackingParam {
    pub(crate) const SIZE: usize = 10;
    const MAX_NUM_BITS: u8 = 32;

    /// Value of every grid point of a field encoded with 0 bits per value.
    pub fn zero_bit_reference_value(&self) -> f64 {
        let dig = i32::from(self.dec);
        let ref_val = f64::from(self.ref_val);
        if dig >= 0 {
            ref_val / 10_f64.powi(dig)
        } else {
            ref_val * 10_f64.powi(-dig)
        }
    }
}

impl TryFromSlice for SimplePackingParam {
    fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<Self, GribError> {
        let mut cursor = *pos;
        let ref_val = f32::try_from_slice(slice, &mut cursor)?;
        let exp = i16::try_from_slice(slice, &mut cursor)?;
        let dec = i16::try_from_slice(slice, &mut cursor)?;
        let num_bits = u8::try_from_slice(slice, &mut cursor)?;
        let orig_field_type = u8::try_from_slice(slice, &mut cursor)?;

        if num_bits > Self::MAX_NUM_BITS {
            return Err(GribError::MalformedHeader(format!(
                "number of bits per packed value is {num_bits} (> {})",
                Self::MAX_NUM_BITS
            )));
        }
        let orig_field_type = OriginalFieldType::try_from(orig_field_type).map_err(|_| {
            GribError::UnsupportedEncoding(
                "GRIB2 code table 5.1 (type of original field values)",
                orig_field_type.into(),
            )
        })?;

        *pos = cursor;
        Ok(Self {
            ref_val,
            exp,
            dec,
            num_bits,
            orig_field_type,
        })
    }
}

/// Type of original field values (Code Table 5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum OriginalFieldType {
    FloatingPoint = 0,
    Integer = 1,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageCompressionParam {
    /// Group splitting method used (see Code Table 5.4).
    pub group_splitting_method: u8,
    /// Missing value management used (see Code Table 5.5).
    pub missing_value_management: MissingValueManagement,
    /// Primary missing value substitute, as an encoded bit pattern.
    pub primary_missing_value: u32,
    /// Secondary missing value substitute, as an encoded bit pattern.
    pub secondary_missing_value: u32,
}

impl TryFromSlice for ImageCompressionParam {
    fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<Self, GribError> {
        let mut cursor = *pos;
        let group_splitting_method = u8::try_from_slice(slice, &mut cursor)?;
        let missing_value_management = u8::try_from_slice(slice, &mut cursor)?;
        let primary_missing_value = u32::try_from_slice(slice, &mut cursor)?;
        let secondary_missing_value = u32::try_from_slice(slice, &mut cursor)?;

        let missing_value_management = MissingValueManagement::try_from(missing_value_management)
            .map_err(|_| {
                GribError::UnsupportedEncoding(
                    "GRIB2 code table 5.5 (missing value management)",
                    missing_value_management.into(),
                )
            })?;

        *pos = cursor;
        Ok(Self {
            group_splitting_method,
            missing_value_management,
            primary_missing_value,
            secondary_missing_value,
        })
    }
}

/// Missing value management used (Code Table 5.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum MissingValueManagement {
    /// No explicit missing values included within the data values
    None = 0,
    /// Primary missing values included within the data values
    Primary = 1,
    /// Primary and secondary missing values included within the data values
    PrimaryAndSecondary = 2,
}
