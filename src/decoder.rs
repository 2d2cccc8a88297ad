use std::{collections::BTreeMap, fmt, io::Read, ops::Deref};

use log::debug;

use crate::{
    datatypes::{Bitmap, ReprDefinition, TemplateParam},
    error::GribError,
    reader::SectionEnvelope,
};

mod bitmap;
mod image;
mod jpeg2000;
mod missing;
#[cfg(feature = "png-unpack-with-png-crate")]
mod png;
mod simple;
mod stream;

pub use image::{DecodedImage, ImageCodec};
#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
pub use jpeg2000::OpenJpegCodec;
pub use jpeg2000::Jpeg2000CodeStream;
#[cfg(feature = "png-unpack-with-png-crate")]
pub use png::{PngCodec, PngCompression};
pub use simple::{SimplePacking, unpack_simple};

/// A decoding strategy for one data representation template.
///
/// Implementations read the template-specific fields of Section 5 and turn
/// the body of Section 7 into values, one per encoded point. Values of points
/// declared as missing are NaN.
pub trait DataTemplate: Send + Sync {
    /// Data representation template number this strategy is registered for
    /// (see Code Table 5.0).
    fn template_num(&self) -> u16;

    /// Reads the fields following the ones common to all templates.
    ///
    /// The default implementation is for templates without such fields.
    fn read_param(&self, _slice: &[u8], _pos: &mut usize) -> Result<TemplateParam, GribError> {
        Ok(TemplateParam::Simple)
    }

    /// Whether octets following the template-specific fields of Section 5
    /// belong to the template. They are kept in [`ReprDefinition::trailer`].
    ///
    /// When this is `false`, such octets make decoding of Section 5 fail.
    fn accepts_trailer(&self) -> bool {
        false
    }

    /// Decodes `payload`, the body of Section 7, into values of encoded
    /// points.
    fn decode(&self, repr: &ReprDefinition, payload: &[u8]) -> Result<Vec<f64>, GribError>;
}

/// A mapping from data representation template numbers to decoding
/// strategies.
///
/// The registry is populated before decoding starts and is only read during
/// decoding, so it can be shared among threads decoding different messages.
pub struct TemplateRegistry {
    templates: BTreeMap<u16, Box<dyn DataTemplate>>,
}

impl TemplateRegistry {
    /// Creates a registry without any template.
    pub fn new() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Creates a registry with all templates supported by the enabled
    /// features.
    pub fn with_default_templates() -> Self {
        let mut registry = Self::new();
        registry.register(SimplePacking);
        #[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
        registry.register(Jpeg2000CodeStream::default());
        #[cfg(feature = "png-unpack-with-png-crate")]
        registry.register(PngCompression::default());
        registry
    }

    /// Registers `template` under its template number and returns the
    /// strategy previously registered under the same number, if any.
    pub fn register<T: DataTemplate + 'static>(
        &mut self,
        template: T,
    ) -> Option<Box<dyn DataTemplate>> {
        self.templates
            .insert(template.template_num(), Box::new(template))
    }

    /// Returns the strategy registered for `template_num`.
    pub fn get(&self, template_num: u16) -> Result<&dyn DataTemplate, GribError> {
        self.templates
            .get(&template_num)
            .map(|t| t.as_ref())
            .ok_or(GribError::UnsupportedTemplate(template_num))
    }

    /// Template numbers with a registered strategy, in ascending order.
    pub fn template_nums(&self) -> impl Iterator<Item = u16> + '_ {
        self.templates.keys().copied()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_default_templates()
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.template_nums()).finish()
    }
}

/// Shape of the grid as declared in the Grid Definition Section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    num_points: usize,
}

impl GridShape {
    pub fn new(num_points: usize) -> Self {
        Self { num_points }
    }

    /// Shape of a grid with `ni` points along a parallel and `nj` points along
    /// a meridian.
    pub fn from_dims(ni: u32, nj: u32) -> Self {
        Self::new(ni as usize * nj as usize)
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }
}

/// Decoded values, one per grid point, in the scanning order of the encoded
/// data. Grid points without a value are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGrid(Box<[f64]>);

impl DecodedGrid {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of grid points without a value.
    pub fn num_missing(&self) -> usize {
        self.0.iter().filter(|v| v.is_nan()).count()
    }

    pub fn into_boxed_slice(self) -> Box<[f64]> {
        self.0
    }
}

impl Deref for DecodedGrid {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DecodedGrid> for Vec<f64> {
    fn from(grid: DecodedGrid) -> Self {
        grid.0.into_vec()
    }
}

/// Decoder for the data of one field, made of Sections 5, 6 and 7.
///
/// Section 5 is decoded when the decoder is created, so that the header stays
/// available through [`Grib2DataDecoder::repr`] even if decoding of the data
/// itself fails.
pub struct Grib2DataDecoder<'r> {
    template: &'r dyn DataTemplate,
    repr: ReprDefinition,
    bitmap: Bitmap,
    payload: Box<[u8]>,
    grid: GridShape,
}

impl<'r> Grib2DataDecoder<'r> {
    /// Creates a decoder from sections read by the caller.
    pub fn new(
        registry: &'r TemplateRegistry,
        sect5: &SectionEnvelope,
        sect6: &SectionEnvelope,
        sect7: SectionEnvelope,
        grid: GridShape,
    ) -> Result<Self, GribError> {
        let repr = ReprDefinition::from_envelope(registry, sect5)?;
        let bitmap = Bitmap::from_envelope(sect6)?;
        sect7.expect(7, 0)?;
        Self::from_parts(registry, repr, bitmap, sect7, grid)
    }

    /// Reads Sections 5, 6 and 7 in this order from `reader` positioned at
    /// the start of Section 5.
    ///
    /// The template is resolved right after reading Section 5, so nothing
    /// beyond it is consumed when the template is not supported.
    pub fn from_reader<R: Read>(
        registry: &'r TemplateRegistry,
        reader: &mut R,
        grid: GridShape,
    ) -> Result<Self, GribError> {
        let repr = ReprDefinition::from_reader(registry, reader)?;
        let bitmap = Bitmap::from_reader(reader)?;
        let sect7 = SectionEnvelope::read_section(reader, 7, 0)?;
        Self::from_parts(registry, repr, bitmap, sect7, grid)
    }

    fn from_parts(
        registry: &'r TemplateRegistry,
        repr: ReprDefinition,
        bitmap: Bitmap,
        sect7: SectionEnvelope,
        grid: GridShape,
    ) -> Result<Self, GribError> {
        let template = registry.get(repr.template_num)?;
        let payload = sect7.body().into();
        Ok(Self {
            template,
            repr,
            bitmap,
            payload,
            grid,
        })
    }

    /// Decoded Data Representation Section.
    pub fn repr(&self) -> &ReprDefinition {
        &self.repr
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Decodes the data into values for all grid points.
    pub fn dispatch(&self) -> Result<DecodedGrid, GribError> {
        let encoded = self.template.decode(&self.repr, &self.payload)?;
        let num_encoded = self.repr.num_encoded_points();
        if encoded.len() != num_encoded {
            return Err(GribError::SectionLengthMismatch {
                expected: num_encoded,
                actual: encoded.len(),
            });
        }

        let decoded = bitmap::apply_bitmap(&self.bitmap, encoded, self.grid.num_points())?;
        let grid = DecodedGrid(decoded.into_boxed_slice());
        debug!(
            "decoded {} grid points ({} missing) with template {}",
            grid.len(),
            grid.num_missing(),
            self.repr.template_num
        );
        Ok(grid)
    }
}
