use log::debug;

use crate::{
    datatypes::{ReprDefinition, TemplateParam},
    decoder::{missing::MissingValueResolver, simple::SimplePackingDecoder},
    error::GribError,
};

/// An image decoded from a code stream: `width` x `height` samples for each
/// component, stored row by row from the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: usize,
    height: usize,
    components: Vec<Vec<i32>>,
}

impl DecodedImage {
    pub fn new(width: usize, height: usize, components: Vec<Vec<i32>>) -> Result<Self, GribError> {
        let num_samples = width.checked_mul(height).ok_or_else(|| {
            GribError::CodecDecodeError(format!("image size {width}x{height} is too large"))
        })?;
        if let Some(comp) = components.iter().find(|c| c.len() != num_samples) {
            return Err(GribError::CodecDecodeError(format!(
                "component with {} samples in a {width}x{height} image",
                comp.len()
            )));
        }
        Ok(Self {
            width,
            height,
            components,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// Rows of component `index`, from the top row.
    pub fn rows(&self, index: usize) -> impl Iterator<Item = &[i32]> {
        let width = self.width.max(1);
        self.components
            .get(index)
            .into_iter()
            .flat_map(move |comp| comp.chunks(width))
    }
}

/// An image codec turning an embedded code stream into samples.
///
/// Implementations report code streams they cannot decode as
/// [`GribError::CodecDecodeError`].
pub trait ImageCodec: Send + Sync {
    fn decode(&self, codestream: &[u8]) -> Result<DecodedImage, GribError>;
}

impl<F> ImageCodec for F
where
    F: Fn(&[u8]) -> Result<DecodedImage, GribError> + Send + Sync,
{
    fn decode(&self, codestream: &[u8]) -> Result<DecodedImage, GribError> {
        self(codestream)
    }
}

/// Decodes `codestream` with `codec` and returns the samples of the single
/// image component in row-major order, as raw values.
pub(crate) fn read_samples(
    codec: &dyn ImageCodec,
    codestream: &[u8],
    num_points: usize,
) -> Result<Vec<u32>, GribError> {
    if codestream.is_empty() {
        return Err(GribError::CodecDecodeError("code stream is empty".to_owned()));
    }

    let image = codec.decode(codestream)?;
    debug!(
        "decoded {}x{} image with {} component(s)",
        image.width(),
        image.height(),
        image.num_components()
    );

    if image.num_components() != 1 {
        return Err(GribError::UnsupportedEncoding(
            "number of image components",
            image.num_components() as u64,
        ));
    }

    let num_samples = image.width() * image.height();
    if num_samples != num_points {
        return Err(GribError::CodecDecodeError(format!(
            "{num_samples} samples decoded while {num_points} points are declared"
        )));
    }

    image
        .rows(0)
        .flatten()
        .map(|&sample| {
            u32::try_from(sample).map_err(|_| {
                GribError::CodecDecodeError(format!("negative sample value {sample}"))
            })
        })
        .collect()
}

/// Decodes image samples and scales them like simply packed values, applying
/// missing value management of template 40 if `repr` has it.
pub(crate) fn decode_image(
    codec: &dyn ImageCodec,
    repr: &ReprDefinition,
    codestream: &[u8],
) -> Result<Vec<f64>, GribError> {
    let num_points = repr.num_encoded_points();
    if repr.simple.num_bits == 0 {
        return Ok(vec![repr.simple.zero_bit_reference_value(); num_points]);
    }

    let samples = read_samples(codec, codestream, num_points)?;
    let values = match &repr.template {
        TemplateParam::ImageCompression(param) => {
            let resolved = MissingValueResolver::new(samples.into_iter(), param);
            SimplePackingDecoder::new(resolved, &repr.simple).collect()
        }
        TemplateParam::Simple => {
            SimplePackingDecoder::new(samples.into_iter().map(Some), &repr.simple).collect()
        }
    };
    Ok(values)
}
