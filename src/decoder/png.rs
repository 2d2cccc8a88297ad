use std::io::Cursor;

use log::warn;

use crate::{
    datatypes::ReprDefinition,
    decoder::{
        DataTemplate,
        image::{DecodedImage, ImageCodec, decode_image},
        stream::NBitwiseIterator,
    },
    error::GribError,
};

/// Grid point data - Portable Network Graphics format (template 5.41).
pub struct PngCompression {
    codec: Box<dyn ImageCodec>,
}

impl PngCompression {
    pub fn with_codec<C: ImageCodec + 'static>(codec: C) -> Self {
        Self {
            codec: Box::new(codec),
        }
    }
}

impl Default for PngCompression {
    fn default() -> Self {
        Self::with_codec(PngCodec)
    }
}

impl DataTemplate for PngCompression {
    fn template_num(&self) -> u16 {
        41
    }

    fn decode(&self, repr: &ReprDefinition, payload: &[u8]) -> Result<Vec<f64>, GribError> {
        if repr.simple.num_bits != 0 && repr.simple.num_bits != 16 {
            warn!(
                "PNG data with {} bits per value has not been tested",
                repr.simple.num_bits
            );
        }
        decode_image(self.codec.as_ref(), repr, payload)
    }
}

/// PNG image decoder backed by the `png` crate.
///
/// Colour channels of an image become separate components. Palette-based
/// images are not supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, codestream: &[u8]) -> Result<DecodedImage, GribError> {
        let mut decoder = png::Decoder::new(Cursor::new(codestream));
        decoder.set_transformations(png::Transformations::IDENTITY);
        let mut reader = decoder
            .read_info()
            .map_err(|e| GribError::CodecDecodeError(format!("PNG decode error: {e}")))?;
        let buf_size = reader.output_buffer_size().ok_or_else(|| {
            GribError::CodecDecodeError("getting output buffer size failed".to_owned())
        })?;
        let mut buf = vec![0; buf_size];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| GribError::CodecDecodeError(format!("PNG decode error: {e}")))?;

        if info.color_type == png::ColorType::Indexed {
            return Err(GribError::UnsupportedEncoding(
                "PNG colour type",
                info.color_type as u64,
            ));
        }

        let width = info.width as usize;
        let height = info.height as usize;
        let num_channels = info.color_type.samples();
        let bit_depth = info.bit_depth as usize;

        let mut components = vec![Vec::with_capacity(width * height); num_channels];
        for row in buf.chunks(info.line_size).take(height) {
            let samples = NBitwiseIterator::new(row, bit_depth).take(width * num_channels);
            for (i, sample) in samples.enumerate() {
                components[i % num_channels].push(sample as i32);
            }
        }
        DecodedImage::new(width, height, components)
    }
}
