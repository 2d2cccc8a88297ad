use crate::{
    datatypes::{ImageCompressionParam, ReprDefinition, TemplateParam},
    decoder::{
        DataTemplate,
        image::{ImageCodec, decode_image},
    },
    error::GribError,
    helpers::TryFromSlice,
};

#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
mod image;
#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
mod stream;

/// Grid point data - JPEG 2000 code stream format (template 5.40).
///
/// The code stream is taken from the octets following the template fields in
/// Section 5 if there are any, and from Section 7 otherwise. It is decoded by
/// the codec given at construction.
pub struct Jpeg2000CodeStream {
    codec: Box<dyn ImageCodec>,
}

impl Jpeg2000CodeStream {
    pub fn with_codec<C: ImageCodec + 'static>(codec: C) -> Self {
        Self {
            codec: Box::new(codec),
        }
    }
}

#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
impl Default for Jpeg2000CodeStream {
    fn default() -> Self {
        Self::with_codec(OpenJpegCodec)
    }
}

impl DataTemplate for Jpeg2000CodeStream {
    fn template_num(&self) -> u16 {
        40
    }

    fn read_param(&self, slice: &[u8], pos: &mut usize) -> Result<TemplateParam, GribError> {
        let param = ImageCompressionParam::try_from_slice(slice, pos)?;
        Ok(TemplateParam::ImageCompression(param))
    }

    fn accepts_trailer(&self) -> bool {
        true
    }

    fn decode(&self, repr: &ReprDefinition, payload: &[u8]) -> Result<Vec<f64>, GribError> {
        let codestream = if repr.trailer.is_empty() {
            payload
        } else if payload.is_empty() {
            &repr.trailer
        } else {
            // a code stream in Section 5 leaves nothing for Section 7
            return Err(GribError::SectionLengthMismatch {
                expected: 0,
                actual: payload.len(),
            });
        };
        decode_image(self.codec.as_ref(), repr, codestream)
    }
}

/// JPEG 2000 code stream decoder backed by OpenJPEG.
#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenJpegCodec;

#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
impl ImageCodec for OpenJpegCodec {
    fn decode(&self, codestream: &[u8]) -> Result<crate::decoder::DecodedImage, GribError> {
        use openjpeg_sys as opj;

        let stream = stream::Stream::from_bytes(codestream)?;
        // GRIB2 embeds raw code streams without the JP2 file format wrapping.
        let codec = J2kCodec::new()?;

        let mut params = unsafe { std::mem::zeroed::<opj::opj_dparameters>() };
        unsafe { opj::opj_set_default_decoder_parameters(&mut params) };
        succeeded(
            unsafe { opj::opj_setup_decoder(codec.as_ptr(), &mut params) },
            "setup of the decoder",
        )?;

        let mut img = std::ptr::null_mut();
        let header_read =
            unsafe { opj::opj_read_header(stream.as_ptr(), codec.as_ptr(), &mut img) };
        let img = image::Image::new(img)?;
        succeeded(header_read, "reading of the code stream header")?;
        succeeded(
            unsafe { opj::opj_decode(codec.as_ptr(), stream.as_ptr(), img.as_ptr()) },
            "decoding of the code stream",
        )?;

        let components = img.components();
        let (width, height) = components
            .first()
            .map_or((0, 0), |comp| (comp.width(), comp.height()));
        let samples = components
            .iter()
            .map(|comp| comp.data().map(<[i32]>::to_vec))
            .collect::<Result<Vec<_>, _>>()?;
        crate::decoder::DecodedImage::new(width, height, samples)
    }
}

#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
struct J2kCodec(std::ptr::NonNull<openjpeg_sys::opj_codec_t>);

#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
impl J2kCodec {
    fn new() -> Result<Self, GribError> {
        let ptr = unsafe {
            openjpeg_sys::opj_create_decompress(openjpeg_sys::OPJ_CODEC_FORMAT::OPJ_CODEC_J2K)
        };
        std::ptr::NonNull::new(ptr)
            .map(Self)
            .ok_or_else(|| GribError::CodecDecodeError("creation of the codec failed".to_owned()))
    }

    fn as_ptr(&self) -> *mut openjpeg_sys::opj_codec_t {
        self.0.as_ptr()
    }
}

#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
impl Drop for J2kCodec {
    fn drop(&mut self) {
        unsafe { openjpeg_sys::opj_destroy_codec(self.0.as_ptr()) }
    }
}

#[cfg(feature = "jpeg2000-unpack-with-openjpeg")]
fn succeeded(status: openjpeg_sys::OPJ_BOOL, action: &str) -> Result<(), GribError> {
    if status == 1 {
        Ok(())
    } else {
        Err(GribError::CodecDecodeError(format!("{action} failed")))
    }
}
