use std::ptr::NonNull;

use openjpeg_sys as opj;

use crate::error::GribError;

#[derive(Debug)]
pub(crate) struct Image(NonNull<opj::opj_image_t>);

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            opj::opj_image_destroy(self.0.as_ptr());
        }
    }
}

impl Image {
    pub(crate) fn new(ptr: *mut opj::opj_image_t) -> Result<Self, GribError> {
        let img = NonNull::new(ptr).ok_or_else(|| {
            GribError::CodecDecodeError("initialization of the JPEG 2000 image failed".to_owned())
        })?;
        Ok(Self(img))
    }

    fn inner(&self) -> &opj::opj_image_t {
        unsafe { &(*self.0.as_ptr()) }
    }

    pub(crate) fn components(&self) -> &[ImageComponent] {
        let img = self.inner();
        let numcomps = img.numcomps;
        if img.comps.is_null() || numcomps == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(img.comps as *mut ImageComponent, numcomps as usize) }
    }

    pub(crate) fn as_ptr(&self) -> *mut opj::opj_image_t {
        self.0.as_ptr()
    }
}

#[repr(transparent)]
pub(crate) struct ImageComponent(opj::opj_image_comp_t);

impl ImageComponent {
    pub(crate) fn width(&self) -> usize {
        self.0.w as usize
    }

    pub(crate) fn height(&self) -> usize {
        self.0.h as usize
    }

    /// Samples of the component, available after the image body is decoded.
    pub(crate) fn data(&self) -> Result<&[i32], GribError> {
        if self.0.data.is_null() {
            return Err(GribError::CodecDecodeError(
                "JPEG 2000 image component has no data".to_owned(),
            ));
        }
        let len = self.width() * self.height();
        Ok(unsafe { std::slice::from_raw_parts(self.0.data, len) })
    }
}
