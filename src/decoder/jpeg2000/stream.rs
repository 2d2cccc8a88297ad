use std::{
    ffi::c_void,
    io::{Cursor, Read},
    marker::PhantomData,
};

use openjpeg_sys as opj;

use crate::error::GribError;

/// User data handed to OpenJPEG callbacks.
type Source<'a> = Cursor<&'a [u8]>;

fn source<'a>(p_data: *mut c_void) -> &'a mut Source<'a> {
    unsafe { &mut *(p_data as *mut Source<'a>) }
}

extern "C" fn read_fn(p_buffer: *mut c_void, nb_bytes: usize, p_data: *mut c_void) -> usize {
    if p_buffer.is_null() || nb_bytes == 0 {
        return usize::MAX;
    }
    let out = unsafe { std::slice::from_raw_parts_mut(p_buffer as *mut u8, nb_bytes) };
    match source(p_data).read(out) {
        Ok(0) | Err(_) => usize::MAX,
        Ok(n) => n,
    }
}

extern "C" fn skip_fn(nb_bytes: i64, p_data: *mut c_void) -> i64 {
    let src = source(p_data);
    let len = src.get_ref().len() as u64;
    let before = src.position();
    let after = before.saturating_add(nb_bytes.max(0) as u64).min(len);
    src.set_position(after);
    (after - before) as i64
}

extern "C" fn seek_fn(nb_bytes: i64, p_data: *mut c_void) -> i32 {
    let src = source(p_data);
    let len = src.get_ref().len() as u64;
    match u64::try_from(nb_bytes) {
        Ok(offset) if offset <= len => {
            src.set_position(offset);
            1
        }
        _ => {
            src.set_position(len);
            0
        }
    }
}

extern "C" fn free_fn(p_data: *mut c_void) {
    drop(unsafe { Box::from_raw(p_data as *mut Source<'_>) })
}

/// An OpenJPEG input stream reading from a borrowed buffer.
pub(crate) struct Stream<'a> {
    ptr: *mut opj::opj_stream_t,
    _buf: PhantomData<&'a [u8]>,
}

impl Drop for Stream<'_> {
    fn drop(&mut self) {
        unsafe { opj::opj_stream_destroy(self.ptr) }
    }
}

impl<'a> Stream<'a> {
    pub(crate) fn from_bytes(buf: &'a [u8]) -> Result<Self, GribError> {
        let ptr = unsafe { opj::opj_stream_default_create(1) };
        if ptr.is_null() {
            return Err(GribError::CodecDecodeError(
                "creation of the input stream failed".to_owned(),
            ));
        }

        let src: Box<Source<'a>> = Box::new(Cursor::new(buf));
        unsafe {
            opj::opj_stream_set_read_function(ptr, Some(read_fn));
            opj::opj_stream_set_skip_function(ptr, Some(skip_fn));
            opj::opj_stream_set_seek_function(ptr, Some(seek_fn));
            opj::opj_stream_set_user_data_length(ptr, buf.len() as u64);
            opj::opj_stream_set_user_data(ptr, Box::into_raw(src) as *mut c_void, Some(free_fn));
        }

        Ok(Self {
            ptr,
            _buf: PhantomData,
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut opj::opj_stream_t {
        self.ptr
    }
}
