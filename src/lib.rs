//! Decoding of the data part of GRIB2 messages.
//!
//! The Data Representation Section (Section 5) tells how values are packed,
//! the Bit-Map Section (Section 6) tells which grid points have a value, and
//! the Data Section (Section 7) carries the packed values. This crate turns
//! those sections into one `f64` per grid point, with missing points as NaN.
//!
//! Packing schemes are looked up in a [`TemplateRegistry`] by data
//! representation template number. Simple packing (template 5.0) is always
//! available. JPEG 2000 code stream (5.40) and PNG (5.41) templates are
//! available with the `jpeg2000-unpack-with-openjpeg` and
//! `png-unpack-with-png-crate` features respectively, and can be registered
//! with any other [`ImageCodec`].
//!
//! ```
//! use grib_repr::{Grib2DataDecoder, GridShape, TemplateRegistry};
//!
//! let mut sections = Vec::new();
//! // Section 5: 4 points, template 5.0, R = 1.0, E = 0, D = 0, 8 bits
//! sections.extend_from_slice(&[0, 0, 0, 21, 5, 0, 0, 0, 4, 0, 0]);
//! sections.extend_from_slice(&[0x3f, 0x80, 0, 0, 0, 0, 0, 0, 8, 0]);
//! // Section 6: no bit map
//! sections.extend_from_slice(&[0, 0, 0, 6, 6, 255]);
//! // Section 7
//! sections.extend_from_slice(&[0, 0, 0, 9, 7, 0, 1, 2, 3]);
//!
//! let registry = TemplateRegistry::with_default_templates();
//! let mut reader = sections.as_slice();
//! let decoder = Grib2DataDecoder::from_reader(&registry, &mut reader, GridShape::new(4))?;
//! assert_eq!(decoder.repr().num_encoded_points(), 4);
//! assert_eq!(decoder.dispatch()?.values(), &[1.0, 2.0, 3.0, 4.0]);
//! # Ok::<(), grib_repr::GribError>(())
//! ```

mod datatypes;
mod decoder;
mod error;
mod helpers;
mod reader;

pub use crate::{
    datatypes::*,
    decoder::*,
    error::*,
    helpers::TryFromSlice,
    reader::{SECT_HEADER_SIZE, SectionEnvelope},
};
