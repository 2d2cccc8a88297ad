use crate::error::GribError;

pub(crate) trait GribInt<I> {
    fn as_grib_int(&self) -> I;
}

macro_rules! add_impl_for_ints {
    ($(($ty_src:ty, $ty_dst:ty),)*) => ($(
        impl GribInt<$ty_dst> for $ty_src {
            fn as_grib_int(&self) -> $ty_dst {
                if self.leading_zeros() == 0 {
                    let abs = (self << 1 >> 1) as $ty_dst;
                    -abs
                } else {
                    *self as $ty_dst
                }
            }
        }
    )*);
}

add_impl_for_ints! {
    (u8, i8),
    (u16, i16),
    (u32, i32),
}

#[inline]
pub(crate) fn num_octets(num_bits: usize) -> usize {
    num_bits.div_ceil(8)
}

/// A reader that decodes a fixed-layout record from a slice.
///
/// The `pos` argument holds the starting position within the slice. On
/// success it is advanced by exactly the number of octets the record
/// occupies, so that records can be read one after another without manual
/// offset bookkeeping. On failure `pos` is left as it was.
///
/// Multi-octet values are read in big-endian order and signed integers follow
/// the GRIB convention, where the most significant bit is the sign and the
/// remaining bits are the magnitude.
pub trait TryFromSlice {
    fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<Self, GribError>
    where
        Self: Sized;
}

impl<const N: usize> TryFromSlice for [u8; N] {
    fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<[u8; N], GribError> {
        let start = *pos;
        let end = start.checked_add(N).ok_or(GribError::TruncatedInput)?;
        let octets = slice
            .get(start..end)
            .and_then(|s| <[u8; N]>::try_from(s).ok())
            .ok_or(GribError::TruncatedInput)?;
        *pos = end;
        Ok(octets)
    }
}

macro_rules! add_impl_for_unsigned_integer_and_float_types {
    ($($ty:ty,)*) => ($(
        impl TryFromSlice for $ty {
            fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<$ty, GribError> {
                let n = <$ty>::from_be_bytes(TryFromSlice::try_from_slice(slice, pos)?);
                Ok(n)
            }
        }
    )*);
}

add_impl_for_unsigned_integer_and_float_types![u8, u16, u32, u64, f32,];

macro_rules! add_impl_for_signed_integer_types {
    ($(($ty_src:ty, $ty_dst:ty),)*) => ($(
        impl TryFromSlice for $ty_dst {
            fn try_from_slice(slice: &[u8], pos: &mut usize) -> Result<$ty_dst, GribError> {
                let n = <$ty_src>::from_be_bytes(TryFromSlice::try_from_slice(slice, pos)?)
                    .as_grib_int();
                Ok(n)
            }
        }
    )*);
}

add_impl_for_signed_integer_types![(u8, i8), (u16, i16), (u32, i32),];
