use num::ToPrimitive;

use crate::{
    datatypes::{ReprDefinition, SimplePackingParam},
    decoder::{DataTemplate, stream::unpack_bits},
    error::GribError,
    helpers::num_octets,
};

/// Grid point data - simple packing (template 5.0).
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePacking;

impl DataTemplate for SimplePacking {
    fn template_num(&self) -> u16 {
        0
    }

    fn decode(&self, repr: &ReprDefinition, payload: &[u8]) -> Result<Vec<f64>, GribError> {
        let num_points = repr.num_encoded_points();
        let nbit = usize::from(repr.simple.num_bits);
        if nbit > 0 {
            let expected = num_points
                .checked_mul(nbit)
                .map(num_octets)
                .ok_or(GribError::TruncatedInput)?;
            if payload.len() > expected {
                return Err(GribError::SectionLengthMismatch {
                    expected,
                    actual: payload.len(),
                });
            }
        }
        unpack_simple(payload, &repr.simple, num_points)
    }
}

/// Unpacks `num_points` values packed with `param.num_bits` bits each from
/// `payload` and reconstructs `(R + X * 2^E) / 10^D` for each packed value X.
///
/// When the number of bits is 0, every value is `R / 10^D` and `payload` is
/// not read.
pub fn unpack_simple(
    payload: &[u8],
    param: &SimplePackingParam,
    num_points: usize,
) -> Result<Vec<f64>, GribError> {
    let raw = unpack_bits(payload, param.num_bits, num_points)?;
    let decoder = SimplePackingDecoder::new(raw.map(Some), param);
    Ok(decoder.collect())
}

/// Reconstructs values from raw packed integers.
///
/// Raw values of `None` are missing and decoded as NaN.
pub(crate) struct SimplePackingDecoder<I> {
    iter: I,
    ref_val: f64,
    bin_factor: f64,
    dec_mul: f64,
    dec_div: f64,
}

impl<I> SimplePackingDecoder<I> {
    pub(crate) fn new(iter: I, param: &SimplePackingParam) -> Self {
        let exp = i32::from(param.exp);
        let dig = i32::from(param.dec);
        // Negative powers of 10 are not exactly representable, so the decimal
        // factor is applied as a multiplication or a division by an exact
        // positive power.
        let (dec_mul, dec_div) = if dig >= 0 {
            (1.0, 10_f64.powi(dig))
        } else {
            (10_f64.powi(-dig), 1.0)
        };
        Self {
            iter,
            ref_val: f64::from(param.ref_val),
            bin_factor: 2_f64.powi(exp),
            dec_mul,
            dec_div,
        }
    }
}

impl<I, N> Iterator for SimplePackingDecoder<I>
where
    I: Iterator<Item = Option<N>>,
    N: ToPrimitive,
{
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let encoded = self.iter.next()?;
        let value = match encoded.and_then(|n| n.to_f64()) {
            Some(encoded) => {
                let diff = encoded * self.bin_factor;
                (self.ref_val + diff) * self.dec_mul / self.dec_div
            }
            None => f64::NAN,
        };
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}
