use crate::{datatypes::Bitmap, error::GribError, helpers::num_octets};

/// Spreads values of encoded points over all `num_points` grid points
/// following the bit map in `bitmap`.
pub(crate) fn apply_bitmap(
    bitmap: &Bitmap,
    values: Vec<f64>,
    num_points: usize,
) -> Result<Vec<f64>, GribError> {
    match bitmap.indicator {
        Bitmap::INDICATOR_ABSENT => {
            if values.len() != num_points {
                return Err(GribError::SectionLengthMismatch {
                    expected: num_points,
                    actual: values.len(),
                });
            }
            Ok(values)
        }
        Bitmap::INDICATOR_PRESENT => {
            let iter = BitmapDecodeIterator::new(bitmap.bits(), values.into_iter(), num_points)?;
            Ok(iter.collect())
        }
        indicator => Err(GribError::UnsupportedEncoding(
            "GRIB2 code table 6.0 (bit map indicator)",
            indicator.into(),
        )),
    }
}

pub(crate) struct BitmapDecodeIterator<'b, I> {
    bitmap: &'b [u8],
    values: I,
    len: usize,
    pos: usize,
}

impl<'b, I> BitmapDecodeIterator<'b, I>
where
    I: ExactSizeIterator<Item = f64>,
{
    pub(crate) fn new(bitmap: &'b [u8], values: I, len: usize) -> Result<Self, GribError> {
        let bitmap_len = num_octets(len);
        if bitmap.len() < bitmap_len {
            return Err(GribError::SectionLengthMismatch {
                expected: bitmap_len,
                actual: bitmap.len(),
            });
        }

        let bitmap = &bitmap[..bitmap_len];
        let num_present = (0..len).filter(|i| !has_zero_at(bitmap, *i)).count();
        if num_present != values.len() {
            return Err(GribError::SectionLengthMismatch {
                expected: num_present,
                actual: values.len(),
            });
        }

        Ok(Self {
            bitmap,
            values,
            len,
            pos: 0,
        })
    }
}

impl<I> Iterator for BitmapDecodeIterator<'_, I>
where
    I: Iterator<Item = f64>,
{
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.len {
            return None;
        }
        let pos = self.pos;
        self.pos += 1;

        if has_zero_at(self.bitmap, pos) {
            Some(f64::NAN)
        } else {
            self.values.next()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.len - self.pos;
        (size, Some(size))
    }
}

const MASK: u8 = 0b10000000;

fn has_zero_at(bitmap: &[u8], pos: usize) -> bool {
    let masked = bitmap[pos / 8] & (MASK >> (pos % 8));
    masked == 0
}
