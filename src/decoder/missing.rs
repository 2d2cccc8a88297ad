use crate::datatypes::{ImageCompressionParam, MissingValueManagement};

/// Marks raw values equal to the declared missing value substitutes as
/// missing (`None`).
///
/// Substitutes are compared with the raw encoded integers, before any
/// scaling is applied.
pub(crate) struct MissingValueResolver<I> {
    iter: I,
    primary: Option<u32>,
    secondary: Option<u32>,
}

impl<I> MissingValueResolver<I> {
    pub(crate) fn new(iter: I, param: &ImageCompressionParam) -> Self {
        let (primary, secondary) = match param.missing_value_management {
            MissingValueManagement::None => (None, None),
            MissingValueManagement::Primary => (Some(param.primary_missing_value), None),
            MissingValueManagement::PrimaryAndSecondary => (
                Some(param.primary_missing_value),
                Some(param.secondary_missing_value),
            ),
        };
        Self {
            iter,
            primary,
            secondary,
        }
    }

    fn is_missing(&self, value: u32) -> bool {
        self.primary == Some(value) || self.secondary == Some(value)
    }
}

impl<I> Iterator for MissingValueResolver<I>
where
    I: Iterator<Item = u32>,
{
    type Item = Option<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.iter.next()?;
        if self.is_missing(value) {
            Some(None)
        } else {
            Some(Some(value))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}
