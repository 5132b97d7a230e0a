use core::convert::Infallible;

/// Fallible counterpart of [`FromIterator`].
///
/// SSZ collections have fixed or bounded lengths, so constructing one from an
/// arbitrary iterator can fail. Coherence rules prevent expressing that with
/// [`FromIterator`] or [`TryFrom`], hence this trait.
pub trait TryFromIterator<T>: Sized {
    type Error;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error>;
}

impl<T> TryFromIterator<T> for Box<[T]> {
    type Error = Infallible;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        Ok(Self::from_iter(items))
    }
}

impl<T> TryFromIterator<T> for Vec<T> {
    type Error = Infallible;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        Ok(Self::from_iter(items))
    }
}
