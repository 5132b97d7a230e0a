use std::sync::Arc as StdArc;

use easy_ext::ext;
use triomphe::Arc as TriompheArc;

/// Explicitly named clone and copy-on-write access for reference-counted pointers.
///
/// `Arc::clone(x)` cannot be called in method position and `x.clone()` hides the
/// fact that only the pointer is cloned. A single trait covers both `std` and
/// `triomphe` pointers so generic code does not care which one it is given.
pub trait ArcExt<T: ?Sized> {
    #[must_use]
    fn clone_arc(&self) -> Self
    where
        Self: Clone,
    {
        Self::clone(self)
    }

    #[must_use]
    fn make_mut(&mut self) -> &mut T
    where
        T: Clone;
}

impl<T: ?Sized> ArcExt<T> for StdArc<T> {
    fn make_mut(&mut self) -> &mut T
    where
        T: Clone,
    {
        Self::make_mut(self)
    }
}

impl<T: ?Sized> ArcExt<T> for TriompheArc<T> {
    fn make_mut(&mut self) -> &mut T
    where
        T: Clone,
    {
        Self::make_mut(self)
    }
}

#[ext(CopyExt)]
pub impl<T: Copy> T {
    /// Like [`Clone::clone`], but only for [`Copy`] types.
    /// Useful for copying out of references in method chains.
    #[must_use]
    fn copy(&self) -> Self {
        *self
    }
}

#[ext(DefaultExt)]
pub impl<T: PartialEq + Default> T {
    #[must_use]
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
