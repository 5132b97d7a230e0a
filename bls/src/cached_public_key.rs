use core::fmt::{Debug, Formatter, Result as FmtResult};

use once_cell::race::OnceBox;
use serde::{Deserialize, Serialize};
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite, H256, U1};

use crate::{error::Error, public_key::PublicKey, public_key_bytes::PublicKeyBytes};

/// A compressed public key that memoizes its decompressed form.
///
/// Validators keep attesting for as long as they are active, so their public
/// keys are decompressed over and over. Decompression dominates signature
/// verification setup, making the cache worthwhile even though it adds a word
/// to every validator record.
#[derive(Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CachedPublicKey {
    bytes: PublicKeyBytes,
    #[serde(skip)]
    decompressed: OnceBox<PublicKey>,
}

impl Clone for CachedPublicKey {
    fn clone(&self) -> Self {
        match self.decompressed.get() {
            Some(public_key) => Self::new(self.bytes, *public_key),
            None => self.bytes.into(),
        }
    }
}

impl PartialEq for CachedPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for CachedPublicKey {}

impl Debug for CachedPublicKey {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        Debug::fmt(&self.bytes, formatter)
    }
}

impl From<PublicKeyBytes> for CachedPublicKey {
    #[inline]
    fn from(bytes: PublicKeyBytes) -> Self {
        Self {
            bytes,
            decompressed: OnceBox::new(),
        }
    }
}

impl From<PublicKey> for CachedPublicKey {
    #[inline]
    fn from(public_key: PublicKey) -> Self {
        Self::new(public_key.to_bytes(), public_key)
    }
}

impl SszSize for CachedPublicKey {
    const SIZE: Size = <PublicKeyBytes as SszSize>::SIZE;
}

impl<C> SszRead<C> for CachedPublicKey {
    #[inline]
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        PublicKeyBytes::from_ssz_unchecked(context, bytes).map(Into::into)
    }
}

impl SszWrite for CachedPublicKey {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.bytes.write_fixed(bytes);
    }
}

impl SszHash for CachedPublicKey {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        self.bytes.hash_tree_root()
    }
}

impl CachedPublicKey {
    fn new(bytes: PublicKeyBytes, public_key: PublicKey) -> Self {
        let decompressed = OnceBox::new();

        decompressed
            .set(Box::new(public_key))
            .expect("cell is empty because OnceBox::new returns an empty cell");

        Self {
            bytes,
            decompressed,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PublicKeyBytes::SIZE] {
        self.bytes.as_bytes()
    }

    #[inline]
    #[must_use]
    pub const fn to_bytes(&self) -> PublicKeyBytes {
        self.bytes
    }

    pub fn decompress(&self) -> Result<&PublicKey, Error> {
        self.decompressed
            .get_or_try_init(|| self.bytes.try_into().map(Box::new))
    }
}
