use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

use derive_more::From;
use primitive_types::H384;
use serde::{Deserialize, Serialize};
use ssz::Ssz;

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, From, Deserialize, Serialize, Ssz,
)]
#[serde(transparent)]
#[ssz(transparent)]
pub struct PublicKeyBytes(H384);

impl AsRef<[u8; Self::SIZE]> for PublicKeyBytes {
    fn as_ref(&self) -> &[u8; Self::SIZE] {
        self.0.as_fixed_bytes()
    }
}

impl From<[u8; Self::SIZE]> for PublicKeyBytes {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(H384(bytes))
    }
}

impl Display for PublicKeyBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        Display::fmt(&self.0, formatter)
    }
}

impl Debug for PublicKeyBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        Debug::fmt(&self.0, formatter)
    }
}

impl PublicKeyBytes {
    pub const SIZE: usize = H384::len_bytes();

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::SIZE] {
        self.0.as_fixed_bytes()
    }
}
