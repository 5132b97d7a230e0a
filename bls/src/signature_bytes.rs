use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

use derive_more::From;
use primitive_types::H768;
use serde::{Deserialize, Serialize};
use ssz::Ssz;

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, From, Deserialize, Serialize, Ssz,
)]
#[serde(transparent)]
#[ssz(transparent)]
pub struct SignatureBytes(H768);

impl AsRef<[u8; Self::SIZE]> for SignatureBytes {
    fn as_ref(&self) -> &[u8; Self::SIZE] {
        self.0.as_fixed_bytes()
    }
}

impl From<[u8; Self::SIZE]> for SignatureBytes {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(H768(bytes))
    }
}

impl Display for SignatureBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        Display::fmt(&self.0, formatter)
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        Debug::fmt(&self.0, formatter)
    }
}

impl SignatureBytes {
    pub const SIZE: usize = H768::len_bytes();

    /// The compressed point at infinity.
    ///
    /// This is the value `SyncAggregate.sync_committee_signature` takes when
    /// no sync committee member participated.
    #[must_use]
    pub fn empty() -> Self {
        let mut bytes = Self::default();
        bytes.0.as_fixed_bytes_mut()[0] = 0xc0;
        bytes
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::empty()
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::SIZE] {
        self.0.as_fixed_bytes()
    }

    #[must_use]
    pub fn as_bytes_mut(&mut self) -> &mut [u8; Self::SIZE] {
        self.0.as_fixed_bytes_mut()
    }
}
