use core::fmt::{Debug, Formatter, Result as FmtResult};

use derive_more::From;

#[derive(Clone, Copy, PartialEq, Eq, Default, From)]
pub struct SecretKeyBytes {
    pub(crate) bytes: [u8; Self::SIZE],
}

impl AsRef<[u8]> for SecretKeyBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsMut<[u8]> for SecretKeyBytes {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

// Redact the contents in case a secret key ends up in logs.
impl Debug for SecretKeyBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("SecretKeyBytes(…)")
    }
}

impl SecretKeyBytes {
    pub const SIZE: usize = 32;
}
