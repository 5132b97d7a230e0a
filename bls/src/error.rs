use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("bytes do not encode a valid public key")]
    InvalidPublicKey,
    #[error("bytes do not encode a valid secret key")]
    InvalidSecretKey,
    #[error("bytes do not encode a valid signature")]
    InvalidSignature,
}
