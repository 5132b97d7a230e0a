use core::fmt::{Formatter, Result as FmtResult};

use generic_array::{ArrayLength, GenericArray};
use serde::{
    de::{Error, Visitor},
    Deserializer,
};

use crate::shared;

pub fn deserialize<'de, D, N>(deserializer: D) -> Result<GenericArray<u8, N>, D::Error>
where
    D: Deserializer<'de>,
    N: ArrayLength<u8>,
{
    struct ArrayVisitor<N> {
        human_readable: bool,
        phantom: core::marker::PhantomData<N>,
    }

    impl<'de, N: ArrayLength<u8>> Visitor<'de> for ArrayVisitor<N> {
        type Value = GenericArray<u8, N>;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str(shared::expecting_prefixed_hex_or_bytes(self.human_readable))
        }

        fn visit_bytes<E: Error>(self, bytes: &[u8]) -> Result<Self::Value, E> {
            if bytes.len() != N::USIZE {
                return Err(E::invalid_length(bytes.len(), &self));
            }

            Ok(GenericArray::clone_from_slice(bytes))
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            let digits = shared::strip_hex_prefix(string)?;
            let bytes = hex::decode(digits).map_err(E::custom)?;
            self.visit_bytes(bytes.as_slice())
        }
    }

    let human_readable = deserializer.is_human_readable();

    let visitor = ArrayVisitor {
        human_readable,
        phantom: core::marker::PhantomData,
    };

    if human_readable {
        deserializer.deserialize_str(visitor)
    } else {
        deserializer.deserialize_bytes(visitor)
    }
}
