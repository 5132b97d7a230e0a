//! Like [`string_or_native`](crate::string_or_native), but for whole sequences.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    marker::PhantomData,
    str::FromStr,
};

use serde::{
    de::{Error, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use try_from_iterator::TryFromIterator;

#[derive(Deserialize, Serialize)]
#[serde(bound(
    deserialize = "T: Deserialize<'de> + FromStr<Err: Display>",
    serialize = "T: Serialize + Display",
))]
struct Wrapper<T>(#[serde(with = "crate::string_or_native")] T);

pub fn deserialize<'de, I, T, D>(deserializer: D) -> Result<T, D::Error>
where
    I: Deserialize<'de> + FromStr<Err: Display>,
    T: TryFromIterator<I, Error: Display>,
    D: Deserializer<'de>,
{
    struct SequenceVisitor<I, T>(PhantomData<(I, T)>);

    impl<'de, I, T> Visitor<'de> for SequenceVisitor<I, T>
    where
        I: Deserialize<'de> + FromStr<Err: Display>,
        T: TryFromIterator<I, Error: Display>,
    {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a sequence of strings or integers")
        }

        fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Self::Value, S::Error> {
            let mut error = None;

            let elements = core::iter::from_fn(|| {
                match seq.next_element::<Wrapper<I>>().transpose()? {
                    Ok(Wrapper(element)) => Some(element),
                    Err(inner) => {
                        error = Some(inner);
                        None
                    }
                }
            });

            let value = T::try_from_iter(elements).map_err(S::Error::custom);

            match error {
                Some(error) => Err(error),
                None => value,
            }
        }
    }

    deserializer.deserialize_seq(SequenceVisitor(PhantomData))
}

pub fn serialize<'elements, I, T, S>(
    sequence: &'elements T,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    I: Serialize + Display + 'elements,
    &'elements T: IntoIterator<Item = &'elements I>,
    S: Serializer,
{
    if serializer.is_human_readable() {
        serializer.collect_seq(sequence.into_iter().map(ToString::to_string))
    } else {
        serializer.collect_seq(sequence)
    }
}
