use ethereum_types::U256;
use ssz::ByteList;

use crate::preset::Preset;

pub type Gas = u64;
pub type Transaction<P> = ByteList<<P as Preset>::MaxBytesPerTransaction>;
pub type Wei = U256;
