use crate::{altair::containers::SyncAggregate, preset::Preset};

impl<P: Preset> SyncAggregate<P> {
    /// The sync aggregate of a block whose proposer saw no sync committee
    /// messages at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sync_committee_bits: Default::default(),
            sync_committee_signature: bls::SignatureBytes::empty(),
        }
    }
}
