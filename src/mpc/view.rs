//! The transcripts recorded while simulating the parties.
use crate::{
    gf2::BitVec,
    mpc::{Error, SharedVec, check_count},
    params::LowmcParams,
};

/// Per-party views of one LowMC evaluation.
///
/// A view has `r + 2` slots, each holding one vector per party:
///
/// * slot `0`: the party's key share (`k` bits),
/// * slots `1..=r`: the AND gate outputs of round `i - 1` (`n` bits, only the
///   low `3m` bits are ever set),
/// * slot `r + 1`: the party's share of the ciphertext (`n` bits).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    slots: Vec<SharedVec>,
}

impl View {
    /// Allocates zeroed views for `parties` parties.
    pub fn new(params: &LowmcParams, parties: usize) -> Result<Self, Error> {
        let rounds = params.rounds();
        let mut slots = Vec::new();
        slots.try_reserve_exact(rounds + 2)?;
        slots.push(SharedVec::zero(params.key_size(), parties));
        for _ in 0..=rounds {
            slots.push(SharedVec::zero(params.block_size(), parties));
        }
        Ok(View { slots })
    }

    /// Builds a view from complete slots.
    pub fn from_slots(params: &LowmcParams, slots: Vec<SharedVec>) -> Result<Self, Error> {
        let template = View::new(params, slots.first().map_or(0, SharedVec::count))?;
        check_count(template.slots.len(), slots.len())?;
        for (expected, slot) in template.slots.iter().zip(&slots) {
            expected.check_shape(slot)?;
        }
        Ok(View { slots })
    }

    /// Number of parties the view covers.
    pub fn parties(&self) -> usize {
        self.slots[0].count()
    }

    /// Number of slots, `r + 2`.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the view has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot `i`.
    pub fn slot(&self, i: usize) -> &SharedVec {
        &self.slots[i]
    }

    /// Slot `i`, mutably.
    pub fn slot_mut(&mut self, i: usize) -> &mut SharedVec {
        &mut self.slots[i]
    }

    /// The key shares in slot `0`.
    pub fn key(&self) -> &SharedVec {
        &self.slots[0]
    }

    /// The output shares in the last slot.
    pub fn output(&self) -> &SharedVec {
        &self.slots[self.slots.len() - 1]
    }

    /// The AND gate outputs recorded in round `round`.
    pub fn round(&self, round: usize) -> &SharedVec {
        &self.slots[round + 1]
    }

    /// Iterates over all slots of one party, in slot order.
    pub fn party(&self, party: usize) -> impl Iterator<Item = &BitVec> + '_ {
        self.slots.iter().map(move |slot| slot.share(party))
    }

    /// Zeroes the round slots of `party`, keeping its key and output.
    pub fn clear_rounds(&mut self, party: usize) {
        let last = self.slots.len() - 1;
        for slot in &mut self.slots[1..last] {
            slot.share_mut(party).clear();
        }
    }
}
