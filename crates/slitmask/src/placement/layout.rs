use super::conflict::{PlacementParams, check_conflicts};
use crate::slit::{Slit, SlitId};
use std::collections::{BTreeMap, BTreeSet};

/// Slit arena plus the id containers of the mask being filled.
///
/// Every id lives in at most one of `pool`, `placed` and `removed`.
#[derive(Debug, Clone, Default)]
pub struct MaskLayout {
    slits: BTreeMap<SlitId, Slit>,
    pool: BTreeSet<SlitId>,
    placed: BTreeSet<SlitId>,
    removed: BTreeSet<SlitId>,
}

impl MaskLayout {
    pub fn new(slits: BTreeMap<SlitId, Slit>) -> Self {
        Self {
            slits,
            ..Self::default()
        }
    }

    /// Starts a fresh mask from the given candidate ids
    pub fn start_mask(&mut self, pool: impl IntoIterator<Item = SlitId>) {
        self.placed.clear();
        self.removed.clear();
        self.pool = pool
            .into_iter()
            .filter(|id| self.slits.contains_key(id))
            .collect();
    }

    /// Closes the current mask and returns the ids left for the next one
    pub fn finish_mask(&mut self) -> BTreeSet<SlitId> {
        let mut residual = std::mem::take(&mut self.removed);
        residual.append(&mut self.pool);
        self.placed.clear();
        residual
    }

    pub fn slit(&self, id: SlitId) -> Option<&Slit> {
        self.slits.get(&id)
    }

    pub(crate) fn slit_mut(&mut self, id: SlitId) -> Option<&mut Slit> {
        self.slits.get_mut(&id)
    }

    pub fn slits(&self) -> &BTreeMap<SlitId, Slit> {
        &self.slits
    }

    pub fn pool(&self) -> &BTreeSet<SlitId> {
        &self.pool
    }

    pub fn placed(&self) -> &BTreeSet<SlitId> {
        &self.placed
    }

    pub fn removed(&self) -> &BTreeSet<SlitId> {
        &self.removed
    }

    pub fn place(&mut self, id: SlitId) {
        self.pool.remove(&id);
        self.removed.remove(&id);
        self.placed.insert(id);
    }

    /// Moves a candidate to the removed list. Placed slits stay where they are.
    pub fn evict(&mut self, id: SlitId) -> bool {
        if self.placed.contains(&id) {
            return false;
        }
        self.pool.remove(&id);
        self.removed.insert(id)
    }

    /// Promotes a removed slit back onto the mask
    pub fn rescue(&mut self, id: SlitId) -> bool {
        if !self.removed.remove(&id) {
            return false;
        }
        self.placed.insert(id);
        true
    }

    pub fn placed_slits(&self) -> impl Iterator<Item = &Slit> + Clone + '_ {
        self.placed.iter().filter_map(|id| self.slits.get(id))
    }

    pub fn pool_slits(&self) -> impl Iterator<Item = &Slit> + Clone + '_ {
        self.pool.iter().filter_map(|id| self.slits.get(id))
    }

    /// Whether the slit clashes with anything on the mask other than itself and `except`
    pub fn conflicts_with_placed(
        &self,
        id: SlitId,
        except: Option<SlitId>,
        params: &PlacementParams,
    ) -> bool {
        match self.slits.get(&id) {
            Some(slit) => check_conflicts(slit, except, self.placed_slits(), params),
            None => false,
        }
    }
}
