use crate::{
    bands::BandDefinition,
    config::{Config, SlitMode},
    constants::MIN_ACQUISITION_SLITS,
    fov::FieldOfView,
    placement::{
        ConflictGraph, MaskLayout, PlacementParams, evict_conflicting, expand_slits, place_tier,
        wiggle_unplaced,
    },
    slit::{Priority, Slit, SlitId},
};
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Everything that stays fixed while a sequence of masks is designed
#[derive(Debug, Clone)]
pub struct MaskDesign {
    pub params: PlacementParams,
    pub fov: FieldOfView,
    pub bands: Option<BandDefinition>,
    pub num_masks: usize,
    pub slit_mode: SlitMode,
    pub wiggle_factor: f64,
    pub wiggle_all_masks: bool,
}

impl MaskDesign {
    pub fn from_config(config: &Config, fov: FieldOfView, bands: Option<BandDefinition>) -> Self {
        Self {
            params: config.placement_params(bands.as_ref()),
            fov,
            bands,
            num_masks: config.placement.num_masks,
            slit_mode: config.placement.slit_mode,
            wiggle_factor: config.placement.wiggle_factor,
            wiggle_all_masks: config.placement.wiggle_all_masks,
        }
    }

    fn expands(&self) -> bool {
        self.slit_mode == SlitMode::Max && self.params.microshuffle_px == 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaskSummary {
    /// Mask number, counting from one
    pub mask: usize,
    pub available: usize,
    pub placed: usize,
    pub acquisition: usize,
    pub priority1: usize,
    pub priority2: usize,
    pub priority3: usize,
    pub rescued: usize,
    pub expansion_iterations: usize,
}

impl MaskSummary {
    pub fn low_acquisition(&self) -> bool {
        self.acquisition < MIN_ACQUISITION_SLITS
    }
}

#[derive(Debug, Clone)]
pub struct MaskResult {
    pub summary: MaskSummary,
    /// Placed slits in id order
    pub slits: Vec<Slit>,
}

/// Fills masks one after another. Objects left off one mask are offered to the
/// next, acquisition objects are offered to every mask.
#[derive(Debug, Clone)]
pub struct MaskSession {
    design: MaskDesign,
    layout: MaskLayout,
    acquisition: BTreeSet<SlitId>,
    pool: BTreeSet<SlitId>,
    produced: usize,
}

impl MaskSession {
    pub fn new(design: MaskDesign, slits: BTreeMap<SlitId, Slit>) -> Self {
        let (acquisition, pool): (BTreeSet<SlitId>, BTreeSet<SlitId>) = slits
            .values()
            .map(|slit| slit.id)
            .partition(|id| slits[id].is_acquisition());
        Self {
            design,
            layout: MaskLayout::new(slits),
            acquisition,
            pool,
            produced: 0,
        }
    }

    pub fn design(&self) -> &MaskDesign {
        &self.design
    }

    /// Science objects not yet on any mask
    pub fn remaining(&self) -> &BTreeSet<SlitId> {
        &self.pool
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Designs the next mask, or returns `None` once the requested number of masks
    /// exists or nothing is left to place.
    pub fn next_mask(&mut self) -> Option<MaskResult> {
        if self.produced >= self.design.num_masks {
            return None;
        }
        if self.pool.is_empty() && (self.produced > 0 || self.acquisition.is_empty()) {
            return None;
        }

        let index = self.produced;
        let params = self.design.params;
        let center = self.design.fov.spatial_center;
        let available = self.pool.len() + self.acquisition.len();

        self.layout.start_mask(self.pool.iter().copied());

        let acquisition_graph = ConflictGraph::build(
            self.acquisition.iter().filter_map(|id| self.layout.slit(*id)),
            &params,
        );
        place_tier(&mut self.layout, acquisition_graph, center, &params);

        let mut full_graph = self.full_graph();
        evict_conflicting(&mut self.layout, &full_graph);

        for tier in Priority::SCIENCE {
            let tier_graph = ConflictGraph::build(
                self.layout.pool_slits().filter(|slit| slit.priority == tier),
                &params,
            );
            let outcome = place_tier(&mut self.layout, tier_graph, center, &params);
            if outcome.wiggles > 0 {
                full_graph = self.full_graph();
            }
            evict_conflicting(&mut self.layout, &full_graph);
        }

        let rescued = if self.design.wiggle_factor > 0.0
            && (index == 0 || self.design.wiggle_all_masks)
        {
            wiggle_unplaced(&mut self.layout, &params)
        } else {
            0
        };

        let expansion_iterations = if self.design.expands() {
            expand_slits(
                &mut self.layout,
                &self.design.fov,
                self.design.bands.as_ref(),
                &params,
            )
            .iterations
        } else {
            0
        };

        let slits: Vec<Slit> = self.layout.placed_slits().cloned().collect();
        let count = |priority: Priority| slits.iter().filter(|s| s.priority == priority).count();
        let summary = MaskSummary {
            mask: index + 1,
            available,
            placed: slits.len(),
            acquisition: count(Priority::Acquisition),
            priority1: count(Priority::First),
            priority2: count(Priority::Second),
            priority3: count(Priority::Third),
            rescued,
            expansion_iterations,
        };

        info!(
            "MASK {} (of {}): {} of {} available objects included.",
            summary.mask, self.design.num_masks, summary.placed, summary.available
        );
        info!(
            "  Thereof priority 0/1/2/3: {} / {} / {} / {}",
            summary.acquisition, summary.priority1, summary.priority2, summary.priority3
        );
        if summary.low_acquisition() {
            warn!(
                "Mask {} has fewer than {} acquisition objects",
                summary.mask, MIN_ACQUISITION_SLITS
            );
        }

        self.pool = self
            .layout
            .finish_mask()
            .into_iter()
            .filter(|id| !self.acquisition.contains(id))
            .collect();
        self.produced += 1;

        Some(MaskResult { summary, slits })
    }

    /// Designs all remaining masks
    pub fn run(&mut self) -> Vec<MaskResult> {
        std::iter::from_fn(|| self.next_mask()).collect()
    }

    /// Conflict graph over the pool and everything already on the mask
    fn full_graph(&self) -> ConflictGraph {
        ConflictGraph::build(
            self.layout.pool_slits().chain(self.layout.placed_slits()),
            &self.design.params,
        )
    }
}
