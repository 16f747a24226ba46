use super::{
    conflict::{PlacementParams, pair_conflicts},
    graph::ConflictGraph,
    layout::MaskLayout,
    wiggle::wiggle_near,
};
use crate::slit::SlitId;
use std::collections::BTreeSet;

/// What one tier contributed to the mask
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierOutcome {
    pub placed: Vec<SlitId>,
    pub evicted: Vec<SlitId>,
    pub wiggles: usize,
}

/// Among `candidates`, the slit whose spectrum sits closest to the spatial centre
/// of the field. Ties go to the lowest id.
pub fn select_central(
    candidates: &BTreeSet<SlitId>,
    layout: &MaskLayout,
    spatial_center: f64,
) -> Option<SlitId> {
    let mut best: Option<(SlitId, f64)> = None;
    for &id in candidates {
        let Some(slit) = layout.slit(id) else {
            continue;
        };
        let distance = (spatial_center - slit.spectrum_center()).abs();
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// Greedy minimum-degree selection over one tier.
///
/// Repeatedly places the most central of the least-conflicting candidates and evicts
/// its neighbours. A successful wiggle moves placed slits, so the remaining candidates
/// are rechecked against the mask and the graph is rebuilt.
pub fn place_tier(
    layout: &mut MaskLayout,
    mut graph: ConflictGraph,
    spatial_center: f64,
    params: &PlacementParams,
) -> TierOutcome {
    let mut outcome = TierOutcome::default();

    while !graph.is_empty() {
        let candidates = graph.min_degree_nodes();
        let Some(winner) = select_central(&candidates, layout, spatial_center) else {
            break;
        };

        let neighbors: Vec<SlitId> = graph.neighbors(winner).collect();
        layout.place(winner);
        outcome.placed.push(winner);
        for neighbor in neighbors {
            graph.remove_node(neighbor);
            if layout.evict(neighbor) {
                outcome.evicted.push(neighbor);
            }
        }
        graph.remove_node(winner);

        if wiggle_near(layout, winner, params) {
            outcome.wiggles += 1;
            graph = refresh_candidates(layout, &graph, params, &mut outcome.evicted);
        }
    }

    let placed: Vec<SlitId> = layout.placed().iter().copied().collect();
    for id in placed {
        if wiggle_near(layout, id, params) {
            outcome.wiggles += 1;
        }
    }

    outcome
}

/// Evicts remaining candidates that now clash with the mask and rebuilds the graph
/// over the rest.
fn refresh_candidates(
    layout: &mut MaskLayout,
    graph: &ConflictGraph,
    params: &PlacementParams,
    evicted: &mut Vec<SlitId>,
) -> ConflictGraph {
    let remaining: Vec<SlitId> = graph
        .node_ids()
        .filter(|id| layout.pool().contains(id))
        .collect();

    let mut survivors = Vec::with_capacity(remaining.len());
    for id in remaining {
        let clashes = layout.slit(id).is_some_and(|candidate| {
            layout
                .placed_slits()
                .any(|placed| pair_conflicts(candidate, placed, params))
        });
        if clashes {
            if layout.evict(id) {
                evicted.push(id);
            }
        } else {
            survivors.push(id);
        }
    }

    ConflictGraph::build(survivors.iter().filter_map(|id| layout.slit(*id)), params)
}

/// Evicts every pool slit adjacent in `graph` to a placed slit.
/// Returns the evicted ids in ascending order.
pub fn evict_conflicting(layout: &mut MaskLayout, graph: &ConflictGraph) -> Vec<SlitId> {
    let doomed: BTreeSet<SlitId> = layout
        .placed()
        .iter()
        .flat_map(|id| graph.neighbors(*id))
        .filter(|id| layout.pool().contains(id))
        .collect();

    doomed.into_iter().filter(|id| layout.evict(*id)).collect()
}
