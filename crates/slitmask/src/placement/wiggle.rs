use super::{conflict::PlacementParams, graph::ConflictGraph, layout::MaskLayout};
use crate::slit::{Slit, SlitId};
use log::debug;
use std::collections::BTreeMap;

/// Splits a required motion between two wiggle budgets.
///
/// Both sides move half when they can. Otherwise the short side gives everything it
/// has and the other covers the rest, or the split fails.
pub fn split_motion(need: f64, first_room: f64, second_room: f64) -> Option<(f64, f64)> {
    let half = need / 2.0;
    if first_room >= half && second_room >= half {
        Some((half, half))
    } else if second_room < half {
        let first = need - second_room;
        (first <= first_room).then_some((first, second_room))
    } else {
        let second = need - first_room;
        (second <= second_room).then_some((first_room, second))
    }
}

/// Tentatively shifts slits, keeping the move only if none of them clashes with a
/// placed slit. On rejection every geometry is restored from its snapshot.
fn try_shift(layout: &mut MaskLayout, moves: &[(SlitId, f64)], params: &PlacementParams) -> bool {
    let mut snapshots: Vec<Slit> = Vec::with_capacity(moves.len());
    for &(id, delta) in moves {
        if let Some(slit) = layout.slit_mut(id) {
            snapshots.push(slit.clone());
            slit.shift_length(delta);
        }
    }

    let clash = moves
        .iter()
        .any(|&(id, _)| layout.conflicts_with_placed(id, None, params));

    if clash {
        for snapshot in snapshots {
            if let Some(slit) = layout.slit_mut(snapshot.id) {
                *slit = snapshot;
            }
        }
        return false;
    }

    for &(id, delta) in moves {
        if delta == 0.0 {
            continue;
        }
        if let Some(slit) = layout.slit_mut(id) {
            slit.wiggle_used = true;
        }
    }
    true
}

/// Pulls a freshly placed slit and its nearest placed neighbour to the clearance gap.
///
/// Neighbours are scanned in id order; the first pair that can be moved without
/// clashing wins. Returns whether any slit moved.
pub fn wiggle_near(layout: &mut MaskLayout, id: SlitId, params: &PlacementParams) -> bool {
    let Some(slit) = layout.slit(id) else {
        return false;
    };
    if slit.available_wiggle() <= 0.0 {
        return false;
    }

    let clearance = params.wiggle_clearance();
    let others: Vec<SlitId> = layout.placed().iter().copied().filter(|o| *o != id).collect();

    for other in others {
        let (Some(slit), Some(cur)) = (layout.slit(id), layout.slit(other)) else {
            continue;
        };
        let slit_room = slit.available_wiggle();
        let cur_room = cur.available_wiggle();

        // Orientation: +1 when `slit` lies below `cur` along the length axis
        let (gap, orientation) = if slit.slit_end < cur.slit_start {
            (cur.slit_start - slit.slit_end, 1.0)
        } else if slit.slit_start > cur.slit_end {
            (slit.slit_start - cur.slit_end, -1.0)
        } else {
            continue;
        };
        if gap <= 0.0 || gap >= slit_room + cur_room + params.min_separation_px() {
            continue;
        }

        let closing = gap - clearance;
        if closing == 0.0 {
            continue;
        }
        let direction = closing.signum();
        let Some((slit_share, cur_share)) = split_motion(closing.abs(), slit_room, cur_room)
        else {
            continue;
        };

        let moves = [
            (id, orientation * direction * slit_share),
            (other, -orientation * direction * cur_share),
        ];
        if try_shift(layout, &moves, params) {
            debug!(
                "Wiggled slit {} ({:+.3} px) against slit {} ({:+.3} px)",
                id, moves[0].1, other, moves[1].1
            );
            return true;
        }
    }

    false
}

/// Tries to bring removed slits back by shifting them, and if needed the single
/// placed slit they clash with, along the length axis.
///
/// Only removed slits with exactly one placed neighbour are considered, and only
/// when their edges overlap partially. Returns the number of rescued slits.
pub fn wiggle_unplaced(layout: &mut MaskLayout, params: &PlacementParams) -> usize {
    let graph = ConflictGraph::build(
        layout
            .placed_slits()
            .chain(layout.removed().iter().filter_map(|id| layout.slit(*id))),
        params,
    );

    let mut placed_hits: BTreeMap<SlitId, usize> = BTreeMap::new();
    for id in layout.placed() {
        for neighbor in graph.neighbors(*id) {
            if layout.removed().contains(&neighbor) {
                *placed_hits.entry(neighbor).or_default() += 1;
            }
        }
    }

    let mut rescued = 0;
    let placed: Vec<SlitId> = layout.placed().iter().copied().collect();
    for placed_id in placed {
        let candidates: Vec<SlitId> = graph
            .neighbors(placed_id)
            .filter(|n| placed_hits.get(n) == Some(&1))
            .collect();
        for removed_id in candidates {
            if layout.removed().contains(&removed_id)
                && rescue_one(layout, placed_id, removed_id, params)
            {
                debug!("Rescued slit {} next to slit {}", removed_id, placed_id);
                rescued += 1;
            }
        }
    }

    rescued
}

fn rescue_one(
    layout: &mut MaskLayout,
    placed_id: SlitId,
    removed_id: SlitId,
    params: &PlacementParams,
) -> bool {
    let (Some(placed), Some(cur)) = (layout.slit(placed_id), layout.slit(removed_id)) else {
        return false;
    };
    let placed_room = placed.available_wiggle();
    let cur_room = cur.available_wiggle();

    // Direction in which the removed slit has to move
    let (overlap, direction) = if placed.slit_end < cur.slit_end
        && placed.slit_end > cur.slit_start
        && cur.slit_start > placed.slit_start
    {
        (placed.slit_end - cur.slit_start, 1.0)
    } else if placed.slit_start > cur.slit_start
        && placed.slit_start < cur.slit_end
        && cur.slit_end < placed.slit_end
    {
        (cur.slit_end - placed.slit_start, -1.0)
    } else {
        return false;
    };
    let need = overlap + params.wiggle_clearance();

    // Removed slit alone
    if need <= cur_room && try_shift(layout, &[(removed_id, direction * need)], params) {
        return layout.rescue(removed_id);
    }

    // Both slits
    let Some((cur_share, placed_share)) = split_motion(need, cur_room, placed_room) else {
        return false;
    };
    let moves = [
        (removed_id, direction * cur_share),
        (placed_id, -direction * placed_share),
    ];
    try_shift(layout, &moves, params) && layout.rescue(removed_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        instrument::Dispersion,
        placement::conflict::pair_conflicts,
        slit::{Priority, test_support::{slit, with_wiggle}},
    };
    use itertools::Itertools;

    fn params() -> PlacementParams {
        PlacementParams::new(1.0, 2.0, 0.0, Dispersion::Horizontal)
    }

    fn layout_of(slits: Vec<Slit>) -> MaskLayout {
        let ids: Vec<SlitId> = slits.iter().map(|s| s.id).collect();
        let mut layout = MaskLayout::new(slits.into_iter().map(|s| (s.id, s)).collect());
        layout.start_mask(ids);
        layout
    }

    fn assert_conflict_free(layout: &MaskLayout) {
        for (a, b) in layout.placed_slits().tuple_combinations() {
            assert!(!pair_conflicts(a, b, &params()), "{} vs {}", a.id, b.id);
        }
    }

    #[test]
    fn test_split_motion() {
        assert_eq!(split_motion(4.0, 3.0, 3.0), Some((2.0, 2.0)));
        assert_eq!(split_motion(4.0, 5.0, 1.0), Some((3.0, 1.0)));
        assert_eq!(split_motion(4.0, 1.0, 5.0), Some((1.0, 3.0)));
        assert_eq!(split_motion(4.0, 4.0, 0.0), Some((4.0, 0.0)));
        assert_eq!(split_motion(4.0, 1.0, 1.0), None);
    }

    #[test]
    fn test_wiggle_near_closes_gap_to_clearance() {
        let mut layout = layout_of(vec![
            with_wiggle(slit(1, Priority::First, (0.0, 10.0), (0.0, 1.0), (0.0, 50.0)), 5.0),
            with_wiggle(slit(2, Priority::First, (16.0, 26.0), (100.0, 101.0), (100.0, 150.0)), 5.0),
        ]);
        layout.place(1);
        layout.place(2);
        assert!(wiggle_near(&mut layout, 1, &params()));

        let one = layout.slit(1).unwrap();
        let two = layout.slit(2).unwrap();
        let gap = two.slit_start - one.slit_end;
        assert!((gap - params().wiggle_clearance()).abs() < 1e-9);
        assert!((one.slit_start - 1.645).abs() < 1e-9);
        assert!(one.wiggle_used && two.wiggle_used);
        assert_eq!(one.current_length(), 10.0);
        assert_conflict_free(&layout);

        // Budget is spent
        assert!(!wiggle_near(&mut layout, 1, &params()));
    }

    #[test]
    fn test_wiggle_near_one_sided_budget() {
        let mut layout = layout_of(vec![
            with_wiggle(slit(1, Priority::First, (0.0, 10.0), (0.0, 1.0), (0.0, 50.0)), 5.0),
            slit(2, Priority::Acquisition, (16.0, 18.0), (100.0, 102.0), (100.0, 150.0)),
        ]);
        layout.place(1);
        layout.place(2);
        assert!(wiggle_near(&mut layout, 1, &params()));
        let acquisition = layout.slit(2).unwrap();
        assert_eq!(acquisition.slit_start, 16.0);
        let gap = acquisition.slit_start - layout.slit(1).unwrap().slit_end;
        assert!((gap - params().wiggle_clearance()).abs() < 1e-9);
    }

    #[test]
    fn test_wiggle_near_rolls_back_on_conflict() {
        // Pulling 2 down towards 1 would run it into 3, which shares its spectrum
        let mut layout = layout_of(vec![
            with_wiggle(slit(1, Priority::First, (20.0, 30.0), (0.0, 1.0), (0.0, 50.0)), 5.0),
            with_wiggle(slit(2, Priority::First, (36.0, 46.0), (100.0, 101.0), (100.0, 150.0)), 5.0),
            slit(3, Priority::First, (24.0, 32.5), (100.0, 101.0), (100.0, 150.0)),
        ]);
        for id in 1..=3 {
            layout.place(id);
        }
        assert_conflict_free(&layout);
        let before_one = layout.slit(1).unwrap().clone();
        let before_two = layout.slit(2).unwrap().clone();

        assert!(!wiggle_near(&mut layout, 1, &params()));
        assert_eq!(layout.slit(1).unwrap(), &before_one);
        assert_eq!(layout.slit(2).unwrap(), &before_two);
        assert!(!layout.slit(1).unwrap().wiggle_used);
    }

    #[test]
    fn test_wiggle_unplaced_rescues_partial_overlap() {
        let mut layout = layout_of(vec![
            slit(1, Priority::First, (0.0, 10.0), (0.0, 1.0), (0.0, 50.0)),
            with_wiggle(slit(2, Priority::Second, (8.0, 18.0), (0.0, 1.0), (0.0, 50.0)), 8.0),
        ]);
        layout.place(1);
        layout.evict(2);

        assert_eq!(wiggle_unplaced(&mut layout, &params()), 1);
        assert!(layout.placed().contains(&2));
        assert!(layout.removed().is_empty());
        let rescued = layout.slit(2).unwrap();
        assert!((rescued.slit_start - (10.0 + params().wiggle_clearance())).abs() < 1e-9);
        assert!(rescued.wiggle_used);
        assert_eq!(layout.slit(1).unwrap().slit_start, 0.0);
        assert_conflict_free(&layout);
    }

    #[test]
    fn test_wiggle_unplaced_shares_motion_with_placed_slit() {
        let mut layout = layout_of(vec![
            with_wiggle(slit(1, Priority::First, (0.0, 10.0), (0.0, 1.0), (0.0, 50.0)), 3.0),
            with_wiggle(slit(2, Priority::Second, (8.0, 18.0), (0.0, 1.0), (0.0, 50.0)), 3.0),
        ]);
        layout.place(1);
        layout.evict(2);

        assert_eq!(wiggle_unplaced(&mut layout, &params()), 1);
        let gap = layout.slit(2).unwrap().slit_start - layout.slit(1).unwrap().slit_end;
        assert!((gap - params().wiggle_clearance()).abs() < 1e-9);
        assert_conflict_free(&layout);
    }

    #[test]
    fn test_wiggle_unplaced_skips_slits_between_two_placed() {
        let mut layout = layout_of(vec![
            slit(1, Priority::First, (0.0, 10.0), (0.0, 1.0), (0.0, 50.0)),
            with_wiggle(slit(2, Priority::Second, (8.0, 32.0), (0.0, 1.0), (0.0, 50.0)), 50.0),
            slit(3, Priority::First, (30.0, 40.0), (0.0, 1.0), (0.0, 50.0)),
        ]);
        layout.place(1);
        layout.place(3);
        layout.evict(2);
        let before = layout.slit(2).unwrap().clone();

        assert_eq!(wiggle_unplaced(&mut layout, &params()), 0);
        assert!(layout.removed().contains(&2));
        assert_eq!(layout.slit(2).unwrap(), &before);
        assert!(!layout.slit(2).unwrap().wiggle_used);
    }

    #[test]
    fn test_wiggle_unplaced_leaves_unreachable_slits() {
        let mut layout = layout_of(vec![
            slit(1, Priority::First, (0.0, 10.0), (0.0, 1.0), (0.0, 50.0)),
            with_wiggle(slit(2, Priority::Second, (2.0, 12.0), (0.0, 1.0), (0.0, 50.0)), 1.0),
        ]);
        layout.place(1);
        layout.evict(2);
        let before = layout.slit(2).unwrap().clone();

        assert_eq!(wiggle_unplaced(&mut layout, &params()), 0);
        assert!(layout.removed().contains(&2));
        assert_eq!(layout.slit(2).unwrap(), &before);
    }
}
