use super::{conflict::PlacementParams, layout::MaskLayout};
use crate::{
    bands::BandDefinition,
    constants::{EXPANSION_STEP_PX, MAX_EXPANSION_ITERATIONS},
    fov::FieldOfView,
    slit::{Slit, SlitId},
};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Growth lock of one slit. Locks only ever accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpansionState {
    #[default]
    Unlocked,
    LockedUp,
    LockedDown,
    FullyLocked,
}

impl ExpansionState {
    pub fn lock_up(self) -> Self {
        match self {
            ExpansionState::Unlocked | ExpansionState::LockedUp => ExpansionState::LockedUp,
            ExpansionState::LockedDown | ExpansionState::FullyLocked => ExpansionState::FullyLocked,
        }
    }

    pub fn lock_down(self) -> Self {
        match self {
            ExpansionState::Unlocked | ExpansionState::LockedDown => ExpansionState::LockedDown,
            ExpansionState::LockedUp | ExpansionState::FullyLocked => ExpansionState::FullyLocked,
        }
    }

    pub fn can_grow_up(self) -> bool {
        matches!(self, ExpansionState::Unlocked | ExpansionState::LockedDown)
    }

    pub fn can_grow_down(self) -> bool {
        matches!(self, ExpansionState::Unlocked | ExpansionState::LockedUp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    pub iterations: usize,
    pub converged: bool,
    pub grown: usize,
}

/// Grows placed slits one pixel per iteration along their length until each one
/// reaches the field edge, its band edge or a neighbour sharing its spectrum.
pub fn expand_slits(
    layout: &mut MaskLayout,
    fov: &FieldOfView,
    bands: Option<&BandDefinition>,
    params: &PlacementParams,
) -> ExpansionReport {
    let ids: Vec<SlitId> = layout.placed().iter().copied().collect();
    let mut states: BTreeMap<SlitId, ExpansionState> = BTreeMap::new();
    let mut limits: BTreeMap<SlitId, (f64, f64)> = BTreeMap::new();
    let mut initial_lengths: BTreeMap<SlitId, f64> = BTreeMap::new();

    for &id in &ids {
        let Some(slit) = layout.slit(id) else {
            continue;
        };
        let state = if slit.is_acquisition() || slit.is_tilted() {
            ExpansionState::FullyLocked
        } else {
            ExpansionState::Unlocked
        };
        states.insert(id, state);
        limits.insert(id, growth_limits(slit, fov, bands));
        initial_lengths.insert(id, slit.current_length());
    }

    let mut report = ExpansionReport::default();
    let separation = params.min_separation_px();

    while report.iterations < MAX_EXPANSION_ITERATIONS {
        report.iterations += 1;
        let mut grew = false;

        for &id in &ids {
            let (Some(&state), Some(&(lower, upper))) = (states.get(&id), limits.get(&id)) else {
                continue;
            };
            if state == ExpansionState::FullyLocked {
                continue;
            }
            let Some(slit) = layout.slit(id) else {
                continue;
            };

            let (blocked_up, blocked_down) = neighbour_blocks(layout, slit, separation);
            let mut state = state;
            if blocked_up || slit.slit_end + EXPANSION_STEP_PX > upper {
                state = state.lock_up();
            }
            if blocked_down || slit.slit_start - EXPANSION_STEP_PX < lower {
                state = state.lock_down();
            }

            if state.can_grow_up() {
                if try_grow(layout, id, EXPANSION_STEP_PX, 0.0, params) {
                    grew = true;
                } else {
                    state = state.lock_up();
                }
            }
            if state.can_grow_down() {
                if try_grow(layout, id, 0.0, EXPANSION_STEP_PX, params) {
                    grew = true;
                } else {
                    state = state.lock_down();
                }
            }
            states.insert(id, state);
        }

        if !grew {
            report.converged = true;
            break;
        }
    }

    if !report.converged {
        warn!(
            "Slit expansion stopped after {} iterations without converging",
            report.iterations
        );
    }

    for &id in &ids {
        let Some(slit) = layout.slit_mut(id) else {
            continue;
        };
        slit.slit_length = slit.current_length();
        slit.ccd_l = (slit.slit_start + slit.slit_end) / 2.0;
        if initial_lengths
            .get(&id)
            .is_some_and(|length| slit.slit_length > *length)
        {
            report.grown += 1;
        }
    }

    debug!(
        "Expanded {} of {} slits in {} iterations",
        report.grown,
        ids.len(),
        report.iterations
    );
    report
}

/// Field-of-view crossings around the slit, narrowed to its band when shuffling
fn growth_limits(slit: &Slit, fov: &FieldOfView, bands: Option<&BandDefinition>) -> (f64, f64) {
    let (mut lower, mut upper) = fov.slit_bounds(slit.ccd_w, slit.ccd_l);
    if let Some((band_lo, band_hi)) =
        bands.and_then(|b| b.band_for(slit.slit_start, slit.slit_end))
    {
        lower = lower.max(band_lo);
        upper = upper.min(band_hi);
    }
    (lower, upper)
}

/// Whether a spectrally overlapping neighbour sits right above or below the slit
fn neighbour_blocks(layout: &MaskLayout, slit: &Slit, separation: f64) -> (bool, bool) {
    let mut up = false;
    let mut down = false;
    for other in layout.placed_slits() {
        if other.id == slit.id
            || slit.spec_end < other.spec_start
            || other.spec_end < slit.spec_start
        {
            continue;
        }
        let above = other.slit_start - slit.slit_end;
        let below = slit.slit_start - other.slit_end;
        up |= above > 0.0 && above < separation + EXPANSION_STEP_PX;
        down |= below > 0.0 && below < separation + EXPANSION_STEP_PX;
    }
    (up, down)
}

fn try_grow(
    layout: &mut MaskLayout,
    id: SlitId,
    up: f64,
    down: f64,
    params: &PlacementParams,
) -> bool {
    let Some(slit) = layout.slit_mut(id) else {
        return false;
    };
    let (start, end) = (slit.slit_start, slit.slit_end);
    slit.slit_end += up;
    slit.slit_start -= down;

    if !layout.conflicts_with_placed(id, None, params) {
        return true;
    }
    if let Some(slit) = layout.slit_mut(id) {
        slit.slit_start = start;
        slit.slit_end = end;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        instrument::Dispersion,
        placement::conflict::pair_conflicts,
        slit::{Priority, test_support::slit},
    };
    use itertools::Itertools;

    fn params() -> PlacementParams {
        PlacementParams::new(1.0, 2.0, 0.0, Dispersion::Horizontal)
    }

    fn fov() -> FieldOfView {
        let vertices = [(0.0, 0.0), (0.0, 100.0), (200.0, 100.0), (200.0, 0.0)];
        FieldOfView::from_vertices(&vertices, &vertices, Dispersion::Horizontal).unwrap()
    }

    fn placed_layout(slits: Vec<Slit>) -> MaskLayout {
        let ids: Vec<SlitId> = slits.iter().map(|s| s.id).collect();
        let mut layout = MaskLayout::new(slits.into_iter().map(|s| (s.id, s)).collect());
        layout.start_mask(ids.clone());
        for id in ids {
            layout.place(id);
        }
        layout
    }

    #[test]
    fn test_state_transitions_are_monotone() {
        let state = ExpansionState::Unlocked.lock_up();
        assert_eq!(state, ExpansionState::LockedUp);
        assert!(!state.can_grow_up());
        assert!(state.can_grow_down());
        assert_eq!(state.lock_up(), ExpansionState::LockedUp);
        assert_eq!(state.lock_down(), ExpansionState::FullyLocked);
        assert_eq!(
            ExpansionState::FullyLocked.lock_up(),
            ExpansionState::FullyLocked
        );
        assert_eq!(
            ExpansionState::Unlocked.lock_down().lock_up(),
            ExpansionState::FullyLocked
        );
    }

    #[test]
    fn test_single_slit_fills_the_field() {
        let mut layout = placed_layout(vec![slit(
            1,
            Priority::First,
            (40.0, 50.0),
            (0.0, 1.0),
            (0.0, 50.0),
        )]);
        let report = expand_slits(&mut layout, &fov(), None, &params());
        assert!(report.converged);
        assert_eq!(report.grown, 1);

        let grown = layout.slit(1).unwrap();
        assert_eq!((grown.slit_start, grown.slit_end), (0.0, 100.0));
        assert_eq!(grown.slit_length, 100.0);
        assert_eq!(grown.ccd_l, 50.0);
    }

    #[test]
    fn test_neighbours_stop_each_other() {
        let mut layout = placed_layout(vec![
            slit(1, Priority::First, (10.0, 20.0), (0.0, 1.0), (0.0, 50.0)),
            slit(2, Priority::First, (40.0, 50.0), (0.0, 1.0), (0.0, 50.0)),
        ]);
        let report = expand_slits(&mut layout, &fov(), None, &params());
        assert!(report.converged);

        let one = layout.slit(1).unwrap();
        let two = layout.slit(2).unwrap();
        assert_eq!(one.slit_start, 0.0);
        assert_eq!(two.slit_end, 100.0);
        assert!(one.slit_end > 20.0 && two.slit_start < 40.0);
        assert!(two.slit_start - one.slit_end > params().min_separation_px());
        assert!(!pair_conflicts(one, two, &params()));
    }

    #[test]
    fn test_disjoint_spectra_grow_past_each_other() {
        let mut layout = placed_layout(vec![
            slit(1, Priority::First, (10.0, 20.0), (0.0, 1.0), (0.0, 50.0)),
            slit(2, Priority::First, (40.0, 50.0), (150.0, 151.0), (150.0, 199.0)),
        ]);
        expand_slits(&mut layout, &fov(), None, &params());
        for id in [1, 2] {
            let s = layout.slit(id).unwrap();
            assert_eq!((s.slit_start, s.slit_end), (0.0, 100.0));
        }
    }

    #[test]
    fn test_acquisition_and_tilted_slits_stay_fixed() {
        let mut tilted = slit(2, Priority::First, (60.0, 70.0), (100.0, 101.0), (100.0, 150.0));
        tilted.catalog.angle = 15.0;
        let mut layout = placed_layout(vec![
            slit(1, Priority::Acquisition, (20.0, 22.0), (0.0, 2.0), (0.0, 50.0)),
            tilted,
        ]);
        let report = expand_slits(&mut layout, &fov(), None, &params());
        assert_eq!(report.grown, 0);
        assert_eq!(layout.slit(1).unwrap().slit_start, 20.0);
        assert_eq!(layout.slit(2).unwrap().slit_end, 70.0);
    }

    #[test]
    fn test_growth_stays_inside_band() {
        let bands = BandDefinition::parse("1_bandShuffle_30_100_8_20_0_1", 1.0)
            .unwrap()
            .unwrap();
        let mut layout = placed_layout(vec![slit(
            1,
            Priority::First,
            (30.0, 40.0),
            (0.0, 1.0),
            (0.0, 50.0),
        )]);
        expand_slits(&mut layout, &fov(), Some(&bands), &params());
        let grown = layout.slit(1).unwrap();
        assert_eq!((grown.slit_start, grown.slit_end), (20.0, 50.0));
    }

    #[test]
    fn test_expanded_mask_remains_conflict_free() {
        let mut layout = placed_layout(vec![
            slit(1, Priority::First, (5.0, 12.0), (0.0, 1.0), (0.0, 60.0)),
            slit(2, Priority::Second, (30.0, 35.0), (0.0, 1.0), (40.0, 120.0)),
            slit(3, Priority::First, (70.0, 80.0), (0.0, 1.0), (100.0, 180.0)),
            slit(4, Priority::Third, (50.0, 57.0), (20.0, 21.0), (10.0, 70.0)),
        ]);
        assert!(
            layout
                .placed_slits()
                .tuple_combinations()
                .all(|(a, b)| !pair_conflicts(a, b, &params()))
        );
        expand_slits(&mut layout, &fov(), None, &params());
        for (a, b) in layout.placed_slits().tuple_combinations() {
            assert!(!pair_conflicts(a, b, &params()), "{} vs {}", a.id, b.id);
            assert!(a.slit_start >= 0.0 && a.slit_end <= 100.0);
        }
    }
}
