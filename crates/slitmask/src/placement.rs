pub mod conflict;
pub mod engine;
pub mod expand;
pub mod graph;
pub mod layout;
pub mod wiggle;

pub use conflict::{PlacementParams, check_conflicts, conflicts, pair_conflicts};
pub use engine::{TierOutcome, evict_conflicting, place_tier, select_central};
pub use expand::{ExpansionReport, ExpansionState, expand_slits};
pub use graph::ConflictGraph;
pub use layout::MaskLayout;
pub use wiggle::{split_motion, wiggle_near, wiggle_unplaced};
