//! Two-phase grass/parasite transition rule.
//!
//! Even generations grow vegetation with parasites frozen; odd generations
//! run predation with the immature grass stages frozen.

use super::cell::CellState;
use super::draws::DRAW_MAX;

/// An EMPTY cell is seeded when at least this many neighbours are grown grass.
pub const SEEDING_MIN_GROWN: u8 = 3;
/// A parasite with at least this many parasite neighbours dies of crowding.
pub const CROWDING_MIN_PARASITES: u8 = 5;
/// Draws at or below this value succeed (25% with `DRAW_MAX = 20`).
pub const DRAW_SUCCESS_MAX: u8 = 5;
/// Parasites start dying of old age once the generation exceeds this.
pub const AGING_AFTER_GENERATION: u64 = 50;

const _: () = assert!(DRAW_SUCCESS_MAX <= DRAW_MAX);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Vegetation,
    Predation,
}

impl Phase {
    #[inline]
    pub const fn of(generation: u64) -> Phase {
        if generation % 2 == 0 {
            Phase::Vegetation
        } else {
            Phase::Predation
        }
    }
}

/// Moore-neighbourhood counts the rule cares about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub parasites: u8,
    pub grown: u8,
}

impl Tally {
    #[inline]
    pub fn add(&mut self, state: CellState) {
        match state {
            CellState::Parasite => self.parasites += 1,
            CellState::GrownGrass => self.grown += 1,
            CellState::Empty | CellState::SeededGrass | CellState::GrowingGrass => {}
        }
    }
}

/// Next state of one cell.
///
/// `tally` is only evaluated for states whose outcome depends on the
/// neighbourhood. `draw` is called at most once, and only when the outcome is
/// still undecided after the deterministic conditions.
#[inline]
pub fn next_state(
    current: CellState,
    generation: u64,
    tally: impl FnOnce() -> Tally,
    draw: impl FnOnce() -> u8,
) -> CellState {
    use CellState::*;

    match (Phase::of(generation), current) {
        (Phase::Vegetation, GrownGrass | GrowingGrass) => GrownGrass,
        (Phase::Vegetation, SeededGrass) => GrowingGrass,
        (Phase::Vegetation, Parasite) => Parasite,
        (Phase::Vegetation, Empty) => {
            if tally().grown >= SEEDING_MIN_GROWN {
                SeededGrass
            } else {
                Empty
            }
        }
        (Phase::Predation, state @ (Empty | SeededGrass | GrowingGrass)) => state,
        (Phase::Predation, GrownGrass) => {
            if tally().parasites > 0 && draw() <= DRAW_SUCCESS_MAX {
                Parasite
            } else {
                GrownGrass
            }
        }
        (Phase::Predation, Parasite) => {
            let tally = tally();
            let crowded = tally.parasites >= CROWDING_MIN_PARASITES;
            let starving = tally.grown == 0;
            if crowded
                || starving
                || (generation > AGING_AFTER_GENERATION && draw() <= DRAW_SUCCESS_MAX)
            {
                Empty
            } else {
                Parasite
            }
        }
    }
}
