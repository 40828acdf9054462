use serde::{Deserialize, Serialize};

use cubedash_core::ObstacleFrame;

use crate::level::{Level, ObstacleKind};
use crate::palette::Palette;

/// Ticks a collected coin keeps fading out.
pub const COIN_FADE_TICKS: f32 = 20.0;

/// Per-obstacle mutable state. Everything here resets on respawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TripState {
    pub activated: bool,
    /// Remaining retrigger cooldown of an orb or pad, in ticks.
    pub timeout: f32,
    pub collected: bool,
    pub collect_fade: f32,
}

/// Mutable per-attempt state layered over an immutable level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    pub trips: Vec<TripState>,
    pub palette: Palette,
}

impl StageState {
    pub fn new(level: &Level) -> Self {
        Self {
            trips: vec![TripState::default(); level.obstacles().len()],
            palette: Palette::new(&level.settings),
        }
    }

    pub fn reset(&mut self, level: &Level) {
        *self = Self::new(level);
    }

    /// Count down timers by one sub-step.
    pub fn advance(&mut self, dt: f32) {
        for trip in &mut self.trips {
            if trip.timeout > 0.0 {
                trip.timeout -= dt;
            }
            if trip.collect_fade > 0.0 {
                trip.collect_fade = (trip.collect_fade - dt).max(0.0);
            }
        }
        self.palette.advance(dt);
    }

    /// Coin flags collected this attempt, by coin index.
    pub fn collected_coins(&self, level: &Level) -> Vec<bool> {
        let mut coins = vec![false; level.coin_count()];
        for (ob, trip) in level.obstacles().iter().zip(&self.trips) {
            if let ObstacleKind::Coin { index } = ob.kind {
                if trip.collected && index < coins.len() {
                    coins[index] = true;
                }
            }
        }
        coins
    }

    /// Render flags per obstacle. Coins already in the level's completion
    /// record are marked as previously collected.
    pub fn frames(&self, level: &Level) -> Vec<ObstacleFrame> {
        self.trips
            .iter()
            .zip(level.obstacles())
            .enumerate()
            .map(|(index, (trip, ob))| ObstacleFrame {
                index,
                activated: trip.activated,
                cooling_down: trip.timeout > 0.0,
                collected: trip.collected,
                previously_collected: match ob.kind {
                    ObstacleKind::Coin { index: coin } => level.completion.is_coin_collected(coin),
                    _ => false,
                },
                collect_fade: trip.collect_fade,
            })
            .collect()
    }
}
