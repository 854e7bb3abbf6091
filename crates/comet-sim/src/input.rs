//! Frame-indexed player input.

use std::collections::{BTreeMap, HashMap};

use bevy_ecs::prelude::*;

use crate::components::PlayerRef;

/// Input snapshot for one player on one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShipInput {
    pub accelerate: bool,
    pub turn_left: bool,
    pub turn_right: bool,
}

/// Confirmed inputs keyed by player and frame.
#[derive(Resource, Debug, Default)]
pub struct InputBuffer {
    frames: HashMap<PlayerRef, BTreeMap<u64, ShipInput>>,
}

impl InputBuffer {
    /// Record `input` for `player` on `frame`, replacing any earlier value.
    pub fn insert(&mut self, player: PlayerRef, frame: u64, input: ShipInput) {
        self.frames.entry(player).or_default().insert(frame, input);
    }

    /// Input for `player` on `frame`, if one was recorded.
    pub fn get(&self, player: PlayerRef, frame: u64) -> Option<ShipInput> {
        self.frames.get(&player)?.get(&frame).copied()
    }

    /// Drop every input older than `frame`.
    pub fn prune_before(&mut self, frame: u64) {
        for inputs in self.frames.values_mut() {
            *inputs = inputs.split_off(&frame);
        }
    }

    /// Number of buffered inputs across all players.
    pub fn len(&self) -> usize {
        self.frames.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
