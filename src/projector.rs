// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use crate::clips::{ClipId, Clips};
use crate::debounce::Edge;

/// The clips eligible for each door edge, in registry order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActiveSets {
    open: Vec<ClipId>,
    close: Vec<ClipId>,
}

impl ActiveSets {
    /// Returns the active set for the given edge.
    pub fn for_edge(&self, edge: Edge) -> &[ClipId] {
        match edge {
            Edge::Opened => &self.open,
            Edge::Closed => &self.close,
        }
    }
}

/// Derives both active sets from the registry. An empty set means nothing plays for that edge.
pub fn project(clips: &Clips) -> ActiveSets {
    let mut sets = ActiveSets::default();
    for clip in clips.list() {
        if clip.on_open {
            sets.open.push(clip.id);
        }
        if clip.on_close {
            sets.close.push(clip.id);
        }
    }
    sets
}
