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

//! Turns raw door sensor levels into validated open/close edges.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// The minimum time between two accepted transitions on the same sensor.
pub const DEFAULT_DEBOUNCE_THRESHOLD: Duration = Duration::from_secs(1);

/// A validated transition of a door sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// The door moved away from the sensor.
    Opened,
    /// The door came to rest against the sensor.
    Closed,
}

impl Edge {
    /// Returns the edge that a stable level represents. A true level means the sensor is
    /// pressed, i.e. the door is closed.
    pub fn from_level(closed: bool) -> Edge {
        if closed {
            Edge::Closed
        } else {
            Edge::Opened
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Opened => write!(f, "opened"),
            Edge::Closed => write!(f, "closed"),
        }
    }
}

/// Per-sensor debounce state.
///
/// A candidate transition is accepted only if at least `threshold` has elapsed since the
/// last accepted transition. Discarded samples do not move the transition timestamp, so a
/// burst of bounces is always measured from the last accepted edge.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// The last level that was accepted. True means closed.
    stable_level: bool,
    /// When the last transition was accepted. None until the first one.
    last_transition: Option<Instant>,
    /// The minimum time between accepted transitions.
    threshold: Duration,
}

impl Debouncer {
    /// Creates a debouncer that starts out stable at the given level.
    pub fn new(initial_level: bool, threshold: Duration) -> Debouncer {
        Debouncer {
            stable_level: initial_level,
            last_transition: None,
            threshold,
        }
    }

    /// Feeds one raw sample taken at `now`. Returns the edge if the sample was accepted as a
    /// transition.
    pub fn sample(&mut self, level: bool, now: Instant) -> Option<Edge> {
        if level == self.stable_level {
            return None;
        }

        if let Some(last_transition) = self.last_transition {
            if now.saturating_duration_since(last_transition) < self.threshold {
                return None;
            }
        }

        self.stable_level = level;
        self.last_transition = Some(now);
        Some(Edge::from_level(level))
    }

    /// Returns the last accepted level.
    pub fn stable_level(&self) -> bool {
        self.stable_level
    }

    /// Returns when the last transition was accepted.
    pub fn last_transition(&self) -> Option<Instant> {
        self.last_transition
    }
}
