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
use std::{
    fmt, io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use super::SensorError;

/// A mock sensor whose level is set by hand.
#[derive(Clone)]
pub struct Sensor {
    name: String,
    closed: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl Sensor {
    /// Gets a mock sensor starting at the given level.
    pub fn get(name: &str, closed: bool) -> Sensor {
        Sensor {
            name: name.to_string(),
            closed: Arc::new(AtomicBool::new(closed)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_closed(&self, closed: bool) {
        self.closed.store(closed, Ordering::Relaxed);
    }

    /// When set, reads fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl super::Sensor for Sensor {
    fn read_level(&self) -> Result<bool, SensorError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(io::Error::other(format!("mock sensor {} failed", self.name)).into());
        }
        Ok(self.closed.load(Ordering::Relaxed))
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
