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
use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";

/// The two door sensors.
#[derive(Deserialize, Clone)]
pub struct Sensors {
    pub left: Sensor,
    pub right: Sensor,
}

/// Allows users to specify the kind of door sensor.
#[derive(Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Sensor {
    Gpio(GpioSensor),
    Mock(MockSensor),
}

/// A switch wired to a GPIO pin.
#[derive(Deserialize, Clone)]
pub struct GpioSensor {
    /// The GPIO character device (default: /dev/gpiochip0).
    chip: Option<PathBuf>,
    /// The line offset on the chip. On a Raspberry Pi this is the BCM pin number.
    pin: u32,
    /// Whether the pin reads low when the switch is pressed (default: true, which matches
    /// a switch to ground with a pull-up).
    active_low: Option<bool>,
}

impl GpioSensor {
    pub fn chip(&self) -> &Path {
        self.chip.as_deref().unwrap_or(Path::new(DEFAULT_GPIO_CHIP))
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    pub fn active_low(&self) -> bool {
        self.active_low.unwrap_or(true)
    }
}

/// A sensor with a fixed starting level, for running without hardware.
#[derive(Deserialize, Clone)]
pub struct MockSensor {
    /// Whether the door starts out closed (default: true).
    closed: Option<bool>,
}

impl MockSensor {
    pub fn closed(&self) -> bool {
        self.closed.unwrap_or(true)
    }
}
