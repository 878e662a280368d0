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

//! Door switches read through the Linux GPIO character device.

use std::fmt;
use std::path::Path;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tracing::info;

use super::SensorError;

/// The label the kernel shows for lines held by this process.
const CONSUMER: &str = "bellbard";

/// A door switch wired to a GPIO input line.
pub struct Sensor {
    /// The name of the sensor, e.g. "left".
    name: String,
    /// The GPIO chip, e.g. /dev/gpiochip0.
    chip: String,
    /// The line offset on the chip. On a Raspberry Pi this is the BCM number.
    pin: u32,
    /// Switches wired against a pull-up read low when pressed.
    active_low: bool,
    /// The requested input line. The request is released on drop.
    handle: LineHandle,
}

impl Sensor {
    /// Requests the line as an input. Active low inversion is done by the kernel.
    pub fn open(
        chip: &Path,
        name: &str,
        pin: u32,
        active_low: bool,
    ) -> Result<Sensor, SensorError> {
        let mut gpio_chip = Chip::new(chip)?;
        let mut flags = LineRequestFlags::INPUT;
        if active_low {
            flags |= LineRequestFlags::ACTIVE_LOW;
        }
        let handle = gpio_chip.get_line(pin)?.request(flags, 0, CONSUMER)?;

        info!(sensor = name, chip = ?chip, pin, active_low, "Requested GPIO line.");
        Ok(Sensor {
            name: name.to_string(),
            chip: chip.display().to_string(),
            pin,
            active_low,
            handle,
        })
    }
}

/// Converts a logical line value into a level.
fn level(value: u8) -> Result<bool, SensorError> {
    match value {
        1 => Ok(true),
        0 => Ok(false),
        other => Err(SensorError::Value(other.to_string())),
    }
}

impl super::Sensor for Sensor {
    fn read_level(&self) -> Result<bool, SensorError> {
        level(self.handle.get_value()?)
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (GPIO {} line {}{})",
            self.name,
            self.chip,
            self.pin,
            if self.active_low { ", active low" } else { "" }
        )
    }
}
