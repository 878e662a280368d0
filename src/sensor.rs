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
use std::{fmt, io, sync::Arc};

use crate::config;

pub mod gpio;
pub mod mock;

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("GPIO error: {0}")]
    Gpio(#[from] gpio_cdev::Error),

    #[error("Unexpected sensor value: {0:?}")]
    Value(String),
}

/// A door edge sensor.
pub trait Sensor: fmt::Display + Send + Sync {
    /// Reads the raw level. True means the sensor is pressed, i.e. the door is closed.
    fn read_level(&self) -> Result<bool, SensorError>;
}

/// Gets a sensor for the given configuration.
pub fn get_sensor(name: &str, config: &config::Sensor) -> Result<Arc<dyn Sensor>, SensorError> {
    Ok(match config {
        config::Sensor::Gpio(gpio) => Arc::new(gpio::Sensor::open(
            gpio.chip(),
            name,
            gpio.pin(),
            gpio.active_low(),
        )?),
        config::Sensor::Mock(mock) => Arc::new(mock::Sensor::get(name, mock.closed())),
    })
}
