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
use std::{fmt, path::Path, sync::Arc, time::Duration};

use crate::config;

pub mod cpal;
pub mod error;
pub mod loader;
pub mod mock;

pub use error::AudioError;

/// An audio output that plays one clip at a time.
///
/// Implementations use interior mutability. Callers that need a check-then-act sequence
/// (is_busy followed by load and play) must serialize access themselves.
pub trait Sink: fmt::Display + Send + Sync {
    /// Loads the clip at the given path, replacing whatever was loaded before.
    fn load(&self, file_path: &Path) -> Result<(), AudioError>;

    /// Starts playing the loaded clip from the beginning. Returns immediately.
    fn play(&self) -> Result<(), AudioError>;

    /// Stops playback. Does nothing if nothing is playing.
    fn stop(&self) -> Result<(), AudioError>;

    /// Returns true while a clip is audible.
    fn is_busy(&self) -> bool;

    /// Returns the length of the clip at the given path.
    fn length(&self, file_path: &Path) -> Result<Duration, AudioError>;

    /// The output volume, from 0.0 to 1.0.
    fn volume(&self) -> f32;

    /// Sets the output volume. Values outside of 0.0 to 1.0 are clamped.
    fn set_volume(&self, volume: f32);
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, AudioError> {
    cpal::Sink::list()
}

/// Gets a sink for the given configuration. Device names starting with "mock" produce a
/// mock sink.
pub fn get_sink(config: &config::Audio) -> Result<Arc<dyn Sink>, AudioError> {
    let device = config.device();
    let sink: Arc<dyn Sink> = if device.starts_with("mock") {
        Arc::new(mock::Sink::get(device))
    } else {
        Arc::new(cpal::Sink::get(config)?)
    };

    sink.set_volume(f32::from(config.volume()) / 100.0);
    Ok(sink)
}
