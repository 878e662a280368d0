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
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tracing::info;

use super::AudioError;

/// The length reported for clips that have no explicit length set.
const DEFAULT_LENGTH: Duration = Duration::from_secs(2);

/// A command received by the mock sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Load(PathBuf),
    Play,
    Stop,
}

/// A mock sink. Doesn't actually play anything, but records every command it receives.
///
/// By default clips finish instantly, so the sink is never busy. With `hold` set, a played
/// clip keeps the sink busy until it is stopped.
#[derive(Clone)]
pub struct Sink {
    name: String,
    calls: Arc<Mutex<Vec<SinkCall>>>,
    loaded: Arc<Mutex<Option<PathBuf>>>,
    busy: Arc<AtomicBool>,
    hold: Arc<AtomicBool>,
    fail_loads: Arc<AtomicBool>,
    lengths: Arc<Mutex<HashMap<PathBuf, Duration>>>,
    volume: Arc<AtomicU32>,
}

impl Sink {
    /// Gets the given mock sink.
    pub fn get(name: &str) -> Sink {
        Sink {
            name: name.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            loaded: Arc::new(Mutex::new(None)),
            busy: Arc::new(AtomicBool::new(false)),
            hold: Arc::new(AtomicBool::new(false)),
            fail_loads: Arc::new(AtomicBool::new(false)),
            lengths: Arc::new(Mutex::new(HashMap::new())),
            volume: Arc::new(AtomicU32::new(1.0f32.to_bits())),
        }
    }

    /// Returns every command received so far.
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    /// Forgets all recorded commands.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Returns the files that were played, in order.
    pub fn played(&self) -> Vec<PathBuf> {
        let calls = self.calls.lock();
        let mut loaded: Option<&PathBuf> = None;
        let mut played = Vec::new();
        for call in calls.iter() {
            match call {
                SinkCall::Load(path) => loaded = Some(path),
                SinkCall::Play => {
                    if let Some(path) = loaded {
                        played.push(path.clone());
                    }
                }
                SinkCall::Stop => {}
            }
        }
        played
    }

    /// Forces the busy state.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Relaxed);
    }

    /// When set, played clips keep the sink busy until stopped.
    pub fn set_hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::Relaxed);
    }

    /// When set, every load fails.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::Relaxed);
    }

    /// Sets the length reported for the given file.
    pub fn set_length(&self, file_path: &Path, length: Duration) {
        self.lengths.lock().insert(file_path.to_path_buf(), length);
    }
}

impl super::Sink for Sink {
    fn load(&self, file_path: &Path) -> Result<(), AudioError> {
        if self.fail_loads.load(Ordering::Relaxed) {
            return Err(AudioError::Device(format!(
                "mock failed to load {}",
                file_path.display()
            )));
        }
        self.calls.lock().push(SinkCall::Load(file_path.to_path_buf()));
        *self.loaded.lock() = Some(file_path.to_path_buf());
        Ok(())
    }

    fn play(&self) -> Result<(), AudioError> {
        let loaded = self.loaded.lock().clone();
        let Some(loaded) = loaded else {
            return Err(AudioError::NothingLoaded);
        };

        info!(sink = self.name, clip = ?loaded, "Playing clip (mock).");
        self.calls.lock().push(SinkCall::Play);
        if self.hold.load(Ordering::Relaxed) {
            self.busy.store(true, Ordering::Relaxed);
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), AudioError> {
        self.calls.lock().push(SinkCall::Stop);
        self.busy.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }

    fn length(&self, file_path: &Path) -> Result<Duration, AudioError> {
        Ok(self
            .lengths
            .lock()
            .get(file_path)
            .copied()
            .unwrap_or(DEFAULT_LENGTH))
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    fn set_volume(&self, volume: f32) {
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
