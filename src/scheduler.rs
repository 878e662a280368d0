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

//! The playback scheduler. Turns door edges into clip playback and services the control
//! surface.
//!
//! Two locks guard the shared state. `state` covers the registry, both active sets and both
//! rotation indices. `sink` serializes every sink command so that a busy check and the
//! load/play that follows it are one decision. When both are needed, `sink` is taken first.
//! `save` orders persistence and is also taken before `state`.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, error, info, span, warn, Level};

use crate::audio::Sink;
use crate::clips::{Clip, ClipId, Clips};
use crate::debounce::Edge;
use crate::projector::{self, ActiveSets};
use crate::settings::Store;

pub mod error;

pub use error::ScheduleError;

/// Why an edge didn't produce any playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A clip is already playing. Door chimes never interrupt playback.
    AudioBusy,
    /// No clip is enabled for this edge.
    EmptySubset,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AudioBusy => write!(f, "audio busy"),
            SkipReason::EmptySubset => write!(f, "no clips enabled"),
        }
    }
}

/// The result of handling a door edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Played { clip: Clip, length: Duration },
    Skipped(SkipReason),
}

/// The result of a rescan of the clip directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rescan {
    pub added: usize,
    pub removed: usize,
}

/// The registry and everything derived from it.
#[derive(Default)]
struct State {
    clips: Clips,
    active: ActiveSets,
    open_index: usize,
    close_index: usize,
}

impl State {
    fn reproject(&mut self) {
        self.active = projector::project(&self.clips);
    }

    fn rotation_mut(&mut self, edge: Edge) -> &mut usize {
        match edge {
            Edge::Opened => &mut self.open_index,
            Edge::Closed => &mut self.close_index,
        }
    }

    /// Picks the next clip for the edge without advancing the rotation. Returns the clip and
    /// the index it was found at.
    fn next_clip(&mut self, edge: Edge) -> Option<(Clip, usize)> {
        let len = self.active.for_edge(edge).len();
        if len == 0 {
            return None;
        }

        // The set may have shrunk since the index was last advanced.
        let mut index = *self.rotation_mut(edge);
        if index >= len {
            index = 0;
        }

        let id = self.active.for_edge(edge)[index];
        self.clips.get(id).cloned().map(|clip| (clip, index))
    }
}

/// Schedules clip playback for door edges and previews.
pub struct Scheduler {
    state: Mutex<State>,
    sink: Mutex<Arc<dyn Sink>>,
    save: Mutex<()>,
    store: Arc<dyn Store>,
    clip_directory: Option<PathBuf>,
}

impl Scheduler {
    /// Creates a scheduler with an empty registry.
    pub fn new(
        sink: Arc<dyn Sink>,
        store: Arc<dyn Store>,
        clip_directory: Option<PathBuf>,
    ) -> Scheduler {
        Scheduler {
            state: Mutex::new(State::default()),
            sink: Mutex::new(sink),
            save: Mutex::new(()),
            store,
            clip_directory,
        }
    }

    /// Loads persisted clips, drops the ones whose files have vanished, picks up new files
    /// from the clip directory and saves the result.
    pub fn load(&self) -> Result<Rescan, Box<dyn Error>> {
        let span = span!(Level::INFO, "scheduler");
        let _enter = span.enter();

        let persisted = self.store.load_all()?;
        let _save = self.save.lock();
        let (result, snapshot) = {
            let mut state = self.state.lock();
            for clip in persisted {
                let name = clip.name.clone();
                if let Err(e) = state.clips.restore(clip) {
                    warn!(clip = name, err = %e, "Skipping persisted clip.");
                }
            }
            let result = self.refresh(&mut state)?;
            (result, state.clips.list().to_vec())
        };
        self.persist(&snapshot);

        info!(
            clips = snapshot.len(),
            added = result.added,
            removed = result.removed,
            "Loaded clips."
        );
        Ok(result)
    }

    /// Handles a validated door edge. Never interrupts playback that is already in progress.
    pub fn on_edge_event(&self, edge: Edge) -> Result<Outcome, ScheduleError> {
        let sink = self.sink.lock();
        if sink.is_busy() {
            debug!(edge = %edge, "Sink busy, skipping.");
            return Ok(Outcome::Skipped(SkipReason::AudioBusy));
        }

        let mut state = self.state.lock();
        let Some((clip, index)) = state.next_clip(edge) else {
            debug!(edge = %edge, "No clips enabled, skipping.");
            return Ok(Outcome::Skipped(SkipReason::EmptySubset));
        };

        sink.load(&clip.file_path)?;
        sink.play()?;
        *state.rotation_mut(edge) = index + 1;
        drop(state);

        let length = Self::length(&**sink, &clip);
        info!(edge = %edge, clip = clip.name, id = clip.id.0, "Playing clip.");
        Ok(Outcome::Played { clip, length })
    }

    /// All clips, sorted by name.
    pub fn list_clips(&self) -> Vec<Clip> {
        self.state.lock().clips.list().to_vec()
    }

    /// The current active sets.
    pub fn active_sets(&self) -> ActiveSets {
        self.state.lock().active.clone()
    }

    /// Updates the flags of a clip. The active sets are recomputed before this returns, so the
    /// very next edge sees the change.
    pub fn toggle_flags(
        &self,
        id: ClipId,
        on_open: Option<bool>,
        on_close: Option<bool>,
    ) -> Result<Clip, ScheduleError> {
        let _save = self.save.lock();
        let (clip, snapshot) = {
            let mut state = self.state.lock();
            let clip = state.clips.set_flags(id, on_open, on_close)?;
            state.reproject();
            (clip, state.clips.list().to_vec())
        };

        info!(
            id = clip.id.0,
            clip = clip.name,
            on_open = clip.on_open,
            on_close = clip.on_close,
            "Updated clip."
        );
        self.persist(&snapshot);
        Ok(clip)
    }

    /// Plays the given clip immediately, stopping whatever is playing. Doesn't touch the
    /// rotation.
    pub fn trigger_preview(&self, id: ClipId) -> Result<(Clip, Duration), ScheduleError> {
        let clip = self
            .state
            .lock()
            .clips
            .get(id)
            .cloned()
            .ok_or(ScheduleError::NotFound(id))?;

        let sink = self.sink.lock();
        sink.stop()?;
        sink.load(&clip.file_path)?;
        sink.play()?;

        let length = Self::length(&**sink, &clip);
        info!(id = clip.id.0, clip = clip.name, "Previewing clip.");
        Ok((clip, length))
    }

    /// Previews a randomly chosen clip.
    pub fn trigger_random_preview(&self) -> Result<(Clip, Duration), ScheduleError> {
        let id = self
            .state
            .lock()
            .clips
            .list()
            .choose(&mut rand::thread_rng())
            .map(|clip| clip.id)
            .ok_or(ScheduleError::NoClips)?;
        self.trigger_preview(id)
    }

    /// Stops playback.
    pub fn stop(&self) -> Result<(), ScheduleError> {
        self.sink.lock().stop()?;
        info!("Stopped playback.");
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.sink.lock().is_busy()
    }

    /// The volume from 0 to 100.
    pub fn volume(&self) -> u8 {
        (self.sink.lock().volume() * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Sets the volume from 0 to 100.
    pub fn set_volume(&self, volume: u8) -> Result<(), ScheduleError> {
        if volume > 100 {
            return Err(ScheduleError::InvalidVolume(volume));
        }
        self.sink.lock().set_volume(f32::from(volume) / 100.0);
        info!(volume, "Set volume.");
        Ok(())
    }

    /// Drops clips whose files have vanished and registers new files from the clip
    /// directory.
    pub fn rescan(&self) -> Result<Rescan, ScheduleError> {
        let _save = self.save.lock();
        let (result, snapshot) = {
            let mut state = self.state.lock();
            let result = self.refresh(&mut state);
            (result, state.clips.list().to_vec())
        };
        // Removals are kept even when the directory can't be read.
        self.persist(&snapshot);
        let result = result?;
        info!(
            added = result.added,
            removed = result.removed,
            "Rescanned clip directory."
        );
        Ok(result)
    }

    fn refresh(&self, state: &mut State) -> Result<Rescan, ScheduleError> {
        let removed = state.clips.remove_if_missing().len();
        let added = match &self.clip_directory {
            Some(directory) => state.clips.discover(directory),
            None => Ok(0),
        };
        state.reproject();
        Ok(Rescan {
            added: added?,
            removed,
        })
    }

    /// Saves a snapshot. Failures are logged and retried on the next save.
    fn persist(&self, clips: &[Clip]) {
        if let Err(e) = self.store.save_all(clips) {
            error!(err = e.as_ref(), "Error saving clip settings.");
        }
    }

    fn length(sink: &dyn Sink, clip: &Clip) -> Duration {
        sink.length(&clip.file_path).unwrap_or_else(|e| {
            warn!(clip = clip.name, err = %e, "Unable to get clip length.");
            Duration::ZERO
        })
    }
}
