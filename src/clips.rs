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

//! The clip registry: every sound effect the player knows about.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::util;

/// File extensions that are picked up from the clip directory.
const CLIP_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// The largest clip id accepted from persisted settings, so ids stay exact for JSON clients.
pub const MAX_CLIP_ID: u64 = (1 << 53) - 1;

/// A stable clip identifier. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("clip {0} not found")]
    NotFound(ClipId),

    #[error("clip file {} is missing", .0.display())]
    MissingFile(PathBuf),

    #[error("clip id {0} is out of range")]
    IdOutOfRange(ClipId),
}

/// A single sound effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clip {
    /// The identifier of the clip.
    pub id: ClipId,
    /// The display name of the clip.
    pub name: String,
    /// The audio file backing this clip.
    pub file_path: PathBuf,
    /// Plays when a door opens.
    pub on_open: bool,
    /// Plays when a door closes.
    pub on_close: bool,
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] (open: {}, close: {}, file: {})",
            self.name,
            self.id,
            self.on_open,
            self.on_close,
            util::filename_display(&self.file_path)
        )
    }
}

/// The clip registry. Clips are kept sorted by name so that listings and the active sets
/// derived from it are deterministic.
#[derive(Debug, Default, Clone)]
pub struct Clips {
    clips: Vec<Clip>,
    /// The next id to hand out.
    next_id: u64,
}

impl Clips {
    /// Creates an empty registry.
    pub fn new() -> Clips {
        Clips::default()
    }

    /// Registers a new clip for the given file. The name defaults to the file stem.
    pub fn add(&mut self, file_path: PathBuf, name: Option<String>) -> ClipId {
        let id = ClipId(self.next_id);
        self.next_id += 1;

        let name = name.unwrap_or_else(|| util::file_stem(&file_path).to_string());
        info!(id = id.0, clip = name.as_str(), "Registering clip.");
        self.insert(Clip {
            id,
            name,
            file_path,
            on_open: false,
            on_close: false,
        });
        id
    }

    /// Restores a previously persisted clip. The id allocator moves past the restored id.
    /// A clip whose id is already taken is given a fresh one. Ids above [MAX_CLIP_ID] are
    /// rejected.
    pub fn restore(&mut self, mut clip: Clip) -> Result<ClipId, ClipError> {
        if clip.id.0 > MAX_CLIP_ID {
            return Err(ClipError::IdOutOfRange(clip.id));
        }
        if self.get(clip.id).is_some() {
            let fresh = ClipId(self.next_id);
            warn!(
                id = clip.id.0,
                fresh = fresh.0,
                "Duplicate clip id, assigning a new one."
            );
            clip.id = fresh;
        }
        let next_id = clip
            .id
            .0
            .checked_add(1)
            .ok_or(ClipError::IdOutOfRange(clip.id))?;
        self.next_id = self.next_id.max(next_id);

        let id = clip.id;
        self.insert(clip);
        Ok(id)
    }

    fn insert(&mut self, clip: Clip) {
        let position = self
            .clips
            .partition_point(|existing| (&existing.name, existing.id) <= (&clip.name, clip.id));
        self.clips.insert(position, clip);
    }

    /// Drops every clip whose backing file no longer exists. Returns the removed clips.
    pub fn remove_if_missing(&mut self) -> Vec<Clip> {
        let (kept, removed): (Vec<Clip>, Vec<Clip>) = self
            .clips
            .drain(..)
            .partition(|clip| clip.file_path.is_file());
        self.clips = kept;

        for clip in removed.iter() {
            let err = ClipError::MissingFile(clip.file_path.clone());
            warn!(id = clip.id.0, clip = clip.name, "{}, dropping clip", err);
        }
        removed
    }

    /// Updates the flags of the given clip. Flags that are None are left alone.
    pub fn set_flags(
        &mut self,
        id: ClipId,
        on_open: Option<bool>,
        on_close: Option<bool>,
    ) -> Result<Clip, ClipError> {
        let clip = self
            .clips
            .iter_mut()
            .find(|clip| clip.id == id)
            .ok_or(ClipError::NotFound(id))?;

        if let Some(on_open) = on_open {
            clip.on_open = on_open;
        }
        if let Some(on_close) = on_close {
            clip.on_close = on_close;
        }
        Ok(clip.clone())
    }

    /// Gets the clip with the given id.
    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|clip| clip.id == id)
    }

    /// Returns true if a clip is registered for the given file.
    pub fn contains_file(&self, file_path: &Path) -> bool {
        self.clips.iter().any(|clip| clip.file_path == file_path)
    }

    /// All clips, sorted by name.
    pub fn list(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Registers every clip file in the directory that isn't registered yet. Returns the
    /// number of clips added.
    pub fn discover(&mut self, directory: &Path) -> Result<usize, io::Error> {
        let mut added = 0;
        for file_path in clip_files(directory)? {
            if self.contains_file(&file_path) {
                continue;
            }
            self.add(file_path, None);
            added += 1;
        }
        Ok(added)
    }
}

/// Lists the clip files in a directory, sorted by path.
pub fn clip_files(directory: &Path) -> Result<Vec<PathBuf>, io::Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let extension = path.extension().and_then(|ext| ext.to_str());
        if extension.is_some_and(|ext| CLIP_EXTENSIONS.contains(&ext.to_lowercase().as_str())) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
