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
use std::io;
use std::path::PathBuf;

use crate::audio::AudioError;
use crate::clips::{ClipError, ClipId};

/// Errors reported by scheduler operations. None of these are fatal to the engine.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("clip {0} not found")]
    NotFound(ClipId),

    #[error("clip file {} is missing", .0.display())]
    MissingFile(PathBuf),

    #[error("no clips registered")]
    NoClips,

    #[error("volume {0} is out of range (0-100)")]
    InvalidVolume(u8),

    #[error("sink error: {0}")]
    Sink(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<ClipError> for ScheduleError {
    fn from(err: ClipError) -> Self {
        match err {
            ClipError::NotFound(id) | ClipError::IdOutOfRange(id) => ScheduleError::NotFound(id),
            ClipError::MissingFile(path) => ScheduleError::MissingFile(path),
        }
    }
}
