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

//! A door chime player. Two door sensors are debounced into open and close edges, and each
//! edge plays the next enabled clip unless something is already playing.

pub mod audio;
pub mod clips;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod monitor;
pub mod projector;
pub mod scheduler;
pub mod sensor;
pub mod settings;
pub mod util;

#[cfg(test)]
mod testutil;
