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
use serde::Deserialize;

const DEFAULT_WEB_PORT: u16 = 5000;

/// Allows users to specify various controllers.
#[derive(Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Controller {
    Web(WebController),
    Keyboard,
}

/// The configuration for the HTTP control surface.
#[derive(Deserialize, Clone)]
pub struct WebController {
    /// The port to listen on (default: 5000).
    port: Option<u16>,
}

impl WebController {
    pub fn new(port: u16) -> WebController {
        WebController { port: Some(port) }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_WEB_PORT)
    }
}
