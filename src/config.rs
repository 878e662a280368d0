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
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::monitor::DoorMonitor;
use crate::scheduler::Scheduler;
use crate::settings::YamlStore;

mod audio;
mod controller;
mod error;
mod player;
mod sensor;

pub use self::audio::Audio;
pub use self::controller::{Controller, WebController};
pub use self::error::ConfigError;
pub use self::player::{ClipsConfig, Player};
pub use self::sensor::{GpioSensor, MockSensor, Sensor, Sensors};

/// Initializes the engine from the given config file and returns the controller. The
/// controller owns the drivers and the door monitor thread. Realistically, the controller is
/// not expected to exit.
pub fn init_engine(player_path: &Path) -> Result<crate::controller::Controller, Box<dyn Error>> {
    let player = Player::deserialize(player_path)?;
    // Relative paths in the config file are relative to the file itself.
    let base = player_path.parent().unwrap_or(Path::new(""));

    let sink = crate::audio::get_sink(player.audio())?;
    info!(sink = %sink, "Audio sink ready.");

    let left = crate::sensor::get_sensor("left", &player.sensors().left)?;
    let right = crate::sensor::get_sensor("right", &player.sensors().right)?;

    let store = Arc::new(YamlStore::new(&player.settings_file(base)));
    let scheduler = Arc::new(Scheduler::new(
        sink,
        store,
        Some(player.clip_directory(base)),
    ));
    scheduler.load()?;

    let monitor = DoorMonitor::new(scheduler.clone(), left, right, player.debounce()?)
        .start(player.poll_interval()?)?;
    let drivers = crate::controller::drivers(player.controllers(), scheduler)?;

    Ok(crate::controller::Controller::new(drivers, Some(monitor)))
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs};

    use super::init_engine;

    #[test]
    fn test_init_engine() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("sounds"))?;
        fs::File::create(dir.path().join("sounds").join("bell.wav"))?;
        let config_path = dir.path().join("bellbard.yaml");
        fs::write(
            &config_path,
            r#"
audio:
  device: mock-device
sensors:
  left:
    kind: mock
  right:
    kind: mock
clips:
  directory: sounds
"#,
        )?;

        let _controller = init_engine(&config_path)?;

        let settings = fs::read_to_string(dir.path().join("sounds").join("settings.yaml"))?;
        assert!(settings.contains("bell"), "{}", settings);
        Ok(())
    }

    #[test]
    fn test_init_engine_missing_config() {
        assert!(init_engine(std::path::Path::new("/nonexistent/bellbard.yaml")).is_err());
    }
}
