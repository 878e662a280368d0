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
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::audio::Audio;
use super::controller::Controller;
use super::error::ConfigError;
use super::sensor::Sensors;
use crate::debounce::DEFAULT_DEBOUNCE_THRESHOLD;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_SETTINGS_FILE: &str = "settings.yaml";

/// The configuration for the door chime player.
#[derive(Deserialize, Clone)]
pub struct Player {
    /// The audio output.
    audio: Audio,
    /// The door sensors.
    sensors: Sensors,
    /// Minimum time between two accepted transitions of one sensor (default: 1s).
    debounce: Option<String>,
    /// How often the sensors are sampled (default: 10ms).
    poll_interval: Option<String>,
    /// Where clips live.
    clips: ClipsConfig,
    /// The control surfaces.
    #[serde(default)]
    controllers: Vec<Controller>,
}

/// Where clips and their settings are stored.
#[derive(Deserialize, Clone)]
pub struct ClipsConfig {
    /// The directory scanned for clip files.
    directory: PathBuf,
    /// The settings file (default: settings.yaml in the clip directory).
    settings: Option<PathBuf>,
}

fn parse_duration(value: &Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.clone())
            .map_err(|e| ConfigError::Duration(value.clone(), e.to_string()))?
            .into()),
        None => Ok(default),
    }
}

impl Player {
    /// Deserializes a file from the path into a player configuration.
    pub fn deserialize(path: &Path) -> Result<Player, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Player>()?)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn sensors(&self) -> &Sensors {
        &self.sensors
    }

    pub fn debounce(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.debounce, DEFAULT_DEBOUNCE_THRESHOLD)
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.poll_interval, DEFAULT_POLL_INTERVAL)
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    /// The clip directory. Relative paths are resolved against `base`.
    pub fn clip_directory(&self, base: &Path) -> PathBuf {
        base.join(&self.clips.directory)
    }

    /// The settings file. Relative paths are resolved against `base`.
    pub fn settings_file(&self, base: &Path) -> PathBuf {
        match &self.clips.settings {
            Some(settings) => base.join(settings),
            None => self.clip_directory(base).join(DEFAULT_SETTINGS_FILE),
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use config::{Config, File, FileFormat};

    use crate::config::{Controller, Sensor};

    use super::Player;

    fn parse(yaml: &str) -> Player {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_full_config() {
        let player = parse(
            r#"
            audio:
              device: mock-device
              volume: 80
            sensors:
              left:
                kind: gpio
                pin: 17
              right:
                kind: gpio
                chip: /dev/gpiochip4
                pin: 4
                active_low: false
            debounce: 500ms
            poll_interval: 5ms
            clips:
              directory: sounds
              settings: /etc/bellbard/settings.yaml
            controllers:
              - kind: web
                port: 8080
              - kind: keyboard
            "#,
        );

        assert_eq!("mock-device", player.audio().device());
        assert_eq!(80, player.audio().volume());
        match &player.sensors().left {
            Sensor::Gpio(gpio) => {
                assert_eq!(Path::new("/dev/gpiochip0"), gpio.chip());
                assert_eq!(17, gpio.pin());
                assert!(gpio.active_low());
            }
            _ => panic!("expected a GPIO sensor"),
        }
        match &player.sensors().right {
            Sensor::Gpio(gpio) => {
                assert_eq!(Path::new("/dev/gpiochip4"), gpio.chip());
                assert_eq!(4, gpio.pin());
                assert!(!gpio.active_low());
            }
            _ => panic!("expected a GPIO sensor"),
        }
        assert_eq!(Duration::from_millis(500), player.debounce().unwrap());
        assert_eq!(Duration::from_millis(5), player.poll_interval().unwrap());
        assert_eq!(
            PathBuf::from("/srv/sounds"),
            player.clip_directory(Path::new("/srv"))
        );
        assert_eq!(
            PathBuf::from("/etc/bellbard/settings.yaml"),
            player.settings_file(Path::new("/srv"))
        );

        assert_eq!(2, player.controllers().len());
        match &player.controllers()[0] {
            Controller::Web(web) => assert_eq!(8080, web.port()),
            _ => panic!("expected a web controller"),
        }
        assert!(matches!(player.controllers()[1], Controller::Keyboard));
    }

    #[test]
    fn test_defaults() {
        let player = parse(
            r#"
            audio:
              device: default
            sensors:
              left:
                kind: mock
              right:
                kind: mock
                closed: false
            clips:
              directory: sounds
            "#,
        );

        assert_eq!(50, player.audio().volume());
        assert_eq!(44100, player.audio().sample_rate());
        assert_eq!(2, player.audio().channels());
        assert_eq!(Duration::from_secs(1), player.debounce().unwrap());
        assert_eq!(Duration::from_millis(10), player.poll_interval().unwrap());
        assert_eq!(
            PathBuf::from("base/sounds/settings.yaml"),
            player.settings_file(Path::new("base"))
        );
        assert!(player.controllers().is_empty());
        match &player.sensors().right {
            Sensor::Mock(mock) => assert!(!mock.closed()),
            _ => panic!("expected a mock sensor"),
        }
    }

    #[test]
    fn test_example_config() {
        let player = Player::deserialize(Path::new("assets/bellbard.yaml")).unwrap();
        assert_eq!("default", player.audio().device());
        assert_eq!(Duration::from_secs(1), player.debounce().unwrap());
        assert_eq!(2, player.controllers().len());
        assert_eq!(
            PathBuf::from("assets/settings.yaml"),
            player.settings_file(Path::new("assets"))
        );
    }

    #[test]
    fn test_bad_duration() {
        let player = parse(
            r#"
            audio:
              device: default
            sensors:
              left:
                kind: mock
              right:
                kind: mock
            debounce: soon
            clips:
              directory: sounds
            "#,
        );

        assert!(player.debounce().is_err());
    }
}
