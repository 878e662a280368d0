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

//! Persistence of clip metadata between runs.

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clips::{Clip, ClipId};
use crate::util;

/// Loads and saves the clip registry.
pub trait Store: Send + Sync {
    /// Loads every persisted clip. Clips are returned as stored, including ones whose file
    /// has since disappeared.
    fn load_all(&self) -> Result<Vec<Clip>, Box<dyn Error>>;

    /// Replaces the persisted clips with the given ones.
    fn save_all(&self, clips: &[Clip]) -> Result<(), Box<dyn Error>>;
}

/// The on-disk representation of the settings file.
#[derive(Deserialize, Serialize, Default)]
struct SettingsFile {
    #[serde(default)]
    sound_effects: Vec<ClipRecord>,
}

/// The on-disk representation of a clip. Files written before ids were persisted have no
/// id, so one is allocated when they're loaded.
#[derive(Deserialize, Serialize)]
struct ClipRecord {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    name: Option<String>,
    file_path: PathBuf,
    #[serde(default)]
    on_open: bool,
    #[serde(default)]
    on_close: bool,
}

/// Stores settings in a YAML file.
pub struct YamlStore {
    path: PathBuf,
}

impl YamlStore {
    pub fn new(path: &Path) -> YamlStore {
        YamlStore {
            path: path.to_path_buf(),
        }
    }
}

impl Store for YamlStore {
    fn load_all(&self) -> Result<Vec<Clip>, Box<dyn Error>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    path = ?self.path,
                    "Settings file not found, starting with no clips."
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let settings: SettingsFile = if contents.trim().is_empty() {
            SettingsFile::default()
        } else {
            serde_yml::from_str(&contents)
                .map_err(|e| format!("error parsing file {}: {}", self.path.display(), e))?
        };

        let mut next_id = match settings
            .sound_effects
            .iter()
            .filter_map(|record| record.id)
            .max()
        {
            Some(max) => max.checked_add(1).ok_or_else(|| {
                format!(
                    "error parsing file {}: clip id {} is out of range",
                    self.path.display(),
                    max
                )
            })?,
            None => 0,
        };

        Ok(settings
            .sound_effects
            .into_iter()
            .map(|record| {
                let id = record.id.unwrap_or_else(|| {
                    let id = next_id;
                    next_id = next_id.saturating_add(1);
                    id
                });
                let name = record
                    .name
                    .unwrap_or_else(|| util::file_stem(&record.file_path).to_string());
                Clip {
                    id: ClipId(id),
                    name,
                    file_path: record.file_path,
                    on_open: record.on_open,
                    on_close: record.on_close,
                }
            })
            .collect())
    }

    fn save_all(&self, clips: &[Clip]) -> Result<(), Box<dyn Error>> {
        let mut records: Vec<ClipRecord> = clips
            .iter()
            .map(|clip| ClipRecord {
                id: Some(clip.id.0),
                name: Some(clip.name.clone()),
                file_path: clip.file_path.clone(),
                on_open: clip.on_open,
                on_close: clip.on_close,
            })
            .collect();
        records.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));

        let serialized = serde_yml::to_string(&SettingsFile {
            sound_effects: records,
        })?;

        // Write then rename so a crash never leaves a truncated settings file.
        let tmp_path = self.path.with_extension("yaml.tmp");
        fs::write(&tmp_path, serialized)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = ?self.path, clips = clips.len(), "Saved settings.");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{fs, path::PathBuf};

    use crate::clips::{Clip, ClipId};

    use super::{Store, YamlStore};

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = YamlStore::new(&dir.path().join("settings.yaml"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = YamlStore::new(&dir.path().join("settings.yaml"));

        let clips = vec![
            Clip {
                id: ClipId(4),
                name: "welcome".to_string(),
                file_path: PathBuf::from("sounds/welcome.wav"),
                on_open: true,
                on_close: false,
            },
            Clip {
                id: ClipId(1),
                name: "bye".to_string(),
                file_path: PathBuf::from("sounds/bye.mp3"),
                on_open: false,
                on_close: true,
            },
        ];
        store.save_all(&clips).unwrap();

        let loaded = store.load_all().unwrap();
        // Saved in name order.
        assert_eq!(vec![clips[1].clone(), clips[0].clone()], loaded);
    }

    #[test]
    fn test_records_without_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(
            &path,
            r#"
sound_effects:
  - file_path: sounds/famima.wav
    on_open: true
  - file_path: sounds/door.wav
    name: Door
    id: 9
  - file_path: sounds/chime.mp3
"#,
        )
        .unwrap();

        let loaded = YamlStore::new(&path).load_all().unwrap();
        assert_eq!(3, loaded.len());
        assert_eq!(ClipId(10), loaded[0].id);
        assert_eq!("famima", loaded[0].name);
        assert!(loaded[0].on_open);
        assert!(!loaded[0].on_close);
        assert_eq!(ClipId(9), loaded[1].id);
        assert_eq!("Door", loaded[1].name);
        assert_eq!(ClipId(11), loaded[2].id);
    }

    #[test]
    fn test_id_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(
            &path,
            r#"
sound_effects:
  - file_path: sounds/door.wav
    id: 18446744073709551615
  - file_path: sounds/chime.mp3
"#,
        )
        .unwrap();

        let err = YamlStore::new(&path).load_all().unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "sound_effects: [[[").unwrap();

        assert!(YamlStore::new(&path).load_all().is_err());
    }
}
