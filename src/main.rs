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
use std::path::PathBuf;
use std::time::Duration;

use bellbard::{audio, clips, config, util};
use clap::{crate_version, Parser, Subcommand};
use tracing::info;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=door chime player
After=sound.target

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/bellbard
ExecStart=/usr/local/bin/bellbard start "$BELLBARD_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=bellbard.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A door chime player."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the clip files that would be picked up from the given directory.
    Clips {
        /// The path to the clip directory.
        path: String,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Plays a single clip file through the audio interface.
    Play {
        /// The device name to play through.
        device_name: String,
        /// The clip file to play.
        file: String,
        /// Volume from 0 to 100.
        #[arg[short, long]]
        volume: Option<u8>,
    },
    /// Start will start the door chime player.
    Start {
        /// The path to the player config.
        player_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Clips { path } => {
            let files = clips::clip_files(&PathBuf::from(&path))?;
            if files.is_empty() {
                println!("No clips found in {}.", path);
                return Ok(());
            }
            println!("Clips (count: {}):", files.len());
            for file in files {
                println!(
                    "- {} ({})",
                    util::file_stem(&file),
                    util::filename_display(&file)
                );
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;
            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }
            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            device_name,
            file,
            volume,
        } => {
            let mut audio_config = config::Audio::new(&device_name);
            if let Some(volume) = volume {
                audio_config = audio_config.with_volume(volume);
            }
            let sink = audio::get_sink(&audio_config)?;
            let file = PathBuf::from(file);
            let length = sink.length(&file)?;

            info!(
                sink = %sink,
                clip = util::filename_display(&file),
                length = util::duration_minutes_seconds(length),
                "Playing clip."
            );
            sink.load(&file)?;
            sink.play()?;

            // Leave time for the output to drain.
            tokio::time::sleep(length + Duration::from_millis(250)).await;
            while sink.is_busy() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
        Commands::Start { player_path } => {
            let mut controller = config::init_engine(&PathBuf::from(player_path))?;
            controller.join().await?;
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE);
        }
    }

    Ok(())
}
