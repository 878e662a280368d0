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
use std::{io, sync::Arc};

use tokio::task::JoinHandle;
use tracing::{info, span, warn, Level};

use crate::{
    clips::ClipId,
    debounce::Edge,
    scheduler::{Outcome, ScheduleError, Scheduler},
    util,
};

const OPEN: &str = "open";
const CLOSE: &str = "close";
const PREVIEW: &str = "preview";
const STOP: &str = "stop";
const LIST: &str = "list";

/// A controller for bench testing from a terminal. `open` and `close` simulate a door edge.
pub struct Driver {
    scheduler: Arc<Scheduler>,
}

impl Driver {
    pub fn new(scheduler: Arc<Scheduler>) -> Driver {
        Driver { scheduler }
    }

    /// Reads and runs one command. Returns false once the input is closed.
    fn monitor_io<R, W>(
        scheduler: &Scheduler,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({}, {}, {} <id>, {}, {}): ",
            OPEN, CLOSE, PREVIEW, STOP, LIST,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let input = input.trim().to_lowercase();
        let mut parts = input.split_whitespace();
        let result = match (parts.next(), parts.next()) {
            (Some(OPEN), None) => Self::edge(scheduler, Edge::Opened, &mut writer),
            (Some(CLOSE), None) => Self::edge(scheduler, Edge::Closed, &mut writer),
            (Some(PREVIEW), Some(id)) => match id.parse::<u64>() {
                Ok(id) => scheduler.trigger_preview(ClipId(id)).and_then(|(clip, length)| {
                    writeln!(
                        writer,
                        "Previewing {} ({})",
                        clip.name,
                        util::duration_minutes_seconds(length)
                    )?;
                    Ok(())
                }),
                Err(_) => {
                    writeln!(writer, "Invalid clip id {:?}", id)?;
                    Ok(())
                }
            },
            (Some(STOP), None) => scheduler.stop(),
            (Some(LIST), None) => {
                for clip in scheduler.list_clips() {
                    writeln!(writer, "{}", clip)?;
                }
                Ok(())
            }
            (None, _) => Ok(()),
            _ => {
                warn!(input = input, "Unrecognized input");
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(err = %e, "Command failed");
            writeln!(writer, "Error: {}", e)?;
        }
        writer.flush()?;
        Ok(true)
    }

    fn edge<W: io::Write>(
        scheduler: &Scheduler,
        edge: Edge,
        writer: &mut W,
    ) -> Result<(), ScheduleError> {
        match scheduler.on_edge_event(edge)? {
            Outcome::Played { clip, length } => writeln!(
                writer,
                "Door {}: playing {} ({})",
                edge,
                clip.name,
                util::duration_minutes_seconds(length)
            )?,
            Outcome::Skipped(reason) => writeln!(writer, "Door {}: skipped, {}", edge, reason)?,
        }
        Ok(())
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self) -> JoinHandle<Result<(), io::Error>> {
        let scheduler = self.scheduler.clone();
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&scheduler, io::stdin().lock(), io::stdout())? {}
            info!("Keyboard input closed.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader};

    use crate::{
        audio::mock::SinkCall,
        scheduler::test::{fixture, Fixture},
    };

    use super::{Driver, CLOSE, LIST, OPEN, STOP};

    fn run(fixture: &Fixture, command: &str) -> Result<(bool, String), io::Error> {
        let reader = BufReader::new(command.as_bytes());
        let mut output: Vec<u8> = Vec::new();
        let more = Driver::monitor_io(&fixture.scheduler, reader, &mut output)?;
        Ok((more, String::from_utf8_lossy(&output).into_owned()))
    }

    #[test]
    fn test_keyboard_commands() -> Result<(), io::Error> {
        let fixture = fixture(&["bell.wav", "chime.wav"]);
        let bell = fixture.id("bell");
        fixture
            .scheduler
            .toggle_flags(bell, Some(true), None)
            .unwrap();

        let (more, output) = run(&fixture, OPEN)?;
        assert!(more);
        assert!(output.contains("Door opened: playing bell"), "{}", output);

        let (_, output) = run(&fixture, CLOSE)?;
        assert!(output.contains("skipped"), "{}", output);

        let (_, output) = run(&fixture, LIST)?;
        assert!(output.contains("bell"));
        assert!(output.contains("chime"));

        fixture.sink.clear_calls();
        let chime = fixture.id("chime");
        let (_, output) = run(&fixture, &format!("preview {}", chime))?;
        assert!(output.contains("Previewing chime"), "{}", output);
        assert_eq!(
            vec![
                SinkCall::Stop,
                SinkCall::Load(fixture.path("chime.wav")),
                SinkCall::Play
            ],
            fixture.sink.calls()
        );

        fixture.sink.clear_calls();
        run(&fixture, STOP)?;
        assert_eq!(vec![SinkCall::Stop], fixture.sink.calls());
        Ok(())
    }

    #[test]
    fn test_keyboard_errors() -> Result<(), io::Error> {
        let fixture = fixture(&["bell.wav"]);

        let (_, output) = run(&fixture, "preview 99")?;
        assert!(output.contains("Error: clip 99 not found"), "{}", output);

        let (_, output) = run(&fixture, "preview bell")?;
        assert!(output.contains("Invalid clip id"), "{}", output);

        let (more, _) = run(&fixture, "unrecognized")?;
        assert!(more);
        assert!(fixture.sink.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_keyboard_eof() -> Result<(), io::Error> {
        let fixture = fixture(&[]);
        let (more, _) = run(&fixture, "")?;
        assert!(!more);
        Ok(())
    }
}
