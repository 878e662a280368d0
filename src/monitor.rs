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
use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, error, info, span, warn, Level};

use crate::{
    debounce::{Debouncer, Edge},
    scheduler::{Outcome, Scheduler},
    sensor::Sensor,
};

/// A sensor and the debouncer that filters it.
struct Door {
    sensor: Arc<dyn Sensor>,
    debouncer: Debouncer,
}

impl Door {
    fn new(sensor: Arc<dyn Sensor>, threshold: Duration) -> Door {
        // A sensor that can't be read yet is assumed closed.
        let initial_level = sensor.read_level().unwrap_or_else(|e| {
            warn!(sensor = %sensor, err = %e, "Unable to read initial sensor level.");
            true
        });
        info!(sensor = %sensor, closed = initial_level, "Watching sensor.");

        Door {
            sensor,
            debouncer: Debouncer::new(initial_level, threshold),
        }
    }

    /// Samples the sensor. Read failures are treated as no event.
    fn sample(&mut self, now: Instant) -> Option<Edge> {
        match self.sensor.read_level() {
            Ok(level) => self.debouncer.sample(level, now),
            Err(e) => {
                warn!(sensor = %self.sensor, err = %e, "Error reading sensor.");
                None
            }
        }
    }
}

/// Polls both door sensors and hands accepted edges to the scheduler. This is the only
/// caller of the scheduler for door chimes.
pub struct DoorMonitor {
    doors: Vec<Door>,
    scheduler: Arc<Scheduler>,
}

impl DoorMonitor {
    pub fn new(
        scheduler: Arc<Scheduler>,
        left: Arc<dyn Sensor>,
        right: Arc<dyn Sensor>,
        threshold: Duration,
    ) -> DoorMonitor {
        DoorMonitor {
            doors: vec![Door::new(left, threshold), Door::new(right, threshold)],
            scheduler,
        }
    }

    /// Samples every sensor once. Returns the outcome of each accepted edge.
    ///
    /// A panic while handling one sensor is contained to that sensor for this tick.
    pub fn tick(&mut self, now: Instant) -> Vec<(Edge, Outcome)> {
        let mut outcomes = Vec::new();
        for door in self.doors.iter_mut() {
            let scheduler = &self.scheduler;
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                let edge = door.sample(now)?;
                info!(sensor = %door.sensor, edge = %edge, "Door edge.");
                match scheduler.on_edge_event(edge) {
                    Ok(outcome) => Some((edge, outcome)),
                    Err(e) => {
                        error!(edge = %edge, err = %e, "Error scheduling playback.");
                        None
                    }
                }
            }));

            match result {
                Ok(Some((edge, outcome))) => {
                    if let Outcome::Skipped(reason) = &outcome {
                        debug!(edge = %edge, reason = %reason, "Edge skipped.");
                    }
                    outcomes.push((edge, outcome));
                }
                Ok(None) => {}
                Err(_) => error!(sensor = %door.sensor, "Panic while handling sensor."),
            }
        }
        outcomes
    }

    /// Starts polling on a dedicated thread. The thread runs for the life of the process.
    pub fn start(mut self, poll_interval: Duration) -> Result<thread::JoinHandle<()>, io::Error> {
        thread::Builder::new()
            .name("door-monitor".to_string())
            .spawn(move || {
                let span = span!(Level::INFO, "door monitor");
                let _enter = span.enter();

                info!(
                    poll_interval = ?poll_interval,
                    "Door monitor started."
                );
                loop {
                    self.tick(Instant::now());
                    thread::sleep(poll_interval);
                }
            })
    }
}

#[cfg(test)]
mod test {
    use std::{
        fmt,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    use crate::{
        debounce::Edge,
        scheduler::{test::fixture, Outcome, SkipReason},
        sensor::{self, mock, SensorError},
        testutil::eventually,
    };

    use super::DoorMonitor;

    const THRESHOLD: Duration = Duration::from_secs(1);

    fn at(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    /// Panics on every read once armed.
    #[derive(Default)]
    struct PanickingSensor {
        armed: AtomicBool,
    }

    impl sensor::Sensor for PanickingSensor {
        fn read_level(&self) -> Result<bool, SensorError> {
            if self.armed.load(Ordering::Relaxed) {
                panic!("sensor exploded");
            }
            Ok(true)
        }
    }

    impl fmt::Display for PanickingSensor {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "panicking")
        }
    }

    #[test]
    fn test_single_play_for_bouncy_samples() {
        let fixture = fixture(&["a.wav"]);
        let id = fixture.id("a");
        fixture
            .scheduler
            .toggle_flags(id, Some(true), Some(true))
            .unwrap();

        let left = mock::Sensor::get("left", true);
        let right = mock::Sensor::get("right", true);
        let mut monitor = DoorMonitor::new(
            fixture.scheduler.clone(),
            Arc::new(left.clone()),
            Arc::new(right),
            THRESHOLD,
        );

        let start = Instant::now();
        let mut edges = Vec::new();
        for (i, closed) in [true, true, false, false].into_iter().enumerate() {
            left.set_closed(closed);
            edges.extend(monitor.tick(at(start, i as u64 * 200)));
        }

        assert_eq!(1, edges.len());
        assert_eq!(Edge::Opened, edges[0].0);
        assert!(matches!(edges[0].1, Outcome::Played { .. }));
        assert_eq!(1, fixture.sink.played().len());
    }

    #[test]
    fn test_bounce_back_is_suppressed() {
        let fixture = fixture(&["a.wav"]);
        fixture
            .scheduler
            .toggle_flags(fixture.id("a"), Some(true), Some(true))
            .unwrap();

        let left = mock::Sensor::get("left", true);
        let mut monitor = DoorMonitor::new(
            fixture.scheduler.clone(),
            Arc::new(left.clone()),
            Arc::new(mock::Sensor::get("right", true)),
            THRESHOLD,
        );

        let start = Instant::now();
        left.set_closed(false);
        assert_eq!(1, monitor.tick(at(start, 0)).len());
        left.set_closed(true);
        assert!(monitor.tick(at(start, 300)).is_empty());
        assert!(monitor.tick(at(start, 900)).is_empty());

        let edges = monitor.tick(at(start, 1000));
        assert_eq!(1, edges.len());
        assert_eq!(Edge::Closed, edges[0].0);
        assert_eq!(2, fixture.sink.played().len());
    }

    #[test]
    fn test_both_doors_share_the_sink() {
        let fixture = fixture(&["a.wav"]);
        fixture
            .scheduler
            .toggle_flags(fixture.id("a"), Some(true), None)
            .unwrap();
        fixture.sink.set_hold(true);

        let left = mock::Sensor::get("left", true);
        let right = mock::Sensor::get("right", true);
        let mut monitor = DoorMonitor::new(
            fixture.scheduler.clone(),
            Arc::new(left.clone()),
            Arc::new(right.clone()),
            THRESHOLD,
        );

        left.set_closed(false);
        right.set_closed(false);
        let edges = monitor.tick(Instant::now());
        assert_eq!(2, edges.len());
        assert!(matches!(edges[0].1, Outcome::Played { .. }));
        assert_eq!(Outcome::Skipped(SkipReason::AudioBusy), edges[1].1);
    }

    #[test]
    fn test_sensor_failures_are_not_events() {
        let fixture = fixture(&["a.wav"]);
        fixture
            .scheduler
            .toggle_flags(fixture.id("a"), Some(true), None)
            .unwrap();

        let left = Arc::new(PanickingSensor::default());
        let right = mock::Sensor::get("right", true);
        let mut monitor = DoorMonitor::new(
            fixture.scheduler.clone(),
            left.clone(),
            Arc::new(right.clone()),
            THRESHOLD,
        );
        left.armed.store(true, Ordering::Relaxed);

        right.set_failing(true);
        right.set_closed(false);
        assert!(monitor.tick(Instant::now()).is_empty());

        right.set_failing(false);
        let edges = monitor.tick(Instant::now());
        assert_eq!(1, edges.len());
        assert_eq!(Edge::Opened, edges[0].0);
    }

    #[test]
    fn test_monitor_thread() {
        let fixture = fixture(&["a.wav"]);
        fixture
            .scheduler
            .toggle_flags(fixture.id("a"), Some(true), None)
            .unwrap();

        let left = mock::Sensor::get("left", true);
        let monitor = DoorMonitor::new(
            fixture.scheduler.clone(),
            Arc::new(left.clone()),
            Arc::new(mock::Sensor::get("right", true)),
            THRESHOLD,
        );
        let _handle = monitor.start(Duration::from_millis(5)).unwrap();

        left.set_closed(false);
        eventually(
            || fixture.sink.played().len() == 1,
            "Door monitor never played a clip",
        );
    }
}
