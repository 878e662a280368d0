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
use std::io;
use std::sync::Arc;
use std::thread;

use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, span, Level};

use crate::config;
use crate::scheduler::Scheduler;

pub mod keyboard;
#[cfg(feature = "web")]
pub mod web;

/// A control surface. Drivers talk to the scheduler directly and run until they fail or
/// their input closes.
pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self) -> JoinHandle<Result<(), io::Error>>;
}

/// Builds the drivers for the configured controllers.
pub fn drivers(
    configs: &[config::Controller],
    scheduler: Arc<Scheduler>,
) -> Result<Vec<Arc<dyn Driver>>, Box<dyn Error>> {
    configs
        .iter()
        .map(|config| -> Result<Arc<dyn Driver>, Box<dyn Error>> {
            let driver: Arc<dyn Driver> = match config {
                #[cfg(feature = "web")]
                config::Controller::Web(web) => web::Driver::new(web, scheduler.clone())?,
                #[cfg(not(feature = "web"))]
                config::Controller::Web(_) => {
                    return Err("web controller requires the web feature".into())
                }
                config::Controller::Keyboard => Arc::new(keyboard::Driver::new(scheduler.clone())),
            };
            Ok(driver)
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("driver task failed: {0}")]
    Join(#[from] JoinError),

    #[error("driver exited with an error: {0}")]
    Driver(#[from] io::Error),
}

/// Owns the running drivers and the door monitor thread.
pub struct Controller {
    handles: Vec<JoinHandle<Result<(), io::Error>>>,
    monitor: Option<thread::JoinHandle<()>>,
}

impl Controller {
    /// Starts every driver.
    pub fn new(
        drivers: Vec<Arc<dyn Driver>>,
        monitor: Option<thread::JoinHandle<()>>,
    ) -> Controller {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let handles = drivers
            .iter()
            .map(|driver| driver.monitor_events())
            .collect::<Vec<_>>();
        info!(drivers = handles.len(), "Controller started.");

        Controller { handles, monitor }
    }

    /// Join waits for every driver. The first driver error is returned once all drivers
    /// have finished. Drivers that finish cleanly leave the door monitor running, so with
    /// a monitor attached join only returns on error.
    pub async fn join(&mut self) -> Result<(), ControllerError> {
        let mut failure = None;
        for handle in self.handles.iter_mut() {
            if let Err(e) = handle.await? {
                error!(err = %e, "Driver exited with an error.");
                failure.get_or_insert(e);
            }
        }
        if let Some(e) = failure {
            return Err(e.into());
        }

        if self.monitor.is_some() {
            info!("Drivers finished, door monitor still running.");
            std::future::pending::<()>().await;
        }
        info!("Controller closing.");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{
        io,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    use tokio::{task::JoinHandle, time::timeout};

    use super::{Controller, ControllerError, Driver};

    struct TestDriver {
        fail: bool,
        started: Arc<AtomicBool>,
    }

    impl Driver for TestDriver {
        fn monitor_events(&self) -> JoinHandle<Result<(), io::Error>> {
            let fail = self.fail;
            let started = self.started.clone();
            tokio::spawn(async move {
                started.store(true, Ordering::Relaxed);
                if fail {
                    Err(io::Error::other("driver failed"))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn drivers(fail: &[bool]) -> (Vec<Arc<dyn Driver>>, Vec<Arc<AtomicBool>>) {
        let started: Vec<Arc<AtomicBool>> =
            fail.iter().map(|_| Arc::new(AtomicBool::new(false))).collect();
        let drivers = fail
            .iter()
            .zip(started.iter())
            .map(|(fail, started)| -> Arc<dyn Driver> {
                Arc::new(TestDriver {
                    fail: *fail,
                    started: started.clone(),
                })
            })
            .collect();
        (drivers, started)
    }

    #[tokio::test]
    async fn test_join_reports_failed_driver() {
        let (drivers, started) = drivers(&[true, false]);
        let monitor = thread::spawn(thread::park);
        let mut controller = Controller::new(drivers, Some(monitor));

        let result = timeout(Duration::from_secs(5), controller.join())
            .await
            .expect("join should return when a driver fails");
        assert!(matches!(result, Err(ControllerError::Driver(_))));
        assert!(started.iter().all(|s| s.load(Ordering::Relaxed)));
    }

    #[tokio::test]
    async fn test_join_keeps_running_with_monitor() {
        let (drivers, started) = drivers(&[false, false]);
        let monitor = thread::spawn(thread::park);
        let mut controller = Controller::new(drivers, Some(monitor));

        assert!(timeout(Duration::from_millis(200), controller.join())
            .await
            .is_err());
        assert!(started.iter().all(|s| s.load(Ordering::Relaxed)));
    }

    #[tokio::test]
    async fn test_join_without_monitor() {
        let (drivers, _) = drivers(&[false]);
        let mut controller = Controller::new(drivers, None);
        assert!(controller.join().await.is_ok());
    }
}
