/*!
Board host loop.

Builds one driver per configured family, applies parameter overrides, starts
every configured device and streams the resulting events to stdout as JSON
lines until the running flag drops.
*/

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use drivers::{Driver, DriverKind};
use serde::Serialize;
use shared::{CanonicalEvent, EventSink, FnSink};
use tracing::{info, trace, warn};

use crate::config::AppConfig;

/// How long the output loop waits before re-checking the running flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One line of output
#[derive(Serialize)]
struct EventLine<'a> {
    timestamp: String,
    driver: &'static str,
    #[serde(flatten)]
    event: &'a CanonicalEvent,
}

pub struct BoardHost {
    config: AppConfig,
    drivers: Vec<Driver>,
    running: Arc<AtomicBool>,
}

impl BoardHost {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            drivers: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get a handle to the running flag for signal handling
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Start every configured device and pump events to stdout
    pub fn run(&mut self) -> Result<()> {
        let rx = self.start_devices()?;

        let stdout = io::stdout();
        let result = pump(&rx, &self.running, &mut stdout.lock());

        self.shutdown();
        // Shutdown events queued while stopping
        while let Ok(line) = rx.try_recv() {
            if write_event(&mut stdout.lock(), line.0, &line.1).is_err() {
                break;
            }
        }
        result
    }

    /// Build drivers, register sinks and start instances. Returns the
    /// receiving end of the shared event channel.
    fn start_devices(&mut self) -> Result<Receiver<(DriverKind, CanonicalEvent)>> {
        let (tx, rx) = unbounded();
        let options = self.config.host.driver_options();

        for kind in self.config.driver_kinds() {
            let driver = Driver::with_options(kind, options.clone());
            driver.set_callback(event_sink(kind, tx.clone()));
            apply_parameters(&driver, &self.config)?;
            info!("Initialized {} driver v{}", driver.name(), driver.version());
            self.drivers.push(driver);
        }

        for key in self.config.parameters.keys() {
            if !self
                .drivers
                .iter()
                .any(|driver| driver.get_parameter(key).is_some())
            {
                warn!("Parameter {} is not known by any configured driver", key);
            }
        }

        for device in &self.config.devices {
            let Some(driver) = self.drivers.iter().find(|d| d.kind() == device.driver) else {
                continue;
            };
            match driver.start(device.id, device.address) {
                Ok(()) => info!(
                    "Starting {:#010x} at {:#010x} with {}",
                    device.id,
                    device.address,
                    driver.name()
                ),
                Err(e) => warn!(
                    "Could not start {:#010x} at {:#010x}: {}",
                    device.id, device.address, e
                ),
            }
        }

        Ok(rx)
    }

    /// Stop every instance of every driver
    pub fn shutdown(&mut self) {
        for driver in self.drivers.drain(..) {
            driver.shutdown();
            info!("{} driver shut down", driver.name());
        }
    }
}

/// Sink tagging every event with the driver that produced it
fn event_sink(kind: DriverKind, tx: Sender<(DriverKind, CanonicalEvent)>) -> Arc<dyn EventSink> {
    Arc::new(FnSink(move |event: CanonicalEvent| {
        if tx.send((kind, event)).is_err() {
            trace!("Output loop gone, discarding {:?}", event.kind);
        }
    }))
}

fn apply_parameters(driver: &Driver, config: &AppConfig) -> Result<()> {
    for (key, &value) in &config.parameters {
        if driver.get_parameter(key).is_some() {
            driver
                .set_parameter(key, value)
                .with_context(|| format!("Failed to set {} on {}", key, driver.name()))?;
        }
    }
    Ok(())
}

/// Forward events until the running flag clears. A closed stdout ends the
/// loop cleanly.
fn pump<W: Write>(
    rx: &Receiver<(DriverKind, CanonicalEvent)>,
    running: &AtomicBool,
    out: &mut W,
) -> Result<()> {
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok((kind, event)) => {
                if let Err(e) = write_event(out, kind, &event) {
                    if e.kind() == io::ErrorKind::BrokenPipe {
                        info!("Output closed, stopping");
                        return Ok(());
                    }
                    return Err(e).context("Failed to write event");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

fn write_event<W: Write>(out: &mut W, kind: DriverKind, event: &CanonicalEvent) -> io::Result<()> {
    let line = EventLine {
        timestamp: Local::now().to_rfc3339(),
        driver: kind.tag(),
        event,
    };
    serde_json::to_writer(&mut *out, &line)?;
    out.write_all(b"\n")?;
    out.flush()
}
