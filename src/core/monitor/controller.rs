use chrono::{Local, NaiveDateTime};
use log::{error, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::alerts::AlertEvaluator;
use crate::core::channel::{sleep_unless, ConnectionState, Connector, DeviceChannel};
use crate::core::config::Config;
use crate::core::report::{MeasurementLog, Notifier, Publisher, StatusReport};
use crate::core::sensor::Sensor;
use crate::error::{ReefError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Sampling,
    Reporting,
    Terminated,
}

/// A sensor together with its alert state
#[derive(Debug, Clone)]
pub struct MonitoredSensor {
    pub sensor: Sensor,
    pub evaluator: AlertEvaluator,
}

/// Where each cycle's output goes
pub struct Reporters {
    pub status_file: PathBuf,
    pub publisher: Box<dyn Publisher>,
    pub notifier: Box<dyn Notifier>,
    pub measurements: Box<dyn MeasurementLog>,
}

/// Outcome of one reporting step
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub status: String,
    pub alerts: Vec<String>,
    pub published: bool,
}

/// Drives the sample -> evaluate -> report loop
pub struct Controller<C: Connector> {
    channel: DeviceChannel<C>,
    sensors: Vec<MonitoredSensor>,
    reporters: Reporters,
    sample_time: u64,
    server_update_freq: u64,
    report_calls: u64,
    pending_alerts: Vec<String>,
    started: NaiveDateTime,
    state: ControllerState,
}

impl<C: Connector> Controller<C> {
    /// Build the sensor set from `config`, in declaration order
    pub fn new(
        config: &Config,
        channel: DeviceChannel<C>,
        reporters: Reporters,
        started: NaiveDateTime,
    ) -> Result<Self> {
        let sensors = config
            .sensors
            .iter()
            .map(|decl| -> Result<MonitoredSensor> {
                Ok(MonitoredSensor {
                    sensor: Sensor::from_decl(decl, config.sample_time, started)?,
                    evaluator: AlertEvaluator::from_decl(decl, started)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut controller = Self {
            channel,
            sensors,
            reporters,
            sample_time: config.sample_time,
            server_update_freq: config.server_update_freq,
            report_calls: 0,
            pending_alerts: Vec::new(),
            started,
            state: ControllerState::Sampling,
        };
        // Publish on the first cycle
        controller.force_publish();
        Ok(controller)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn sensors(&self) -> &[MonitoredSensor] {
        &self.sensors
    }

    pub fn report_calls(&self) -> u64 {
        self.report_calls
    }

    pub fn connect(&mut self) -> Result<()> {
        self.channel.connect()
    }

    /// Read every sensor once, in order
    pub fn sample_all(&mut self) -> Result<()> {
        self.state = ControllerState::Sampling;
        for monitored in &mut self.sensors {
            let (kind, index) = monitored.sensor.resource();
            let raw = self.channel.read_raw(kind, index)?;
            monitored.sensor.update(raw);
        }
        Ok(())
    }

    /// Evaluate, write the status artifact, publish when due and flush
    /// alerts. Collaborator failures are logged and do not stop the cycle.
    pub fn test_and_report(&mut self, now: NaiveDateTime) -> CycleReport {
        self.state = ControllerState::Reporting;
        let mut report = StatusReport::new(self.started, now);
        let mut fired = Vec::new();

        for monitored in &mut self.sensors {
            let sensor = &mut monitored.sensor;
            let value = sensor.value();
            let evaluation = monitored.evaluator.test(value, now);
            if let Some(alert) = evaluation.alert {
                fired.push(alert.message);
            }
            sensor.track(value, now, monitored.evaluator.is_armed());
            report.push(sensor.label(), sensor.render_text(value));

            if let Err(e) = sensor.log(value, now, &mut *self.reporters.measurements) {
                error!("Error making log entry for {}: {}", sensor.label(), e);
            }
        }

        if !fired.is_empty() {
            self.force_publish();
            self.pending_alerts.extend(fired.iter().cloned());
        }

        let status = report.render();
        if let Err(e) = report.write(&self.reporters.status_file) {
            error!("Error writing status file {:?}: {}", self.reporters.status_file, e);
        }

        self.report_calls += 1;
        // report_calls * sample_time > server_update_freq, without the multiply
        let published = self.report_calls > self.server_update_freq / self.sample_time;
        if published {
            self.report_calls = 0;
            if let Err(e) = self.reporters.publisher.publish(&self.reporters.status_file) {
                error!("Error updating cloud drive: {}", e);
            }
        }

        self.flush_alerts(&status);

        CycleReport {
            status,
            alerts: fired,
            published,
        }
    }

    /// One full sampling and reporting cycle
    pub fn run_cycle(&mut self, now: NaiveDateTime) -> Result<CycleReport> {
        self.run_cycle_with(|| now)
    }

    /// Like [`run_cycle`](Self::run_cycle), reading `clock` only after every
    /// sensor has been sampled, so time spent reconnecting is not backdated.
    pub fn run_cycle_with<F>(&mut self, clock: F) -> Result<CycleReport>
    where
        F: FnOnce() -> NaiveDateTime,
    {
        self.sample_all()?;
        Ok(self.test_and_report(clock()))
    }

    /// Connect and run cycles until `shutdown` is set or the channel fails
    /// for good. A shutdown during reconnect backoff ends the run cleanly.
    pub fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        self.channel.set_shutdown(shutdown.clone());
        self.connect()?;
        let cadence = Duration::from_secs(self.sample_time);

        while !shutdown.load(Ordering::Relaxed) {
            match self.run_cycle_with(|| Local::now().naive_local()) {
                Ok(_) => {}
                Err(ReefError::Interrupted) => break,
                Err(e) => {
                    self.state = ControllerState::Terminated;
                    error!("Unrecoverable failure, exiting: {}", e);
                    return Err(e);
                }
            }
            sleep_unless(cadence, &shutdown);
        }

        info!("User requested termination. Exiting.");
        self.channel.disconnect();
        self.state = ControllerState::Terminated;
        Ok(())
    }

    fn force_publish(&mut self) {
        self.report_calls = self.server_update_freq / self.sample_time;
    }

    fn flush_alerts(&mut self, status: &str) {
        if self.pending_alerts.is_empty() {
            return;
        }
        if let Err(e) = self.reporters.notifier.notify(&self.pending_alerts, status) {
            error!("Error sending alert: {}", e);
        }
        self.pending_alerts.clear();
    }
}
