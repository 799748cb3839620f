//! Monitor orchestration.
//!
//! The controller runs one cycle per sample interval: read every sensor over
//! the device channel, evaluate alerts, write the status artifact, publish it
//! when due and flush alert lines to the notifier.

mod controller;

pub use controller::{Controller, ControllerState, CycleReport, MonitoredSensor, Reporters};
