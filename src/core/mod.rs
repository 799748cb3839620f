// Core business logic module

pub mod alerts;
pub mod channel;
pub mod config;
pub mod monitor;
pub mod report;
pub mod sensor;

// Re-export commonly used items
pub use alerts::{Alert, AlertEvaluator, AlertRule, TimeWindow};
pub use channel::{ConnectionState, DeviceChannel, ResourceKind};
pub use config::Config;
pub use monitor::{Controller, ControllerState};
pub use sensor::{Sensor, SensorKind};
