//! Sensor model.
//!
//! A [`Sensor`] owns its rolling sample state and turns raw controller reads
//! into a calibrated value. The set of variants is closed; every variant
//! answers the same four questions: `update`, `value`, `render_text` and
//! `label`.

pub mod analog;
mod buffer;
pub mod digital;
pub mod ph;

use chrono::NaiveDateTime;
use serde::Serialize;

pub use analog::{AnalogChannel, Level, MAX_RANGE};
pub use buffer::SampleBuffer;
pub use digital::{Debounce, StateTexts};
pub use ph::PhProbe;

use crate::core::channel::ResourceKind;
use crate::core::config::SensorDecl;
use crate::core::report::MeasurementLog;
use crate::error::{ReefError, Result};

/// Integer read from the controller: 0-1023 for analog, 0/1 for digital
pub type RawSample = u16;

/// Calibrated value of a sensor that has not produced a reading yet
pub const UNAVAILABLE: f64 = -1.0;

/// Samples in the variance flow buffer
pub const FLOW_VARIANCE_LEN: usize = 118;

/// Sensor kind, keyed by the tag used in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SensorKind {
    Analog,
    Digital,
    Temperature,
    FlowVariance,
    FlowDelta,
    Light,
    FloorWet,
    Co2,
    HighLow,
    Ph,
}

impl SensorKind {
    pub const ALL: [SensorKind; 10] = [
        SensorKind::Analog,
        SensorKind::Digital,
        SensorKind::Temperature,
        SensorKind::FlowVariance,
        SensorKind::FlowDelta,
        SensorKind::Light,
        SensorKind::FloorWet,
        SensorKind::Co2,
        SensorKind::HighLow,
        SensorKind::Ph,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            SensorKind::Analog => "gpioa",
            SensorKind::Digital => "gpiod",
            SensorKind::Temperature => "temp",
            SensorKind::FlowVariance => "rflow",
            SensorKind::FlowDelta => "flow",
            SensorKind::Light => "light",
            SensorKind::FloorWet => "floor",
            SensorKind::Co2 => "co2",
            SensorKind::HighLow => "hilow",
            SensorKind::Ph => "ph",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn resource(self) -> ResourceKind {
        match self {
            SensorKind::Digital | SensorKind::FloorWet | SensorKind::Co2 => ResourceKind::Gpio,
            _ => ResourceKind::Adc,
        }
    }

    /// Names of the variant specific fields following the rule
    pub fn extra_fields(self) -> &'static [&'static str] {
        match self {
            SensorKind::Digital | SensorKind::FloorWet | SensorKind::Co2 => &["text0", "text1"],
            SensorKind::Temperature => &["pad_resistor", "calibration"],
            SensorKind::HighLow => &["high_text", "low_text", "normal_text"],
            SensorKind::Ph => &["slope", "offset"],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Variant {
    Analog(AnalogChannel),
    Temperature {
        channel: AnalogChannel,
        pad_resistor: f64,
        calibration: f64,
    },
    FlowVariance(AnalogChannel),
    FlowDelta(AnalogChannel),
    Light(AnalogChannel),
    HighLow {
        channel: AnalogChannel,
        high: String,
        low: String,
        normal: String,
    },
    Ph(PhProbe),
    Digital {
        debounce: Debounce,
        texts: StateTexts,
    },
    FloorWet {
        debounce: Debounce,
        texts: StateTexts,
    },
    Co2 {
        debounce: Debounce,
        texts: StateTexts,
        sample_time_secs: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    label: String,
    index: u32,
    kind: SensorKind,
    variant: Variant,
}

impl Sensor {
    /// Build a sensor from its declaration. `now` seeds the pH day and hour
    /// stamps.
    pub fn from_decl(decl: &SensorDecl, sample_time_secs: u64, now: NaiveDateTime) -> Result<Self> {
        let wanted = decl.kind.extra_fields();
        if decl.extra.len() < wanted.len() {
            return Err(ReefError::config(format!(
                "sensor {:?} ({}) needs fields: {}",
                decl.label,
                decl.kind.tag(),
                wanted.join(", ")
            )));
        }
        let text = |i: usize| decl.extra[i].clone();
        let number = |i: usize| -> Result<f64> {
            decl.extra[i].parse().map_err(|_| {
                ReefError::config(format!(
                    "sensor {:?}: {} is not a number: {:?}",
                    decl.label, wanted[i], decl.extra[i]
                ))
            })
        };

        let variant = match decl.kind {
            SensorKind::Analog => Variant::Analog(AnalogChannel::averaged()),
            SensorKind::Temperature => Variant::Temperature {
                channel: AnalogChannel::averaged(),
                pad_resistor: number(0)?,
                calibration: number(1)?,
            },
            SensorKind::FlowVariance => {
                let seed = (0..1024)
                    .step_by(64)
                    .chain((0..1024).step_by(10))
                    .take(FLOW_VARIANCE_LEN)
                    .map(f64::from);
                Variant::FlowVariance(AnalogChannel::new(SampleBuffer::seeded(seed), false))
            }
            SensorKind::FlowDelta => Variant::FlowDelta(AnalogChannel::averaged()),
            SensorKind::Light => Variant::Light(AnalogChannel::averaged()),
            SensorKind::HighLow => Variant::HighLow {
                channel: AnalogChannel::averaged(),
                high: text(0),
                low: text(1),
                normal: text(2),
            },
            SensorKind::Ph => {
                let slope = number(0)?;
                if slope == 0.0 {
                    return Err(ReefError::config(format!(
                        "sensor {:?}: slope must be non-zero",
                        decl.label
                    )));
                }
                Variant::Ph(PhProbe::new(slope, number(1)?, now))
            }
            SensorKind::Digital | SensorKind::FloorWet | SensorKind::Co2 => {
                let debounce = Debounce::new();
                let texts = StateTexts {
                    zero: text(0),
                    one: text(1),
                };
                match decl.kind {
                    SensorKind::Co2 => Variant::Co2 {
                        debounce,
                        texts,
                        sample_time_secs,
                    },
                    SensorKind::FloorWet => Variant::FloorWet { debounce, texts },
                    _ => Variant::Digital { debounce, texts },
                }
            }
        };

        Ok(Self {
            label: decl.label.clone(),
            index: decl.index,
            kind: decl.kind,
            variant,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Controller resource read for this sensor
    pub fn resource(&self) -> (ResourceKind, u32) {
        (self.kind.resource(), self.index)
    }

    /// Push one raw sample and recompute the calibrated state
    pub fn update(&mut self, raw: RawSample) {
        match &mut self.variant {
            Variant::Analog(channel)
            | Variant::Temperature { channel, .. }
            | Variant::FlowVariance(channel)
            | Variant::FlowDelta(channel)
            | Variant::Light(channel)
            | Variant::HighLow { channel, .. } => channel.update(raw),
            Variant::Ph(probe) => probe.update(raw),
            Variant::Digital { debounce, .. }
            | Variant::FloorWet { debounce, .. }
            | Variant::Co2 { debounce, .. } => debounce.update(raw),
        }
    }

    /// Latest calibrated value
    pub fn value(&self) -> f64 {
        match &self.variant {
            Variant::Analog(channel) | Variant::HighLow { channel, .. } => channel.sample(),
            Variant::Temperature {
                channel,
                pad_resistor,
                calibration,
            } => analog::thermistor_fahrenheit(channel.sample(), *pad_resistor, *calibration),
            Variant::FlowVariance(channel) => channel.buffer().std_dev(),
            Variant::FlowDelta(channel) | Variant::Light(channel) => analog::inverted(channel.sample()),
            Variant::Ph(probe) => probe.value(),
            Variant::Digital { debounce, .. }
            | Variant::FloorWet { debounce, .. }
            | Variant::Co2 { debounce, .. } => debounce.value(),
        }
    }

    pub fn render_text(&self, value: f64) -> String {
        match &self.variant {
            Variant::HighLow {
                high, low, normal, ..
            } => match Level::classify(value) {
                Level::High => high.clone(),
                Level::Low => low.clone(),
                Level::Normal => normal.clone(),
            },
            Variant::Ph(probe) => probe.render(value),
            Variant::Digital { texts, .. } | Variant::FloorWet { texts, .. } => texts.render(value),
            Variant::Co2 {
                debounce,
                texts,
                sample_time_secs,
            } => digital::render_co2(debounce, texts, *sample_time_secs),
            _ => analog::format_analog(value),
        }
    }

    /// Post-evaluation bookkeeping (pH daily extremes)
    pub fn track(&mut self, value: f64, now: NaiveDateTime, armed: bool) {
        if let Variant::Ph(probe) = &mut self.variant {
            probe.track(value, now, armed);
        }
    }

    /// Append to the measurement log if this variant keeps one
    pub fn log(&mut self, value: f64, now: NaiveDateTime, log: &mut dyn MeasurementLog) -> Result<()> {
        match &mut self.variant {
            Variant::Ph(probe) => probe.log(value, now, log),
            _ => Ok(()),
        }
    }
}
