//! Analog signal processing: trimmed averaging and the conversions applied
//! on top of it by the derived analog sensors.

use super::buffer::SampleBuffer;
use super::{RawSample, UNAVAILABLE};

/// Full scale of the 10 bit A/D converter
pub const MAX_RANGE: f64 = 1023.0;

/// High/Low level bucket boundaries
pub const LEVEL_HIGH: f64 = 768.0;
pub const LEVEL_LOW: f64 = 256.0;

// Steinhart-Hart coefficients for the 10k thermistor
const SH_A: f64 = 0.001129148;
const SH_B: f64 = 0.000234125;
const SH_C: f64 = 8.76741e-8;

/// Rolling buffer plus the averaged sample derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogChannel {
    buffer: SampleBuffer,
    averaging: bool,
    averaged: f64,
}

impl AnalogChannel {
    pub fn new(buffer: SampleBuffer, averaging: bool) -> Self {
        Self {
            buffer,
            averaging,
            averaged: UNAVAILABLE,
        }
    }

    /// Default 16 sample channel with trimmed averaging
    pub fn averaged() -> Self {
        Self::new(SampleBuffer::analog_default(), true)
    }

    pub fn update(&mut self, raw: RawSample) {
        self.buffer.push(f64::from(raw));
        self.averaged = if self.averaging {
            self.buffer.trimmed_mean()
        } else {
            self.buffer.latest().unwrap_or(UNAVAILABLE)
        };
    }

    /// Averaged sample, or `UNAVAILABLE` before the first update
    pub fn sample(&self) -> f64 {
        self.averaged
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }
}

/// Thermistor reading in Fahrenheit.
///
/// Wiring: `[Ground] -- [pad resistor] -- | -- [thermistor] -- [Vcc]`
pub fn thermistor_fahrenheit(sample: f64, pad_resistor: f64, calibration: f64) -> f64 {
    if sample <= 0.0 {
        return 0.0;
    }
    let resistance = (1024.0 * pad_resistor / sample) - pad_resistor;
    let ln_r = resistance.ln();
    let kelvin = 1.0 / (SH_A + SH_B * ln_r + SH_C * ln_r.powi(3));
    let celsius = kelvin - 273.15;
    celsius * 9.0 / 5.0 + 32.0 + calibration
}

/// Flips sensor polarity so that larger means more
pub fn inverted(sample: f64) -> f64 {
    MAX_RANGE - sample
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
    Normal,
}

impl Level {
    pub fn classify(value: f64) -> Self {
        if value > LEVEL_HIGH {
            Level::High
        } else if value < LEVEL_LOW {
            Level::Low
        } else {
            Level::Normal
        }
    }
}

pub fn format_analog(value: f64) -> String {
    format!("{:6.1}", value)
}
