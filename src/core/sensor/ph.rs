//! pH probe with daily extremes and an hourly measurement log.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use super::analog::AnalogChannel;
use super::buffer::SampleBuffer;
use super::RawSample;
use crate::core::report::MeasurementLog;
use crate::error::Result;

/// Raw reading of a probe sitting in neutral solution
pub const NEUTRAL_RAW: f64 = 472.5;

const BUFFER_LEN: usize = 16 + 20;

// Sentinels so the first armed reading of a day replaces both extremes
const MAX_SENTINEL: f64 = 4.0;
const MIN_SENTINEL: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PhProbe {
    channel: AnalogChannel,
    slope: f64,
    offset: f64,
    max: f64,
    max_at: NaiveDateTime,
    min: f64,
    min_at: NaiveDateTime,
    day: NaiveDate,
    logged_hour: u32,
}

impl PhProbe {
    pub fn new(slope: f64, offset: f64, now: NaiveDateTime) -> Self {
        Self {
            channel: AnalogChannel::new(
                SampleBuffer::seeded(std::iter::repeat(NEUTRAL_RAW).take(BUFFER_LEN)),
                true,
            ),
            slope,
            offset,
            max: MAX_SENTINEL,
            max_at: now,
            min: MIN_SENTINEL,
            min_at: now,
            day: now.date(),
            logged_hour: now.hour(),
        }
    }

    pub fn update(&mut self, raw: RawSample) {
        self.channel.update(raw);
    }

    pub fn value(&self) -> f64 {
        ph_from_sample(self.channel.sample(), self.slope, self.offset)
    }

    /// Roll the daily window and, once alerting is armed, fold `value` into
    /// the day's extremes.
    pub fn track(&mut self, value: f64, now: NaiveDateTime, armed: bool) {
        if now.date() != self.day {
            self.reset_extremes(now);
        }
        if !armed {
            return;
        }
        if value > self.max {
            self.max = value;
            self.max_at = now;
        }
        if value < self.min {
            self.min = value;
            self.min_at = now;
        }
    }

    /// Append one row per clock hour. The hour is only marked as logged once
    /// the append succeeds.
    pub fn log(&mut self, value: f64, now: NaiveDateTime, log: &mut dyn MeasurementLog) -> Result<()> {
        if now.hour() == self.logged_hour {
            return Ok(());
        }
        log.append(now, value)?;
        self.logged_hour = now.hour();
        Ok(())
    }

    pub fn render(&self, value: f64) -> String {
        format!(
            "{:2.1}  max:{:3.1} at {}  min:{:3.1} at {}",
            value,
            self.max,
            self.max_at.format("%I:%M %p"),
            self.min,
            self.min_at.format("%I:%M %p")
        )
    }

    pub fn extremes(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    fn reset_extremes(&mut self, now: NaiveDateTime) {
        self.max = MAX_SENTINEL;
        self.min = MIN_SENTINEL;
        self.max_at = now;
        self.min_at = now;
        self.day = now.date();
    }
}

pub fn ph_from_sample(sample: f64, slope: f64, offset: f64) -> f64 {
    sample / slope + offset
}
