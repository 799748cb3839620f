//! Debounced digital inputs.

use super::{RawSample, UNAVAILABLE};

/// Consecutive identical reads required before the visible state flips
/// is `DEBOUNCE_RUN + 1`.
pub const DEBOUNCE_RUN: u32 = 3;

/// Run-length debounce filter with lifetime duty cycle totals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Debounce {
    ones_run: u32,
    zeros_run: u32,
    ones_total: u64,
    zeros_total: u64,
    previous: u8,
    state: Option<u8>,
}

impl Debounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any non-one read counts as a zero
    pub fn update(&mut self, raw: RawSample) {
        if raw == 1 {
            if self.previous == 0 {
                self.previous = 1;
                self.zeros_run = 0;
            }
            self.ones_run += 1;
            self.ones_total += 1;
        } else {
            if self.previous == 1 {
                self.previous = 0;
                self.ones_run = 0;
            }
            self.zeros_run += 1;
            self.zeros_total += 1;
        }

        if self.ones_run > DEBOUNCE_RUN {
            self.state = Some(1);
        } else if self.zeros_run > DEBOUNCE_RUN {
            self.state = Some(0);
        }
    }

    /// Debounced state, `None` until a run long enough has been seen
    pub fn state(&self) -> Option<u8> {
        self.state
    }

    /// Debounced state as a calibrated value
    pub fn value(&self) -> f64 {
        self.state.map(f64::from).unwrap_or(UNAVAILABLE)
    }

    pub fn ones_run(&self) -> u32 {
        self.ones_run
    }

    pub fn zeros_run(&self) -> u32 {
        self.zeros_run
    }

    /// Percentage of lifetime reads that were zero
    pub fn percent_zero(&self) -> Option<f64> {
        let total = self.ones_total + self.zeros_total;
        if total == 0 {
            return None;
        }
        Some(self.zeros_total as f64 * 100.0 / total as f64)
    }
}

/// Texts shown for the two debounced states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTexts {
    pub zero: String,
    pub one: String,
}

impl StateTexts {
    pub fn render(&self, value: f64) -> String {
        if value == 0.0 {
            self.zero.clone()
        } else if value == 1.0 {
            self.one.clone()
        } else {
            "Not Avail".to_string()
        }
    }
}

/// CO2 delivery rendering. A zero read means gas is flowing.
///
/// Reports the length of the current raw run, ignoring the debounce gate,
/// plus the lifetime on-time.
pub fn render_co2(debounce: &Debounce, texts: &StateTexts, sample_time_secs: u64) -> String {
    let (text, run) = if debounce.zeros_run() > 0 {
        (&texts.zero, debounce.zeros_run())
    } else if debounce.ones_run() > 0 {
        (&texts.one, debounce.ones_run())
    } else {
        return "Not Avail".to_string();
    };

    let minutes = (u64::from(run) * sample_time_secs) as f64 / 60.0;
    let percent_on = debounce.percent_zero().unwrap_or(0.0);
    format!(
        "{} {:.0} minutes. (overall on-time: {:.0}%)",
        text, minutes, percent_on
    )
}
